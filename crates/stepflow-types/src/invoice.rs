//! Invoice processing schemas.
//!
//! Typed input and structured-output shapes for the invoice pipeline:
//! the request (PDF link plus model), and the extracted invoice record the
//! generation service must conform to.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input request for invoice processing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InvoiceRequest {
    /// Invoice PDF file URL.
    pub file_link: String,
    /// Model to use for extraction.
    #[serde(default = "default_model_id")]
    pub model_id: String,
}

fn default_model_id() -> String {
    "gpt-4.1".to_string()
}

/// Individual line item in an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LineItem {
    /// Description of the item or service.
    pub description: String,
    /// Quantity of items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    /// Price per unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    /// Total amount for this line item.
    pub amount: f64,
}

/// Structured invoice data extracted from a PDF.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InvoiceData {
    /// Name of the vendor/supplier.
    pub vendor_name: String,
    /// Vendor address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_address: Option<String>,
    /// Invoice number.
    pub invoice_number: String,
    /// Invoice date.
    pub invoice_date: String,
    /// Payment due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// List of line items.
    pub line_items: Vec<LineItem>,
    /// Subtotal before tax.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<f64>,
    /// Tax amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<f64>,
    /// Total invoice amount.
    pub total_amount: f64,
    /// Currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Additional notes or payment terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

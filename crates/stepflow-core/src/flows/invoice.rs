//! Invoice processing pipeline: download a PDF, extract structured data,
//! cross-check the arithmetic.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;
use tracing::debug;

use stepflow_types::invoice::{InvoiceData, InvoiceRequest};
use stepflow_types::pipeline::StepOutput;

use crate::pipeline::{FunctionStep, Pipeline, ServiceStep, StepContext};
use crate::service::fetch::BoxRemoteFetch;
use crate::service::generate::BoxGenerationService;

/// Arithmetic checks tolerate rounding to the cent.
const CENT_TOLERANCE: f64 = 0.01;

const EXTRACTION_INSTRUCTIONS: &str = "You are an invoice data extraction specialist. \
Read the attached invoice document and extract every field you can find. \
Use null for fields that are not present; never guess values.";

/// Build the invoice processing pipeline.
///
/// Steps: `download-invoice` (fetch the PDF), `extract-invoice-data`
/// (structured extraction against the [`InvoiceData`] schema), and
/// `validate-invoice-data` (deterministic arithmetic cross-checks).
pub fn invoice_pipeline(
    service: Arc<BoxGenerationService>,
    fetcher: Arc<BoxRemoteFetch>,
    model: impl Into<String>,
) -> Pipeline {
    let download = FunctionStep::new("download-invoice", move |ctx: StepContext| {
        let fetcher = Arc::clone(&fetcher);
        async move {
            let request: InvoiceRequest = ctx.typed_input()?;
            match fetcher.fetch(&request.file_link).await {
                Ok(file) => {
                    debug!(
                        url = %request.file_link,
                        bytes = file.bytes.len(),
                        "invoice downloaded"
                    );
                    Ok(StepOutput::success(json!({
                        "file_link": request.file_link,
                        "filename": file.filename,
                        "content_type": file
                            .content_type
                            .as_deref()
                            .unwrap_or("application/pdf"),
                        "base64": BASE64.encode(&file.bytes),
                        "bytes": file.bytes.len(),
                    })))
                }
                Err(err) => Ok(StepOutput::fatal(err.to_string())),
            }
        }
    });

    // model_id in the request wins over the configured default.
    let extract = ServiceStep::new("extract-invoice-data", service)
        .model(model)
        .model_from_input("model_id")
        .instructions(EXTRACTION_INSTRUCTIONS)
        .prompt("Extract the invoice data from the attached document.")
        .output_schema::<InvoiceData>("invoice_data")
        .attachment_from_step("download-invoice");

    let validate = FunctionStep::new("validate-invoice-data", |ctx: StepContext| async move {
        let extracted = ctx.step_content("extract-invoice-data")?.clone();
        let data: InvoiceData = match serde_json::from_value(extracted) {
            Ok(data) => data,
            Err(err) => {
                return Ok(StepOutput::fatal(format!(
                    "extracted invoice is malformed: {err}"
                )));
            }
        };

        let issues = check_totals(&data);
        if issues.is_empty() {
            Ok(StepOutput::success(json!({
                "valid": true,
                "invoice": data,
            })))
        } else {
            Ok(StepOutput::failure(json!({
                "valid": false,
                "invoice": data,
                "issues": issues,
            })))
        }
    });

    Pipeline::new("invoice-processing")
        .input_schema::<InvoiceRequest>()
        .step(download)
        .step(extract)
        .step(validate)
}

/// Cross-check line items, subtotal, tax, and total.
fn check_totals(data: &InvoiceData) -> Vec<String> {
    let mut issues = Vec::new();

    if !data.line_items.is_empty() {
        let line_sum: f64 = data.line_items.iter().map(|item| item.amount).sum();
        let expected = data.subtotal.unwrap_or(data.total_amount);
        if (line_sum - expected).abs() > CENT_TOLERANCE {
            issues.push(format!(
                "line items sum to {line_sum:.2} but expected {expected:.2}"
            ));
        }
    }

    if let (Some(subtotal), Some(tax)) = (data.subtotal, data.tax_amount) {
        let computed = subtotal + tax;
        if (computed - data.total_amount).abs() > CENT_TOLERANCE {
            issues.push(format!(
                "subtotal {subtotal:.2} plus tax {tax:.2} is {computed:.2}, \
                 not total {total:.2}",
                total = data.total_amount
            ));
        }
    }

    issues
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! HTTP-backed service implementations.

pub mod fetch;

pub use fetch::HttpFetcher;

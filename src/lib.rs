//! mailchimp-export - Async client for the MailChimp Export API v1.0
//!
//! Wraps the bulk-export HTTP endpoints (`list`,
//! `campaignSubscriberActivity`) behind an authenticated client. Responses
//! are newline-delimited JSON records and can be consumed either buffered
//! (one `Vec` of records) or incrementally (a [`RecordBatchStream`] yielding
//! one batch per transport chunk, with partial records carried across chunk
//! boundaries).
//!
//! # Example
//!
//! ```rust,no_run
//! use mailchimp_export::{ExportClient, ExportParams};
//!
//! # async fn run() -> mailchimp_export::Result<()> {
//! let client = ExportClient::new("0123456789abcdef-us2")?;
//!
//! let mut params = ExportParams::new();
//! params.insert("id".to_string(), "my-list-id".to_string());
//!
//! let members = client.list(&params).await?;
//! println!("exported {} members", members.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod errors;
pub mod framing;
pub mod operations;

// Re-export commonly used types
pub use client::{ExportClient, ExportParams};
pub use config::ExportConfig;
pub use errors::{ExportError, Result};
pub use framing::{Record, RecordBatchStream};

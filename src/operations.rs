//! Static registry of Export API operations
//!
//! Each operation is described once, at compile time: its wire name, the
//! parameters it accepts, and how its response body is framed. Dispatch goes
//! through [`lookup`] so a mistyped name is a hard error instead of silently
//! resolving to nothing.

use crate::errors::{ExportError, Result};

/// Export API version this operation set belongs to
pub const EXPORT_API_VERSION: &str = "1.0";

/// How an operation's response body is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Newline-delimited JSON records
    LineDelimited {
        /// The service may omit the body entirely when there is nothing to
        /// report; decode that as a successful empty result
        allow_absent_body: bool,
    },

    /// Fallback for operations without a line framer: the whole body is one
    /// JSON document. No registered operation uses this today; it is the
    /// default framing for operations added before their line decoder is.
    SingleDocument,
}

/// Descriptor for one export operation
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    /// Wire name, as it appears in the endpoint path
    pub name: &'static str,

    /// Parameters forwarded to the service; anything else is dropped
    pub allowed_params: &'static [&'static str],

    /// Response framing for this operation
    pub framing: Framing,
}

/// Exports/dumps members of a list and all of their associated details.
///
/// See <https://apidocs.mailchimp.com/export/1.0/list.func.php>
pub const LIST: OperationSpec = OperationSpec {
    name: "list",
    allowed_params: &["id", "status", "segment", "since"],
    framing: Framing::LineDelimited {
        allow_absent_body: false,
    },
};

/// Exports/dumps all subscriber activity for the requested campaign.
///
/// The service omits the body entirely when the campaign has no activity.
///
/// See <https://apidocs.mailchimp.com/export/1.0/campaignsubscriberactivity.func.php>
pub const CAMPAIGN_SUBSCRIBER_ACTIVITY: OperationSpec = OperationSpec {
    name: "campaignSubscriberActivity",
    allowed_params: &["id", "include_empty", "since"],
    framing: Framing::LineDelimited {
        allow_absent_body: true,
    },
};

/// All registered operations
pub const OPERATIONS: &[&OperationSpec] = &[&LIST, &CAMPAIGN_SUBSCRIBER_ACTIVITY];

/// Resolve an operation by wire name
pub fn lookup(name: &str) -> Result<&'static OperationSpec> {
    OPERATIONS
        .iter()
        .find(|spec| spec.name == name)
        .copied()
        .ok_or_else(|| ExportError::UnknownOperation(name.to_string()))
}

//! Classified result of a single order submission.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one order dispatch.
///
/// Produced once per submission and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderOutcome {
    /// The exchange returned a usable identifier (tx hash or order id).
    Identifier { id: String },
    /// The exchange refused the order.
    Rejected { reason: String },
    /// The response shape was not recognized, or the submission itself failed.
    ///
    /// `synthetic_id` is derived from the target identifier, `cause` carries
    /// the transport error when there was one.
    Fallback {
        synthetic_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },
}

impl OrderOutcome {
    /// Correlation token for the report.
    ///
    /// A rejected order has none: it must never look like a placed trade.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::Identifier { id } => Some(id),
            Self::Fallback { synthetic_id, .. } => Some(synthetic_id),
            Self::Rejected { .. } => None,
        }
    }

    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Detail worth carrying into a report's `error_detail`, if any.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Identifier { .. } => None,
            Self::Rejected { reason } => Some(format!("order rejected: {reason}")),
            Self::Fallback {
                cause: Some(cause), ..
            } => Some(format!("order submission failed: {cause}")),
            Self::Fallback { cause: None, .. } => {
                Some("unrecognized exchange response, using fallback identifier".to_string())
            }
        }
    }
}

impl fmt::Display for OrderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier { id } => write!(f, "identifier({id})"),
            Self::Rejected { reason } => write!(f, "rejected({reason})"),
            Self::Fallback { synthetic_id, .. } => write!(f, "fallback({synthetic_id})"),
        }
    }
}

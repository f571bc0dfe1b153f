//! Message format for compositing in a web worker.
//!
//! A [`ComposeOrder`] and its [`ComposeReply`] travel as small JSON
//! strings.  The source files and the encoded PNG travel beside them as
//! raw byte buffers, so no pixel data is ever JSON-encoded.
//!
//! Errors cross the boundary as an [`ErrorReport`]: the message and the
//! failing slot survive, the underlying error chain does not.

use serde::{Deserialize, Serialize};

use crate::config::{Limits, ProfileKind, ResolutionProfile};
use crate::encode::CompositeImage;
use crate::layout::Layout;
use crate::types::{ComposeError, Slot};

/// Parameters of one compositing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeOrder {
    /// Generation token, echoed in the reply.
    pub token: u64,
    /// Preview or export.
    pub kind: ProfileKind,
    /// Output geometry.
    pub profile: ResolutionProfile,
    /// Input and canvas limits.
    pub limits: Limits,
}

/// A [`ComposeError`] flattened for transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// The slot that caused the failure, if any.
    pub slot: Option<Slot>,
    /// Rendered error message.
    pub message: String,
}

impl From<&ComposeError> for ErrorReport {
    fn from(error: &ComposeError) -> Self {
        Self {
            slot: error.slot(),
            message: error.to_string(),
        }
    }
}

impl From<ErrorReport> for ComposeError {
    fn from(report: ErrorReport) -> Self {
        Self::Worker {
            slot: report.slot,
            message: report.message,
        }
    }
}

/// Outcome of a [`ComposeOrder`].  On success the PNG bytes are sent
/// alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeReply {
    /// Token of the order this answers.
    pub token: u64,
    /// Layout of the encoded composite, or why there is none.
    pub outcome: Result<Layout, ErrorReport>,
}

impl ComposeOrder {
    /// Composite `front` and `back` on the current thread.
    ///
    /// Returns the reply and, on success, the PNG bytes to send with it.
    #[must_use]
    pub fn execute(&self, front: &[u8], back: &[u8]) -> (ComposeReply, Option<Vec<u8>>) {
        match crate::compose(front, back, &self.profile, &self.limits) {
            Ok(image) => {
                let reply = ComposeReply {
                    token: self.token,
                    outcome: Ok(*image.layout()),
                };
                (reply, Some(image.into_png()))
            }
            Err(e) => {
                let reply = ComposeReply {
                    token: self.token,
                    outcome: Err(ErrorReport::from(&e)),
                };
                (reply, None)
            }
        }
    }
}

impl ComposeReply {
    /// Rebuild the composite from the reply and the PNG bytes that came
    /// with it.
    ///
    /// # Errors
    ///
    /// Returns the reported failure as [`ComposeError::Worker`], or a
    /// [`ComposeError::Worker`] without a slot when a successful reply
    /// arrived without its PNG.
    pub fn into_result(self, png: Option<Vec<u8>>) -> Result<CompositeImage, ComposeError> {
        match (self.outcome, png) {
            (Ok(layout), Some(png)) => Ok(CompositeImage::from_parts(png, layout)),
            (Ok(_), None) => Err(ComposeError::Worker {
                slot: None,
                message: "worker reply is missing the PNG data".into(),
            }),
            (Err(report), _) => Err(report.into()),
        }
    }
}

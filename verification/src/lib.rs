//! Proof-of-possession challenges gating ledger writes.
//!
//! A wallet requests a challenge, signs its message, and submits the
//! signature. A valid signature inside the window authorizes exactly one
//! ledger write, after which the record is consumed.

pub mod codec;
pub mod error;
pub mod queue;
pub mod record;

pub use codec::{decode_queue, encode_queue, DecodedQueue};
pub use error::VerificationError;
pub use queue::{
    Challenge, ExpiryPolicy, QueueConfig, SubmissionIssue, SubmissionReport, VerificationQueue,
    DEFAULT_PROTOCOL_TAG, DEFAULT_VALIDATION_WINDOW_MS,
};
pub use record::{challenge_message, RecordState, VerificationRecord};

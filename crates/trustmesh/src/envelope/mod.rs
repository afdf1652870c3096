//! Signed, hybrid-encrypted message envelopes.

pub mod codec;
pub mod types;

pub use codec::{seal_for, EnvelopeCodec};
pub use types::{MessageEnvelope, OpenedMessage, SignatureStatus, ENVELOPE_VERSION};

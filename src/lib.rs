//! Codec for NITF image segment subheaders.
//!
//! Every structure here is a [Record]: an ordered table of field descriptors
//! plus the current values, decoded from and encoded to a caller supplied
//! byte window. On top of the generic record sit the typed entities:
//! [ImageSegmentHeader] (NITF 2.1 and 2.0), [MaskSubheader], [ImageBand] and
//! [ImageComment].
use thiserror::Error;

pub mod band;
pub mod extension;
pub mod field;
pub mod header;
pub mod loops;
pub mod mask;
pub mod policy;
pub mod record;
pub mod security;

pub use band::{ImageBand, ImageComment};
pub use extension::Extension;
pub use field::{Field, Kind, Schema, Value};
pub use header::{ImageSegmentHeader, Version};
pub use loops::CountFormat;
pub use mask::MaskSubheader;
pub use policy::Policy;
pub use record::{Context, Record};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{field}: invalid value {value} ({reason})")]
    SchemaViolation {
        field: String,
        value: String,
        reason: String,
    },
    #[error("{field}: needs {needed} bytes, only {available} available")]
    Truncated {
        field: String,
        needed: usize,
        available: usize,
    },
    #[error("{0} requires band_depth and blocks to decode")]
    MissingContext(String),
    #[error("{record} consumed {consumed} bytes but re-encodes to {encoded}")]
    LengthMismatch {
        record: String,
        consumed: usize,
        encoded: usize,
    },
    #[error("{record} has no field {field}")]
    UnknownField { record: String, field: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

impl CodecError {
    pub(crate) fn schema(
        field: impl Into<String>,
        value: impl std::fmt::Debug,
        reason: impl Into<String>,
    ) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            value: format!("{value:?}"),
            reason: reason.into(),
        }
    }
}

//! Handling of cross-field inconsistencies
use log::warn;

use crate::{CodecError, CodecResult};

/// What to do when a value has to be corrected to keep a record consistent,
/// or when a decoded record would not re-encode to the bytes it came from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Fail with an error naming the offending field.
    Strict,
    /// Log a warning, apply the correction and carry on.
    #[default]
    Lenient,
}

impl Policy {
    /// Apply a correction to `field`, or refuse it under [Policy::Strict].
    pub(crate) fn correct(
        self,
        field: &str,
        value: impl std::fmt::Debug,
        reason: &str,
    ) -> CodecResult<()> {
        match self {
            Self::Strict => Err(CodecError::schema(field, value, reason)),
            Self::Lenient => {
                warn!("{field}: {reason}, correcting {value:?}");
                Ok(())
            }
        }
    }

    /// Compare the bytes a decode consumed with the bytes the result re-encodes to.
    pub(crate) fn check_length(
        self,
        record: &str,
        consumed: usize,
        encoded: usize,
    ) -> CodecResult<()> {
        if consumed == encoded {
            return Ok(());
        }
        match self {
            Self::Strict => Err(CodecError::LengthMismatch {
                record: record.to_string(),
                consumed,
                encoded,
            }),
            Self::Lenient => {
                warn!(
                    "{record} was decoded from {consumed} bytes but would encode to {encoded} bytes"
                );
                Ok(())
            }
        }
    }
}

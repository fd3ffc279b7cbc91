//! Length prefixed extension containers (user defined and extended subheader data)
use serde_json::{json, Value as Json};

use crate::field::parse_decimal;
use crate::record::Window;
use crate::{CodecError, CodecResult};

const MAX_LENGTH: usize = 99_999;
const MAX_OVERFLOW: u16 = 999;

/// Opaque tagged record extension data.
///
/// On the wire: five digit length, then (when non-zero) a three digit
/// overflow pointer and `length - 3` bytes of content.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Extension {
    overflow: Option<u16>,
    data: Vec<u8>,
}

impl Extension {
    pub fn new(overflow: u16, data: Vec<u8>) -> CodecResult<Self> {
        if overflow > MAX_OVERFLOW {
            return Err(CodecError::schema(
                "overflow",
                overflow,
                format!("at most {MAX_OVERFLOW}"),
            ));
        }
        if data.len() + 3 > MAX_LENGTH {
            return Err(CodecError::schema(
                "data",
                data.len(),
                format!("at most {} bytes", MAX_LENGTH - 3),
            ));
        }
        Ok(Self {
            overflow: Some(overflow),
            data,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.overflow.is_none()
    }

    pub fn overflow(&self) -> Option<u16> {
        self.overflow
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Value of the length field
    pub fn length(&self) -> usize {
        match self.overflow {
            Some(_) => self.data.len() + 3,
            None => 0,
        }
    }

    pub fn encoded_len(&self) -> usize {
        5 + self.length()
    }

    pub(crate) fn decode(field: &str, window: &mut Window<'_>) -> CodecResult<Self> {
        let length = parse_decimal(field, window.take(field, 5)?)? as usize;
        if length == 0 {
            return Ok(Self::default());
        }
        if length < 3 {
            return Err(CodecError::schema(
                field,
                length,
                "non-zero length must cover the overflow pointer",
            ));
        }
        let overflow = parse_decimal(field, window.take(field, 3)?)? as u16;
        let data = window.take(field, length - 3)?.to_vec();
        Ok(Self {
            overflow: Some(overflow),
            data,
        })
    }

    pub(crate) fn encode(&self, field: &str, out: &mut Vec<u8>) -> CodecResult<()> {
        let length = self.length();
        if length > MAX_LENGTH {
            return Err(CodecError::schema(field, length, "does not fit in 5 digits"));
        }
        out.extend_from_slice(format!("{length:05}").as_bytes());
        if let Some(overflow) = self.overflow {
            out.extend_from_slice(format!("{overflow:03}").as_bytes());
            out.extend_from_slice(&self.data);
        }
        Ok(())
    }

    pub(crate) fn to_json(&self) -> Json {
        match self.overflow {
            Some(overflow) => json!({ "length": self.length(), "overflow": overflow }),
            None => json!({ "length": 0 }),
        }
    }
}

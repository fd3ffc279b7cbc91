//! Count prefixes of repeated records
use crate::field::parse_decimal;
use crate::record::Window;
use crate::{CodecError, CodecResult};

/// How the number of children of a loop is written ahead of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountFormat {
    /// One decimal digit, 0 through 9
    Single,
    /// One digit for 1 through 9, otherwise `'0'` followed by five digits.
    ///
    /// A count of zero is written as the single digit `'0'`, which a decoder
    /// reads as the marker for the five digit form. The format cannot carry
    /// an empty loop.
    Extended,
}

impl CountFormat {
    pub fn max(self) -> usize {
        match self {
            Self::Single => 9,
            Self::Extended => 99_999,
        }
    }

    /// Bytes taken by the prefix for `count` children
    pub fn width(self, count: usize) -> usize {
        match self {
            Self::Extended if count > 9 => 6,
            _ => 1,
        }
    }

    pub fn encode(self, field: &str, count: usize, out: &mut Vec<u8>) -> CodecResult<()> {
        if count > self.max() {
            return Err(CodecError::schema(
                field,
                count,
                format!("at most {} entries", self.max()),
            ));
        }
        match self.width(count) {
            1 => out.extend_from_slice(count.to_string().as_bytes()),
            _ => out.extend_from_slice(format!("0{count:05}").as_bytes()),
        }
        Ok(())
    }

    pub(crate) fn decode(self, field: &str, window: &mut Window<'_>) -> CodecResult<usize> {
        let count = parse_decimal(field, window.take(field, 1)?)? as usize;
        match self {
            Self::Extended if count == 0 => {
                Ok(parse_decimal(field, window.take(field, 5)?)? as usize)
            }
            _ => Ok(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(format: CountFormat, count: usize) -> Vec<u8> {
        let mut out = Vec::new();
        format.encode("NBANDS", count, &mut out).unwrap();
        out
    }

    #[test]
    fn small_counts_take_one_digit() {
        assert_eq!(encoded(CountFormat::Extended, 9), b"9");
        assert_eq!(encoded(CountFormat::Single, 3), b"3");
    }

    #[test]
    fn large_counts_take_six_digits() {
        let bytes = encoded(CountFormat::Extended, 10);
        assert_eq!(bytes, b"000010");
        let mut window = Window::new(&bytes, 0);
        assert_eq!(CountFormat::Extended.decode("NBANDS", &mut window).unwrap(), 10);
        assert_eq!(window.position(), 6);
    }

    #[test]
    fn nine_decodes_from_one_digit() {
        let mut window = Window::new(b"9", 0);
        assert_eq!(CountFormat::Extended.decode("NBANDS", &mut window).unwrap(), 9);
        assert_eq!(window.position(), 1);
    }

    #[test]
    fn single_digit_count_is_bounded() {
        let mut out = Vec::new();
        assert!(CountFormat::Single.encode("NICOM", 10, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn zero_reads_as_extended_marker() {
        let mut window = Window::new(b"000000", 0);
        assert_eq!(CountFormat::Extended.decode("NBANDS", &mut window).unwrap(), 0);
        assert_eq!(window.position(), 6);

        let mut window = Window::new(b"0", 0);
        assert!(matches!(
            CountFormat::Extended.decode("NBANDS", &mut window),
            Err(CodecError::Truncated { .. })
        ));
    }
}

//! Image band and image comment records
use std::sync::OnceLock;

use log::debug;
use ndarray::{Array, Array2, Dimension, Ix2};

use crate::field::{Field, Kind, Schema, Value};
use crate::record::{Context, Record};
use crate::{CodecError, CodecResult};

pub(crate) fn band_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::new(
            "ImageBand",
            vec![
                Field::text("IREPBAND", 2),
                Field::text("ISUBCAT", 6),
                Field::one_of("IFC", 1, &["N"], "N"),
                Field::text("IMFLT", 3),
                Field::new("LUTD", Kind::Lut),
            ],
        )
    })
}

pub(crate) fn comment_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| Schema::new("ImageComment", vec![Field::text("ICOM", 80)]))
}

/// Descriptor of one band of an image segment
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBand {
    record: Record,
}

impl Default for ImageBand {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBand {
    pub fn new() -> Self {
        Self {
            record: Record::new(band_schema()),
        }
    }

    /// Band with the given representation (`IREPBAND`) and subcategory (`ISUBCAT`)
    pub fn with_representation(irepband: &str, isubcat: &str) -> CodecResult<Self> {
        let mut band = Self::new();
        band.set_irepband(irepband)?;
        band.set_isubcat(isubcat)?;
        Ok(band)
    }

    pub fn from_bytes(bytes: &[u8], start: usize) -> CodecResult<(Self, usize)> {
        let (record, consumed) = Record::decode(band_schema(), bytes, start, Context::default())?;
        Ok((Self { record }, consumed))
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        self.record.encode()
    }

    pub fn encoded_len(&self) -> usize {
        self.record.encoded_len()
    }

    fn text(&self, name: &str) -> &str {
        self.record.text(name).unwrap_or_default()
    }

    pub fn irepband(&self) -> &str {
        self.text("IREPBAND")
    }

    pub fn set_irepband(&mut self, value: &str) -> CodecResult<()> {
        self.record.set("IREPBAND", Value::Text(value.to_string()))
    }

    pub fn isubcat(&self) -> &str {
        self.text("ISUBCAT")
    }

    pub fn set_isubcat(&mut self, value: &str) -> CodecResult<()> {
        self.record.set("ISUBCAT", Value::Text(value.to_string()))
    }

    /// Image filter condition, always `N`
    pub fn ifc(&self) -> &str {
        self.text("IFC")
    }

    pub fn imflt(&self) -> &str {
        self.text("IMFLT")
    }

    pub fn set_imflt(&mut self, value: &str) -> CodecResult<()> {
        self.record.set("IMFLT", Value::Text(value.to_string()))
    }

    /// Lookup tables, one row per table
    pub fn lutd(&self) -> Option<&Array2<u8>> {
        match self.record.get("LUTD") {
            Some(Value::Lut(lut)) => Some(lut),
            _ => None,
        }
    }

    /// Attach lookup tables. The array must be two dimensional, with at most
    /// 4 rows (tables) of at most 65536 entries.
    pub fn set_lutd<D: Dimension>(&mut self, lut: Array<u8, D>) -> CodecResult<()> {
        let shape = lut.shape().to_vec();
        let lut = lut.into_dimensionality::<Ix2>().map_err(|_| {
            CodecError::schema("LUTD", shape, "lookup tables must be two dimensional")
        })?;
        debug!("Setting LUTD with shape {:?}", lut.dim());
        self.record.set("LUTD", Value::Lut(lut))
    }

    pub fn clear_lutd(&mut self) -> CodecResult<()> {
        self.record.set("LUTD", Value::Absent)
    }

    /// Number of lookup tables
    pub fn nluts(&self) -> usize {
        self.lutd().map_or(0, |lut| lut.nrows())
    }

    /// Number of entries in each lookup table
    pub fn neluts(&self) -> usize {
        self.lutd().map_or(0, |lut| lut.ncols())
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.record.to_json()
    }

    pub fn as_record(&self) -> &Record {
        &self.record
    }

    pub(crate) fn into_record(self) -> Record {
        self.record
    }

    pub(crate) fn from_record(record: Record) -> Self {
        Self { record }
    }
}

/// One 80 character image comment
#[derive(Debug, Clone, PartialEq)]
pub struct ImageComment {
    record: Record,
}

impl ImageComment {
    pub fn new(text: &str) -> CodecResult<Self> {
        let mut record = Record::new(comment_schema());
        record.set("ICOM", Value::Text(text.to_string()))?;
        Ok(Self { record })
    }

    pub fn from_bytes(bytes: &[u8], start: usize) -> CodecResult<(Self, usize)> {
        let (record, consumed) = Record::decode(comment_schema(), bytes, start, Context::default())?;
        Ok((Self { record }, consumed))
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        self.record.encode()
    }

    pub fn text(&self) -> &str {
        self.record.text("ICOM").unwrap_or_default()
    }

    pub(crate) fn into_record(self) -> Record {
        self.record
    }

    pub(crate) fn from_record(record: Record) -> Self {
        Self { record }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array3};

    use super::*;

    #[test]
    fn band_without_lut_ends_in_zero() {
        let band = ImageBand::with_representation("M", "").unwrap();
        let bytes = band.to_bytes().unwrap();
        assert_eq!(bytes, b"M       N   0");
        assert_eq!(band.nluts(), 0);
        assert_eq!(band.neluts(), 0);
    }

    #[test]
    fn lut_is_written_row_major() {
        let lut = Array2::from_shape_fn((2, 100), |(r, c)| (r * 100 + c) as u8);
        let mut band = ImageBand::with_representation("LU", "").unwrap();
        band.set_lutd(lut.clone()).unwrap();
        assert_eq!((band.nluts(), band.neluts()), (2, 100));

        let bytes = band.to_bytes().unwrap();
        assert_eq!(&bytes[12..18], b"200100");
        assert_eq!(bytes.len(), 12 + 6 + 200);
        assert_eq!(bytes[18..], lut.iter().copied().collect::<Vec<_>>()[..]);

        let (back, consumed) = ImageBand::from_bytes(&bytes, 0).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(back.lutd(), Some(&lut));
        assert_eq!(back, band);
    }

    #[test]
    fn lut_shape_is_checked_on_assignment() {
        let mut band = ImageBand::new();
        assert!(band.set_lutd(Array2::<u8>::zeros((5, 10))).is_err());
        assert!(band.set_lutd(Array2::<u8>::zeros((1, 65_537))).is_err());
        assert!(band.set_lutd(Array1::<u8>::zeros(10)).is_err());
        assert!(band.set_lutd(Array3::<u8>::zeros((1, 2, 3))).is_err());
        assert!(band.lutd().is_none());

        band.set_lutd(Array2::<u8>::zeros((4, 65_536))).unwrap();
        assert_eq!(band.nluts(), 4);
        band.clear_lutd().unwrap();
        assert!(band.lutd().is_none());
        assert_eq!(band.to_bytes().unwrap().last(), Some(&b'0'));
    }

    #[test]
    fn oversized_lut_is_rejected_on_decode() {
        let bytes = b"M       N   5000010123456789";
        assert!(matches!(
            ImageBand::from_bytes(bytes, 0),
            Err(CodecError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn filter_condition_is_fixed() {
        let bytes = b"M       X   0";
        assert!(ImageBand::from_bytes(bytes, 0).is_err());
    }

    #[test]
    fn comment_is_eighty_characters() {
        let comment = ImageComment::new("collected at dawn").unwrap();
        let bytes = comment.to_bytes().unwrap();
        assert_eq!(bytes.len(), 80);
        let (back, _) = ImageComment::from_bytes(&bytes, 0).unwrap();
        assert_eq!(back.text(), "collected at dawn");
        assert!(ImageComment::new(&"x".repeat(81)).is_err());
    }
}

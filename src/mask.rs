//! Mask subheader, the offset table at the front of masked image data
use std::sync::OnceLock;

use log::{debug, error};
use ndarray::{Array, Array2, Dimension, Ix2};
use serde_json::{json, Value as Json};

use crate::field::{Field, Kind, Schema, Value};
use crate::policy::Policy;
use crate::record::{Context, Record};
use crate::{CodecError, CodecResult};

/// Table entry for a block that is not recorded (BMR) or has no pad pixels (TMR)
pub const NOT_RECORDED: u32 = 0xFFFF_FFFF;

/// Length field value announcing a present table
const TABLE_ENTRY_LENGTH: u64 = 4;

/// Bytes needed to hold a pad pixel code of `bits` bits
pub fn tpxcd_length(bits: u64) -> usize {
    bits.div_ceil(8) as usize
}

fn tpxcd_width(record: &Record) -> usize {
    tpxcd_length(record.int("TPXCDLNTH").unwrap_or(0))
}

fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::new(
            "MaskSubheader",
            vec![
                Field::new("IMDATOFF", Kind::Binary { width: 4 }),
                Field::new("BMRLNTH", Kind::Binary { width: 2 }),
                Field::new("TMRLNTH", Kind::Binary { width: 2 }),
                Field::new("TPXCDLNTH", Kind::Binary { width: 2 }),
                Field::new("TPXCD", Kind::Blob { width: tpxcd_width }),
                Field::new(
                    "BMR",
                    Kind::Table {
                        length_field: "BMRLNTH",
                    },
                ),
                Field::new(
                    "TMR",
                    Kind::Table {
                        length_field: "TMRLNTH",
                    },
                ),
            ],
        )
    })
}

/// Block mask and pad pixel mask tables of a masked image segment.
///
/// The table shape `(band_depth, blocks)` is not part of the encoding and
/// comes from the owning image segment header.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskSubheader {
    record: Record,
}

impl MaskSubheader {
    /// Empty mask subheader (no tables, no pad code) for the given shape.
    pub fn new(band_depth: usize, blocks: usize) -> CodecResult<Self> {
        let context = Context::new(band_depth, blocks);
        context.shape("MaskSubheader")?;
        let mut mask = Self {
            record: Record::with_context(schema(), context),
        };
        mask.update_offset()?;
        Ok(mask)
    }

    /// Decode a mask subheader starting at `start`.
    ///
    /// `band_depth` and `blocks` must both be non-zero.
    pub fn from_bytes(
        bytes: &[u8],
        start: usize,
        band_depth: usize,
        blocks: usize,
        policy: Policy,
    ) -> CodecResult<(Self, usize)> {
        let context = Context::new(band_depth, blocks);
        context.shape("MaskSubheader")?;
        let (record, consumed) = Record::decode(schema(), bytes, start, context)?;
        let mask = Self { record };
        mask.check_offset(consumed, policy)?;
        debug!(
            "Decoded mask subheader of {consumed} bytes for {band_depth} x {blocks} blocks"
        );
        Ok((mask, consumed))
    }

    fn check_offset(&self, consumed: usize, policy: Policy) -> CodecResult<()> {
        let encoded = self.encoded_len();
        let declared = self.imdatoff() as usize;
        if declared == encoded && consumed == encoded {
            return Ok(());
        }
        match policy {
            Policy::Strict => Err(CodecError::LengthMismatch {
                record: format!("MaskSubheader (IMDATOFF={declared})"),
                consumed,
                encoded,
            }),
            Policy::Lenient => {
                error!(
                    "Mask subheader declares IMDATOFF={declared} and was read from {consumed} bytes, \
                     but would serialize to {encoded} bytes"
                );
                Ok(())
            }
        }
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        self.record.encode()
    }

    pub fn encoded_len(&self) -> usize {
        self.record.encoded_len()
    }

    pub fn band_depth(&self) -> usize {
        self.record.context().band_depth.unwrap_or_default()
    }

    pub fn blocks(&self) -> usize {
        self.record.context().blocks.unwrap_or_default()
    }

    fn int(&self, name: &str) -> u64 {
        self.record.int(name).unwrap_or_default()
    }

    /// Offset from the start of this subheader to the blocked image data
    pub fn imdatoff(&self) -> u32 {
        self.int("IMDATOFF") as u32
    }

    pub fn bmrlnth(&self) -> u16 {
        self.int("BMRLNTH") as u16
    }

    pub fn tmrlnth(&self) -> u16 {
        self.int("TMRLNTH") as u16
    }

    /// Pad pixel code length, in bits
    pub fn tpxcdlnth(&self) -> u16 {
        self.int("TPXCDLNTH") as u16
    }

    pub fn tpxcd(&self) -> Option<&[u8]> {
        match self.record.get("TPXCD") {
            Some(Value::Bytes(bytes)) => Some(bytes),
            _ => None,
        }
    }

    fn table(&self, name: &str) -> Option<&Array2<u32>> {
        match self.record.get(name) {
            Some(Value::Table(table)) => Some(table),
            _ => None,
        }
    }

    /// Block mask records: byte offset of every block from the start of the
    /// blocked image data, [NOT_RECORDED] for blocks that were not transmitted.
    pub fn bmr(&self) -> Option<&Array2<u32>> {
        self.table("BMR")
    }

    /// Pad pixel mask records: byte offset of every block holding pad
    /// pixels, [NOT_RECORDED] for blocks without any.
    pub fn tmr(&self) -> Option<&Array2<u32>> {
        self.table("TMR")
    }

    fn set_table<D: Dimension>(
        &mut self,
        name: &str,
        length_field: &str,
        table: Option<Array<u32, D>>,
    ) -> CodecResult<()> {
        match table {
            Some(table) => {
                let shape = table.shape().to_vec();
                let table = table.into_dimensionality::<Ix2>().map_err(|_| {
                    CodecError::schema(
                        name,
                        shape,
                        format!("shape must be ({}, {})", self.band_depth(), self.blocks()),
                    )
                })?;
                // check the shape before touching the length field
                let expected = (self.band_depth(), self.blocks());
                if table.dim() != expected {
                    return Err(CodecError::schema(
                        name,
                        table.dim(),
                        format!("shape must be {expected:?}"),
                    ));
                }
                self.record
                    .set(length_field, Value::Int(TABLE_ENTRY_LENGTH))?;
                self.record.set(name, Value::Table(table))?;
            }
            None => {
                self.record.set(length_field, Value::Int(0))?;
                self.record.set(name, Value::Absent)?;
            }
        }
        self.update_offset()
    }

    /// Replace the block mask table. The table must be shaped `(band_depth, blocks)`.
    pub fn set_bmr<D: Dimension>(&mut self, table: Array<u32, D>) -> CodecResult<()> {
        self.set_table("BMR", "BMRLNTH", Some(table))
    }

    pub fn clear_bmr(&mut self) -> CodecResult<()> {
        self.set_table::<Ix2>("BMR", "BMRLNTH", None)
    }

    /// Replace the pad pixel mask table. The table must be shaped `(band_depth, blocks)`.
    pub fn set_tmr<D: Dimension>(&mut self, table: Array<u32, D>) -> CodecResult<()> {
        self.set_table("TMR", "TMRLNTH", Some(table))
    }

    pub fn clear_tmr(&mut self) -> CodecResult<()> {
        self.set_table::<Ix2>("TMR", "TMRLNTH", None)
    }

    /// Set the pad pixel output code of `bits` bits. `code` must hold
    /// `ceil(bits / 8)` bytes, and be empty when `bits` is zero.
    pub fn set_tpxcd(&mut self, bits: u16, code: &[u8]) -> CodecResult<()> {
        let expected = tpxcd_length(u64::from(bits));
        if code.len() != expected {
            return Err(CodecError::schema(
                "TPXCD",
                code.len(),
                format!("{bits} bits require {expected} bytes"),
            ));
        }
        // clear first so the blob never disagrees with its length field
        self.record.set("TPXCDLNTH", Value::Int(0))?;
        self.record.set("TPXCD", Value::Absent)?;
        self.record.set("TPXCDLNTH", Value::Int(u64::from(bits)))?;
        if expected > 0 {
            self.record.set("TPXCD", Value::Bytes(code.to_vec()))?;
        }
        self.update_offset()
    }

    fn update_offset(&mut self) -> CodecResult<()> {
        let length = self.encoded_len() as u64;
        self.record.set("IMDATOFF", Value::Int(length))
    }

    /// Offset of `block` of `band` into the blocked image data, `None` when
    /// the block was not recorded or no block mask is present.
    pub fn block_offset(&self, band: usize, block: usize) -> Option<u32> {
        self.bmr()
            .and_then(|bmr| bmr.get((band, block)).copied())
            .filter(|&offset| offset != NOT_RECORDED)
    }

    /// Does `block` of `band` contain pad pixels?
    pub fn has_pad_pixels(&self, band: usize, block: usize) -> bool {
        self.tmr()
            .and_then(|tmr| tmr.get((band, block)).copied())
            .is_some_and(|offset| offset != NOT_RECORDED)
    }

    /// Ordered summary for logging, starting with the table shape.
    pub fn to_json(&self) -> Json {
        let mut out = serde_json::Map::new();
        out.insert("band_depth".to_string(), json!(self.band_depth()));
        out.insert("blocks".to_string(), json!(self.blocks()));
        if let Json::Object(fields) = self.record.to_json() {
            out.extend(fields);
        }
        Json::Object(out)
    }

    pub fn as_record(&self) -> &Record {
        &self.record
    }
}

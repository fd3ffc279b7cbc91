//! Field descriptors and the values they carry
//!
//! A [Schema] is an ordered list of [Field]s. Each field's [Kind] knows how
//! to decode, encode, measure and validate a [Value]; [Record](crate::Record)
//! walks the list and threads the byte offset through.
use std::fmt;

use ndarray::Array2;

use crate::extension::Extension;
use crate::loops::CountFormat;
use crate::record::{Record, Window};
use crate::{CodecError, CodecResult};

/// Presence of a field, decided from the siblings decoded before it.
pub type Presence = fn(&Record) -> bool;
/// Byte width of a field, computed from the siblings decoded before it.
pub type WidthFn = fn(&Record) -> usize;
/// Schema of a nested or repeated record.
pub type SchemaFn = fn() -> &'static Schema;

/// Maximum number of lookup tables per band
pub const MAX_NLUTS: usize = 4;
/// Maximum number of entries per lookup table
pub const MAX_NELUTS: usize = 65_536;

#[derive(Clone, Copy)]
pub enum Kind {
    /// ASCII, left justified and space padded. Trailing spaces are dropped on decode.
    Text { width: usize, default: &'static str },
    /// ASCII restricted to a closed set of values
    Enum {
        width: usize,
        values: &'static [&'static str],
        default: &'static str,
    },
    /// ASCII decimal, right justified and zero padded
    Decimal { width: usize, default: u64 },
    /// Big-endian unsigned integer
    Binary { width: usize },
    /// ASCII kept at its full width, present only when `present` holds
    Conditional { width: usize, present: Presence },
    /// Raw bytes, absent when the computed width is zero
    Blob { width: WidthFn },
    /// Big-endian u32 table shaped `(band_depth, blocks)` by the record's
    /// [Context](crate::Context), absent when `length_field` is zero
    Table { length_field: &'static str },
    /// Band lookup table: count digit, entry count, then the table bytes
    Lut,
    Nested(SchemaFn),
    Loop { child: SchemaFn, count: CountFormat },
    /// Length prefixed opaque container
    Extension,
}

#[derive(Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
}

impl Field {
    pub const fn new(name: &'static str, kind: Kind) -> Self {
        Self { name, kind }
    }

    pub const fn text(name: &'static str, width: usize) -> Self {
        Self::new(name, Kind::Text { width, default: "" })
    }

    pub const fn decimal(name: &'static str, width: usize, default: u64) -> Self {
        Self::new(name, Kind::Decimal { width, default })
    }

    pub const fn one_of(
        name: &'static str,
        width: usize,
        values: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self::new(
            name,
            Kind::Enum {
                width,
                values,
                default,
            },
        )
    }
}

pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: &'static str, fields: Vec<Field>) -> Self {
        Self { name, fields }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(self.name)
            .field(&self.fields.iter().map(|field| field.name).collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Absent,
    Text(String),
    Int(u64),
    Bytes(Vec<u8>),
    Table(Array2<u32>),
    Lut(Array2<u8>),
    Record(Record),
    List(Vec<Record>),
    Extension(Extension),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Text(_) => "text",
            Self::Int(_) => "integer",
            Self::Bytes(_) => "bytes",
            Self::Table(_) => "table",
            Self::Lut(_) => "lookup table",
            Self::Record(_) => "record",
            Self::List(_) => "list",
            Self::Extension(_) => "extension",
        }
    }
}

pub(crate) fn ascii(field: &str, raw: &[u8]) -> CodecResult<String> {
    if !raw.is_ascii() {
        return Err(CodecError::schema(
            field,
            String::from_utf8_lossy(raw),
            "not ASCII",
        ));
    }
    Ok(raw.iter().map(|&b| b as char).collect())
}

pub(crate) fn parse_decimal(field: &str, raw: &[u8]) -> CodecResult<u64> {
    let text = ascii(field, raw)?;
    text.trim()
        .parse()
        .map_err(|_| CodecError::schema(field, &text, "not a decimal integer"))
}

fn mismatch(field: &str, value: &Value, expected: &str) -> CodecError {
    CodecError::schema(
        field,
        value.kind_name(),
        format!("expected {expected}"),
    )
}

fn check_text(field: &str, text: &str, width: usize) -> CodecResult<()> {
    if !text.is_ascii() {
        return Err(CodecError::schema(field, text, "not ASCII"));
    }
    if text.len() > width {
        return Err(CodecError::schema(
            field,
            text,
            format!("longer than {width} characters"),
        ));
    }
    Ok(())
}

fn check_lut_shape(field: &str, rows: usize, cols: usize) -> CodecResult<()> {
    if rows > MAX_NLUTS {
        return Err(CodecError::schema(
            field,
            (rows, cols),
            format!("at most {MAX_NLUTS} lookup tables"),
        ));
    }
    if cols > MAX_NELUTS {
        return Err(CodecError::schema(
            field,
            (rows, cols),
            format!("at most {MAX_NELUTS} lookup table entries"),
        ));
    }
    Ok(())
}

fn pad(text: &str, width: usize, out: &mut Vec<u8>) {
    out.extend_from_slice(text.as_bytes());
    out.resize(out.len() + width - text.len(), b' ');
}

impl Kind {
    pub(crate) fn default_value(&self) -> Value {
        match *self {
            Self::Text { default, .. } | Self::Enum { default, .. } => {
                Value::Text(default.to_string())
            }
            Self::Decimal { default, .. } => Value::Int(default),
            Self::Binary { .. } => Value::Int(0),
            Self::Conditional { .. } | Self::Blob { .. } | Self::Table { .. } | Self::Lut => {
                Value::Absent
            }
            Self::Nested(schema) => Value::Record(Record::new(schema())),
            Self::Loop { .. } => Value::List(Vec::new()),
            Self::Extension => Value::Extension(Extension::default()),
        }
    }

    /// Check `value` against this kind, returning it in normalised form.
    pub(crate) fn validate(&self, field: &str, value: Value, record: &Record) -> CodecResult<Value> {
        match (*self, value) {
            (Self::Text { width, .. }, Value::Text(text)) => {
                check_text(field, &text, width)?;
                Ok(Value::Text(text.trim_end_matches(' ').to_string()))
            }
            (Self::Enum { width, values, .. }, Value::Text(text)) => {
                check_text(field, &text, width)?;
                let text = text.trim_end_matches(' ');
                if !values.contains(&text) {
                    return Err(CodecError::schema(
                        field,
                        text,
                        format!("must be one of {values:?}"),
                    ));
                }
                Ok(Value::Text(text.to_string()))
            }
            (Self::Decimal { width, .. }, Value::Int(n)) => {
                if n.to_string().len() > width {
                    return Err(CodecError::schema(
                        field,
                        n,
                        format!("more than {width} digits"),
                    ));
                }
                Ok(Value::Int(n))
            }
            (Self::Binary { width }, Value::Int(n)) => {
                if width < 8 && n >> (8 * width) != 0 {
                    return Err(CodecError::schema(
                        field,
                        n,
                        format!("does not fit in {width} bytes"),
                    ));
                }
                Ok(Value::Int(n))
            }
            (Self::Conditional { .. }, Value::Absent) => Ok(Value::Absent),
            (Self::Conditional { width, .. }, Value::Text(text)) => {
                check_text(field, &text, width)?;
                Ok(Value::Text(format!("{text:<width$}")))
            }
            (Self::Blob { width }, value) => {
                let width = width(record);
                match value {
                    Value::Absent if width == 0 => Ok(Value::Absent),
                    Value::Bytes(bytes) if bytes.len() == width && width > 0 => {
                        Ok(Value::Bytes(bytes))
                    }
                    Value::Bytes(bytes) => Err(CodecError::schema(
                        field,
                        bytes.len(),
                        format!("length must be {width}"),
                    )),
                    other => Err(CodecError::schema(
                        field,
                        other.kind_name(),
                        format!("{width} bytes required"),
                    )),
                }
            }
            (Self::Table { length_field }, value) => {
                let length = record.int(length_field).unwrap_or(0);
                match value {
                    Value::Absent if length == 0 => Ok(Value::Absent),
                    Value::Absent => Err(CodecError::schema(
                        field,
                        "absent",
                        format!("{length_field}={length} requires a table"),
                    )),
                    Value::Table(table) => {
                        if length != 4 {
                            return Err(CodecError::schema(
                                field,
                                table.dim(),
                                format!("{length_field}={length}, a table requires 4"),
                            ));
                        }
                        let shape = record.context().shape(field)?;
                        if table.dim() != shape {
                            return Err(CodecError::schema(
                                field,
                                table.dim(),
                                format!("shape must be {shape:?}"),
                            ));
                        }
                        Ok(Value::Table(table))
                    }
                    other => Err(mismatch(field, &other, "table")),
                }
            }
            (Self::Lut, Value::Absent) => Ok(Value::Absent),
            (Self::Lut, Value::Lut(lut)) => {
                let (rows, cols) = lut.dim();
                check_lut_shape(field, rows, cols)?;
                // zero tables and "no lookup table" share one encoding
                if rows == 0 {
                    Ok(Value::Absent)
                } else {
                    Ok(Value::Lut(lut))
                }
            }
            (Self::Nested(schema), Value::Record(nested)) => {
                if !std::ptr::eq(nested.schema(), schema()) {
                    return Err(CodecError::schema(
                        field,
                        nested.schema().name,
                        format!("expected a {} record", schema().name),
                    ));
                }
                Ok(Value::Record(nested))
            }
            (Self::Loop { child, count }, Value::List(children)) => {
                if children.len() > count.max() {
                    return Err(CodecError::schema(
                        field,
                        children.len(),
                        format!("at most {} entries", count.max()),
                    ));
                }
                if let Some(stray) = children
                    .iter()
                    .find(|c| !std::ptr::eq(c.schema(), child()))
                {
                    return Err(CodecError::schema(
                        field,
                        stray.schema().name,
                        format!("expected {} records", child().name),
                    ));
                }
                Ok(Value::List(children))
            }
            (Self::Extension, Value::Extension(extension)) => Ok(Value::Extension(extension)),
            (kind, value) => Err(mismatch(field, &value, kind.expects())),
        }
    }

    fn expects(&self) -> &'static str {
        match self {
            Self::Text { .. } | Self::Enum { .. } | Self::Conditional { .. } => "text",
            Self::Decimal { .. } | Self::Binary { .. } => "integer",
            Self::Blob { .. } => "bytes",
            Self::Table { .. } => "table",
            Self::Lut => "lookup table",
            Self::Nested(_) => "record",
            Self::Loop { .. } => "list",
            Self::Extension => "extension",
        }
    }

    pub(crate) fn decode(
        &self,
        field: &str,
        record: &Record,
        window: &mut Window<'_>,
    ) -> CodecResult<Value> {
        match *self {
            Self::Text { width, .. } => {
                let text = ascii(field, window.take(field, width)?)?;
                Ok(Value::Text(text.trim_end_matches(' ').to_string()))
            }
            Self::Enum { width, values, .. } => {
                let text = ascii(field, window.take(field, width)?)?;
                let text = text.trim_end_matches(' ');
                if !values.contains(&text) {
                    return Err(CodecError::schema(
                        field,
                        text,
                        format!("must be one of {values:?}"),
                    ));
                }
                Ok(Value::Text(text.to_string()))
            }
            Self::Decimal { width, .. } => {
                Ok(Value::Int(parse_decimal(field, window.take(field, width)?)?))
            }
            Self::Binary { width } => {
                let raw = window.take(field, width)?;
                Ok(Value::Int(
                    raw.iter().fold(0_u64, |acc, &b| (acc << 8) | u64::from(b)),
                ))
            }
            Self::Conditional { width, present } => {
                if !present(record) {
                    return Ok(Value::Absent);
                }
                Ok(Value::Text(ascii(field, window.take(field, width)?)?))
            }
            Self::Blob { width } => match width(record) {
                0 => Ok(Value::Absent),
                width => Ok(Value::Bytes(window.take(field, width)?.to_vec())),
            },
            Self::Table { length_field } => {
                if record.int(length_field).unwrap_or(0) == 0 {
                    return Ok(Value::Absent);
                }
                let (band_depth, blocks) = record.context().shape(field)?;
                let raw = window.take(field, 4 * band_depth * blocks)?;
                let entries = raw
                    .chunks_exact(4)
                    .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                let table = Array2::from_shape_vec((band_depth, blocks), entries)
                    .map_err(|e| CodecError::schema(field, (band_depth, blocks), e.to_string()))?;
                Ok(Value::Table(table))
            }
            Self::Lut => {
                let rows = parse_decimal(field, window.take(field, 1)?)? as usize;
                if rows == 0 {
                    return Ok(Value::Absent);
                }
                let cols = parse_decimal(field, window.take(field, 5)?)? as usize;
                check_lut_shape(field, rows, cols)?;
                let raw = window.take(field, rows * cols)?;
                let lut = Array2::from_shape_vec((rows, cols), raw.to_vec())
                    .map_err(|e| CodecError::schema(field, (rows, cols), e.to_string()))?;
                Ok(Value::Lut(lut))
            }
            Self::Nested(schema) => Ok(Value::Record(Record::decode_window(
                schema(),
                window,
                record.context(),
            )?)),
            Self::Loop { child, count } => {
                let n = count.decode(field, window)?;
                let children = (0..n)
                    .map(|_| Record::decode_window(child(), window, record.context()))
                    .collect::<CodecResult<Vec<_>>>()?;
                Ok(Value::List(children))
            }
            Self::Extension => Ok(Value::Extension(Extension::decode(field, window)?)),
        }
    }

    pub(crate) fn encode(
        &self,
        field: &str,
        value: &Value,
        record: &Record,
        out: &mut Vec<u8>,
    ) -> CodecResult<()> {
        match (*self, value) {
            (Self::Text { width, .. } | Self::Enum { width, .. }, Value::Text(text)) => {
                check_text(field, text, width)?;
                pad(text, width, out);
            }
            (Self::Decimal { width, .. }, Value::Int(n)) => {
                let digits = format!("{n:0width$}");
                if digits.len() > width {
                    return Err(CodecError::schema(
                        field,
                        n,
                        format!("more than {width} digits"),
                    ));
                }
                out.extend_from_slice(digits.as_bytes());
            }
            (Self::Binary { width }, Value::Int(n)) => {
                let bytes = n.to_be_bytes();
                if bytes[..8 - width].iter().any(|&b| b != 0) {
                    return Err(CodecError::schema(
                        field,
                        n,
                        format!("does not fit in {width} bytes"),
                    ));
                }
                out.extend_from_slice(&bytes[8 - width..]);
            }
            (Self::Conditional { width, present }, value) => match (present(record), value) {
                (true, Value::Text(text)) => {
                    check_text(field, text, width)?;
                    pad(text, width, out);
                }
                (false, Value::Absent) => {}
                (true, _) => {
                    return Err(CodecError::schema(field, "absent", "required by its siblings"))
                }
                (false, value) => {
                    return Err(CodecError::schema(
                        field,
                        value.kind_name(),
                        "not allowed by its siblings",
                    ))
                }
            },
            (Self::Blob { width }, value) => {
                let width = width(record);
                match value {
                    Value::Absent if width == 0 => {}
                    Value::Bytes(bytes) if bytes.len() == width => out.extend_from_slice(bytes),
                    other => {
                        return Err(CodecError::schema(
                            field,
                            other.kind_name(),
                            format!("{width} bytes required"),
                        ))
                    }
                }
            }
            (Self::Table { .. }, Value::Absent) => {}
            (Self::Table { .. }, Value::Table(table)) => {
                table
                    .iter()
                    .for_each(|entry| out.extend_from_slice(&entry.to_be_bytes()));
            }
            (Self::Lut, Value::Absent) => out.push(b'0'),
            (Self::Lut, Value::Lut(lut)) => {
                let (rows, cols) = lut.dim();
                out.extend_from_slice(format!("{rows}{cols:05}").as_bytes());
                out.extend(lut.iter().copied());
            }
            (Self::Nested(_), Value::Record(nested)) => nested.encode_into(out)?,
            (Self::Loop { count, .. }, Value::List(children)) => {
                count.encode(field, children.len(), out)?;
                for child in children {
                    child.encode_into(out)?;
                }
            }
            (Self::Extension, Value::Extension(extension)) => extension.encode(field, out)?,
            (kind, value) => return Err(mismatch(field, value, kind.expects())),
        }
        Ok(())
    }

    pub(crate) fn encoded_len(&self, value: &Value) -> usize {
        match (*self, value) {
            (
                Self::Text { width, .. }
                | Self::Enum { width, .. }
                | Self::Decimal { width, .. }
                | Self::Binary { width },
                _,
            ) => width,
            (Self::Conditional { .. }, Value::Absent) => 0,
            (Self::Conditional { width, .. }, _) => width,
            (Self::Blob { .. }, Value::Bytes(bytes)) => bytes.len(),
            (Self::Table { .. }, Value::Table(table)) => 4 * table.len(),
            (Self::Lut, Value::Lut(lut)) => 6 + lut.len(),
            (Self::Lut, _) => 1,
            (Self::Nested(_), Value::Record(nested)) => nested.encoded_len(),
            (Self::Loop { count, .. }, Value::List(children)) => {
                count.width(children.len())
                    + children.iter().map(Record::encoded_len).sum::<usize>()
            }
            (Self::Extension, Value::Extension(extension)) => extension.encoded_len(),
            _ => 0,
        }
    }
}

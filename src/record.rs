//! Generic positional record codec
use std::fmt;

use log::{debug, trace};
use serde_json::{json, Map, Value as Json};

use crate::field::{Kind, Schema, Value};
use crate::{CodecError, CodecResult};

/// Shape information that is not part of the encoding itself.
///
/// Only context shaped tables ([Kind::Table]) read it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub band_depth: Option<usize>,
    pub blocks: Option<usize>,
}

impl Context {
    pub fn new(band_depth: usize, blocks: usize) -> Self {
        Self {
            band_depth: Some(band_depth),
            blocks: Some(blocks),
        }
    }

    /// `(band_depth, blocks)`, failing when either is missing or zero.
    pub fn shape(&self, field: &str) -> CodecResult<(usize, usize)> {
        match (self.band_depth, self.blocks) {
            (Some(band_depth), Some(blocks)) if band_depth > 0 && blocks > 0 => {
                Ok((band_depth, blocks))
            }
            _ => Err(CodecError::MissingContext(field.to_string())),
        }
    }
}

/// Read position over a caller supplied byte window.
pub(crate) struct Window<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Window<'a> {
    pub(crate) fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn take(&mut self, field: &str, count: usize) -> CodecResult<&'a [u8]> {
        let available = self.bytes.len().saturating_sub(self.pos);
        if count > available {
            return Err(CodecError::Truncated {
                field: field.to_string(),
                needed: count,
                available,
            });
        }
        let out = &self.bytes[self.pos..self.pos + count];
        self.pos += count;
        Ok(out)
    }
}

/// A schema together with one value per field.
#[derive(Clone)]
pub struct Record {
    schema: &'static Schema,
    context: Context,
    values: Vec<Value>,
}

impl Record {
    /// A record holding every field's default.
    pub fn new(schema: &'static Schema) -> Self {
        Self::with_context(schema, Context::default())
    }

    pub fn with_context(schema: &'static Schema, context: Context) -> Self {
        let mut record = Self {
            schema,
            context,
            values: schema.fields.iter().map(|f| f.kind.default_value()).collect(),
        };
        // conditional fields depend on the defaults of their siblings
        for (index, field) in schema.fields.iter().enumerate() {
            if let Kind::Conditional { width, present } = field.kind {
                if present(&record) {
                    record.values[index] = Value::Text(" ".repeat(width));
                }
            }
        }
        record
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn context(&self) -> Context {
        self.context
    }

    /// Decode a record starting at `start`, returning it with the number of bytes consumed.
    pub fn decode(
        schema: &'static Schema,
        bytes: &[u8],
        start: usize,
        context: Context,
    ) -> CodecResult<(Self, usize)> {
        let mut window = Window::new(bytes, start);
        let record = Self::decode_window(schema, &mut window, context)?;
        Ok((record, window.position() - start))
    }

    pub(crate) fn decode_window(
        schema: &'static Schema,
        window: &mut Window<'_>,
        context: Context,
    ) -> CodecResult<Self> {
        let mut record = Self {
            schema,
            context,
            values: vec![Value::Absent; schema.fields.len()],
        };
        for (index, field) in schema.fields.iter().enumerate() {
            let value = field.kind.decode(field.name, &record, window)?;
            trace!("{}.{} = {:?}", schema.name, field.name, value);
            record.values[index] = value;
        }
        Ok(record)
    }

    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out)?;
        Ok(out)
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) -> CodecResult<()> {
        for (field, value) in self.schema.fields.iter().zip(&self.values) {
            field.kind.encode(field.name, value, self, out)?;
        }
        Ok(())
    }

    /// Number of bytes [Record::encode] produces
    pub fn encoded_len(&self) -> usize {
        self.schema
            .fields
            .iter()
            .zip(&self.values)
            .map(|(field, value)| field.kind.encoded_len(value))
            .sum()
    }

    fn index(&self, name: &str) -> CodecResult<usize> {
        self.schema
            .index_of(name)
            .ok_or_else(|| CodecError::UnknownField {
                record: self.schema.name.to_string(),
                field: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> &[Record] {
        match self.get(name) {
            Some(Value::List(children)) => children,
            _ => &[],
        }
    }

    /// Assign `value` to `name` after checking it against the field's kind.
    pub fn set(&mut self, name: &str, value: Value) -> CodecResult<()> {
        let index = self.index(name)?;
        let field = self.schema.fields[index];
        let value = field.kind.validate(field.name, value, self)?;
        self.values[index] = value;
        self.rederive_presence(index);
        Ok(())
    }

    /// Bring the conditional fields after `changed` in line with their presence rules:
    /// a newly required field becomes spaces, a field no longer allowed is dropped.
    fn rederive_presence(&mut self, changed: usize) {
        let schema = self.schema;
        for (index, field) in schema.fields.iter().enumerate().skip(changed + 1) {
            let Kind::Conditional { width, present } = field.kind else {
                continue;
            };
            match (present(self), self.values[index].is_absent()) {
                (true, true) => {
                    debug!("{}.{} is now required", schema.name, field.name);
                    self.values[index] = Value::Text(" ".repeat(width));
                }
                (false, false) => {
                    debug!("{}.{} is no longer allowed", schema.name, field.name);
                    self.values[index] = Value::Absent;
                }
                _ => {}
            }
        }
    }

    /// Ordered `name -> value` summary for logging and fixtures, absent fields left out.
    pub fn to_json(&self) -> Json {
        let mut out = Map::new();
        for (field, value) in self.schema.fields.iter().zip(&self.values) {
            if let Some(json) = value_json(value) {
                out.insert(field.name.to_string(), json);
            }
        }
        Json::Object(out)
    }
}

fn value_json(value: &Value) -> Option<Json> {
    Some(match value {
        Value::Absent => return None,
        Value::Text(text) => json!(text),
        Value::Int(n) => json!(n),
        Value::Bytes(bytes) => json!(bytes),
        Value::Table(table) => Json::Array(
            table
                .outer_iter()
                .map(|row| json!(row.to_vec()))
                .collect(),
        ),
        Value::Lut(lut) => Json::Array(lut.outer_iter().map(|row| json!(row.to_vec())).collect()),
        Value::Record(record) => record.to_json(),
        Value::List(children) => Json::Array(children.iter().map(Record::to_json).collect()),
        Value::Extension(extension) => extension.to_json(),
    })
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema)
            && self.context == other.context
            && self.values == other.values
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.schema.name)?;
        f.debug_map()
            .entries(
                self.schema
                    .fields
                    .iter()
                    .zip(&self.values)
                    .map(|(field, value)| (field.name, value)),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::field::Field;
    use crate::loops::CountFormat;

    fn has_note(record: &Record) -> bool {
        record.text("FLAG") == Some("Y")
    }

    fn entry_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| Schema::new("Entry", vec![Field::text("NAME", 4)]))
    }

    fn sample_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(
                "Sample",
                vec![
                    Field::one_of("TAG", 2, &["AB", "CD"], "AB"),
                    Field::decimal("COUNT", 3, 7),
                    Field::new("SIZE", Kind::Binary { width: 2 }),
                    Field::one_of("FLAG", 1, &["Y", "N"], "N"),
                    Field::new(
                        "NOTE",
                        Kind::Conditional {
                            width: 5,
                            present: has_note,
                        },
                    ),
                    Field::new(
                        "ENTRIES",
                        Kind::Loop {
                            child: entry_schema,
                            count: CountFormat::Single,
                        },
                    ),
                ],
            )
        })
    }

    #[test]
    fn defaults_encode_at_full_width() {
        let record = Record::new(sample_schema());
        let bytes = record.encode().unwrap();
        assert_eq!(bytes, b"AB007\x00\x00N0");
        assert_eq!(record.encoded_len(), bytes.len());
    }

    #[test]
    fn decode_follows_sibling_presence() {
        let bytes = b"CD042\x01\x02Yhello2abcdxy  ";
        let (record, consumed) = Record::decode(sample_schema(), bytes, 0, Context::default()).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(record.text("TAG"), Some("CD"));
        assert_eq!(record.int("COUNT"), Some(42));
        assert_eq!(record.int("SIZE"), Some(0x0102));
        assert_eq!(record.text("NOTE"), Some("hello"));
        let names: Vec<_> = record
            .list("ENTRIES")
            .iter()
            .map(|e| e.text("NAME").unwrap().to_string())
            .collect();
        assert_eq!(names, ["abcd", "xy"]);
        assert_eq!(record.encode().unwrap(), bytes);
    }

    #[test]
    fn decode_starts_at_offset() {
        let bytes = b"####AB001\x00\x01N0";
        let (record, consumed) = Record::decode(sample_schema(), bytes, 4, Context::default()).unwrap();
        assert_eq!(consumed, bytes.len() - 4);
        assert_eq!(record.int("COUNT"), Some(1));
    }

    #[test]
    fn illegal_enum_is_rejected_on_decode_and_assignment() {
        let err = Record::decode(sample_schema(), b"XX001\x00\x01N0", 0, Context::default()).unwrap_err();
        assert!(matches!(err, CodecError::SchemaViolation { ref field, .. } if field == "TAG"));

        let mut record = Record::new(sample_schema());
        assert!(record.set("TAG", Value::Text("ZZ".into())).is_err());
        assert!(record.set("TAG", Value::Text("CD".into())).is_ok());
    }

    #[test]
    fn assignment_checks_width_and_type() {
        let mut record = Record::new(sample_schema());
        assert!(record.set("COUNT", Value::Int(1000)).is_err());
        assert!(record.set("SIZE", Value::Int(0x1_0000)).is_err());
        assert!(record.set("COUNT", Value::Text("12".into())).is_err());
        assert!(matches!(
            record.set("MISSING", Value::Int(1)),
            Err(CodecError::UnknownField { .. })
        ));
        record.set("COUNT", Value::Int(999)).unwrap();
        assert_eq!(record.int("COUNT"), Some(999));
    }

    #[test]
    fn truncated_window_names_the_field() {
        let err = Record::decode(sample_schema(), b"AB00", 0, Context::default()).unwrap_err();
        match err {
            CodecError::Truncated {
                field,
                needed,
                available,
            } => {
                assert_eq!(field, "COUNT");
                assert_eq!(needed, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn inconsistent_conditional_fails_to_encode() {
        let mut record = Record::new(sample_schema());
        record.set("NOTE", Value::Text("hi".into())).unwrap();
        assert!(record.encode().is_err());
        record.set("FLAG", Value::Text("Y".into())).unwrap();
        assert_eq!(record.encode().unwrap(), b"AB007\x00\x00Yhi   0");
    }

    #[test]
    fn conditional_follows_its_sibling() {
        let mut record = Record::new(sample_schema());
        record.set("FLAG", Value::Text("Y".into())).unwrap();
        assert_eq!(record.text("NOTE"), Some("     "));
        assert_eq!(record.encode().unwrap(), b"AB007\x00\x00Y     0");

        record.set("NOTE", Value::Text("hi".into())).unwrap();
        record.set("COUNT", Value::Int(8)).unwrap();
        assert_eq!(record.text("NOTE"), Some("hi   "));

        record.set("FLAG", Value::Text("N".into())).unwrap();
        assert_eq!(record.get("NOTE"), Some(&Value::Absent));
        assert_eq!(record.encode().unwrap(), b"AB008\x00\x00N0");
    }

    #[test]
    fn summary_keeps_schema_order() {
        let record = Record::new(sample_schema());
        let json = record.to_json();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["TAG", "COUNT", "SIZE", "FLAG", "ENTRIES"]);
    }
}

//! Image security tags, nested inside the image segment header
use std::sync::OnceLock;

use crate::field::{Field, Kind, Schema};
use crate::record::Record;

const CLASSIFICATIONS: &[&str] = &["U", "R", "C", "S", "T"];

/// Downgrade value announcing that a downgrade event description follows
const DOWNGRADE_EVENT: &str = "999998";

/// Security tags of a NITF 2.1 image segment
pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::new(
            "ImageSecurity",
            vec![
                Field::one_of("ISCLAS", 1, CLASSIFICATIONS, "U"),
                Field::text("ISCLSY", 2),
                Field::text("ISCODE", 11),
                Field::text("ISCTLH", 2),
                Field::text("ISREL", 20),
                Field::text("ISDCTP", 2),
                Field::text("ISDCDT", 8),
                Field::text("ISDCXM", 4),
                Field::text("ISDG", 1),
                Field::text("ISDGDT", 8),
                Field::text("ISCLTX", 43),
                Field::text("ISCATP", 1),
                Field::text("ISCAUT", 40),
                Field::text("ISCRSN", 1),
                Field::text("ISSRDT", 8),
                Field::text("ISCTLN", 15),
            ],
        )
    })
}

fn has_downgrade_event(record: &Record) -> bool {
    record.text("ISDWNG") == Some(DOWNGRADE_EVENT)
}

/// Security tags of a NITF 2.0 image segment
pub fn legacy_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::new(
            "ImageSecurity20",
            vec![
                Field::one_of("ISCLAS", 1, CLASSIFICATIONS, "U"),
                Field::text("ISCODE", 40),
                Field::text("ISCTLH", 40),
                Field::text("ISREL", 40),
                Field::text("ISCAUT", 20),
                Field::text("ISCTLN", 20),
                Field::text("ISDWNG", 6),
                Field::new(
                    "ISDEVT",
                    Kind::Conditional {
                        width: 40,
                        present: has_downgrade_event,
                    },
                ),
            ],
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Value;
    use crate::record::Context;

    #[test]
    fn current_tags_are_fixed_width() {
        let record = Record::new(schema());
        assert_eq!(record.encoded_len(), 167);
        let bytes = record.encode().unwrap();
        assert_eq!(bytes[0], b'U');
        assert!(bytes[1..].iter().all(|&b| b == b' '));
    }

    #[test]
    fn legacy_downgrade_event_is_conditional() {
        let mut record = Record::new(legacy_schema());
        assert_eq!(record.encoded_len(), 167);

        record
            .set("ISDWNG", Value::Text(DOWNGRADE_EVENT.to_string()))
            .unwrap();
        record
            .set("ISDEVT", Value::Text("RELEASE AFTER REVIEW".to_string()))
            .unwrap();
        let bytes = record.encode().unwrap();
        assert_eq!(bytes.len(), 207);

        let (back, consumed) = Record::decode(legacy_schema(), &bytes, 0, Context::default()).unwrap();
        assert_eq!(consumed, 207);
        assert_eq!(back, record);
    }

    #[test]
    fn downgrade_code_adds_and_drops_the_event() {
        let mut record = Record::new(legacy_schema());
        record
            .set("ISDWNG", Value::Text(DOWNGRADE_EVENT.to_string()))
            .unwrap();
        assert_eq!(record.text("ISDEVT"), Some(" ".repeat(40).as_str()));
        assert_eq!(record.encode().unwrap().len(), 207);

        record.set("ISDWNG", Value::Text("203012".to_string())).unwrap();
        assert_eq!(record.get("ISDEVT"), Some(&Value::Absent));
        assert_eq!(record.encode().unwrap().len(), 167);
    }

    #[test]
    fn unknown_classification_is_rejected() {
        let mut bytes = Record::new(schema()).encode().unwrap();
        bytes[0] = b'X';
        assert!(Record::decode(schema(), &bytes, 0, Context::default()).is_err());
    }
}

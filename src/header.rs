//! Image segment subheader, NITF 2.1 and NITF 2.0
use std::sync::OnceLock;

use log::{debug, warn};
use serde_json::Value as Json;

use crate::band::{band_schema, comment_schema, ImageBand, ImageComment};
use crate::extension::Extension;
use crate::field::{Field, Kind, Presence, Schema, SchemaFn, Value};
use crate::loops::CountFormat;
use crate::mask::MaskSubheader;
use crate::policy::Policy;
use crate::record::{Context, Record};
use crate::security;
use crate::{CodecError, CodecResult};

const PIXEL_VALUE_TYPES: &[&str] = &["INT", "B", "SI", "R", "C"];
const REPRESENTATIONS: &[&str] = &[
    "MONO", "RGB", "RGB/LUT", "MULTI", "NODISPLY", "NVECTOR", "POLAR", "VPH", "YCbCr601",
];
const MODES: &[&str] = &["B", "P", "R", "S"];

const COMPRESSION_CODES: &[&str] = &[
    "NC", "NM", "C0", "C1", "C3", "C4", "C5", "C6", "C7", "C8", "I1", "M1", "M3", "M4", "M5",
    "M6", "M7", "M8",
];
const LEGACY_COMPRESSION_CODES: &[&str] = &[
    "NC", "NM", "C1", "C3", "C4", "C5", "C6", "C7", "C8", "I1", "M1", "M3", "M4", "M5", "M6",
    "M7", "M8",
];
const UNCOMPRESSED: &[&str] = &["NC", "NM"];
const MASKED: &[&str] = &["NM", "M1", "M3", "M4", "M5", "M6", "M7", "M8"];

const COORDINATE_CODES: &[&str] = &["", "U", "G", "N", "S", "D"];
const LEGACY_COORDINATE_CODES: &[&str] = &["U", "G", "C", "N"];

const IGEOLO_WIDTH: usize = 60;
const COMRAT_WIDTH: usize = 4;

/// Wire version of the image segment subheader
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    /// NITF 2.1
    #[default]
    V21,
    /// NITF 2.0
    V20,
}

impl Version {
    pub fn schema(self) -> &'static Schema {
        static CURRENT: OnceLock<Schema> = OnceLock::new();
        static LEGACY: OnceLock<Schema> = OnceLock::new();
        match self {
            Self::V21 => CURRENT.get_or_init(|| header_schema(self)),
            Self::V20 => LEGACY.get_or_init(|| header_schema(self)),
        }
    }

    pub fn compression_codes(self) -> &'static [&'static str] {
        match self {
            Self::V21 => COMPRESSION_CODES,
            Self::V20 => LEGACY_COMPRESSION_CODES,
        }
    }

    pub fn coordinate_codes(self) -> &'static [&'static str] {
        match self {
            Self::V21 => COORDINATE_CODES,
            Self::V20 => LEGACY_COORDINATE_CODES,
        }
    }

    /// Does coordinate code `icords` call for the IGEOLO field?
    pub fn has_geolocation(self, icords: &str) -> bool {
        match self {
            Self::V21 => !icords.trim().is_empty(),
            Self::V20 => icords.trim() != "N",
        }
    }

    /// Names of the image identifier and the secondary identifier / title fields
    pub fn identifier_fields(self) -> (&'static str, &'static str) {
        match self {
            Self::V21 => ("IID1", "IID2"),
            Self::V20 => ("IID", "ITITLE"),
        }
    }

    fn security_schema(self) -> SchemaFn {
        match self {
            Self::V21 => security::schema,
            Self::V20 => security::legacy_schema,
        }
    }
}

fn is_compressed_code(ic: &str) -> bool {
    !UNCOMPRESSED.contains(&ic)
}

fn is_masked_code(ic: &str) -> bool {
    MASKED.contains(&ic)
}

fn check_code(field: &str, value: &str, codes: &[&str]) -> CodecResult<String> {
    let value = value.trim_end_matches(' ');
    if !codes.contains(&value) {
        return Err(CodecError::schema(
            field,
            value,
            format!("must be one of {codes:?}"),
        ));
    }
    Ok(value.to_string())
}

fn has_rate(record: &Record) -> bool {
    record.text("IC").is_some_and(is_compressed_code)
}

fn has_geolocation(record: &Record) -> bool {
    Version::V21.has_geolocation(record.text("ICORDS").unwrap_or_default())
}

fn has_legacy_geolocation(record: &Record) -> bool {
    Version::V20.has_geolocation(record.text("ICORDS").unwrap_or_default())
}

fn mask_shape(record: &Record) -> (usize, usize) {
    let band_depth = match record.text("IMODE") {
        Some("S") => record.list("Bands").len(),
        _ => 1,
    };
    let blocks = record.int("NBPR").unwrap_or_default() * record.int("NBPC").unwrap_or_default();
    (band_depth, blocks as usize)
}

fn header_schema(version: Version) -> Schema {
    let (identifier, title) = version.identifier_fields();
    let (name, geolocation): (&'static str, Presence) = match version {
        Version::V21 => ("ImageSegmentHeader", has_geolocation),
        Version::V20 => ("ImageSegmentHeader20", has_legacy_geolocation),
    };
    Schema::new(
        name,
        vec![
            Field::one_of("IM", 2, &["IM"], "IM"),
            Field::text(identifier, 10),
            Field::text("IDATIM", 14),
            Field::text("TGTID", 17),
            Field::text(title, 80),
            Field::new("Security", Kind::Nested(version.security_schema())),
            Field::one_of("ENCRYP", 1, &["0"], "0"),
            Field::text("ISORCE", 42),
            Field::decimal("NROWS", 8, 0),
            Field::decimal("NCOLS", 8, 0),
            Field::one_of("PVTYPE", 3, PIXEL_VALUE_TYPES, "INT"),
            Field::one_of("IREP", 8, REPRESENTATIONS, "NODISPLY"),
            Field::new(
                "ICAT",
                Kind::Text {
                    width: 8,
                    default: "SAR",
                },
            ),
            Field::decimal("ABPP", 2, 0),
            Field::one_of("PJUST", 1, &["L", "R"], "R"),
            Field::one_of("ICORDS", 1, version.coordinate_codes(), "G"),
            Field::new(
                "IGEOLO",
                Kind::Conditional {
                    width: IGEOLO_WIDTH,
                    present: geolocation,
                },
            ),
            Field::new(
                "Comments",
                Kind::Loop {
                    child: comment_schema,
                    count: CountFormat::Single,
                },
            ),
            Field::one_of("IC", 2, version.compression_codes(), "NC"),
            Field::new(
                "COMRAT",
                Kind::Conditional {
                    width: COMRAT_WIDTH,
                    present: has_rate,
                },
            ),
            Field::new(
                "Bands",
                Kind::Loop {
                    child: band_schema,
                    count: CountFormat::Extended,
                },
            ),
            Field::decimal("ISYNC", 1, 0),
            Field::one_of("IMODE", 1, MODES, "P"),
            Field::decimal("NBPR", 4, 1),
            Field::decimal("NBPC", 4, 1),
            Field::decimal("NPPBH", 4, 0),
            Field::decimal("NPPBV", 4, 0),
            Field::decimal("NBPP", 2, 0),
            Field::decimal("IDLVL", 3, 0),
            Field::decimal("IALVL", 3, 0),
            Field::text("ILOC", 10),
            Field::new(
                "IMAG",
                Kind::Text {
                    width: 4,
                    default: "1.0",
                },
            ),
            Field::new("UserHeader", Kind::Extension),
            Field::new("ExtendedHeader", Kind::Extension),
        ],
    )
}

/// Subheader of one image segment.
///
/// Setters validate the fields they touch and keep dependent fields
/// consistent: COMRAT follows IC, IGEOLO follows ICORDS. Corrections that
/// change a value the caller supplied are governed by the header's [Policy].
#[derive(Debug, Clone)]
pub struct ImageSegmentHeader {
    version: Version,
    policy: Policy,
    record: Record,
    mask_subheader: Option<MaskSubheader>,
}

/// Headers are equal when they hold the same fields and mask; the policy is not compared.
impl PartialEq for ImageSegmentHeader {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.record == other.record
            && self.mask_subheader == other.mask_subheader
    }
}

impl Default for ImageSegmentHeader {
    fn default() -> Self {
        Self::new(Version::default())
    }
}

impl ImageSegmentHeader {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            policy: Policy::default(),
            record: Record::new(version.schema()),
            mask_subheader: None,
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Decode a subheader starting at `start`, returning it with the number of bytes consumed.
    pub fn from_bytes(
        bytes: &[u8],
        start: usize,
        version: Version,
        policy: Policy,
    ) -> CodecResult<(Self, usize)> {
        let (record, consumed) =
            Record::decode(version.schema(), bytes, start, Context::default())?;
        policy.check_length(record.name(), consumed, record.encoded_len())?;
        let header = Self {
            version,
            policy,
            record,
            mask_subheader: None,
        };
        debug!(
            "Decoded {:?} image subheader of {consumed} bytes: {} x {}, IC={}",
            version,
            header.nrows(),
            header.ncols(),
            header.ic()
        );
        Ok((header, consumed))
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        if self.band_count() == 0 {
            match self.policy {
                Policy::Strict => {
                    return Err(CodecError::schema(
                        "Bands",
                        0,
                        "an empty band loop reads back as an extended count",
                    ))
                }
                Policy::Lenient => {
                    warn!("Encoding an image subheader without bands, it will not decode back")
                }
            }
        }
        self.record.encode()
    }

    pub fn encoded_len(&self) -> usize {
        self.record.encoded_len()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    pub fn as_record(&self) -> &Record {
        &self.record
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.record.get(name)
    }

    /// Ordered summary for logging, with the mask subheader when one is attached.
    pub fn to_json(&self) -> Json {
        let mut json = self.record.to_json();
        if let (Json::Object(fields), Some(mask)) = (&mut json, &self.mask_subheader) {
            fields.insert("MaskSubheader".to_string(), mask.to_json());
        }
        json
    }

    fn text(&self, name: &str) -> &str {
        self.record.text(name).unwrap_or_default()
    }

    fn int(&self, name: &str) -> u64 {
        self.record.int(name).unwrap_or_default()
    }

    /// Set several fields at once, leaving the header untouched if any of them fails.
    ///
    /// An attached mask subheader whose shape no longer matches is detached.
    fn apply(&mut self, changes: Vec<(&str, Value)>) -> CodecResult<()> {
        let mut record = self.record.clone();
        for (name, value) in changes {
            record.set(name, value)?;
        }
        let stale_mask = match &self.mask_subheader {
            Some(mask) => {
                let shape = mask_shape(&record);
                let stale = (mask.band_depth(), mask.blocks()) != shape;
                if stale {
                    self.policy.correct(
                        "MaskSubheader",
                        shape,
                        "mask shape no longer matches the header, detaching it",
                    )?;
                }
                stale
            }
            None => false,
        };
        self.record = record;
        if stale_mask {
            self.mask_subheader = None;
        }
        Ok(())
    }

    // Identification

    /// Image identifier (`IID1`, or `IID` for NITF 2.0)
    pub fn identifier(&self) -> &str {
        self.text(self.version.identifier_fields().0)
    }

    /// Secondary identifier (`IID2`, or the title `ITITLE` for NITF 2.0)
    pub fn title(&self) -> &str {
        self.text(self.version.identifier_fields().1)
    }

    pub fn idatim(&self) -> &str {
        self.text("IDATIM")
    }

    pub fn tgtid(&self) -> &str {
        self.text("TGTID")
    }

    pub fn security(&self) -> Option<&Record> {
        match self.record.get("Security") {
            Some(Value::Record(security)) => Some(security),
            _ => None,
        }
    }

    pub fn isorce(&self) -> &str {
        self.text("ISORCE")
    }

    // Image layout

    pub fn nrows(&self) -> u32 {
        self.int("NROWS") as u32
    }

    pub fn ncols(&self) -> u32 {
        self.int("NCOLS") as u32
    }

    pub fn pvtype(&self) -> &str {
        self.text("PVTYPE")
    }

    pub fn irep(&self) -> &str {
        self.text("IREP")
    }

    pub fn icat(&self) -> &str {
        self.text("ICAT")
    }

    pub fn abpp(&self) -> u8 {
        self.int("ABPP") as u8
    }

    pub fn pjust(&self) -> &str {
        self.text("PJUST")
    }

    pub fn icords(&self) -> &str {
        self.text("ICORDS")
    }

    /// Corner coordinates, at their full 60 characters when present
    pub fn igeolo(&self) -> Option<&str> {
        self.record.text("IGEOLO")
    }

    pub fn comments(&self) -> Vec<String> {
        self.record
            .list("Comments")
            .iter()
            .map(|c| ImageComment::from_record(c.clone()).text().to_string())
            .collect()
    }

    pub fn ic(&self) -> &str {
        self.text("IC")
    }

    /// Compression rate, at its full 4 characters when present
    pub fn comrat(&self) -> Option<&str> {
        self.record.text("COMRAT")
    }

    pub fn band_count(&self) -> usize {
        self.record.list("Bands").len()
    }

    pub fn bands(&self) -> Vec<ImageBand> {
        self.record
            .list("Bands")
            .iter()
            .cloned()
            .map(ImageBand::from_record)
            .collect()
    }

    pub fn isync(&self) -> u8 {
        self.int("ISYNC") as u8
    }

    pub fn imode(&self) -> &str {
        self.text("IMODE")
    }

    pub fn nbpr(&self) -> u16 {
        self.int("NBPR") as u16
    }

    pub fn nbpc(&self) -> u16 {
        self.int("NBPC") as u16
    }

    pub fn nppbh(&self) -> u16 {
        self.int("NPPBH") as u16
    }

    pub fn nppbv(&self) -> u16 {
        self.int("NPPBV") as u16
    }

    pub fn nbpp(&self) -> u8 {
        self.int("NBPP") as u8
    }

    pub fn idlvl(&self) -> u16 {
        self.int("IDLVL") as u16
    }

    pub fn ialvl(&self) -> u16 {
        self.int("IALVL") as u16
    }

    pub fn iloc(&self) -> &str {
        self.text("ILOC")
    }

    pub fn imag(&self) -> &str {
        self.text("IMAG")
    }

    fn extension(&self, name: &str) -> Option<&Extension> {
        match self.record.get(name) {
            Some(Value::Extension(extension)) => Some(extension),
            _ => None,
        }
    }

    pub fn user_header(&self) -> Option<&Extension> {
        self.extension("UserHeader")
    }

    pub fn extended_header(&self) -> Option<&Extension> {
        self.extension("ExtendedHeader")
    }

    pub fn mask_subheader(&self) -> Option<&MaskSubheader> {
        self.mask_subheader.as_ref()
    }

    // Setters

    /// Set a text field by name. IC, COMRAT, ICORDS and IGEOLO go through
    /// their dedicated setters.
    pub fn set_text(&mut self, name: &str, value: &str) -> CodecResult<()> {
        match name {
            "IC" => self.set_ic(value),
            "COMRAT" => self.set_comrat(Some(value)),
            "ICORDS" => self.set_icords(value),
            "IGEOLO" => self.set_igeolo(Some(value)),
            _ => self.apply(vec![(name, Value::Text(value.to_string()))]),
        }
    }

    /// Set a numeric field by name.
    pub fn set_int(&mut self, name: &str, value: u64) -> CodecResult<()> {
        self.apply(vec![(name, Value::Int(value))])
    }

    /// Set the compression code.
    ///
    /// Uncompressed codes drop COMRAT. Compressed codes keep the current
    /// COMRAT; without one, COMRAT becomes four spaces, with a warning.
    pub fn set_ic(&mut self, value: &str) -> CodecResult<()> {
        let ic = check_code("IC", value, self.version.compression_codes())?;
        if !is_compressed_code(&ic) {
            if self.comrat().is_some() {
                debug!("IC={ic}, dropping COMRAT");
            }
            return self.set_compression(&ic, None);
        }
        let comrat = self.comrat().map(str::to_string);
        if comrat.is_none() {
            self.policy
                .correct("COMRAT", "absent", "compressed IC requires a rate")?;
        }
        let comrat = comrat.unwrap_or_else(|| " ".repeat(COMRAT_WIDTH));
        self.set_compression(&ic, Some(&comrat))
    }

    /// Set the compression rate. It is only allowed for compressed IC codes,
    /// and required for them.
    pub fn set_comrat(&mut self, value: Option<&str>) -> CodecResult<()> {
        let ic = self.ic().to_string();
        self.set_compression(&ic, value)
    }

    /// Set IC and COMRAT together.
    pub fn set_compression(&mut self, ic: &str, comrat: Option<&str>) -> CodecResult<()> {
        let ic = check_code("IC", ic, self.version.compression_codes())?;
        let comrat = match (is_compressed_code(&ic), comrat) {
            (true, Some(rate)) => Value::Text(rate.to_string()),
            (true, None) => {
                self.policy
                    .correct("COMRAT", "absent", "compressed IC requires a rate")?;
                Value::Text(" ".repeat(COMRAT_WIDTH))
            }
            (false, Some(rate)) => {
                self.policy
                    .correct("COMRAT", rate, "uncompressed IC allows no rate")?;
                Value::Absent
            }
            (false, None) => Value::Absent,
        };
        if !is_masked_code(&ic) && self.mask_subheader.is_some() {
            self.policy
                .correct("MaskSubheader", &ic, "IC no longer indicates a mask")?;
        }
        self.apply(vec![("IC", Value::Text(ic.clone())), ("COMRAT", comrat)])?;
        if !is_masked_code(&ic) {
            self.mask_subheader = None;
        }
        Ok(())
    }

    /// Set the coordinate code. IGEOLO appears (as 60 spaces) or disappears
    /// to match it.
    pub fn set_icords(&mut self, value: &str) -> CodecResult<()> {
        let icords = check_code("ICORDS", value, self.version.coordinate_codes())?;
        let igeolo = if self.version.has_geolocation(&icords) {
            let current = self.igeolo().map(str::to_string);
            Value::Text(current.unwrap_or_else(|| " ".repeat(IGEOLO_WIDTH)))
        } else {
            Value::Absent
        };
        self.apply(vec![("ICORDS", Value::Text(icords)), ("IGEOLO", igeolo)])
    }

    /// Set the corner coordinates; only allowed, and required, when ICORDS calls for them.
    pub fn set_igeolo(&mut self, value: Option<&str>) -> CodecResult<()> {
        let icords = self.icords().to_string();
        self.set_geolocation(&icords, value)
    }

    /// Set ICORDS and IGEOLO together.
    pub fn set_geolocation(&mut self, icords: &str, igeolo: Option<&str>) -> CodecResult<()> {
        let icords = check_code("ICORDS", icords, self.version.coordinate_codes())?;
        let igeolo = match (self.version.has_geolocation(&icords), igeolo) {
            (true, Some(corners)) => Value::Text(corners.to_string()),
            (true, None) => {
                self.policy
                    .correct("IGEOLO", "absent", "ICORDS requires corner coordinates")?;
                Value::Text(" ".repeat(IGEOLO_WIDTH))
            }
            (false, Some(corners)) => {
                self.policy
                    .correct("IGEOLO", corners, "ICORDS allows no corner coordinates")?;
                Value::Absent
            }
            (false, None) => Value::Absent,
        };
        self.apply(vec![("ICORDS", Value::Text(icords)), ("IGEOLO", igeolo)])
    }

    pub fn set_bands(&mut self, bands: Vec<ImageBand>) -> CodecResult<()> {
        let bands = bands.into_iter().map(ImageBand::into_record).collect();
        self.apply(vec![("Bands", Value::List(bands))])
    }

    pub fn push_band(&mut self, band: ImageBand) -> CodecResult<()> {
        let mut bands = self.record.list("Bands").to_vec();
        bands.push(band.into_record());
        self.apply(vec![("Bands", Value::List(bands))])
    }

    pub fn set_comments(&mut self, comments: &[&str]) -> CodecResult<()> {
        let comments = comments
            .iter()
            .map(|text| ImageComment::new(text).map(ImageComment::into_record))
            .collect::<CodecResult<Vec<_>>>()?;
        self.record.set("Comments", Value::List(comments))
    }

    /// Replace the security tags. The record must use this header version's security schema.
    pub fn set_security(&mut self, security: Record) -> CodecResult<()> {
        self.record.set("Security", Value::Record(security))
    }

    /// Set a security tag (`ISCLAS`, `ISCODE`, ...) in place. On NITF 2.0
    /// headers ISDEVT appears (as 40 spaces) or disappears to follow ISDWNG.
    pub fn set_security_text(&mut self, name: &str, value: &str) -> CodecResult<()> {
        let mut security = self
            .security()
            .cloned()
            .unwrap_or_else(|| Record::new(self.version.security_schema()()));
        security.set(name, Value::Text(value.to_string()))?;
        self.set_security(security)
    }

    pub fn set_user_header(&mut self, extension: Extension) -> CodecResult<()> {
        self.record.set("UserHeader", Value::Extension(extension))
    }

    pub fn set_extended_header(&mut self, extension: Extension) -> CodecResult<()> {
        self.record.set("ExtendedHeader", Value::Extension(extension))
    }

    /// Attach or detach the mask subheader. Attaching requires a masked IC
    /// and a mask shaped like [ImageSegmentHeader::mask_context].
    pub fn set_mask_subheader(&mut self, mask: Option<MaskSubheader>) -> CodecResult<()> {
        let Some(mask) = mask else {
            self.mask_subheader = None;
            return Ok(());
        };
        if !self.is_masked() {
            return Err(CodecError::schema(
                "MaskSubheader",
                self.ic(),
                "IC does not indicate a mask subheader",
            ));
        }
        let expected = self.mask_context();
        if (mask.band_depth(), mask.blocks()) != expected {
            return Err(CodecError::schema(
                "MaskSubheader",
                (mask.band_depth(), mask.blocks()),
                format!("shape must be {expected:?}"),
            ));
        }
        self.mask_subheader = Some(mask);
        Ok(())
    }

    /// Decode the mask subheader found at `start` (the first byte of the
    /// image data) and attach it. Returns the bytes consumed.
    pub fn read_mask_subheader(&mut self, bytes: &[u8], start: usize) -> CodecResult<usize> {
        if !self.is_masked() {
            return Err(CodecError::schema(
                "MaskSubheader",
                self.ic(),
                "IC does not indicate a mask subheader",
            ));
        }
        let (band_depth, blocks) = self.mask_context();
        let (mask, consumed) =
            MaskSubheader::from_bytes(bytes, start, band_depth, blocks, self.policy)?;
        self.mask_subheader = Some(mask);
        Ok(consumed)
    }

    // Derived values

    pub fn is_masked(&self) -> bool {
        is_masked_code(self.ic())
    }

    pub fn is_compressed(&self) -> bool {
        is_compressed_code(self.ic())
    }

    fn band_sequential(&self) -> bool {
        self.imode() == "S"
    }

    /// `(band_depth, blocks)` of this segment's mask tables. Band sequential
    /// images record every band's blocks separately.
    pub fn mask_context(&self) -> (usize, usize) {
        mask_shape(&self.record)
    }

    /// Bytes in one uncompressed block. A block holds every band, except in
    /// band sequential mode (IMODE `S`) where it holds a single band.
    pub fn uncompressed_block_size(&self) -> u64 {
        let nppbv = match self.nppbv() {
            0 => u64::from(self.nrows()),
            n => u64::from(n),
        };
        let nppbh = match self.nppbh() {
            0 => u64::from(self.ncols()),
            n => u64::from(n),
        };
        let bands = if self.band_sequential() {
            1
        } else {
            self.band_count() as u64
        };
        nppbh * nppbv * bands * u64::from(self.nbpp()) / 8
    }

    /// Bytes in the whole uncompressed image, block padding included.
    pub fn full_uncompressed_image_size(&self) -> u64 {
        let mut blocks = u64::from(self.nbpr()) * u64::from(self.nbpc());
        if self.band_sequential() {
            blocks *= self.band_count() as u64;
        }
        blocks * self.uncompressed_block_size()
    }

    /// Complexity level (CLEVEL) implied by the larger image dimension
    pub fn complexity_level(&self) -> u8 {
        match self.nrows().max(self.ncols()) {
            0..=2048 => 3,
            2049..=8192 => 5,
            8193..=65536 => 6,
            _ => 7,
        }
    }
}

use ndarray::array;
use nitf_imhdr::{
    CodecError, Extension, ImageBand, ImageSegmentHeader, MaskSubheader, Policy, Version,
};

fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

/// A NITF 2.1 subheader assembled field by field
fn current_fixture(ic: &str, comrat: &str) -> Vec<u8> {
    let mut out = String::new();
    out += "IM";
    out += &pad("MISSION01", 10);
    out += "20240131120000";
    out += &pad("", 17);
    out += &pad("harbor overview", 80);
    out += "U";
    out += &pad("", 166);
    out += "0";
    out += &pad("EO sensor", 42);
    out += "00001024";
    out += "00002048";
    out += "INT";
    out += &pad("MONO", 8);
    out += &pad("VIS", 8);
    out += "08";
    out += "R";
    out += "G";
    out += "323030N0760030W323030N0750030W313030N0750030W313030N0760030W";
    out += "1";
    out += &pad("first pass", 80);
    out += ic;
    out += comrat;
    out += "1";
    out += "M       N   0";
    out += "0";
    out += "B";
    out += "0002";
    out += "0001";
    out += "1024";
    out += "1024";
    out += "08";
    out += "001";
    out += "000";
    out += "0000000000";
    out += "1.0 ";
    out += "00000";
    out += "00014";
    out += "000";
    out += "ABCDEFGHIJK";
    out.into_bytes()
}

#[test]
fn decodes_current_subheader() {
    let bytes = current_fixture("NC", "");
    let (header, consumed) =
        ImageSegmentHeader::from_bytes(&bytes, 0, Version::V21, Policy::Strict).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(header.identifier(), "MISSION01");
    assert_eq!(header.title(), "harbor overview");
    assert_eq!((header.nrows(), header.ncols()), (1024, 2048));
    assert_eq!(header.icat(), "VIS");
    assert_eq!(header.abpp(), 8);
    assert_eq!(header.igeolo().map(str::len), Some(60));
    assert_eq!(header.comments(), ["first pass"]);
    assert_eq!(header.comrat(), None);
    assert_eq!(header.band_count(), 1);
    assert_eq!(header.bands()[0].irepband(), "M");
    assert_eq!((header.nbpr(), header.nbpc()), (2, 1));
    assert_eq!(header.idlvl(), 1);
    assert_eq!(header.imag(), "1.0");
    assert!(header.user_header().unwrap().is_empty());
    let extended = header.extended_header().unwrap();
    assert_eq!(extended.overflow(), Some(0));
    assert_eq!(extended.data(), b"ABCDEFGHIJK");

    assert_eq!(header.to_bytes().unwrap(), bytes);
}

#[test]
fn decodes_at_offset_inside_a_file() {
    let mut file = b"NITF02.10 file header stand-in".to_vec();
    let start = file.len();
    file.extend(current_fixture("C3", "00.5"));
    file.extend(b"image data follows");

    let (header, consumed) =
        ImageSegmentHeader::from_bytes(&file, start, Version::V21, Policy::Strict).unwrap();
    assert_eq!(header.ic(), "C3");
    assert_eq!(header.comrat(), Some("00.5"));
    assert_eq!(&file[start + consumed..], b"image data follows");
}

#[test]
fn short_input_reports_the_field() {
    let bytes = current_fixture("NC", "");
    let cut = &bytes[..363];
    match ImageSegmentHeader::from_bytes(cut, 0, Version::V21, Policy::Lenient) {
        Err(CodecError::Truncated { field, .. }) => assert_eq!(field, "ICAT"),
        other => panic!("expected a truncation error, got {other:?}"),
    }
}

#[test]
fn illegal_codes_fail_decoding() {
    let mut bytes = current_fixture("NC", "");
    let ic = bytes.len() - 80;
    assert_eq!(&bytes[ic..ic + 2], b"NC");
    bytes[ic..ic + 2].copy_from_slice(b"ZZ");
    assert!(matches!(
        ImageSegmentHeader::from_bytes(&bytes, 0, Version::V21, Policy::Lenient),
        Err(CodecError::SchemaViolation { .. })
    ));
}

#[test]
fn legacy_subheader_roundtrip() {
    let mut header = ImageSegmentHeader::new(Version::V20).with_policy(Policy::Strict);
    header.set_text("IID", "OLDMISSION").unwrap();
    header.set_text("ITITLE", "archived frame").unwrap();
    header.set_security_text("ISDWNG", "999998").unwrap();
    header.set_security_text("ISDEVT", "DECLASSIFY ON REVIEW").unwrap();
    header.set_geolocation("N", None).unwrap();
    header.set_bands(vec![ImageBand::new()]).unwrap();

    let bytes = header.to_bytes().unwrap();
    assert_eq!(bytes.len(), 499 + 40 - 60);
    let (back, consumed) =
        ImageSegmentHeader::from_bytes(&bytes, 0, Version::V20, Policy::Strict).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(back.identifier(), "OLDMISSION");
    assert_eq!(back.igeolo(), None);
    assert_eq!(back.with_policy(Policy::Strict), header);

    assert!(ImageSegmentHeader::from_bytes(&bytes, 0, Version::V21, Policy::Strict).is_err());
}

#[test]
fn many_bands_use_the_extended_count() {
    let mut header = ImageSegmentHeader::default();
    header
        .set_bands((0..12).map(|_| ImageBand::new()).collect())
        .unwrap();
    let bytes = header.to_bytes().unwrap();
    assert_eq!(bytes.len(), 499 + 5 + 11 * 13);

    let (back, _) =
        ImageSegmentHeader::from_bytes(&bytes, 0, Version::V21, Policy::Strict).unwrap();
    assert_eq!(back.band_count(), 12);
    assert_eq!(back, header);
}

#[test]
fn masked_image_carries_its_mask() {
    let mut header = ImageSegmentHeader::default();
    header.set_bands(vec![ImageBand::new()]).unwrap();
    header.set_int("NBPR", 2).unwrap();
    header.set_compression("M3", Some("1.50")).unwrap();
    assert_eq!(header.mask_context(), (1, 2));

    let mut mask = MaskSubheader::new(1, 2).unwrap();
    mask.set_bmr(array![[0u32, 0xFFFF_FFFF]]).unwrap();
    let mut file = header.to_bytes().unwrap();
    file.extend(mask.to_bytes().unwrap());

    let (mut back, consumed) =
        ImageSegmentHeader::from_bytes(&file, 0, Version::V21, Policy::Strict).unwrap();
    let mask_len = back.read_mask_subheader(&file, consumed).unwrap();
    assert_eq!(consumed + mask_len, file.len());
    let back_mask = back.mask_subheader().unwrap();
    assert_eq!(back_mask.block_offset(0, 1), None);
    assert_eq!(back_mask, &mask);

    let summary = back.to_json();
    assert_eq!(summary["COMRAT"], "1.50");
    assert_eq!(summary["MaskSubheader"]["BMRLNTH"], 4);
}

#[test]
fn extensions_survive_assignment() {
    let mut header = ImageSegmentHeader::default();
    header.set_bands(vec![ImageBand::new()]).unwrap();
    header
        .set_user_header(Extension::new(1, b"USERTRE0000".to_vec()).unwrap())
        .unwrap();
    let bytes = header.to_bytes().unwrap();
    assert_eq!(bytes.len(), 499 + 14);
    let (back, _) =
        ImageSegmentHeader::from_bytes(&bytes, 0, Version::V21, Policy::Strict).unwrap();
    assert_eq!(back.user_header().unwrap().overflow(), Some(1));
    assert_eq!(back.user_header().unwrap().data(), b"USERTRE0000");
}

use assert_matches::assert_matches;
use bsonjs::{
    Bson,
    DecoderOptions,
    EncoderOptions,
    SerializationMode,
    de::read_document,
    decode,
    decode_to_writer,
    decode_with_options,
    doc,
    encode,
    encode_from_reader,
    encode_with_options,
    error::ErrorKind,
    oid::ObjectId,
};
use pretty_assertions::assert_eq;

const MODES: [SerializationMode; 3] = [
    SerializationMode::Legacy,
    SerializationMode::Relaxed,
    SerializationMode::Canonical,
];

#[test]
fn empty_document_in_every_mode() {
    for mode in MODES {
        assert_eq!(decode(b"\x05\x00\x00\x00\x00", mode).unwrap(), "{}");
    }
}

#[test]
fn int32_by_mode() {
    let bson = encode(r#"{"a": 1}"#).unwrap();
    assert_eq!(bson, b"\x0c\x00\x00\x00\x10a\x00\x01\x00\x00\x00\x00");
    assert_eq!(decode(&bson, SerializationMode::Relaxed).unwrap(), r#"{"a": 1}"#);
    assert_eq!(
        decode(&bson, SerializationMode::Canonical).unwrap(),
        r#"{"a": {"$numberInt": "1"}}"#
    );
    assert_eq!(decode(&bson, SerializationMode::Legacy).unwrap(), r#"{"a": 1}"#);
}

#[test]
fn object_id_field() {
    let bson = encode(r#"{"_id": {"$oid": "507f1f77bcf86cd799439011"}}"#).unwrap();

    let mut expected = vec![0x16, 0x00, 0x00, 0x00, 0x07, b'_', b'i', b'd', 0x00];
    expected.extend(hex::decode("507f1f77bcf86cd799439011").unwrap());
    expected.push(0x00);
    assert_eq!(bson, expected);

    let doc = read_document(&bson).unwrap();
    assert_eq!(
        doc.get("_id"),
        Some(&Bson::ObjectId(
            ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap()
        ))
    );
}

#[test]
fn int64_max_in_relaxed_mode() {
    let bson = encode(r#"{"n": {"$numberLong": "9223372036854775807"}}"#).unwrap();
    assert_eq!(
        decode(&bson, SerializationMode::Relaxed).unwrap(),
        r#"{"n": 9223372036854775807}"#
    );
    assert_eq!(
        decode(&bson, SerializationMode::Canonical).unwrap(),
        r#"{"n": {"$numberLong": "9223372036854775807"}}"#
    );
}

#[test]
fn invalid_mode_is_rejected() {
    let err = SerializationMode::try_from(5).unwrap_err();
    assert_matches!(err.kind, ErrorKind::InvalidMode { mode: 5, .. });

    for code in 0..=2 {
        let mode = SerializationMode::try_from(code).unwrap();
        assert_eq!(i32::from(mode), code);
    }
}

#[test]
fn truncated_buffer() {
    let mut bson = vec![0x14, 0x00, 0x00, 0x00];
    bson.extend([0u8; 6]);
    assert_eq!(bson.len(), 10);

    let err = decode(&bson, SerializationMode::Relaxed).unwrap_err();
    assert_matches!(err.kind, ErrorKind::InvalidBson { .. });
    assert!(
        err.to_string().contains("document length 20 exceeds buffer length 10"),
        "{err}"
    );
}

#[test]
fn trailing_bytes() {
    let mut bson = encode(r#"{"a": "b"}"#).unwrap();
    let expected = decode(&bson, SerializationMode::Relaxed).unwrap();
    bson.extend_from_slice(b"\x05\x00\x00\x00\x00garbage");

    assert_eq!(decode(&bson, SerializationMode::Relaxed).unwrap(), expected);

    let strict = DecoderOptions::builder()
        .mode(SerializationMode::Relaxed)
        .allow_trailing_bytes(false)
        .build();
    let err = decode_with_options(&bson, &strict).unwrap_err();
    assert!(err.to_string().contains("trailing bytes"), "{err}");
}

#[test]
fn trailing_text() {
    assert_eq!(
        encode(r#"{"a": 1} {"b": 2}"#).unwrap(),
        encode(r#"{"a": 1}"#).unwrap()
    );
    assert_eq!(
        encode("{\"a\": 1}\n\n").unwrap(),
        encode(r#"{"a": 1}"#).unwrap()
    );
}

#[test]
fn malformed_json_reports_an_offset() {
    let err = encode(r#"{"a": 1,}"#).unwrap_err();
    assert_matches!(err.kind, ErrorKind::MalformedJson { offset: Some(_), .. });

    let err = encode("").unwrap_err();
    assert_matches!(err.kind, ErrorKind::MalformedJson { offset: Some(0), .. });

    let err = encode(r#"{"a": {"$oid": "xyz"}}"#).unwrap_err();
    assert_matches!(err.kind, ErrorKind::MalformedJson { .. });
    assert_eq!(err.key.as_deref(), Some("a"));
}

#[test]
fn nested_decode_errors_name_the_key() {
    // {"outer": {"flag": <boolean 2>}}
    let bson = b"\x18\x00\x00\x00\x03outer\x00\x0c\x00\x00\x00\x08flag\x00\x02\x00\x00";
    let err = decode(bson, SerializationMode::Canonical).unwrap_err();
    assert_matches!(err.kind, ErrorKind::InvalidBson { .. });
    assert_eq!(err.key.as_deref(), Some("flag"));
}

#[test]
fn text_and_byte_inputs_agree() {
    let text = r#"{"x": [1, {"$numberLong": "2"}, 3.5, "four", null, true]}"#;
    let from_str = encode(text).unwrap();
    assert_eq!(encode(text.as_bytes()).unwrap(), from_str);
    assert_eq!(encode(text.to_string()).unwrap(), from_str);
    assert_eq!(encode_from_reader(text.as_bytes()).unwrap(), from_str);

    let mut out = Vec::new();
    decode_to_writer(&from_str, &mut out, SerializationMode::Canonical).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        r#"{"x": [{"$numberInt": "1"}, {"$numberLong": "2"}, {"$numberDouble": "3.5"}, "four", null, true]}"#
    );
}

#[test]
fn maximum_document_size() {
    let json = r#"{"s": "0123456789"}"#;
    let size = encode(json).unwrap().len();

    let exact = EncoderOptions::builder().max_document_size(size).build();
    assert_eq!(encode_with_options(json, &exact).unwrap().len(), size);

    let small = EncoderOptions::builder().max_document_size(size - 1).build();
    assert_matches!(
        encode_with_options(json, &small).unwrap_err().kind,
        ErrorKind::TooLarge { .. }
    );
}

#[test]
fn mixed_spellings_in_one_document() {
    let json = r#"{
        "canonical": {"$date": {"$numberLong": "0"}},
        "relaxed": {"$date": "1970-01-01T00:00:00Z"},
        "legacy": {"$date": 0},
        "regex": {"$regex": "^a", "$options": "i"},
        "binary": {"$binary": "AQID", "$type": "0"}
    }"#;
    let bson = encode(json).unwrap();
    assert_eq!(
        decode(&bson, SerializationMode::Canonical).unwrap(),
        concat!(
            r#"{"canonical": {"$date": {"$numberLong": "0"}}, "#,
            r#""relaxed": {"$date": {"$numberLong": "0"}}, "#,
            r#""legacy": {"$date": {"$numberLong": "0"}}, "#,
            r#""regex": {"$regularExpression": {"pattern": "^a", "options": "i"}}, "#,
            r#""binary": {"$binary": {"base64": "AQID", "subType": "00"}}}"#
        )
    );
}

#[test]
fn duplicate_bson_keys_survive_decoding() {
    let mut doc = doc! { "k": 1 };
    doc.push("k", "two");
    let bson = bsonjs::ser::write_document(&doc).unwrap();
    assert_eq!(
        decode(&bson, SerializationMode::Relaxed).unwrap(),
        r#"{"k": 1, "k": "two"}"#
    );

    for mode in MODES {
        let json = decode(&bson, mode).unwrap();
        assert_eq!(encode(&json).unwrap(), bson, "{json}");
    }
}

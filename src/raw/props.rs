use crate::{
    Binary,
    Bson,
    DateTime,
    DbPointer,
    Decimal128,
    Document,
    JavaScriptCodeWithScope,
    Regex,
    Timestamp,
    oid::ObjectId,
    spec::BinarySubtype,
};

use proptest::prelude::*;

fn arbitrary_binary_subtype() -> impl Strategy<Value = BinarySubtype> {
    prop_oneof![
        Just(BinarySubtype::Generic),
        Just(BinarySubtype::Function),
        Just(BinarySubtype::BinaryOld),
        Just(BinarySubtype::UuidOld),
        Just(BinarySubtype::Uuid),
        Just(BinarySubtype::Md5),
        (0x80u8..=0xff).prop_map(BinarySubtype::from),
    ]
}

/// Regex patterns and options are cstrings.
fn cstring() -> impl Strategy<Value = String> {
    "[^\0]{0,8}"
}

/// Keys never start with `$`, so that no generated document reads back as a wrapper.
fn key() -> impl Strategy<Value = String> {
    "([^\0$][^\0]{0,7})?"
}

/// Any double except NaN, which never compares equal to itself.
fn double() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("NaN", |d| !d.is_nan())
}

fn decimal128() -> impl Strategy<Value = Decimal128> {
    // A canonical coefficient with an exponent within range.
    (any::<bool>(), 0u64..=u64::MAX, -6176i32..=6111).prop_map(|(negative, coefficient, exp)| {
        let text = format!("{}{}E{}", if negative { "-" } else { "" }, coefficient, exp);
        text.parse()
            .unwrap_or_else(|_| Decimal128::from_bytes([0; 16]))
    })
}

pub(crate) fn arbitrary_bson() -> impl Strategy<Value = Bson> {
    let leaf = prop_oneof![
        Just(Bson::Null),
        Just(Bson::Undefined),
        Just(Bson::MinKey),
        Just(Bson::MaxKey),
        any::<String>().prop_map(Bson::String),
        any::<String>().prop_map(Bson::Symbol),
        any::<bool>().prop_map(Bson::Boolean),
        double().prop_map(Bson::Double),
        any::<i32>().prop_map(Bson::Int32),
        any::<i64>().prop_map(Bson::Int64),
        any::<i64>().prop_map(|ms| Bson::DateTime(DateTime::from_millis(ms))),
        any::<(u32, u32)>().prop_map(|(time, increment)| Bson::Timestamp(Timestamp { time, increment })),
        (cstring(), "[imsux]{0,5}")
            .prop_map(|(pattern, options)| Bson::RegularExpression(Regex { pattern, options })),
        any::<[u8; 12]>().prop_map(|bytes| Bson::ObjectId(ObjectId::from_bytes(bytes))),
        (any::<String>(), any::<[u8; 12]>()).prop_map(|(namespace, bytes)| {
            Bson::DbPointer(DbPointer {
                namespace,
                id: ObjectId::from_bytes(bytes),
            })
        }),
        (arbitrary_binary_subtype(), any::<Vec<u8>>())
            .prop_map(|(subtype, bytes)| Bson::Binary(Binary { subtype, bytes })),
        decimal128().prop_map(Bson::Decimal128),
        any::<String>().prop_map(Bson::JavaScriptCode),
    ];

    leaf.prop_recursive(4, 256, 10, |inner| {
        prop_oneof![
            arbitrary_entries(inner.clone()).prop_map(Bson::Document),
            prop::collection::vec(inner.clone(), 0..12).prop_map(Bson::Array),
            (arbitrary_entries(inner), any::<String>()).prop_map(|(scope, code)| {
                Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope { code, scope })
            }),
        ]
    })
}

fn arbitrary_entries(value: impl Strategy<Value = Bson>) -> impl Strategy<Value = Document> {
    prop::collection::vec((key(), value), 0..12)
        .prop_map(|entries| entries.into_iter().collect::<Document>())
}

pub(crate) fn arbitrary_document() -> impl Strategy<Value = Document> {
    arbitrary_entries(arbitrary_bson())
}

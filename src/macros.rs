/// Construct a [`Bson`](crate::Bson) value.
///
/// Nested `{ "key": value }` and `[value, ...]` literals are supported. Any value that is more
/// than a single token, such as `-1` or `i64::MAX`, must be wrapped in parentheses.
///
/// ```rust
/// use bsonjs::{bson, Bson};
///
/// let value = bson!({ "a": [1, (-2), null], "b": { "c": "d" } });
/// assert!(matches!(value, Bson::Document(_)));
/// ```
#[macro_export]
macro_rules! bson {
    (null) => {
        $crate::Bson::Null
    };

    ([ $($val:tt),* $(,)? ]) => {
        $crate::Bson::Array(vec![$($crate::bson!($val)),*])
    };

    ({ $($key:literal : $val:tt),* $(,)? }) => {
        $crate::Bson::Document($crate::doc! { $($key : $val),* })
    };

    ($val:expr) => {
        $crate::Bson::from($val)
    };
}

/// Construct a [`Document`](crate::Document). Entries keep their order, and repeated keys are
/// kept as separate entries.
///
/// ```rust
/// use bsonjs::doc;
///
/// let doc = doc! { "a": 1, "b": { "c": [true, (i64::MAX)] } };
/// assert_eq!(doc.len(), 2);
/// ```
#[macro_export]
macro_rules! doc {
    () => {{ $crate::Document::new() }};

    ( $($key:literal : $val:tt),* $(,)? ) => {{
        let mut document = $crate::Document::new();

        $(
            document.push($key, $crate::bson!($val));
        )*

        document
    }};
}

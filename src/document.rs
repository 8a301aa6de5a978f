//! A BSON document represented as an ordered list of key/value pairs.

use std::{
    fmt::{self, Debug, Formatter},
    iter::{Extend, FromIterator, IntoIterator},
};

use crate::bson::{Array, Bson};

/// A BSON document represented as an ordered list of key/value pairs.
///
/// Unlike a map, a `Document` keeps every entry it is given, so keys may repeat. Lookups by key
/// return the first matching entry.
#[derive(Clone, PartialEq, Default)]
pub struct Document {
    inner: Vec<(String, Bson)>,
}

impl Debug for Document {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "Document(")?;
        fmt.debug_map()
            .entries(self.inner.iter().map(|(k, v)| (k, v)))
            .finish()?;
        write!(fmt, ")")
    }
}

/// An owning iterator over Document entries.
pub struct IntoIter {
    inner: std::vec::IntoIter<(String, Bson)>,
}

/// An iterator over Document entries.
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, (String, Bson)>,
}

impl IntoIterator for Document {
    type Item = (String, Bson);
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.inner.into_iter(),
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Bson);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        Iter {
            inner: self.inner.iter(),
        }
    }
}

impl FromIterator<(String, Bson)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, Bson)>>(iter: T) -> Self {
        Document {
            inner: iter.into_iter().collect(),
        }
    }
}

impl Iterator for IntoIter {
    type Item = (String, Bson);

    fn next(&mut self) -> Option<(String, Bson)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for IntoIter {}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a String, &'a Bson);

    fn next(&mut self) -> Option<(&'a String, &'a Bson)> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl Extend<(String, Bson)> for Document {
    fn extend<T: IntoIterator<Item = (String, Bson)>>(&mut self, iter: T) {
        self.inner.extend(iter);
    }
}

impl Document {
    /// Creates a new empty Document.
    pub fn new() -> Document {
        Document { inner: Vec::new() }
    }

    /// Gets an iterator over the entries of the document, in insertion order.
    pub fn iter(&self) -> Iter<'_> {
        self.into_iter()
    }

    /// Returns a reference to the first value with the given key, if any.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&Bson> {
        let key = key.as_ref();
        self.inner.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns a reference to the first document value with the given key, if any.
    pub fn get_document(&self, key: impl AsRef<str>) -> Option<&Document> {
        self.get(key).and_then(Bson::as_document)
    }

    /// Returns a reference to the first array value with the given key, if any.
    pub fn get_array(&self, key: impl AsRef<str>) -> Option<&Array> {
        self.get(key).and_then(Bson::as_array)
    }

    /// Whether any entry has the given key.
    pub fn contains_key(&self, key: impl AsRef<str>) -> bool {
        self.get(key).is_some()
    }

    /// Gets an iterator over the keys of the document, including repeats.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.inner.iter().map(|(k, _)| k)
    }

    /// Returns the number of entries in the document.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the document contains no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Sets the value of the first entry with the given key, returning the previous value, or
    /// appends a new entry if the key is not present.
    pub fn insert<KT: Into<String>, BT: Into<Bson>>(&mut self, key: KT, val: BT) -> Option<Bson> {
        let key = key.into();
        let val = val.into();
        match self.inner.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, val)),
            None => {
                self.inner.push((key, val));
                None
            }
        }
    }

    /// Appends an entry, even if the key is already present.
    pub fn push<KT: Into<String>, BT: Into<Bson>>(&mut self, key: KT, val: BT) {
        self.inner.push((key.into(), val.into()));
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::{Bson, Document, doc};

    #[test]
    fn keeps_duplicate_keys_in_order() {
        let mut doc = Document::new();
        doc.push("a", 1);
        doc.push("b", 2);
        doc.push("a", 3);

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.get("a"), Some(&Bson::Int32(1)));
        assert_eq!(doc.keys().collect::<Vec<_>>(), ["a", "b", "a"]);
    }

    #[test]
    fn insert_replaces_first() {
        let mut doc = doc! { "a": 1, "b": 2 };
        assert_eq!(doc.insert("a", "x"), Some(Bson::Int32(1)));
        assert_eq!(doc.insert("c", true), None);
        assert_eq!(doc, doc! { "a": "x", "b": 2, "c": true });
    }

    #[test]
    fn iterator_lengths() {
        assert_eq!(Document::new().into_iter().len(), 0);

        let mut doc = doc! { "a": 1, "b": 2 };
        doc.push("a", 3);
        assert_eq!(doc.iter().len(), 3);

        let mut iter = doc.into_iter();
        assert_eq!(iter.len(), 3);
        iter.next();
        assert_eq!(iter.size_hint(), (2, Some(2)));
    }

    #[test]
    fn typed_getters() {
        let doc = doc! { "d": { "k": 1 }, "arr": [1, 2], "s": "v" };
        assert_eq!(doc.get_document("d"), Some(&doc! { "k": 1 }));
        assert_eq!(doc.get_array("arr").map(Vec::len), Some(2));
        assert!(doc.get_document("s").is_none());
        assert!(doc.contains_key("s"));
        assert!(!doc.contains_key("missing"));
    }
}

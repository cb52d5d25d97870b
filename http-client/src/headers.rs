//! Ordered header list with case-insensitive names.

use http::{HeaderName, HeaderValue};

use crate::error::HttpClientResult;

/// An ordered list of header fields.
///
/// Names are compared ignoring ASCII case. The casing used by the first insertion of a name is
/// kept, and so is its position, so the list renders in the order headers were first set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a header list from key-value pairs, validating every name and value.
    ///
    /// Later pairs overwrite earlier ones with the same name.
    ///
    /// # Errors
    ///
    /// This function will return an error if a name is not a valid header token or a value
    /// contains characters not allowed in a header field.
    pub fn try_from_iter<I, K, V>(headers: I) -> HttpClientResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut list = Self::new();
        for (key, val) in headers {
            list.insert(key.as_ref(), val.as_ref())?;
        }
        Ok(list)
    }

    /// Inserts a header, overwriting the value of an existing entry with the same name.
    ///
    /// # Errors
    ///
    /// This function will return an error if the name or the value is not valid.
    pub fn insert(&mut self, name: &str, value: &str) -> HttpClientResult<()> {
        HeaderName::from_bytes(name.as_bytes())?;
        HeaderValue::from_str(value)?;
        self.insert_unchecked(name, value);
        Ok(())
    }

    // Callers must have validated both name and value.
    pub(crate) fn insert_unchecked(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(idx) => self.entries[idx].1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    // Keeps repeated fields (e.g. several `Set-Cookie` lines) as separate entries.
    pub(crate) fn append(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_string(), value.to_string()));
    }

    /// Removes the header with the given name, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// Returns the value of the first header with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    /// Returns the values of every header with the given name, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a header with the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy of `self` overlaid with `other`: entries of `other` overwrite entries with
    /// the same name and new names are appended.
    pub(crate) fn merged(&self, other: &Headers) -> Headers {
        let mut merged = self.clone();
        for (name, value) in other.iter() {
            merged.insert_unchecked(name, value);
        }
        merged
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

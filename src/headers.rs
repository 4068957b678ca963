//! Ordered, list-valued header tables.
//!
//! A [`Headers`] table maps lower-cased field names to lists of string
//! values, preserving the order in which names were first inserted. All
//! mutation goes through `&mut self`: a request exposes its table behind a
//! shared reference only, which is what makes request headers immutable
//! without any runtime mode flag.

use thiserror::Error;

/// Errors raised when constructing or mutating a header table.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HeaderError {
    /// Field name is empty or contains a character outside the token set.
    #[error("invalid character in header field name {0:?}")]
    InvalidName(String),

    /// Field value contains a CR or LF byte.
    #[error("invalid newline in value for header field {0:?}")]
    InvalidValue(String),
}

/// Characters allowed in a field name besides ASCII alphanumerics.
const NAME_EXTRA: &str = "-#$%&'*+.^_`|~";

fn validate_name(name: &str) -> Result<(), HeaderError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || NAME_EXTRA.contains(c));
    if valid {
        Ok(())
    } else {
        Err(HeaderError::InvalidName(name.to_string()))
    }
}

fn validate_value(name: &str, value: &str) -> Result<(), HeaderError> {
    if value.contains(['\r', '\n']) {
        Err(HeaderError::InvalidValue(name.to_string()))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    values: Vec<String>,
}

/// An insertion-ordered mapping from lower-cased field names to value lists.
///
/// Multi-valued fields (repeated `set-cookie`, `via`, ...) keep every raw
/// value; [`get`](Headers::get) joins them for single-string consumers while
/// [`raw`](Headers::raw) exposes the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Entry>,
}

impl Headers {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from name/value pairs, appending in order.
    ///
    /// Repeated names accumulate values rather than replacing them.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self, HeaderError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.append(name.into(), value.into())?;
        }
        Ok(headers)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Replace the value list for `name` with a single value.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), HeaderError> {
        self.set_many(name, [value.into()])
    }

    /// Replace the value list for `name` with the given values.
    pub fn set_many<V>(
        &mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), HeaderError>
    where
        V: Into<String>,
    {
        let name = name.into().to_ascii_lowercase();
        validate_name(&name)?;
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        for value in &values {
            validate_value(&name, value)?;
        }
        match self.position(&name) {
            Some(i) => self.entries[i].values = values,
            None => self.entries.push(Entry { name, values }),
        }
        Ok(())
    }

    /// Add a value to `name`, keeping any existing values.
    pub fn append(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), HeaderError> {
        let name = name.into().to_ascii_lowercase();
        validate_name(&name)?;
        let value = value.into();
        validate_value(&name, &value)?;
        match self.position(&name) {
            Some(i) => self.entries[i].values.push(value),
            None => self.entries.push(Entry {
                name,
                values: vec![value],
            }),
        }
        Ok(())
    }

    /// Set a field whose name is a known-valid static token.
    ///
    /// Used for the bookkeeping fields the crate maintains itself
    /// (`content-length`, `content-type`, ...); values are still validated
    /// by construction at the call sites.
    pub(crate) fn set_known(&mut self, name: &'static str, value: impl Into<String>) {
        debug_assert!(validate_name(name).is_ok());
        let value = value.into();
        match self.position(name) {
            Some(i) => self.entries[i].values = vec![value],
            None => self.entries.push(Entry {
                name: name.to_string(),
                values: vec![value],
            }),
        }
    }

    /// Remove a field entirely. Returns whether it was present.
    pub fn delete(&mut self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        match self.position(&name) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Whether a field is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.position(&name.to_ascii_lowercase()).is_some()
    }

    /// All values for `name` joined with `", "`, or `None` if absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.position(&name)
            .map(|i| self.entries[i].values.join(", "))
    }

    /// The raw value list for `name`; empty if the field is absent.
    #[must_use]
    pub fn raw(&self, name: &str) -> &[String] {
        let name = name.to_ascii_lowercase();
        self.position(&name)
            .map(|i| self.entries[i].values.as_slice())
            .unwrap_or(&[])
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// `(name, values)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.values.as_slice()))
    }

    /// Number of distinct field names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain").unwrap();
        assert_eq!(headers.get("content-type").as_deref(), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE").as_deref(), Some("text/plain"));
        assert!(headers.get("accept").is_none());
    }

    #[test]
    fn set_replaces_append_accumulates() {
        let mut headers = Headers::new();
        headers.set("set-cookie", "a=1").unwrap();
        headers.append("set-cookie", "b=2").unwrap();
        assert_eq!(headers.raw("set-cookie"), ["a=1", "b=2"]);
        assert_eq!(headers.get("set-cookie").as_deref(), Some("a=1, b=2"));

        headers.set("set-cookie", "c=3").unwrap();
        assert_eq!(headers.raw("set-cookie"), ["c=3"]);
    }

    #[test]
    fn names_keep_insertion_order() {
        let mut headers = Headers::new();
        headers.set("b-first", "1").unwrap();
        headers.set("a-second", "2").unwrap();
        headers.append("b-first", "3").unwrap();
        let names: Vec<_> = headers.names().collect();
        assert_eq!(names, ["b-first", "a-second"]);
    }

    #[test]
    fn invalid_name_rejected() {
        let mut headers = Headers::new();
        let err = headers.set("bad name", "x").unwrap_err();
        assert_eq!(err, HeaderError::InvalidName("bad name".to_string()));
        assert!(headers.set("", "x").is_err());
        assert!(headers.set("x-ok", "fine").is_ok());
    }

    #[test]
    fn newline_in_value_rejected() {
        let mut headers = Headers::new();
        let err = headers.set("x-test", "a\r\nb").unwrap_err();
        assert_eq!(err, HeaderError::InvalidValue("x-test".to_string()));
        assert!(headers.append("x-test", "a\nb").is_err());
        assert!(!headers.has("x-test"));
    }

    #[test]
    fn delete_and_has() {
        let mut headers = Headers::new();
        headers.set("x-token", "1").unwrap();
        assert!(headers.has("X-Token"));
        assert!(headers.delete("X-TOKEN"));
        assert!(!headers.has("x-token"));
        assert!(!headers.delete("x-token"));
        assert!(headers.raw("x-token").is_empty());
    }

    #[test]
    fn from_pairs_accumulates() {
        let headers = Headers::from_pairs([
            ("accept", "text/html"),
            ("accept", "application/json"),
            ("host", "example.com"),
        ])
        .unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.raw("accept").len(), 2);
    }
}

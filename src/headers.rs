//! Ordered, case-insensitive HTTP header collection

/// Header fields keyed by case-insensitive name, each with an ordered list of raw values.
///
/// Field names keep the case they were first inserted with, and distinct names keep their
/// insertion order so that serialization is deterministic. Cloning produces a fully
/// independent copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderCollection {
    fields: Vec<(String, Vec<String>)>,
}

impl HeaderCollection {
    /// Create an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to a field, creating the field if it does not exist yet
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.fields[index].1.push(value),
            None => self.fields.push((name, vec![value])),
        }
    }

    /// Replace all values of a field, keeping its position if it already exists
    pub fn set_raw(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => self.fields[index].1 = values,
            None => self.fields.push((name, values)),
        }
    }

    /// All values of a field, in order
    #[must_use]
    pub fn get_raw(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|index| self.fields[index].1.as_slice())
    }

    /// First value of a field
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_raw(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Whether the field is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove a field, returning its values
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name)
            .map(|index| self.fields.remove(index).1)
    }

    /// Whether any value of the field, split on commas, equals `token` (case-insensitive)
    #[must_use]
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get_raw(name).is_some_and(|values| {
            values
                .iter()
                .flat_map(|value| value.split(','))
                .any(|part| part.trim().eq_ignore_ascii_case(token))
        })
    }

    /// Iterate over `(name, values)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

impl<N, V> FromIterator<(N, V)> for HeaderCollection
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

use std::sync::Arc;

/// Anything that can answer "what is the value of column X" for one record.
pub trait ValueSource {
    fn value(&self, column: &str) -> Option<&str>;

    /// `true` if the column is present with a non-empty value
    fn has_value(&self, column: &str) -> bool {
        self.value(column).is_some_and(|v| !v.is_empty())
    }
}

/// One input record: ordered column names with their raw values
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    line: usize,
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    pub fn new(line: usize, headers: Arc<[String]>, mut values: Vec<String>) -> Self {
        // short records read as empty trailing cells
        values.resize(headers.len(), String::new());
        Self {
            line,
            headers,
            values,
        }
    }

    pub fn from_pairs<K, V>(line: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (headers, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(line, headers.into(), values)
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }
}

impl ValueSource for Row {
    fn value(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }
}

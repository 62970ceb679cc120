use indexmap::IndexMap;

/// A value as the host runtime hands it to us (or expects it back)
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    /// empty array, or a value the caller did not supply
    #[default]
    Empty,
    /// double precision numeric array
    Numeric(Vec<f64>),
    Text(String),
    /// structure with named fields, kept in insertion order
    Record(IndexMap<String, HostValue>),
}

impl HostValue {
    pub fn scalar(value: f64) -> Self {
        Self::Numeric(vec![value])
    }

    pub fn record() -> Self {
        Self::Record(IndexMap::new())
    }

    /// Numeric contents, None for any other kind of value
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric(values) => Some(values),
            _ => None,
        }
    }

    /// First element of a numeric array, the way the host hands out scalars
    pub fn first_scalar(&self) -> Option<f64> {
        self.as_numeric().and_then(|values| values.first().copied())
    }

    pub fn as_record(&self) -> Option<&IndexMap<String, HostValue>> {
        match self {
            Self::Record(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&HostValue> {
        self.as_record().and_then(|fields| fields.get(name))
    }

    /// Insert or replace a field. Does nothing if self is not a record.
    pub fn set_field(&mut self, name: &str, value: HostValue) {
        if let Self::Record(fields) = self {
            fields.insert(name.to_string(), value);
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
            Self::Record(_) => "record",
        }
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl From<Vec<f64>> for HostValue {
    fn from(values: Vec<f64>) -> Self {
        Self::Numeric(values)
    }
}

impl From<&[i32]> for HostValue {
    fn from(values: &[i32]) -> Self {
        Self::Numeric(values.iter().map(|&v| v as f64).collect())
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Truncate a host double toward zero, saturating at the i32 range
pub fn truncate_to_int(value: f64) -> i32 {
    value as i32
}

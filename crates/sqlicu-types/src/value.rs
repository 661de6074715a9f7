/// A SQL function argument or result, independent of the engine's value
/// representation.
#[derive(Clone, Debug, PartialEq)]
pub enum SqliteValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqliteValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text form as produced by `CAST(x AS TEXT)`.
    ///
    /// Whole floats keep a `.0` suffix (`1.0`, not `1`). Blob bytes are
    /// reinterpreted as UTF-8, lossily.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => float_text(*f),
            Self::Text(s) => s.clone(),
            Self::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

impl From<&str> for SqliteValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

fn float_text(f: f64) -> String {
    if f.is_infinite() {
        return if f > 0.0 { "Inf" } else { "-Inf" }.to_owned();
    }
    if f == f.trunc() && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_properties() {
        let v = SqliteValue::Null;
        assert!(v.is_null());
        assert_eq!(v.to_text(), "");
        assert_eq!(v.as_integer(), None);
    }

    #[test]
    fn text_coercion() {
        assert_eq!(SqliteValue::Integer(42).to_text(), "42");
        assert_eq!(SqliteValue::Float(1.5).to_text(), "1.5");
        assert_eq!(SqliteValue::Blob(b"abc".to_vec()).to_text(), "abc");
        assert_eq!(SqliteValue::from("hi").as_text(), Some("hi"));
        assert_eq!(SqliteValue::Integer(1).as_text(), None);
    }

    #[test]
    fn whole_floats_keep_decimal_point() {
        assert_eq!(SqliteValue::Float(1.0).to_text(), "1.0");
        assert_eq!(SqliteValue::Float(-3.0).to_text(), "-3.0");
        assert_eq!(SqliteValue::Float(0.0).to_text(), "0.0");
        assert_eq!(SqliteValue::Float(0.25).to_text(), "0.25");
        assert_eq!(SqliteValue::Float(f64::INFINITY).to_text(), "Inf");
    }
}

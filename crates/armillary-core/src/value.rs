//! Attribute values carried by document elements.

use std::fmt;

/// A scalar attribute value.
///
/// Elements store attributes as a name-to-value map; the engine does not
/// interpret values beyond equality and display.
///
/// # Examples
///
/// ```
/// use armillary_core::value::Value;
///
/// let nullable: Value = false.into();
/// let max_len: Value = 40.into();
/// let type_name: Value = "String".into();
///
/// assert_eq!(nullable.type_name(), "bool");
/// assert_eq!(max_len.to_string(), "40");
/// assert_eq!(type_name, Value::Str("String".to_owned()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Free text, e.g. a documentation string or a primitive type name.
    Str(String),
    /// A flag, e.g. nullability.
    Bool(bool),
    /// An integer, e.g. a maximum length.
    Int(i64),
    /// A floating-point number, e.g. a default for a numeric property.
    Float(f64),
}

impl Value {
    /// Returns the name of the value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
        }
    }

    /// Returns the contained text if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the contained flag if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the contained integer if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(text) => write!(f, "{text}"),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Str(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Str(text)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from("text"), Value::Str("text".to_owned()));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(7), Value::Int(7));
        assert_eq!(Value::from(2.5), Value::Float(2.5));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(9).as_int(), Some(9));
        assert_eq!(Value::from(9).as_str(), None);
        assert_eq!(Value::from("abc").as_bool(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("String").to_string(), "String");
        assert_eq!(Value::from(false).to_string(), "false");
        assert_eq!(Value::from(40).to_string(), "40");
    }
}

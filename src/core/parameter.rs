//! Bound query parameters
//!
//! A parameter's storage kind is fixed where the value is created. Conversions
//! mirror the classic binding table: integers bind as integers, booleans as
//! booleans, `None` as null, and everything else (floats and dates included)
//! as text so the server performs the final cast.

use chrono::{NaiveDate, NaiveDateTime};

/// Date format used when binding a [`NaiveDate`]
pub const SQL_FORMAT_DATE: &str = "%Y-%m-%d";

/// Date-time format used when binding a [`NaiveDateTime`]
pub const SQL_FORMAT_DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";

/// A value bound to a positional placeholder
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Bound as text
    Text(String),
    /// Bound as a 64-bit integer
    Integer(i64),
    /// Bound as a boolean
    Boolean(bool),
    /// Bound as SQL NULL
    Null,
}

impl Parameter {
    /// Name of the storage kind, for logs and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Parameter::Text(_) => "text",
            Parameter::Integer(_) => "integer",
            Parameter::Boolean(_) => "boolean",
            Parameter::Null => "null",
        }
    }

    /// Whether this is the SQL NULL parameter
    pub fn is_null(&self) -> bool {
        matches!(self, Parameter::Null)
    }

    /// Text payload, if bound as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Parameter::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Parameter {
    fn from(v: &str) -> Self {
        Parameter::Text(v.to_string())
    }
}

impl From<String> for Parameter {
    fn from(v: String) -> Self {
        Parameter::Text(v)
    }
}

impl From<&String> for Parameter {
    fn from(v: &String) -> Self {
        Parameter::Text(v.clone())
    }
}

macro_rules! integer_parameter {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Parameter {
                fn from(v: $ty) -> Self {
                    Parameter::Integer(i64::from(v))
                }
            }
        )*
    };
}

integer_parameter!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Parameter {
    fn from(v: bool) -> Self {
        Parameter::Boolean(v)
    }
}

impl From<f32> for Parameter {
    fn from(v: f32) -> Self {
        Parameter::Text(v.to_string())
    }
}

impl From<f64> for Parameter {
    fn from(v: f64) -> Self {
        Parameter::Text(v.to_string())
    }
}

impl From<NaiveDate> for Parameter {
    fn from(v: NaiveDate) -> Self {
        Parameter::Text(v.format(SQL_FORMAT_DATE).to_string())
    }
}

impl From<NaiveDateTime> for Parameter {
    fn from(v: NaiveDateTime) -> Self {
        Parameter::Text(v.format(SQL_FORMAT_DATE_TIME).to_string())
    }
}

impl<T: Into<Parameter>> From<Option<T>> for Parameter {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Parameter::Null,
        }
    }
}

/// Positional placeholder syntax of a dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (SQLite, MySQL)
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
}

impl PlaceholderStyle {
    /// Placeholder for the parameter at 1-based `position`
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            PlaceholderStyle::QuestionMark => "?".to_string(),
            PlaceholderStyle::Numbered => format!("${}", position),
        }
    }
}

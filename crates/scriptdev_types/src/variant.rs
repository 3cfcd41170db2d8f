//! Variant - tagged union passed across the host/runtime boundary
//!
//! Every host integer width collapses into one signed or one unsigned 64-bit
//! representation at construction time. Accessors coerce between scalar tags
//! and between vector tags, but never between a scalar and a vector.

use serde::{Deserialize, Serialize};

use crate::ConvertError;

// ─────────────────────────────────────────────────────────────────────────────
// Variant Type Tag
// ─────────────────────────────────────────────────────────────────────────────

/// Tag identifying which member of a [`Variant`] is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantType {
    None,
    Bool,
    Long,
    Unsigned,
    Double,
    String,
    VectorLong,
    VectorUnsigned,
    VectorDouble,
    VectorString,
}

impl VariantType {
    /// Check if the tag is one of the vector tags
    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            VariantType::VectorLong
                | VariantType::VectorUnsigned
                | VariantType::VectorDouble
                | VariantType::VectorString
        )
    }
}

impl std::fmt::Display for VariantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariantType::None => write!(f, "none"),
            VariantType::Bool => write!(f, "bool"),
            VariantType::Long => write!(f, "long"),
            VariantType::Unsigned => write!(f, "unsigned"),
            VariantType::Double => write!(f, "double"),
            VariantType::String => write!(f, "string"),
            VariantType::VectorLong => write!(f, "vector<long>"),
            VariantType::VectorUnsigned => write!(f, "vector<unsigned>"),
            VariantType::VectorDouble => write!(f, "vector<double>"),
            VariantType::VectorString => write!(f, "vector<string>"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Variant
// ─────────────────────────────────────────────────────────────────────────────

/// Closed tagged union over the scalar and vector types the host understands
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Variant {
    /// No value
    #[default]
    None,
    Bool(bool),
    Long(i64),
    Unsigned(u64),
    Double(f64),
    String(String),
    VectorLong(Vec<i64>),
    VectorUnsigned(Vec<u64>),
    VectorDouble(Vec<f64>),
    VectorString(Vec<String>),
}

impl Variant {
    /// Get the tag of the stored value
    pub fn kind(&self) -> VariantType {
        match self {
            Variant::None => VariantType::None,
            Variant::Bool(_) => VariantType::Bool,
            Variant::Long(_) => VariantType::Long,
            Variant::Unsigned(_) => VariantType::Unsigned,
            Variant::Double(_) => VariantType::Double,
            Variant::String(_) => VariantType::String,
            Variant::VectorLong(_) => VariantType::VectorLong,
            Variant::VectorUnsigned(_) => VariantType::VectorUnsigned,
            Variant::VectorDouble(_) => VariantType::VectorDouble,
            Variant::VectorString(_) => VariantType::VectorString,
        }
    }

    /// Check if no value is stored
    pub fn is_none(&self) -> bool {
        matches!(self, Variant::None)
    }

    /// Check if a vector is stored
    pub fn is_vector(&self) -> bool {
        self.kind().is_vector()
    }

    fn mismatch(&self, to: &'static str) -> ConvertError {
        ConvertError::Mismatch {
            from: self.kind(),
            to,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scalar accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get as boolean. Strings are not coerced.
    pub fn get_bool(&self) -> Result<bool, ConvertError> {
        match self {
            Variant::Bool(b) => Ok(*b),
            Variant::Long(l) => Ok(*l != 0),
            Variant::Unsigned(u) => Ok(*u != 0),
            Variant::Double(d) => Ok(*d != 0.0),
            _ => Err(self.mismatch("bool")),
        }
    }

    /// Get as signed 64-bit integer
    pub fn get_long(&self) -> Result<i64, ConvertError> {
        match self {
            Variant::Bool(b) => Ok(i64::from(*b)),
            Variant::Long(l) => Ok(*l),
            Variant::Unsigned(u) => unsigned_to_long(*u),
            Variant::Double(d) => double_to_long(*d),
            Variant::String(s) => parse_long(s),
            _ => Err(self.mismatch("long")),
        }
    }

    /// Get as unsigned 64-bit integer
    pub fn get_unsigned(&self) -> Result<u64, ConvertError> {
        match self {
            Variant::Bool(b) => Ok(u64::from(*b)),
            Variant::Long(l) => long_to_unsigned(*l),
            Variant::Unsigned(u) => Ok(*u),
            Variant::Double(d) => double_to_unsigned(*d),
            Variant::String(s) => parse_unsigned(s),
            _ => Err(self.mismatch("unsigned")),
        }
    }

    /// Get as double
    pub fn get_double(&self) -> Result<f64, ConvertError> {
        match self {
            Variant::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Variant::Long(l) => Ok(*l as f64),
            Variant::Unsigned(u) => Ok(*u as f64),
            Variant::Double(d) => Ok(*d),
            Variant::String(s) => parse_double(s),
            _ => Err(self.mismatch("double")),
        }
    }

    /// Get as string
    pub fn get_string(&self) -> Result<String, ConvertError> {
        match self {
            Variant::Bool(b) => Ok(format_bool(*b).to_string()),
            Variant::Long(l) => Ok(l.to_string()),
            Variant::Unsigned(u) => Ok(u.to_string()),
            Variant::Double(d) => Ok(format_double(*d)),
            Variant::String(s) => Ok(s.clone()),
            _ => Err(self.mismatch("string")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Vector accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get as vector of signed integers
    pub fn get_long_array(&self) -> Result<Vec<i64>, ConvertError> {
        match self {
            Variant::VectorLong(v) => Ok(v.clone()),
            Variant::VectorUnsigned(v) => v.iter().map(|&u| unsigned_to_long(u)).collect(),
            Variant::VectorDouble(v) => v.iter().map(|&d| double_to_long(d)).collect(),
            Variant::VectorString(v) => v.iter().map(|s| parse_long(s)).collect(),
            _ => Err(self.mismatch("vector<long>")),
        }
    }

    /// Get as vector of unsigned integers
    pub fn get_unsigned_array(&self) -> Result<Vec<u64>, ConvertError> {
        match self {
            Variant::VectorLong(v) => v.iter().map(|&l| long_to_unsigned(l)).collect(),
            Variant::VectorUnsigned(v) => Ok(v.clone()),
            Variant::VectorDouble(v) => v.iter().map(|&d| double_to_unsigned(d)).collect(),
            Variant::VectorString(v) => v.iter().map(|s| parse_unsigned(s)).collect(),
            _ => Err(self.mismatch("vector<unsigned>")),
        }
    }

    /// Get as vector of doubles
    pub fn get_double_array(&self) -> Result<Vec<f64>, ConvertError> {
        match self {
            Variant::VectorLong(v) => Ok(v.iter().map(|&l| l as f64).collect()),
            Variant::VectorUnsigned(v) => Ok(v.iter().map(|&u| u as f64).collect()),
            Variant::VectorDouble(v) => Ok(v.clone()),
            Variant::VectorString(v) => v.iter().map(|s| parse_double(s)).collect(),
            _ => Err(self.mismatch("vector<double>")),
        }
    }

    /// Get as vector of strings
    pub fn get_string_array(&self) -> Result<Vec<String>, ConvertError> {
        match self {
            Variant::VectorLong(v) => Ok(v.iter().map(|l| l.to_string()).collect()),
            Variant::VectorUnsigned(v) => Ok(v.iter().map(|u| u.to_string()).collect()),
            Variant::VectorDouble(v) => Ok(v.iter().map(|&d| format_double(d)).collect()),
            Variant::VectorString(v) => Ok(v.clone()),
            _ => Err(self.mismatch("vector<string>")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Coercion helpers
// ─────────────────────────────────────────────────────────────────────────────

fn format_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

/// Doubles always keep a decimal point or exponent so they read back as doubles
fn format_double(d: f64) -> String {
    format!("{:?}", d)
}

fn out_of_range(value: impl ToString, to: &'static str) -> ConvertError {
    ConvertError::OutOfRange {
        value: value.to_string(),
        to,
    }
}

fn unsigned_to_long(u: u64) -> Result<i64, ConvertError> {
    i64::try_from(u).map_err(|_| out_of_range(u, "long"))
}

fn long_to_unsigned(l: i64) -> Result<u64, ConvertError> {
    u64::try_from(l).map_err(|_| out_of_range(l, "unsigned"))
}

fn double_to_long(d: f64) -> Result<i64, ConvertError> {
    let t = d.trunc();
    // 2^63 is exactly representable; anything at or above it overflows
    if !t.is_finite() || t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return Err(out_of_range(d, "long"));
    }
    Ok(t as i64)
}

fn double_to_unsigned(d: f64) -> Result<u64, ConvertError> {
    let t = d.trunc();
    if !t.is_finite() || t < 0.0 || t >= u64::MAX as f64 {
        return Err(out_of_range(d, "unsigned"));
    }
    Ok(t as u64)
}

fn parse_error(text: &str, to: &'static str) -> ConvertError {
    ConvertError::Parse {
        text: text.to_string(),
        to,
    }
}

/// Integer text parses exactly; decimal text is truncated (`"5.2"` -> 5)
fn parse_long(text: &str) -> Result<i64, ConvertError> {
    let trimmed = text.trim();
    if let Ok(l) = trimmed.parse::<i64>() {
        return Ok(l);
    }
    match trimmed.parse::<f64>() {
        Ok(d) => double_to_long(d),
        Err(_) => Err(parse_error(text, "long")),
    }
}

fn parse_unsigned(text: &str) -> Result<u64, ConvertError> {
    let trimmed = text.trim();
    if let Ok(u) = trimmed.parse::<u64>() {
        return Ok(u);
    }
    if let Ok(l) = trimmed.parse::<i64>() {
        return long_to_unsigned(l);
    }
    match trimmed.parse::<f64>() {
        Ok(d) => double_to_unsigned(d),
        Err(_) => Err(parse_error(text, "unsigned")),
    }
}

fn parse_double(text: &str) -> Result<f64, ConvertError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| parse_error(text, "double"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Display
// ─────────────────────────────────────────────────────────────────────────────

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn list<T>(
            f: &mut std::fmt::Formatter<'_>,
            items: &[T],
            item: impl Fn(&T) -> String,
        ) -> std::fmt::Result {
            let parts: Vec<String> = items.iter().map(item).collect();
            write!(f, "[{}]", parts.join(", "))
        }

        match self {
            Variant::None => write!(f, "None"),
            Variant::Bool(b) => write!(f, "{}", format_bool(*b)),
            Variant::Long(l) => write!(f, "{}", l),
            Variant::Unsigned(u) => write!(f, "{}", u),
            Variant::Double(d) => write!(f, "{}", format_double(*d)),
            Variant::String(s) => write!(f, "{}", s),
            Variant::VectorLong(v) => list(f, v, |l| l.to_string()),
            Variant::VectorUnsigned(v) => list(f, v, |u| u.to_string()),
            Variant::VectorDouble(v) => list(f, v, |d| format_double(*d)),
            Variant::VectorString(v) => list(f, v, |s| format!("{:?}", s)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// From Implementations
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! impl_from_scalar {
    ($member:ident, $repr:ty: $($host:ty),+) => {
        $(
            impl From<$host> for Variant {
                fn from(v: $host) -> Self {
                    Variant::$member(v as $repr)
                }
            }
        )+
    };
}

macro_rules! impl_from_vector {
    ($member:ident, $repr:ty: $($host:ty),+) => {
        $(
            impl From<Vec<$host>> for Variant {
                fn from(v: Vec<$host>) -> Self {
                    Variant::$member(v.into_iter().map(|x| x as $repr).collect())
                }
            }

            impl From<&[$host]> for Variant {
                fn from(v: &[$host]) -> Self {
                    Variant::$member(v.iter().map(|&x| x as $repr).collect())
                }
            }
        )+
    };
}

impl_from_scalar!(Long, i64: i8, i16, i32, i64, isize);
impl_from_scalar!(Unsigned, u64: u8, u16, u32, u64, usize);
impl_from_scalar!(Double, f64: f32, f64);

impl_from_vector!(VectorLong, i64: i8, i16, i32, i64, isize);
impl_from_vector!(VectorUnsigned, u64: u8, u16, u32, u64, usize);
impl_from_vector!(VectorDouble, f64: f32, f64);

impl From<()> for Variant {
    fn from(_: ()) -> Self {
        Variant::None
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::String(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(v.to_string())
    }
}

impl From<Vec<String>> for Variant {
    fn from(v: Vec<String>) -> Self {
        Variant::VectorString(v)
    }
}

impl From<Vec<&str>> for Variant {
    fn from(v: Vec<&str>) -> Self {
        Variant::VectorString(v.into_iter().map(str::to_string).collect())
    }
}

impl From<&[String]> for Variant {
    fn from(v: &[String]) -> Self {
        Variant::VectorString(v.to_vec())
    }
}

impl<T: Into<Variant>> From<Option<T>> for Variant {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Variant::None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors() -> Vec<Variant> {
        vec![
            Variant::from(vec![1i64, 2, 3]),
            Variant::from(vec![1u64, 2, 3]),
            Variant::from(vec![1.0f64, 2.0, 3.0]),
            Variant::from(vec!["1", "2", "3"]),
        ]
    }

    #[test]
    fn test_scalar_roundtrip() {
        assert_eq!(Variant::from(true).get_bool(), Ok(true));
        assert_eq!(Variant::from(false).get_bool(), Ok(false));
        assert_eq!(Variant::from(-42i64).get_long(), Ok(-42));
        assert_eq!(Variant::from(u64::MAX).get_unsigned(), Ok(u64::MAX));
        assert_eq!(Variant::from(2.5f64).get_double(), Ok(2.5));
        assert_eq!(Variant::from("hello").get_string(), Ok("hello".to_string()));
    }

    #[test]
    fn test_host_widths_collapse() {
        assert_eq!(Variant::from(-3i8).kind(), VariantType::Long);
        assert_eq!(Variant::from(7i32).kind(), VariantType::Long);
        assert_eq!(Variant::from(7u16).kind(), VariantType::Unsigned);
        assert_eq!(Variant::from(7usize).kind(), VariantType::Unsigned);
        assert_eq!(Variant::from(1.5f32), Variant::Double(1.5));

        let raw: &[u8] = &[1, 2, 255];
        assert_eq!(Variant::from(raw), Variant::VectorUnsigned(vec![1, 2, 255]));
        let raw: &[i16] = &[-1, 2];
        assert_eq!(Variant::from(raw), Variant::VectorLong(vec![-1, 2]));
    }

    #[test]
    fn test_bool_coercions() {
        let v = Variant::from(true);
        assert_eq!(v.get_long(), Ok(1));
        assert_eq!(v.get_unsigned(), Ok(1));
        assert_eq!(v.get_double(), Ok(1.0));
        assert_eq!(v.get_string(), Ok("True".to_string()));
        assert_eq!(Variant::from(false).get_string(), Ok("False".to_string()));
    }

    #[test]
    fn test_numeric_coercions() {
        let v = Variant::from(17i64);
        assert_eq!(v.get_bool(), Ok(true));
        assert_eq!(v.get_unsigned(), Ok(17));
        assert_eq!(v.get_double(), Ok(17.0));
        assert_eq!(v.get_string(), Ok("17".to_string()));

        let v = Variant::from(13.1f64);
        assert_eq!(v.get_bool(), Ok(true));
        assert_eq!(v.get_long(), Ok(13));
        assert_eq!(v.get_unsigned(), Ok(13));
        assert!(v.get_string().unwrap().starts_with("13.1"));

        assert_eq!(Variant::from(-7.9f64).get_long(), Ok(-7));
        assert_eq!(Variant::from(0.0f64).get_bool(), Ok(false));
        assert_eq!(Variant::from(0u64).get_bool(), Ok(false));
    }

    #[test]
    fn test_string_coercions() {
        let v = Variant::from("5.2");
        assert_eq!(v.get_long(), Ok(5));
        assert_eq!(v.get_unsigned(), Ok(5));
        assert_eq!(v.get_double(), Ok(5.2));
        assert!(matches!(v.get_bool(), Err(ConvertError::Mismatch { .. })));

        assert_eq!(Variant::from(" 42 ").get_long(), Ok(42));
        assert!(matches!(
            Variant::from("abc").get_long(),
            Err(ConvertError::Parse { .. })
        ));
        assert!(matches!(
            Variant::from("abc").get_double(),
            Err(ConvertError::Parse { .. })
        ));
    }

    #[test]
    fn test_narrowing_is_checked() {
        assert!(matches!(
            Variant::from(u64::MAX).get_long(),
            Err(ConvertError::OutOfRange { .. })
        ));
        assert!(matches!(
            Variant::from(-1i64).get_unsigned(),
            Err(ConvertError::OutOfRange { .. })
        ));
        assert!(matches!(
            Variant::from(f64::NAN).get_long(),
            Err(ConvertError::OutOfRange { .. })
        ));
        assert!(matches!(
            Variant::from(1e300f64).get_long(),
            Err(ConvertError::OutOfRange { .. })
        ));
        assert!(matches!(
            Variant::from("-3").get_unsigned(),
            Err(ConvertError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_none_fails_every_accessor() {
        let v = Variant::None;
        assert!(v.get_bool().is_err());
        assert!(v.get_long().is_err());
        assert!(v.get_unsigned().is_err());
        assert!(v.get_double().is_err());
        assert!(v.get_string().is_err());
        assert!(v.get_long_array().is_err());
        assert!(v.get_unsigned_array().is_err());
        assert!(v.get_double_array().is_err());
        assert!(v.get_string_array().is_err());
    }

    #[test]
    fn test_scalar_accessor_on_vector_fails() {
        for v in vectors() {
            assert!(v.is_vector());
            assert!(v.get_bool().is_err(), "get_bool on {}", v.kind());
            assert!(v.get_long().is_err(), "get_long on {}", v.kind());
            assert!(v.get_unsigned().is_err(), "get_unsigned on {}", v.kind());
            assert!(v.get_double().is_err(), "get_double on {}", v.kind());
            assert!(v.get_string().is_err(), "get_string on {}", v.kind());
        }
    }

    #[test]
    fn test_vector_accessor_on_scalar_fails() {
        for v in [
            Variant::from(true),
            Variant::from(17i64),
            Variant::from(17u64),
            Variant::from(17.0f64),
            Variant::from("17"),
        ] {
            assert!(v.get_long_array().is_err());
            assert!(v.get_unsigned_array().is_err());
            assert!(v.get_double_array().is_err());
            assert!(v.get_string_array().is_err());
        }
    }

    #[test]
    fn test_vector_cross_conversion() {
        for v in vectors() {
            assert_eq!(v.get_long_array(), Ok(vec![1, 2, 3]));
            assert_eq!(v.get_unsigned_array(), Ok(vec![1, 2, 3]));
            assert_eq!(v.get_double_array(), Ok(vec![1.0, 2.0, 3.0]));
        }

        let v = Variant::from(vec![1.5f64, -2.5]);
        assert_eq!(v.get_long_array(), Ok(vec![1, -2]));
        assert!(v.get_unsigned_array().is_err());
        assert_eq!(
            v.get_string_array(),
            Ok(vec!["1.5".to_string(), "-2.5".to_string()])
        );

        let v = Variant::from(vec![1i64, 2, 3]);
        assert_eq!(
            v.get_string_array(),
            Ok(vec!["1".to_string(), "2".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Variant::None.to_string(), "None");
        assert_eq!(Variant::from(true).to_string(), "True");
        assert_eq!(Variant::from(17.0f64).to_string(), "17.0");
        assert_eq!(Variant::from(vec![1i64, 2]).to_string(), "[1, 2]");
        assert_eq!(Variant::from(vec!["a"]).to_string(), "[\"a\"]");
    }

    #[test]
    fn test_json_representation() {
        let json = serde_json::to_value(Variant::from(vec![1i64, 2])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "vector_long", "value": [1, 2] })
        );

        let back: Variant = serde_json::from_value(json).unwrap();
        assert_eq!(back, Variant::VectorLong(vec![1, 2]));

        let none = serde_json::to_value(Variant::None).unwrap();
        assert_eq!(none, serde_json::json!({ "kind": "none" }));
    }
}

//! Marshaling between [`Variant`] and runtime values.

use rhai::{Array, Dynamic};
use scriptdev_types::Variant;

/// Which vector member the first element of an array selects
#[derive(Clone, Copy)]
enum ArrayKind {
    Long,
    Double,
    String,
}

/// Convert a runtime value into a [`Variant`].
///
/// Scalars are tried in order string, bool, integer, float. Arrays become a
/// vector whose member is chosen by the first element; elements that do not
/// fit that member fail the whole conversion. Any other value (unit, maps,
/// functions, custom types) has no representation and yields `None`.
pub fn from_dynamic(value: Dynamic) -> Option<Variant> {
    let value = value.flatten();

    if value.is_string() {
        return value.into_string().ok().map(Variant::String);
    }
    if value.is_char() {
        return value.as_char().ok().map(|c| Variant::String(c.to_string()));
    }
    if let Ok(b) = value.as_bool() {
        return Some(Variant::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Some(Variant::Long(i));
    }
    if let Ok(f) = value.as_float() {
        return Some(Variant::Double(f));
    }
    if value.is_array() {
        return value.into_array().ok().and_then(from_array);
    }

    None
}

fn from_array(items: Array) -> Option<Variant> {
    let Some(first) = items.first() else {
        return Some(Variant::VectorLong(Vec::new()));
    };

    let kind = {
        let first = first.flatten_clone();
        if first.is_int() || first.is_bool() {
            ArrayKind::Long
        } else if first.is_float() {
            ArrayKind::Double
        } else if first.is_string() || first.is_char() {
            ArrayKind::String
        } else {
            tracing::debug!(
                "[convert] Array element type {} has no vector representation",
                first.type_name()
            );
            return None;
        }
    };

    match kind {
        ArrayKind::Long => items
            .into_iter()
            .map(|item| match from_dynamic(item)? {
                Variant::Long(l) => Some(l),
                Variant::Bool(b) => Some(i64::from(b)),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Variant::VectorLong),
        ArrayKind::Double => items
            .into_iter()
            .map(|item| match from_dynamic(item)? {
                Variant::Double(d) => Some(d),
                Variant::Long(l) => Some(l as f64),
                Variant::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Variant::VectorDouble),
        ArrayKind::String => items
            .into_iter()
            .map(|item| match from_dynamic(item)? {
                Variant::String(s) => Some(s),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Variant::VectorString),
    }
}

/// Convert a [`Variant`] into a runtime value.
///
/// Unsigned values that do not fit the runtime's signed integer are passed as
/// floats. The absent value maps to unit.
pub fn to_dynamic(value: &Variant) -> Dynamic {
    match value {
        Variant::None => Dynamic::UNIT,
        Variant::Bool(b) => Dynamic::from_bool(*b),
        Variant::Long(l) => Dynamic::from_int(*l),
        Variant::Unsigned(u) => unsigned_to_dynamic(*u),
        Variant::Double(d) => Dynamic::from_float(*d),
        Variant::String(s) => Dynamic::from(s.clone()),
        Variant::VectorLong(v) => {
            Dynamic::from_array(v.iter().map(|&l| Dynamic::from_int(l)).collect())
        }
        Variant::VectorUnsigned(v) => {
            Dynamic::from_array(v.iter().map(|&u| unsigned_to_dynamic(u)).collect())
        }
        Variant::VectorDouble(v) => {
            Dynamic::from_array(v.iter().map(|&d| Dynamic::from_float(d)).collect())
        }
        Variant::VectorString(v) => {
            Dynamic::from_array(v.iter().map(|s| Dynamic::from(s.clone())).collect())
        }
    }
}

fn unsigned_to_dynamic(u: u64) -> Dynamic {
    match i64::try_from(u) {
        Ok(l) => Dynamic::from_int(l),
        Err(_) => Dynamic::from_float(u as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_from_runtime() {
        assert_eq!(from_dynamic(Dynamic::from_int(17)), Some(Variant::Long(17)));
        assert_eq!(from_dynamic(Dynamic::from_float(2.5)), Some(Variant::Double(2.5)));
        assert_eq!(from_dynamic(Dynamic::from_bool(true)), Some(Variant::Bool(true)));
        assert_eq!(
            from_dynamic(Dynamic::from("abc".to_string())),
            Some(Variant::String("abc".to_string()))
        );
        assert_eq!(
            from_dynamic(Dynamic::from_char('x')),
            Some(Variant::String("x".to_string()))
        );
        assert_eq!(from_dynamic(Dynamic::UNIT), None);
    }

    #[test]
    fn test_first_element_picks_vector_kind() {
        let ints: Array = vec![Dynamic::from_int(1), Dynamic::from_bool(true)];
        assert_eq!(
            from_dynamic(Dynamic::from_array(ints)),
            Some(Variant::VectorLong(vec![1, 1]))
        );

        let floats: Array = vec![Dynamic::from_float(1.5), Dynamic::from_int(2)];
        assert_eq!(
            from_dynamic(Dynamic::from_array(floats)),
            Some(Variant::VectorDouble(vec![1.5, 2.0]))
        );

        let strings: Array = vec![Dynamic::from("a".to_string()), Dynamic::from_char('b')];
        assert_eq!(
            from_dynamic(Dynamic::from_array(strings)),
            Some(Variant::VectorString(vec!["a".to_string(), "b".to_string()]))
        );
    }

    #[test]
    fn test_mixed_array_fails() {
        let mixed: Array = vec![Dynamic::from_int(1), Dynamic::from_float(2.5)];
        assert_eq!(from_dynamic(Dynamic::from_array(mixed)), None);

        let mixed: Array = vec![Dynamic::from("a".to_string()), Dynamic::from_int(1)];
        assert_eq!(from_dynamic(Dynamic::from_array(mixed)), None);

        let nested: Array = vec![Dynamic::from_array(vec![Dynamic::from_int(1)])];
        assert_eq!(from_dynamic(Dynamic::from_array(nested)), None);
    }

    #[test]
    fn test_empty_array_is_empty_long_vector() {
        assert_eq!(
            from_dynamic(Dynamic::from_array(Array::new())),
            Some(Variant::VectorLong(Vec::new()))
        );
    }

    #[test]
    fn test_variant_to_runtime() {
        assert!(to_dynamic(&Variant::None).is_unit());
        assert_eq!(to_dynamic(&Variant::Long(-4)).as_int(), Ok(-4));
        assert_eq!(to_dynamic(&Variant::Unsigned(9)).as_int(), Ok(9));
        assert_eq!(
            to_dynamic(&Variant::Unsigned(u64::MAX)).as_float(),
            Ok(u64::MAX as f64)
        );

        let back = from_dynamic(to_dynamic(&Variant::from(vec![1.0f64, 2.0])));
        assert_eq!(back, Some(Variant::VectorDouble(vec![1.0, 2.0])));
        let back = from_dynamic(to_dynamic(&Variant::from(vec!["x", "y"])));
        assert_eq!(back, Some(Variant::from(vec!["x", "y"])));
    }
}

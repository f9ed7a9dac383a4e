//! Type coercion and primitive operator semantics.
//!
//! Everything here is pure. Objects are handled without running script
//! code: wrapper objects use their internal value, arrays join their
//! elements and other objects fall back to `NaN` / `"[object Object]"`.
//! The interpreter runs user-defined `valueOf`/`toString` first (see
//! `Interpreter::to_primitive`) and only then calls into this module.

use crate::builtin::date;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::Value;

/// `typeof` result.
pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Null => "object",
        Value::Boolean(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Object(obj) if obj.is_callable() => "function",
        Value::Object(_) => "object",
    }
}

pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Object(_) => true,
    }
}

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Number(n) | ObjectKind::Date(n) => *n,
            ObjectKind::Boolean(b) => to_number(&Value::Boolean(*b)),
            ObjectKind::String(s) => string_to_number(s),
            ObjectKind::Array(_) => string_to_number(&to_string(value)),
            _ => f64::NAN,
        },
    }
}

pub fn to_string(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::String(s) => s.clone(),
        Value::Object(obj) => object_to_string(obj, &mut Vec::new()),
    }
}

fn object_to_string(obj: &ObjectRef, visiting: &mut Vec<ObjectRef>) -> String {
    if matches!(obj.borrow().kind, ObjectKind::Error) {
        return error_to_string(obj);
    }

    let elements = match &obj.borrow().kind {
        ObjectKind::Number(n) => return number_to_string(*n),
        ObjectKind::Boolean(b) => return b.to_string(),
        ObjectKind::String(s) => return s.clone(),
        ObjectKind::Date(t) => return date::to_date_string(*t),
        ObjectKind::Function(callable) => {
            return match callable {
                crate::function::Callable::Script(f) => f.source_text().to_string(),
                other => format!("function {}() {{ [native code] }}", other.name()),
            }
        }
        ObjectKind::Ordinary | ObjectKind::Error => return "[object Object]".to_string(),
        ObjectKind::Array(elements) => elements.clone(),
    };

    // A self-containing array prints its inner occurrence as empty.
    if visiting.iter().any(|seen| seen.ptr_eq(obj)) {
        return String::new();
    }
    visiting.push(obj.clone());
    let joined = elements
        .iter()
        .map(|element| match element {
            Value::Undefined | Value::Null => String::new(),
            Value::Object(inner) => object_to_string(inner, visiting),
            other => to_string(other),
        })
        .collect::<Vec<_>>()
        .join(",");
    visiting.pop();
    joined
}

/// `Name: message`, as `Error.prototype.toString` formats it.
pub fn error_to_string(obj: &ObjectRef) -> String {
    let name = match obj.get("name") {
        Value::Undefined => "Error".to_string(),
        other => to_string(&other),
    };
    let message = match obj.get("message") {
        Value::Undefined => String::new(),
        other => to_string(&other),
    };
    match (name.is_empty(), message.is_empty()) {
        (_, true) => name,
        (true, false) => message,
        (false, false) => format!("{}: {}", name, message),
    }
}

/// Shortest decimal rendering that round-trips, in script notation.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        // Rust prints `1e21` / `1.5e-7`; scripts expect an explicit `+`.
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }
    // `Display` is shortest round-trip and never switches to an exponent,
    // so large integers come out zero-padded.
    format!("{}", n)
}

/// String-to-number conversion: whitespace-trimmed decimal, `Infinity`,
/// or `0x`/`0o`/`0b` integer literals. The empty string is `0`.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &trimmed[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return f64::NAN;
        }
        return digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * radix as f64 + d as f64);
    }

    // Rust's float parser also accepts `inf` and `NaN`; scripts do not.
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Canonical array index of a property name (`"3"` yes, `"03"` no).
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|&i| i != u32::MAX).map(|i| i as usize)
}

/// Integer conversion with truncation toward zero; NaN becomes 0.
pub fn to_integer(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else {
        n.trunc()
    }
}

pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4294967296.0) as u32
}

pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// `**` and `Math.pow`. Unlike `powf`, a NaN exponent always yields NaN
/// and `(±1) ** ±Infinity` is NaN.
pub fn exponentiate(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// `===`: no conversion, NaN unequal to itself, objects by identity.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
        _ => false,
    }
}

/// `==` between primitives.
pub fn loose_equals_primitive(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Boolean(_), _)
        | (_, Value::Boolean(_)) => to_number(a) == to_number(b),
        _ => strict_equals(a, b),
    }
}

/// Relational comparison of primitives: `Some(true)` when `a < b`,
/// `None` when either side is NaN.
pub fn less_than(a: &Value, b: &Value) -> Option<bool> {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return Some(x < y);
    }
    let (x, y) = (to_number(a), to_number(b));
    if x.is_nan() || y.is_nan() {
        None
    } else {
        Some(x < y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(&Value::from("")), 0.0);
        assert_eq!(to_number(&Value::from("  42  ")), 42.0);
        assert_eq!(to_number(&Value::from("0x1F")), 31.0);
        assert_eq!(to_number(&Value::from("-1.5e2")), -150.0);
        assert_eq!(to_number(&Value::from("-Infinity")), f64::NEG_INFINITY);
        assert!(to_number(&Value::from("abc")).is_nan());
        assert!(to_number(&Value::from("inf")).is_nan());
        assert!(to_number(&Value::from("1 2")).is_nan());
        assert!(to_number(&Value::Undefined).is_nan());
        assert_eq!(to_number(&Value::Null), 0.0);
        assert_eq!(to_number(&Value::Boolean(true)), 1.0);
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(123456789012.0), "123456789012");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_number_to_string_large_integers() {
        assert_eq!(number_to_string(2f64.powi(60)), "1152921504606847000");
        assert_eq!(number_to_string(123456789012345680000.0), "123456789012345680000");
        assert_eq!(number_to_string(9007199254740993.0), "9007199254740992");
        assert_eq!(number_to_string(-2f64.powi(64)), "-18446744073709552000");
        assert_eq!(number_to_string(1e20), "100000000000000000000");
    }

    #[test]
    fn test_to_boolean() {
        assert!(!to_boolean(&Value::from("")));
        assert!(to_boolean(&Value::from("0")));
        assert!(!to_boolean(&Value::Number(f64::NAN)));
        assert!(!to_boolean(&Value::Number(0.0)));
        assert!(!to_boolean(&Value::Null));
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_equals_primitive(&Value::Null, &Value::Undefined));
        assert!(loose_equals_primitive(&Value::from("1"), &Value::from(1)));
        assert!(loose_equals_primitive(&Value::Boolean(true), &Value::from("1")));
        assert!(!loose_equals_primitive(&Value::Null, &Value::from(0)));
        assert!(!loose_equals_primitive(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
    }

    #[test]
    fn test_int32_wraps() {
        assert_eq!(to_int32(4294967297.0), 1);
        assert_eq!(to_int32(2147483648.0), -2147483648);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_uint32(-1.0), 4294967295);
        assert_eq!(to_int32(f64::NAN), 0);
    }

    #[test]
    fn test_array_index() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("17"), Some(17));
        assert_eq!(array_index("017"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("1.5"), None);
        assert_eq!(array_index("length"), None);
    }

    #[test]
    fn test_less_than() {
        assert_eq!(less_than(&Value::from("a"), &Value::from("b")), Some(true));
        assert_eq!(less_than(&Value::from("10"), &Value::from(9)), Some(false));
        assert_eq!(less_than(&Value::Undefined, &Value::from(1)), None);
    }
}

//! `Number` constructor, `Number.prototype`, and the number parsing
//! functions shared with the global object.

use crate::coerce::{self, number_to_string};
use crate::error::{JsError, JsResult};
use crate::function::ExecutionContext;
use crate::interpreter::Interpreter;
use crate::object::ObjectKind;
use crate::value::Value;

use super::{construct_target, define_constant, define_constructor, define_method, into_wrapper, native_function};

/// Largest integer `n` such that `n` and `n + 1` are both exact doubles.
pub const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

pub fn init(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().number_prototype.clone();
    prototype.borrow_mut().kind = ObjectKind::Number(0.0);
    let constructor = define_constructor(interp, "Number", 1, number_constructor, &prototype);

    define_constant(&constructor, "MAX_VALUE", Value::Number(f64::MAX));
    define_constant(&constructor, "MIN_VALUE", Value::Number(5e-324));
    define_constant(&constructor, "EPSILON", Value::Number(f64::EPSILON));
    define_constant(&constructor, "NaN", Value::Number(f64::NAN));
    define_constant(&constructor, "POSITIVE_INFINITY", Value::Number(f64::INFINITY));
    define_constant(&constructor, "NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY));
    define_constant(&constructor, "MAX_SAFE_INTEGER", Value::Number(MAX_SAFE_INTEGER));
    define_constant(&constructor, "MIN_SAFE_INTEGER", Value::Number(-MAX_SAFE_INTEGER));

    define_method(interp, &constructor, "isNaN", 1, number_is_nan);
    define_method(interp, &constructor, "isFinite", 1, number_is_finite);
    define_method(interp, &constructor, "isInteger", 1, number_is_integer);
    define_method(interp, &constructor, "isSafeInteger", 1, number_is_safe_integer);

    // parseInt/parseFloat are the same function objects on both.
    let parse_int = Value::Object(native_function(interp, "parseInt", 2, parse_int));
    let parse_float = Value::Object(native_function(interp, "parseFloat", 1, parse_float));
    constructor.define("parseInt", parse_int.clone(), false);
    constructor.define("parseFloat", parse_float.clone(), false);
    interp.global_object().define("parseInt", parse_int, false);
    interp.global_object().define("parseFloat", parse_float, false);

    define_method(interp, &prototype, "toString", 1, number_to_string_method);
    define_method(interp, &prototype, "toFixed", 1, number_to_fixed);
    define_method(interp, &prototype, "valueOf", 0, number_value_of);
}

/// `Number(v)` converts; `new Number(v)` wraps.
fn number_constructor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let n = if ctx.arg_count() == 0 {
        0.0
    } else {
        interp.to_number(&ctx.arg(0))?
    };
    let prototype = interp.intrinsics().number_prototype.clone();
    match construct_target(ctx, &prototype) {
        Some(target) => Ok(into_wrapper(target, ObjectKind::Number(n))),
        None => Ok(Value::Number(n)),
    }
}

fn number_is_nan(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Boolean(ctx.arg(0).as_number().map_or(false, f64::is_nan)))
}

fn number_is_finite(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Boolean(ctx.arg(0).as_number().map_or(false, f64::is_finite)))
}

fn number_is_integer(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let integral = ctx
        .arg(0)
        .as_number()
        .map_or(false, |n| n.is_finite() && n.trunc() == n);
    Ok(Value::Boolean(integral))
}

fn number_is_safe_integer(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let safe = ctx
        .arg(0)
        .as_number()
        .map_or(false, |n| n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER);
    Ok(Value::Boolean(safe))
}

// Parsing

fn parse_int(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let text = interp.to_string(&ctx.arg(0))?;
    let radix = coerce::to_int32(interp.to_number(&ctx.arg(1))?);
    Ok(Value::Number(parse_int_str(&text, radix)))
}

/// Leading-prefix integer parse. `radix` 0 means "10, or 16 with `0x`".
pub fn parse_int_str(text: &str, radix: i32) -> f64 {
    let mut s = text.trim_start();
    let negative = s.starts_with('-');
    if s.starts_with('-') || s.starts_with('+') {
        s = &s[1..];
    }

    let mut radix = radix;
    if radix != 0 && !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    if (radix == 0 || radix == 16) && (s.starts_with("0x") || s.starts_with("0X")) {
        s = &s[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }

    let radix = radix as u32;
    let digits: Vec<u32> = s.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let magnitude = digits
        .iter()
        .fold(0.0, |acc, &d| acc * radix as f64 + d as f64);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

fn parse_float(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let text = interp.to_string(&ctx.arg(0))?;
    Ok(Value::Number(parse_float_str(&text)))
}

/// Longest decimal-literal prefix of `text`, or NaN if there is none.
pub fn parse_float_str(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }

    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let int_end = digits_from(end);
    let mut seen_digits = int_end > end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        seen_digits |= frac_end > end + 1;
        end = frac_end;
    }
    if !seen_digits {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

// Prototype methods

fn this_number(ctx: &ExecutionContext, method: &str) -> JsResult<f64> {
    match &ctx.this_value {
        Value::Number(n) => Ok(*n),
        Value::Object(obj) => match obj.borrow().kind {
            ObjectKind::Number(n) => Ok(n),
            _ => Err(not_a_number(method)),
        },
        _ => Err(not_a_number(method)),
    }
}

fn not_a_number(method: &str) -> JsError {
    JsError::type_error(format!(
        "Number.prototype.{} requires that 'this' be a Number",
        method
    ))
}

fn number_value_of(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Number(this_number(ctx, "valueOf")?))
}

fn number_to_string_method(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let n = this_number(ctx, "toString")?;
    let radix = super::integer_arg(interp, ctx, 0, 10.0)?;
    if !(2.0..=36.0).contains(&radix) {
        return Err(JsError::range("toString() radix must be between 2 and 36"));
    }
    Ok(Value::from(to_radix_string(n, radix as u32)))
}

/// Render `n` in base `radix`.
pub fn to_radix_string(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() {
        return number_to_string(n);
    }

    let mut integer = n.abs().trunc();
    let mut fraction = n.abs() - integer;
    let mut digits = Vec::new();
    loop {
        let digit = (integer % radix as f64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        integer = (integer / radix as f64).trunc();
        if integer == 0.0 {
            break;
        }
    }
    if n < 0.0 {
        digits.push('-');
    }
    let mut out: String = digits.into_iter().rev().collect();

    if fraction > 0.0 {
        out.push('.');
        // 52 digits exhausts the mantissa even in base 2.
        for _ in 0..52 {
            fraction *= radix as f64;
            let digit = fraction.trunc() as u32;
            out.push(std::char::from_digit(digit, radix).unwrap_or('0'));
            fraction -= digit as f64;
            if fraction == 0.0 {
                break;
            }
        }
    }
    out
}

fn number_to_fixed(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let n = this_number(ctx, "toFixed")?;
    let digits = super::integer_arg(interp, ctx, 0, 0.0)?;
    if !(0.0..=100.0).contains(&digits) {
        return Err(JsError::range("toFixed() digits argument must be between 0 and 100"));
    }
    Ok(Value::from(to_fixed(n, digits as usize)))
}

/// Fixed-point notation with ties rounded away from zero.
pub fn to_fixed(n: f64, digits: usize) -> String {
    if !n.is_finite() || n.abs() >= 1e21 {
        return number_to_string(n);
    }

    // Expand well past the requested precision, then round by hand.
    let expanded = format!("{:.*}", digits + 30, n.abs());
    let (int_part, frac_part) = expanded.split_once('.').unwrap_or((expanded.as_str(), ""));
    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(digits))
        .map(|b| b - b'0')
        .collect();

    if frac_part.as_bytes().get(digits).map_or(false, |&b| b >= b'5') {
        let mut i = kept.len();
        loop {
            if i == 0 {
                kept.insert(0, 1);
                break;
            }
            i -= 1;
            if kept[i] == 9 {
                kept[i] = 0;
            } else {
                kept[i] += 1;
                break;
            }
        }
    }

    let int_len = kept.len() - digits;
    let mut out = String::with_capacity(kept.len() + 2);
    if n < 0.0 {
        out.push('-');
    }
    for (i, digit) in kept.iter().enumerate() {
        if i == int_len {
            out.push('.');
        }
        out.push((b'0' + digit) as char);
    }
    out
}

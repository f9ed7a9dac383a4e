//! `String` constructor and `String.prototype`.
//!
//! Indices count Unicode scalar values, the same unit primitive `length`
//! and `str[i]` use.

use crate::coerce;
use crate::error::{JsError, JsResult};
use crate::function::ExecutionContext;
use crate::interpreter::Interpreter;
use crate::object::ObjectKind;
use crate::value::Value;

use super::{construct_target, define_constructor, define_method, integer_arg, into_wrapper, relative_index};

pub fn init(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().string_prototype.clone();
    prototype.borrow_mut().kind = ObjectKind::String(String::new());
    let constructor = define_constructor(interp, "String", 1, string_constructor, &prototype);
    define_method(interp, &constructor, "fromCharCode", 1, string_from_char_code);

    define_method(interp, &prototype, "charAt", 1, string_char_at);
    define_method(interp, &prototype, "charCodeAt", 1, string_char_code_at);
    define_method(interp, &prototype, "indexOf", 1, string_index_of);
    define_method(interp, &prototype, "lastIndexOf", 1, string_last_index_of);
    define_method(interp, &prototype, "includes", 1, string_includes);
    define_method(interp, &prototype, "startsWith", 1, string_starts_with);
    define_method(interp, &prototype, "endsWith", 1, string_ends_with);
    define_method(interp, &prototype, "slice", 2, string_slice);
    define_method(interp, &prototype, "substring", 2, string_substring);
    define_method(interp, &prototype, "toUpperCase", 0, string_to_upper_case);
    define_method(interp, &prototype, "toLowerCase", 0, string_to_lower_case);
    define_method(interp, &prototype, "trim", 0, string_trim);
    define_method(interp, &prototype, "trimStart", 0, string_trim_start);
    define_method(interp, &prototype, "trimEnd", 0, string_trim_end);
    define_method(interp, &prototype, "split", 2, string_split);
    define_method(interp, &prototype, "repeat", 1, string_repeat);
    define_method(interp, &prototype, "concat", 1, string_concat);
    define_method(interp, &prototype, "toString", 0, string_value_of);
    define_method(interp, &prototype, "valueOf", 0, string_value_of);
}

fn string_constructor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let s = if ctx.arg_count() == 0 {
        String::new()
    } else {
        interp.to_string(&ctx.arg(0))?
    };
    let prototype = interp.intrinsics().string_prototype.clone();
    match construct_target(ctx, &prototype) {
        Some(target) => Ok(into_wrapper(target, ObjectKind::String(s))),
        None => Ok(Value::String(s)),
    }
}

fn string_from_char_code(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let mut out = String::with_capacity(ctx.arg_count());
    for arg in &ctx.arguments {
        let code = coerce::to_uint32(interp.to_number(arg)?) & 0xffff;
        out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    Ok(Value::String(out))
}

/// `this` coerced to a string, as every generic method starts.
fn this_string(interp: &mut Interpreter, ctx: &ExecutionContext, method: &str) -> JsResult<String> {
    if ctx.this_value.is_nullish() {
        return Err(JsError::type_error(format!(
            "String.prototype.{} called on null or undefined",
            method
        )));
    }
    interp.to_string(&ctx.this_value)
}

fn chars_of(interp: &mut Interpreter, ctx: &ExecutionContext, method: &str) -> JsResult<Vec<char>> {
    Ok(this_string(interp, ctx, method)?.chars().collect())
}

fn string_value_of(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    match &ctx.this_value {
        Value::String(s) => Ok(Value::String(s.clone())),
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::String(s) => Ok(Value::String(s.clone())),
            _ => Err(JsError::type_error(
                "String.prototype.valueOf requires that 'this' be a String",
            )),
        },
        _ => Err(JsError::type_error(
            "String.prototype.valueOf requires that 'this' be a String",
        )),
    }
}

fn string_char_at(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let chars = chars_of(interp, ctx, "charAt")?;
    let index = integer_arg(interp, ctx, 0, 0.0)?;
    let ch = if index >= 0.0 { chars.get(index as usize) } else { None };
    Ok(Value::from(ch.map(char::to_string).unwrap_or_default()))
}

fn string_char_code_at(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let chars = chars_of(interp, ctx, "charCodeAt")?;
    let index = integer_arg(interp, ctx, 0, 0.0)?;
    let ch = if index >= 0.0 { chars.get(index as usize) } else { None };
    Ok(Value::Number(ch.map_or(f64::NAN, |&c| c as u32 as f64)))
}

/// First position at or after `from` where `needle` occurs.
fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}

/// Last position at or before `from` where `needle` occurs.
fn rfind_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last = (haystack.len() - needle.len()).min(from);
    (0..=last).rev().find(|&i| haystack[i..].starts_with(needle))
}

fn position_arg(interp: &mut Interpreter, ctx: &ExecutionContext, index: usize, len: usize) -> JsResult<usize> {
    let position = integer_arg(interp, ctx, index, 0.0)?;
    Ok(position.clamp(0.0, len as f64) as usize)
}

fn search_string(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Vec<char>> {
    Ok(interp.to_string(&ctx.arg(0))?.chars().collect())
}

fn string_index_of(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let chars = chars_of(interp, ctx, "indexOf")?;
    let needle = search_string(interp, ctx)?;
    let from = position_arg(interp, ctx, 1, chars.len())?;
    Ok(Value::Number(
        find_chars(&chars, &needle, from).map_or(-1.0, |i| i as f64),
    ))
}

fn string_last_index_of(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let chars = chars_of(interp, ctx, "lastIndexOf")?;
    let needle = search_string(interp, ctx)?;
    let from = match interp.to_number(&ctx.arg(1))? {
        n if n.is_nan() => chars.len(),
        n => n.clamp(0.0, chars.len() as f64) as usize,
    };
    Ok(Value::Number(
        rfind_chars(&chars, &needle, from).map_or(-1.0, |i| i as f64),
    ))
}

fn string_includes(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let chars = chars_of(interp, ctx, "includes")?;
    let needle = search_string(interp, ctx)?;
    let from = position_arg(interp, ctx, 1, chars.len())?;
    Ok(Value::Boolean(find_chars(&chars, &needle, from).is_some()))
}

fn string_starts_with(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let chars = chars_of(interp, ctx, "startsWith")?;
    let needle = search_string(interp, ctx)?;
    let from = position_arg(interp, ctx, 1, chars.len())?;
    Ok(Value::Boolean(chars[from..].starts_with(&needle)))
}

fn string_ends_with(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let chars = chars_of(interp, ctx, "endsWith")?;
    let needle = search_string(interp, ctx)?;
    let end = match ctx.arg(1) {
        Value::Undefined => chars.len(),
        _ => position_arg(interp, ctx, 1, chars.len())?,
    };
    Ok(Value::Boolean(chars[..end].ends_with(&needle)))
}

fn string_slice(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let chars = chars_of(interp, ctx, "slice")?;
    let len = chars.len();
    let start = relative_index(integer_arg(interp, ctx, 0, 0.0)?, len);
    let end = relative_index(integer_arg(interp, ctx, 1, len as f64)?, len);
    let slice: String = if start < end { chars[start..end].iter().collect() } else { String::new() };
    Ok(Value::String(slice))
}

fn string_substring(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let chars = chars_of(interp, ctx, "substring")?;
    let len = chars.len();
    let a = position_arg(interp, ctx, 0, len)?;
    let b = match ctx.arg(1) {
        Value::Undefined => len,
        _ => position_arg(interp, ctx, 1, len)?,
    };
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    Ok(Value::String(chars[start..end].iter().collect()))
}

fn string_to_upper_case(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::String(this_string(interp, ctx, "toUpperCase")?.to_uppercase()))
}

fn string_to_lower_case(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::String(this_string(interp, ctx, "toLowerCase")?.to_lowercase()))
}

fn is_trimmable(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

fn string_trim(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let s = this_string(interp, ctx, "trim")?;
    Ok(Value::from(s.trim_matches(is_trimmable)))
}

fn string_trim_start(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let s = this_string(interp, ctx, "trimStart")?;
    Ok(Value::from(s.trim_start_matches(is_trimmable)))
}

fn string_trim_end(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let s = this_string(interp, ctx, "trimEnd")?;
    Ok(Value::from(s.trim_end_matches(is_trimmable)))
}

fn string_split(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let s = this_string(interp, ctx, "split")?;
    let limit = match ctx.arg(1) {
        Value::Undefined => u32::MAX as usize,
        value => coerce::to_uint32(interp.to_number(&value)?) as usize,
    };

    let parts: Vec<Value> = match ctx.arg(0) {
        Value::Undefined => vec![Value::String(s)],
        separator => {
            let separator = interp.to_string(&separator)?;
            if separator.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(separator.as_str()).map(Value::from).collect()
            }
        }
    };
    let parts = parts.into_iter().take(limit).collect();
    Ok(Value::Object(interp.create_array(parts)))
}

fn string_repeat(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let s = this_string(interp, ctx, "repeat")?;
    let count = integer_arg(interp, ctx, 0, 0.0)?;
    if count < 0.0 || count.is_infinite() {
        return Err(JsError::range(format!(
            "Invalid count value: {}",
            coerce::number_to_string(count)
        )));
    }
    if s.len() as f64 * count > (1u64 << 29) as f64 {
        return Err(JsError::range("Invalid string length"));
    }
    Ok(Value::String(s.repeat(count as usize)))
}

fn string_concat(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let mut s = this_string(interp, ctx, "concat")?;
    for arg in &ctx.arguments {
        s.push_str(&interp.to_string(arg)?);
    }
    Ok(Value::String(s))
}

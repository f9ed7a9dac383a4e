//! The `JSON` namespace object.
//!
//! Script values are converted to and from `serde_json::Value`; serde_json
//! does the text work. With `preserve_order` enabled, object keys keep
//! their insertion order in both directions.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::value::RawValue;
use serde_json::{Map, Number};

use crate::error::{JsError, JsResult};
use crate::function::ExecutionContext;
use crate::interpreter::Interpreter;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::Value;

use super::define_method;

/// Integers up to 2^53 are written without a fractional part.
const MAX_EXACT_INTEGER: f64 = 9007199254740992.0;

pub fn init(interp: &mut Interpreter) {
    let json = interp.create_object();
    define_method(interp, &json, "parse", 2, json_parse);
    define_method(interp, &json, "stringify", 3, json_stringify);
    interp.global_object().define("JSON", Value::Object(json), false);
}

// ── parse ────────────────────────────────────────────────────────────

fn json_parse(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let text = interp.to_string(&ctx.arg(0))?;
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(parsed) => from_json(interp, &parsed),
        Err(err) if is_number_out_of_range(&err) => from_raw_json(interp, &text),
        Err(err) => Err(parse_error(err)),
    }
}

fn parse_error(err: serde_json::Error) -> JsError {
    JsError::syntax(format!("JSON.parse: {}", err))
}

/// serde_json rejects literals beyond the `f64` range, which scripts read
/// as `Infinity`.
fn is_number_out_of_range(err: &serde_json::Error) -> bool {
    err.is_syntax() && err.to_string().starts_with("number out of range")
}

/// Slow path for documents holding out-of-range numbers: each node is kept
/// as raw text and numbers are converted with `f64` parsing, which
/// saturates to infinity.
fn from_raw_json(interp: &Interpreter, text: &str) -> JsResult<Value> {
    let raw: Box<RawValue> = serde_json::from_str(text).map_err(parse_error)?;
    from_raw(interp, raw.get())
}

fn from_raw(interp: &Interpreter, raw: &str) -> JsResult<Value> {
    match raw.as_bytes().first() {
        Some(b'[') => {
            let items: Vec<Box<RawValue>> = serde_json::from_str(raw).map_err(parse_error)?;
            let elements = items
                .iter()
                .map(|item| from_raw(interp, item.get()))
                .collect::<JsResult<Vec<_>>>()?;
            Ok(Value::Object(interp.create_array(elements)))
        }
        Some(b'{') => {
            let RawObject(entries) = serde_json::from_str(raw).map_err(parse_error)?;
            let obj = interp.create_object();
            for (key, item) in &entries {
                obj.set(key, from_raw(interp, item.get())?)?;
            }
            Ok(Value::Object(obj))
        }
        Some(b'-' | b'0'..=b'9') => raw
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|err| JsError::syntax(format!("JSON.parse: {}", err))),
        _ => {
            let parsed: serde_json::Value = serde_json::from_str(raw).map_err(parse_error)?;
            from_json(interp, &parsed)
        }
    }
}

/// Object members in document order, duplicates included.
struct RawObject(Vec<(String, Box<RawValue>)>);

impl<'de> Deserialize<'de> for RawObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawObject;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawObject, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, Box<RawValue>>()? {
                    entries.push(entry);
                }
                Ok(RawObject(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Build script values from parsed JSON.
pub fn from_json(interp: &Interpreter, json: &serde_json::Value) -> JsResult<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            let elements = items
                .iter()
                .map(|item| from_json(interp, item))
                .collect::<JsResult<Vec<_>>>()?;
            Value::Object(interp.create_array(elements))
        }
        serde_json::Value::Object(map) => {
            let obj = interp.create_object();
            for (key, item) in map {
                obj.set(key, from_json(interp, item)?)?;
            }
            Value::Object(obj)
        }
    })
}

// ── stringify ────────────────────────────────────────────────────────

fn json_stringify(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let indent = indent_of(&ctx.arg(2));
    let mut stack = Vec::new();
    let Some(json) = to_json(interp, &ctx.arg(0), &mut stack)? else {
        return Ok(Value::Undefined);
    };
    Ok(Value::String(write_json(&json, &indent)?))
}

/// The `space` argument: a count of spaces or a literal string, both
/// capped at ten characters.
fn indent_of(space: &Value) -> String {
    let space = match space {
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Number(n) => Value::Number(*n),
            ObjectKind::String(s) => Value::String(s.clone()),
            _ => Value::Undefined,
        },
        other => other.clone(),
    };
    match space {
        Value::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    }
}

/// Serialize with `indent` per level, or compactly when it is empty.
pub fn write_json(json: &serde_json::Value, indent: &str) -> JsResult<String> {
    if indent.is_empty() {
        return serde_json::to_string(json).map_err(|err| JsError::type_error(err.to_string()));
    }
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
    json.serialize(&mut serializer)
        .map_err(|err| JsError::type_error(err.to_string()))?;
    String::from_utf8(out).map_err(|err| JsError::type_error(err.to_string()))
}

/// Convert a script value. `None` means "omit": `undefined` and functions.
pub fn to_json(
    interp: &mut Interpreter,
    value: &Value,
    stack: &mut Vec<ObjectRef>,
) -> JsResult<Option<serde_json::Value>> {
    let mut value = value.clone();
    if let Value::Object(obj) = &value {
        let to_json_method = obj.get("toJSON");
        if to_json_method.is_function() {
            value = interp.call_function(&to_json_method, &value, &[Value::from("")])?;
        }
    }

    let obj = match &value {
        Value::Undefined => return Ok(None),
        Value::Null => return Ok(Some(serde_json::Value::Null)),
        Value::Boolean(b) => return Ok(Some(serde_json::Value::Bool(*b))),
        Value::Number(n) => return Ok(Some(number_to_json(*n))),
        Value::String(s) => return Ok(Some(serde_json::Value::String(s.clone()))),
        Value::Object(obj) => obj.clone(),
    };

    // Wrapper objects serialize as their primitive.
    let primitive = match &obj.borrow().kind {
        ObjectKind::Function(_) => return Ok(None),
        ObjectKind::Number(n) => Some(number_to_json(*n)),
        ObjectKind::Boolean(b) => Some(serde_json::Value::Bool(*b)),
        ObjectKind::String(s) => Some(serde_json::Value::String(s.clone())),
        _ => None,
    };
    if primitive.is_some() {
        return Ok(primitive);
    }

    if stack.iter().any(|seen| seen.ptr_eq(&obj)) {
        return Err(JsError::type_error("Converting circular structure to JSON"));
    }
    stack.push(obj.clone());
    let result = if let Some(elements) = obj.array_elements() {
        let mut items = Vec::with_capacity(elements.len());
        for element in &elements {
            items.push(to_json(interp, element, stack)?.unwrap_or(serde_json::Value::Null));
        }
        serde_json::Value::Array(items)
    } else {
        let mut map = Map::new();
        for key in obj.own_enumerable_keys() {
            let member = interp.get_property(&value, &key)?;
            if let Some(json) = to_json(interp, &member, stack)? {
                map.insert(key, json);
            }
        }
        serde_json::Value::Object(map)
    };
    stack.pop();
    Ok(Some(result))
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    // Non-finite numbers have no JSON form.
    Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

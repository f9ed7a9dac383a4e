//! `Array` constructor and `Array.prototype`.

use std::cmp::Ordering;

use crate::coerce;
use crate::error::{JsError, JsResult};
use crate::function::ExecutionContext;
use crate::interpreter::Interpreter;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::Value;

use super::{callback_arg, define_constructor, define_method, integer_arg, relative_index};

pub fn init(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().array_prototype.clone();
    let constructor = define_constructor(interp, "Array", 1, array_constructor, &prototype);
    define_method(interp, &constructor, "isArray", 1, array_is_array);

    define_method(interp, &prototype, "push", 1, array_push);
    define_method(interp, &prototype, "pop", 0, array_pop);
    define_method(interp, &prototype, "shift", 0, array_shift);
    define_method(interp, &prototype, "unshift", 1, array_unshift);
    define_method(interp, &prototype, "join", 1, array_join);
    define_method(interp, &prototype, "indexOf", 1, array_index_of);
    define_method(interp, &prototype, "includes", 1, array_includes);
    define_method(interp, &prototype, "slice", 2, array_slice);
    define_method(interp, &prototype, "concat", 1, array_concat);
    define_method(interp, &prototype, "reverse", 0, array_reverse);
    define_method(interp, &prototype, "sort", 1, array_sort);
    define_method(interp, &prototype, "forEach", 1, array_for_each);
    define_method(interp, &prototype, "map", 1, array_map);
    define_method(interp, &prototype, "filter", 1, array_filter);
    define_method(interp, &prototype, "reduce", 1, array_reduce);
    define_method(interp, &prototype, "some", 1, array_some);
    define_method(interp, &prototype, "every", 1, array_every);
    define_method(interp, &prototype, "find", 1, array_find);
    define_method(interp, &prototype, "findIndex", 1, array_find_index);
    define_method(interp, &prototype, "toString", 0, array_to_string);
}

/// `Array(n)` makes `n` empty slots; any other arguments become elements.
fn array_constructor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let elements = match ctx.arguments.as_slice() {
        [Value::Number(n)] => {
            if *n < 0.0 || n.fract() != 0.0 || *n > u32::MAX as f64 {
                return Err(JsError::range("Invalid array length"));
            }
            vec![Value::Undefined; *n as usize]
        }
        items => items.to_vec(),
    };
    Ok(Value::Object(interp.create_array(elements)))
}

fn array_is_array(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Boolean(
        ctx.arg(0).as_object().map_or(false, ObjectRef::is_array),
    ))
}

// ── Helpers ──────────────────────────────────────────────────────────

fn this_array(ctx: &ExecutionContext, method: &str) -> JsResult<ObjectRef> {
    match &ctx.this_value {
        Value::Object(obj) if obj.is_array() => Ok(obj.clone()),
        _ => Err(JsError::type_error(format!(
            "Array.prototype.{} called on non-array",
            method
        ))),
    }
}

/// Run `f` on the element storage of `array`.
fn with_elements<R>(array: &ObjectRef, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
    match &mut array.borrow_mut().kind {
        ObjectKind::Array(elements) => f(elements),
        _ => f(&mut Vec::new()),
    }
}

fn length_of(array: &ObjectRef) -> usize {
    with_elements(array, |elements| elements.len())
}

/// Element `index`, or `None` once the array has shrunk below it.
fn element_at(array: &ObjectRef, index: usize) -> Option<Value> {
    with_elements(array, |elements| elements.get(index).cloned())
}

/// Visit each element with `callback(element, index, array)`. The visit
/// stops early when `visit` returns `Some`.
fn iterate<T>(
    interp: &mut Interpreter,
    ctx: &ExecutionContext,
    method: &str,
    mut visit: impl FnMut(&mut Interpreter, Value, usize, Value) -> JsResult<Option<T>>,
) -> JsResult<Option<T>> {
    let array = this_array(ctx, method)?;
    let callback = callback_arg(ctx, 0)?;
    let this_arg = ctx.arg(1);
    let len = length_of(&array);
    for index in 0..len {
        let Some(element) = element_at(&array, index) else {
            break;
        };
        let args = [element.clone(), Value::from(index), ctx.this_value.clone()];
        let result = interp.call_function(&callback, &this_arg, &args)?;
        if let Some(done) = visit(interp, element, index, result)? {
            return Ok(Some(done));
        }
    }
    Ok(None)
}

// ── Mutators ─────────────────────────────────────────────────────────

fn array_push(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "push")?;
    let len = with_elements(&array, |elements| {
        elements.extend(ctx.arguments.iter().cloned());
        elements.len()
    });
    Ok(Value::from(len))
}

fn array_pop(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "pop")?;
    Ok(with_elements(&array, Vec::pop).unwrap_or_default())
}

fn array_shift(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "shift")?;
    Ok(with_elements(&array, |elements| {
        if elements.is_empty() {
            Value::Undefined
        } else {
            elements.remove(0)
        }
    }))
}

fn array_unshift(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "unshift")?;
    let len = with_elements(&array, |elements| {
        elements.splice(0..0, ctx.arguments.iter().cloned());
        elements.len()
    });
    Ok(Value::from(len))
}

fn array_reverse(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "reverse")?;
    with_elements(&array, |elements| elements.reverse());
    Ok(ctx.this_value.clone())
}

fn array_sort(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "sort")?;
    let comparator = match ctx.arg(0) {
        Value::Undefined => None,
        f if f.is_function() => Some(f),
        _ => {
            return Err(JsError::type_error(
                "The comparison function must be either a function or undefined",
            ))
        }
    };
    let elements = with_elements(&array, |elements| elements.clone());
    let sorted = merge_sort(interp, elements, comparator.as_ref())?;
    with_elements(&array, |elements| *elements = sorted);
    Ok(ctx.this_value.clone())
}

/// Stable merge sort with a comparator that may throw.
fn merge_sort(interp: &mut Interpreter, mut items: Vec<Value>, comparator: Option<&Value>) -> JsResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(interp, items, comparator)?;
    let right = merge_sort(interp, right, comparator)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if compare(interp, &right[j], &left[i], comparator)? == Ordering::Less {
            merged.push(right[j].clone());
            j += 1;
        } else {
            merged.push(left[i].clone());
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    Ok(merged)
}

/// Sort order: `undefined` last, then the comparator or string order.
fn compare(interp: &mut Interpreter, a: &Value, b: &Value, comparator: Option<&Value>) -> JsResult<Ordering> {
    match (a.is_undefined(), b.is_undefined()) {
        (true, true) => return Ok(Ordering::Equal),
        (true, false) => return Ok(Ordering::Greater),
        (false, true) => return Ok(Ordering::Less),
        _ => {}
    }
    match comparator {
        Some(f) => {
            let result = interp.call_function(f, &Value::Undefined, &[a.clone(), b.clone()])?;
            let n = interp.to_number(&result)?;
            Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
        }
        None => {
            let (x, y) = (interp.to_string(a)?, interp.to_string(b)?);
            Ok(x.cmp(&y))
        }
    }
}

// ── Accessors ────────────────────────────────────────────────────────

fn array_join(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "join")?;
    let separator = match ctx.arg(0) {
        Value::Undefined => ",".to_string(),
        other => interp.to_string(&other)?,
    };
    Ok(Value::String(join(interp, &array, &separator)?))
}

fn array_to_string(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "toString")?;
    Ok(Value::String(join(interp, &array, ",")?))
}

/// Join elements, printing `null`/`undefined` as empty. An array already
/// being joined further up the stack prints as empty.
pub fn join(interp: &mut Interpreter, array: &ObjectRef, separator: &str) -> JsResult<String> {
    if !interp.enter_join(array) {
        return Ok(String::new());
    }
    let elements = with_elements(array, |elements| elements.clone());
    let mut parts = Vec::with_capacity(elements.len());
    let mut result = Ok(());
    for element in &elements {
        match element {
            Value::Undefined | Value::Null => parts.push(String::new()),
            other => match interp.to_string(other) {
                Ok(s) => parts.push(s),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            },
        }
    }
    interp.exit_join();
    result.map(|()| parts.join(separator))
}

fn array_index_of(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "indexOf")?;
    let elements = with_elements(&array, |elements| elements.clone());
    let from = relative_index(integer_arg(interp, ctx, 1, 0.0)?, elements.len());
    let target = ctx.arg(0);
    let found = elements
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, element)| coerce::strict_equals(element, &target));
    Ok(Value::Number(found.map_or(-1.0, |(i, _)| i as f64)))
}

fn array_includes(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "includes")?;
    let elements = with_elements(&array, |elements| elements.clone());
    let from = relative_index(integer_arg(interp, ctx, 1, 0.0)?, elements.len());
    let target = ctx.arg(0);
    // Same-value-zero, so NaN is found.
    Ok(Value::Boolean(elements.iter().skip(from).any(|e| *e == target)))
}

fn array_slice(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "slice")?;
    let elements = with_elements(&array, |elements| elements.clone());
    let len = elements.len();
    let start = relative_index(integer_arg(interp, ctx, 0, 0.0)?, len);
    let end = relative_index(integer_arg(interp, ctx, 1, len as f64)?, len);
    let slice = if start < end { elements[start..end].to_vec() } else { Vec::new() };
    Ok(Value::Object(interp.create_array(slice)))
}

fn array_concat(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "concat")?;
    let mut result = with_elements(&array, |elements| elements.clone());
    for arg in &ctx.arguments {
        match arg.as_object().and_then(ObjectRef::array_elements) {
            Some(elements) => result.extend(elements),
            None => result.push(arg.clone()),
        }
    }
    Ok(Value::Object(interp.create_array(result)))
}

// ── Iteration ────────────────────────────────────────────────────────

fn array_for_each(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    iterate::<()>(interp, ctx, "forEach", |_, _, _, _| Ok(None))?;
    Ok(Value::Undefined)
}

fn array_map(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let mut mapped = Vec::new();
    iterate::<()>(interp, ctx, "map", |_, _, _, result| {
        mapped.push(result);
        Ok(None)
    })?;
    Ok(Value::Object(interp.create_array(mapped)))
}

fn array_filter(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let mut kept = Vec::new();
    iterate::<()>(interp, ctx, "filter", |_, element, _, result| {
        if coerce::to_boolean(&result) {
            kept.push(element);
        }
        Ok(None)
    })?;
    Ok(Value::Object(interp.create_array(kept)))
}

fn array_some(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let hit = iterate(interp, ctx, "some", |_, _, _, result| {
        Ok(coerce::to_boolean(&result).then_some(()))
    })?;
    Ok(Value::Boolean(hit.is_some()))
}

fn array_every(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let miss = iterate(interp, ctx, "every", |_, _, _, result| {
        Ok((!coerce::to_boolean(&result)).then_some(()))
    })?;
    Ok(Value::Boolean(miss.is_none()))
}

fn array_find(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let found = iterate(interp, ctx, "find", |_, element, _, result| {
        Ok(coerce::to_boolean(&result).then_some(element))
    })?;
    Ok(found.unwrap_or_default())
}

fn array_find_index(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let found = iterate(interp, ctx, "findIndex", |_, _, index, result| {
        Ok(coerce::to_boolean(&result).then_some(index))
    })?;
    Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
}

fn array_reduce(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let array = this_array(ctx, "reduce")?;
    let callback = callback_arg(ctx, 0)?;
    let len = length_of(&array);

    let mut index = 0;
    let mut accumulator = if ctx.arg_count() >= 2 {
        ctx.arg(1)
    } else {
        index = 1;
        element_at(&array, 0)
            .ok_or_else(|| JsError::type_error("Reduce of empty array with no initial value"))?
    };
    while index < len {
        let Some(element) = element_at(&array, index) else {
            break;
        };
        let args = [accumulator, element, Value::from(index), ctx.this_value.clone()];
        accumulator = interp.call_function(&callback, &Value::Undefined, &args)?;
        index += 1;
    }
    Ok(accumulator)
}

#[cfg(test)]
mod tests {
    use crate::interpreter::Interpreter;
    use crate::value::Value;

    fn eval(source: &str) -> Value {
        Interpreter::new().run(source).unwrap()
    }

    #[test]
    fn test_constructor_forms() {
        assert_eq!(eval("Array(3).length"), Value::from(3));
        assert_eq!(eval("new Array(1, 2).join('-')"), Value::from("1-2"));
        assert_eq!(eval("Array.isArray([]) && !Array.isArray({})"), Value::Boolean(true));
        let err = Interpreter::new().run("Array(-1)").unwrap_err();
        assert!(err.to_string().contains("Invalid array length"));
    }

    #[test]
    fn test_stack_and_queue_methods() {
        let result = eval(
            "var a = [2]; a.push(3, 4); a.unshift(1); var last = a.pop(); \
             var first = a.shift(); [first, last, a.join()].join('|')",
        );
        assert_eq!(result, Value::from("1|4|2,3"));
    }

    #[test]
    fn test_higher_order_methods() {
        assert_eq!(
            eval("[1, 2, 3, 4].filter(function (x) { return x % 2 == 0; }).map(function (x) { return x * 10; }).join()"),
            Value::from("20,40")
        );
        assert_eq!(
            eval("[1, 2, 3].reduce(function (acc, x) { return acc + x; })"),
            Value::from(6)
        );
        assert_eq!(
            eval("[1, 2, 3].reduce(function (acc, x) { return acc + x; }, 10)"),
            Value::from(16)
        );
        assert_eq!(eval("[5, 7].findIndex(function (x) { return x > 5; })"), Value::from(1));
        assert_eq!(eval("[5, 7].some(function (x) { return x > 6; })"), Value::Boolean(true));
        assert_eq!(eval("[5, 7].every(function (x) { return x > 6; })"), Value::Boolean(false));
    }

    #[test]
    fn test_reduce_of_empty_array_throws() {
        let err = Interpreter::new()
            .run("[].reduce(function (a, b) { return a + b; })")
            .unwrap_err();
        assert!(err.to_string().contains("Reduce of empty array with no initial value"));
    }

    #[test]
    fn test_sort_is_stable_and_puts_undefined_last() {
        assert_eq!(eval("[10, 9, 1, undefined, 2].sort().join()"), Value::from("1,10,2,9,"));
        let result = eval(
            "var people = [{n: 'a', age: 30}, {n: 'b', age: 25}, {n: 'c', age: 30}]; \
             people.sort(function (x, y) { return x.age - y.age; }) \
                   .map(function (p) { return p.n; }).join('')",
        );
        assert_eq!(result, Value::from("bac"));
    }

    #[test]
    fn test_join_handles_nulls_and_cycles() {
        assert_eq!(eval("[1, null, undefined, 'x'].join('-')"), Value::from("1---x"));
        assert_eq!(eval("var a = [1]; a.push(a); a.join()"), Value::from("1,"));
    }

    #[test]
    fn test_index_of_versus_includes_on_nan() {
        assert_eq!(eval("[NaN].indexOf(NaN)"), Value::from(-1));
        assert_eq!(eval("[NaN].includes(NaN)"), Value::Boolean(true));
        assert_eq!(eval("[1, 2, 3].indexOf(3, -1)"), Value::from(2));
    }

    #[test]
    fn test_slice_concat_reverse() {
        assert_eq!(eval("[1, 2, 3, 4].slice(1, -1).join()"), Value::from("2,3"));
        assert_eq!(eval("[1].concat([2, 3], 4).join()"), Value::from("1,2,3,4"));
        assert_eq!(eval("[1, 2, 3].reverse().join()"), Value::from("3,2,1"));
    }
}

//! The `Math` namespace object.

use crate::coerce;
use crate::error::JsResult;
use crate::function::ExecutionContext;
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::{define_constant, define_method};

pub fn init(interp: &mut Interpreter) {
    let math = interp.create_object();

    define_constant(&math, "PI", Value::Number(std::f64::consts::PI));
    define_constant(&math, "E", Value::Number(std::f64::consts::E));
    define_constant(&math, "LN2", Value::Number(std::f64::consts::LN_2));
    define_constant(&math, "LN10", Value::Number(std::f64::consts::LN_10));
    define_constant(&math, "LOG2E", Value::Number(std::f64::consts::LOG2_E));
    define_constant(&math, "LOG10E", Value::Number(std::f64::consts::LOG10_E));
    define_constant(&math, "SQRT2", Value::Number(std::f64::consts::SQRT_2));
    define_constant(&math, "SQRT1_2", Value::Number(std::f64::consts::FRAC_1_SQRT_2));

    define_method(interp, &math, "abs", 1, math_abs);
    define_method(interp, &math, "floor", 1, math_floor);
    define_method(interp, &math, "ceil", 1, math_ceil);
    define_method(interp, &math, "round", 1, math_round);
    define_method(interp, &math, "trunc", 1, math_trunc);
    define_method(interp, &math, "sign", 1, math_sign);
    define_method(interp, &math, "sqrt", 1, math_sqrt);
    define_method(interp, &math, "cbrt", 1, math_cbrt);
    define_method(interp, &math, "pow", 2, math_pow);
    define_method(interp, &math, "min", 2, math_min);
    define_method(interp, &math, "max", 2, math_max);
    define_method(interp, &math, "hypot", 2, math_hypot);
    define_method(interp, &math, "sin", 1, math_sin);
    define_method(interp, &math, "cos", 1, math_cos);
    define_method(interp, &math, "tan", 1, math_tan);
    define_method(interp, &math, "atan2", 2, math_atan2);
    define_method(interp, &math, "log", 1, math_log);
    define_method(interp, &math, "log2", 1, math_log2);
    define_method(interp, &math, "log10", 1, math_log10);
    define_method(interp, &math, "exp", 1, math_exp);
    define_method(interp, &math, "random", 0, math_random);

    interp.global_object().define("Math", Value::Object(math), false);
}

fn number_arg(interp: &mut Interpreter, ctx: &ExecutionContext, index: usize) -> JsResult<f64> {
    interp.to_number(&ctx.arg(index))
}

/// Apply a one-argument float function to the first argument.
fn unary(interp: &mut Interpreter, ctx: &ExecutionContext, f: fn(f64) -> f64) -> JsResult<Value> {
    Ok(Value::Number(f(number_arg(interp, ctx, 0)?)))
}

fn math_abs(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::abs)
}

fn math_floor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::floor)
}

fn math_ceil(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::ceil)
}

/// Halves round toward +Infinity, so `round(-2.5)` is -2.
pub fn round(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    if x - x.floor() == 0.5 {
        x.ceil()
    } else {
        x.round()
    }
}

fn math_round(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, round)
}

fn math_trunc(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::trunc)
}

fn math_sign(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, |x| if x.is_nan() || x == 0.0 { x } else { x.signum() })
}

fn math_sqrt(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::sqrt)
}

fn math_cbrt(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::cbrt)
}

fn math_pow(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let base = number_arg(interp, ctx, 0)?;
    let exponent = number_arg(interp, ctx, 1)?;
    Ok(Value::Number(coerce::exponentiate(base, exponent)))
}

/// Every argument is converted before NaN short-circuits the result.
fn numbers(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Vec<f64>> {
    ctx.arguments.iter().map(|arg| interp.to_number(arg)).collect()
}

fn math_min(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let result = numbers(interp, ctx)?.into_iter().fold(f64::INFINITY, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else if n < acc || (n == 0.0 && acc == 0.0 && n.is_sign_negative()) {
            n
        } else {
            acc
        }
    });
    Ok(Value::Number(result))
}

fn math_max(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let result = numbers(interp, ctx)?.into_iter().fold(f64::NEG_INFINITY, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else if n > acc || (n == 0.0 && acc == 0.0 && n.is_sign_positive()) {
            n
        } else {
            acc
        }
    });
    Ok(Value::Number(result))
}

fn math_hypot(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let values = numbers(interp, ctx)?;
    if values.iter().any(|n| n.is_infinite()) {
        return Ok(Value::Number(f64::INFINITY));
    }
    let sum: f64 = values.iter().map(|n| n * n).sum();
    Ok(Value::Number(sum.sqrt()))
}

fn math_sin(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::sin)
}

fn math_cos(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::cos)
}

fn math_tan(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::tan)
}

fn math_atan2(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let y = number_arg(interp, ctx, 0)?;
    let x = number_arg(interp, ctx, 1)?;
    Ok(Value::Number(y.atan2(x)))
}

fn math_log(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::ln)
}

fn math_log2(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::log2)
}

fn math_log10(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::log10)
}

fn math_exp(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    unary(interp, ctx, f64::exp)
}

fn math_random(interp: &mut Interpreter, _ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Number(interp.next_random()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Value {
        Interpreter::new().run(source).unwrap()
    }

    #[test]
    fn test_round_half_toward_positive_infinity() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(-2.6), -3.0);
        assert_eq!(round(0.49999999999999994), 0.0);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(eval("Math.max(1, '7', 3)"), Value::from(7));
        assert_eq!(eval("Math.min()"), Value::Number(f64::INFINITY));
        assert_eq!(eval("Math.max()"), Value::Number(f64::NEG_INFINITY));
        assert!(matches!(eval("Math.min(1, NaN)"), Value::Number(n) if n.is_nan()));
    }

    #[test]
    fn test_pow_and_constants() {
        assert_eq!(eval("Math.pow(2, 10)"), Value::from(1024));
        assert!(matches!(eval("Math.pow(1, Infinity)"), Value::Number(n) if n.is_nan()));
        assert_eq!(eval("Math.PI === 3.141592653589793"), Value::Boolean(true));
        assert_eq!(eval("Math.sign(-3)"), Value::from(-1));
        assert_eq!(eval("Math.hypot(3, 4)"), Value::from(5));
    }

    #[test]
    fn test_random_stays_in_unit_interval() {
        let result = eval(
            "var ok = true; for (var i = 0; i < 200; i++) { var r = Math.random(); \
             if (r < 0 || r >= 1) ok = false; } ok",
        );
        assert_eq!(result, Value::Boolean(true));
    }
}

//! `Date` constructor and `Date.prototype`.
//!
//! Times are milliseconds since the Unix epoch as `f64`, NaN for an invalid
//! date. Everything is UTC: there is no local time zone.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::error::{JsError, JsResult};
use crate::function::ExecutionContext;
use crate::interpreter::{Interpreter, PreferredType};
use crate::object::ObjectKind;
use crate::value::Value;

use super::{construct_target, define_constructor, define_method, into_wrapper};

/// Largest magnitude a time value may have (100 million days).
const MAX_TIME: f64 = 8.64e15;

const MS_PER_DAY: f64 = 86_400_000.0;

const TO_STRING_FORMAT: &str = "%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)";

pub fn init(interp: &mut Interpreter) {
    let prototype = interp.intrinsics().date_prototype.clone();
    let constructor = define_constructor(interp, "Date", 7, date_constructor, &prototype);
    define_method(interp, &constructor, "now", 0, date_now);
    define_method(interp, &constructor, "parse", 1, date_parse);
    define_method(interp, &constructor, "UTC", 7, date_utc);

    define_method(interp, &prototype, "getTime", 0, date_get_time);
    define_method(interp, &prototype, "valueOf", 0, date_get_time);
    define_method(interp, &prototype, "getFullYear", 0, date_get_full_year);
    define_method(interp, &prototype, "getMonth", 0, date_get_month);
    define_method(interp, &prototype, "getDate", 0, date_get_date);
    define_method(interp, &prototype, "getDay", 0, date_get_day);
    define_method(interp, &prototype, "getHours", 0, date_get_hours);
    define_method(interp, &prototype, "getMinutes", 0, date_get_minutes);
    define_method(interp, &prototype, "getSeconds", 0, date_get_seconds);
    define_method(interp, &prototype, "getMilliseconds", 0, date_get_milliseconds);
    define_method(interp, &prototype, "getTimezoneOffset", 0, date_get_timezone_offset);
    define_method(interp, &prototype, "toISOString", 0, date_to_iso_string);
    define_method(interp, &prototype, "toJSON", 1, date_to_json);
    define_method(interp, &prototype, "toUTCString", 0, date_to_utc_string);
    define_method(interp, &prototype, "toString", 0, date_to_string);
}

// ── Time arithmetic ──────────────────────────────────────────────────

/// Current host time.
pub fn now() -> f64 {
    Utc::now().timestamp_millis() as f64
}

/// Clamp a time value to the representable range; NaN outside it.
pub fn time_clip(t: f64) -> f64 {
    if !t.is_finite() || t.abs() > MAX_TIME {
        return f64::NAN;
    }
    // `+ 0.0` turns -0 into +0.
    t.trunc() + 0.0
}

/// Time value from calendar fields. `month` is zero-based and, like the
/// other fields, may overflow into the next larger unit.
pub fn make_time(year: f64, month: f64, day: f64, hours: f64, minutes: f64, seconds: f64, ms: f64) -> f64 {
    let fields = [year, month, day, hours, minutes, seconds, ms];
    if fields.iter().any(|f| !f.is_finite()) {
        return f64::NAN;
    }
    let [year, month, day, hours, minutes, seconds, ms] = fields.map(f64::trunc);

    let year = year + (month / 12.0).floor();
    let month = month.rem_euclid(12.0);
    if year.abs() > 300_000.0 {
        return f64::NAN;
    }
    let Some(first_of_month) = NaiveDate::from_ymd_opt(year as i32, month as u32 + 1, 1) else {
        return f64::NAN;
    };
    let epoch_days = first_of_month
        .signed_duration_since(NaiveDate::default())
        .num_days() as f64;
    let days = epoch_days + day - 1.0;
    time_clip(days * MS_PER_DAY + hours * 3_600_000.0 + minutes * 60_000.0 + seconds * 1000.0 + ms)
}

fn datetime(t: f64) -> Option<DateTime<Utc>> {
    if t.is_nan() {
        return None;
    }
    DateTime::from_timestamp_millis(t as i64)
}

/// `Date.prototype.toString` rendering, or `"Invalid Date"`.
pub fn to_date_string(t: f64) -> String {
    match datetime(t) {
        Some(dt) => dt.format(TO_STRING_FORMAT).to_string(),
        None => "Invalid Date".to_string(),
    }
}

/// ISO 8601 with milliseconds, as `toISOString` prints it.
pub fn to_iso_string(t: f64) -> Option<String> {
    datetime(t).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

/// Parse the date formats scripts commonly use. NaN when none match.
pub fn parse_date(text: &str) -> f64 {
    let text = text.trim();
    let millis = |dt: NaiveDateTime| time_clip(dt.and_utc().timestamp_millis() as f64);

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return time_clip(dt.timestamp_millis() as f64);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text.trim_end_matches('Z'), format) {
            return millis(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map_or(f64::NAN, millis);
    }
    if text.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map_or(f64::NAN, millis);
        }
    }
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(year) = text.parse::<f64>() {
            return make_time(year, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return time_clip(dt.timestamp_millis() as f64);
    }
    let without_zone_name = text.trim_end_matches(" (Coordinated Universal Time)");
    if let Ok(dt) = DateTime::parse_from_str(without_zone_name, "%a %b %d %Y %H:%M:%S GMT%z") {
        return time_clip(dt.timestamp_millis() as f64);
    }
    f64::NAN
}

// ── Constructor and statics ──────────────────────────────────────────

fn date_constructor(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let prototype = interp.intrinsics().date_prototype.clone();
    let Some(target) = construct_target(ctx, &prototype) else {
        // A plain call ignores its arguments.
        return Ok(Value::from(to_date_string(now())));
    };

    let t = match ctx.arg_count() {
        0 => now(),
        1 => time_from_value(interp, &ctx.arg(0))?,
        _ => time_from_fields(interp, ctx)?,
    };
    Ok(into_wrapper(target, ObjectKind::Date(t)))
}

fn time_from_value(interp: &mut Interpreter, value: &Value) -> JsResult<f64> {
    if let Value::Object(obj) = value {
        if let ObjectKind::Date(t) = obj.borrow().kind {
            return Ok(t);
        }
    }
    match interp.to_primitive(value, PreferredType::Number)? {
        Value::String(s) => {
            let t = parse_date(&s);
            if t.is_nan() {
                return Err(JsError::range(format!("Invalid date: {}", s)));
            }
            Ok(t)
        }
        other => Ok(time_clip(interp.to_number(&other)?)),
    }
}

/// `(year, month, day?, hours?, minutes?, seconds?, ms?)` as UTC.
fn time_from_fields(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<f64> {
    let defaults = [f64::NAN, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
    let mut fields = defaults;
    for (i, slot) in fields.iter_mut().enumerate() {
        if i < ctx.arg_count() {
            *slot = interp.to_number(&ctx.arguments[i])?;
        }
    }
    let [mut year, month, day, hours, minutes, seconds, ms] = fields;
    if year.is_finite() && (0.0..=99.0).contains(&year.trunc()) {
        year = 1900.0 + year.trunc();
    }
    Ok(make_time(year, month, day, hours, minutes, seconds, ms))
}

fn date_now(_interp: &mut Interpreter, _ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Number(now()))
}

fn date_parse(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let text = interp.to_string(&ctx.arg(0))?;
    Ok(Value::Number(parse_date(&text)))
}

fn date_utc(interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Number(time_from_fields(interp, ctx)?))
}

// ── Prototype methods ────────────────────────────────────────────────

fn this_time(ctx: &ExecutionContext) -> JsResult<f64> {
    if let Value::Object(obj) = &ctx.this_value {
        if let ObjectKind::Date(t) = obj.borrow().kind {
            return Ok(t);
        }
    }
    Err(JsError::type_error("this is not a Date object."))
}

/// A calendar field of `this`, NaN for an invalid date.
fn field(ctx: &ExecutionContext, get: impl FnOnce(&DateTime<Utc>) -> u32) -> JsResult<Value> {
    let t = this_time(ctx)?;
    Ok(Value::Number(datetime(t).map_or(f64::NAN, |dt| get(&dt) as f64)))
}

fn date_get_time(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::Number(this_time(ctx)?))
}

fn date_get_full_year(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let t = this_time(ctx)?;
    Ok(Value::Number(datetime(t).map_or(f64::NAN, |dt| dt.year() as f64)))
}

fn date_get_month(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    field(ctx, |dt| dt.month0())
}

fn date_get_date(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    field(ctx, |dt| dt.day())
}

fn date_get_day(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    field(ctx, |dt| dt.weekday().num_days_from_sunday())
}

fn date_get_hours(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    field(ctx, |dt| dt.hour())
}

fn date_get_minutes(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    field(ctx, |dt| dt.minute())
}

fn date_get_seconds(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    field(ctx, |dt| dt.second())
}

fn date_get_milliseconds(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    field(ctx, |dt| dt.timestamp_subsec_millis())
}

fn date_get_timezone_offset(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    field(ctx, |_| 0)
}

fn date_to_iso_string(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let t = this_time(ctx)?;
    to_iso_string(t)
        .map(Value::from)
        .ok_or_else(|| JsError::range("Invalid time value"))
}

fn date_to_json(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let t = this_time(ctx)?;
    Ok(to_iso_string(t).map_or(Value::Null, Value::from))
}

fn date_to_utc_string(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    let t = this_time(ctx)?;
    let text = datetime(t).map_or_else(
        || "Invalid Date".to_string(),
        |dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
    );
    Ok(Value::from(text))
}

fn date_to_string(_interp: &mut Interpreter, ctx: &ExecutionContext) -> JsResult<Value> {
    Ok(Value::from(to_date_string(this_time(ctx)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Value {
        Interpreter::new().run(source).unwrap()
    }

    #[test]
    fn test_make_time_handles_overflowing_fields() {
        assert_eq!(make_time(1970.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0), 0.0);
        assert_eq!(
            make_time(2023.0, 12.0, 1.0, 0.0, 0.0, 0.0, 0.0),
            make_time(2024.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0)
        );
        assert_eq!(
            make_time(2024.0, 1.0, 30.0, 0.0, 0.0, 0.0, 0.0),
            make_time(2024.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0)
        );
        assert!(make_time(f64::NAN, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0).is_nan());
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("1970-01-01T00:00:00.000Z"), 0.0);
        assert_eq!(parse_date("1970-01-02"), MS_PER_DAY);
        assert_eq!(parse_date("2000-01-01T00:00:00+01:00"), 946_681_200_000.0);
        assert_eq!(parse_date("1970"), 0.0);
        assert_eq!(parse_date("Thu, 01 Jan 1970 00:00:01 GMT"), 1000.0);
        assert_eq!(parse_date(&to_date_string(86_400_000.0)), 86_400_000.0);
        assert!(parse_date("not a date").is_nan());
    }

    #[test]
    fn test_components_are_utc() {
        let result = eval(
            "var d = new Date(Date.UTC(2024, 1, 29, 13, 45, 30, 250)); \
             [d.getFullYear(), d.getMonth(), d.getDate(), d.getDay(), d.getHours(), \
              d.getMinutes(), d.getSeconds(), d.getMilliseconds()].join()",
        );
        assert_eq!(result, Value::from("2024,1,29,4,13,45,30,250"));
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(
            eval("new Date(0).toISOString()"),
            Value::from("1970-01-01T00:00:00.000Z")
        );
        assert_eq!(
            eval("String(new Date(0))"),
            Value::from("Thu Jan 01 1970 00:00:00 GMT+0000 (Coordinated Universal Time)")
        );
        assert_eq!(
            eval("new Date(0).toUTCString()"),
            Value::from("Thu, 01 Jan 1970 00:00:00 GMT")
        );
        assert_eq!(eval("typeof Date()"), Value::from("string"));
    }

    #[test]
    fn test_two_digit_years_and_arithmetic() {
        assert_eq!(eval("new Date(99, 0).getFullYear()"), Value::from(1999));
        assert_eq!(eval("new Date(1000) - new Date(250)"), Value::from(750));
        assert_eq!(eval("new Date(5).getTime() === +new Date(5)"), Value::Boolean(true));
    }

    #[test]
    fn test_unparseable_string_is_range_error() {
        let err = Interpreter::new().run("new Date('garbage')").unwrap_err();
        assert!(err.to_string().contains("Invalid date: garbage"));
        assert!(matches!(eval("Date.parse('garbage')"), Value::Number(n) if n.is_nan()));
    }

    #[test]
    fn test_to_iso_string_of_invalid_date_throws() {
        let mut interp = Interpreter::new();
        let err = interp.run("new Date(NaN).toISOString()").unwrap_err();
        assert!(err.to_string().contains("Invalid time value"));
        assert_eq!(interp.run("String(new Date(NaN))").unwrap(), Value::from("Invalid Date"));
    }
}

//! Literal formatting and parsing per dialect.
//!
//! `parse_literal` inverts `format_literal` for every value the dialect can
//! represent at its literal precision, so formats can be checked by
//! round-tripping.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::dialect::capabilities::{
    BooleanStyle, IntervalStyle, LiteralStyle, StringEscape, StringPrefix, TemporalFormat,
};
use crate::dialect::{Capabilities, Capability, Feature};
use crate::error::{Error, Result};
use crate::value::{ColumnType, Value};

const MICROS_PER_DAY: i128 = 86_400_000_000;
const TICKS_PER_MICRO: i64 = 10;

/// Renders `value` as a literal of the dialect behind `caps`.
pub fn format_literal(caps: &Capabilities, value: &Value, path: &str) -> Result<String> {
    Ok(match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => match caps.boolean_style() {
            BooleanStyle::Native => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            BooleanStyle::Bit | BooleanStyle::Integer => (if *b { "1" } else { "0" }).to_string(),
        },
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(Error::defect(path, format!("float literal {} has no SQL form", f)));
            }
            format!("{:?}", f)
        }
        Value::String(s) => quote_string(string_escape(caps, path)?, s),
        Value::DateTime(dt) => {
            let format = caps.temporal(Feature::DateTimeLiteral, path)?;
            let separator = if matches!(format.style, LiteralStyle::Cast(_)) {
                'T'
            } else {
                ' '
            };
            let text = format!(
                "{}{}{}",
                dt.format("%Y-%m-%d"),
                separator,
                time_text(&dt.time(), format.precision)
            );
            wrap_temporal(format, &text)
        }
        Value::Date(d) => {
            let format = caps.temporal(Feature::DateLiteral, path)?;
            wrap_temporal(format, &d.format("%Y-%m-%d").to_string())
        }
        Value::Time(t) => {
            let format = caps.temporal(Feature::TimeLiteral, path)?;
            wrap_temporal(format, &time_text(t, format.precision))
        }
        Value::Interval(d) => {
            let micros = d.num_microseconds().ok_or_else(|| {
                Error::defect(path, "interval literal out of range")
            })?;
            match interval_style(caps, path)? {
                IntervalStyle::Native => format!("INTERVAL '{}'", interval_text(micros)),
                IntervalStyle::Ticks => micros
                    .checked_mul(TICKS_PER_MICRO)
                    .ok_or_else(|| Error::defect(path, "interval literal out of range"))?
                    .to_string(),
                IntervalStyle::Microseconds => micros.to_string(),
            }
        }
    })
}

/// Parses literal text produced by [`format_literal`] back into a value.
pub fn parse_literal(caps: &Capabilities, ty: ColumnType, text: &str) -> Result<Value> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("NULL") {
        return Ok(Value::Null);
    }
    let bad = || Error::LiteralParse {
        kind: ty.to_string(),
        text: text.to_string(),
    };
    let path = "literal";
    Ok(match ty {
        ColumnType::Bool => match text.to_ascii_uppercase().as_str() {
            "TRUE" | "1" => Value::Bool(true),
            "FALSE" | "0" => Value::Bool(false),
            _ => return Err(bad()),
        },
        ColumnType::Int => Value::Int(text.parse().map_err(|_| bad())?),
        ColumnType::Float => Value::Float(text.parse().map_err(|_| bad())?),
        ColumnType::String => {
            Value::String(unquote_string(string_escape(caps, path)?, text).ok_or_else(bad)?)
        }
        ColumnType::DateTime => {
            let format = caps.temporal(Feature::DateTimeLiteral, path)?;
            let inner = unwrap_temporal(format, text).ok_or_else(bad)?;
            let pattern = if matches!(format.style, LiteralStyle::Cast(_)) {
                "%Y-%m-%dT%H:%M:%S%.f"
            } else {
                "%Y-%m-%d %H:%M:%S%.f"
            };
            Value::DateTime(NaiveDateTime::parse_from_str(&inner, pattern).map_err(|_| bad())?)
        }
        ColumnType::Date => {
            let format = caps.temporal(Feature::DateLiteral, path)?;
            let inner = unwrap_temporal(format, text).ok_or_else(bad)?;
            Value::Date(NaiveDate::parse_from_str(&inner, "%Y-%m-%d").map_err(|_| bad())?)
        }
        ColumnType::Time => {
            let format = caps.temporal(Feature::TimeLiteral, path)?;
            let inner = unwrap_temporal(format, text).ok_or_else(bad)?;
            Value::Time(NaiveTime::parse_from_str(&inner, "%H:%M:%S%.f").map_err(|_| bad())?)
        }
        ColumnType::Interval => {
            let micros = match interval_style(caps, path)? {
                IntervalStyle::Native => {
                    let inner = text
                        .strip_prefix("INTERVAL ")
                        .and_then(unquote_plain)
                        .ok_or_else(bad)?;
                    parse_interval_text(&inner).ok_or_else(bad)?
                }
                IntervalStyle::Ticks => {
                    let ticks: i64 = text.parse().map_err(|_| bad())?;
                    ticks / TICKS_PER_MICRO
                }
                IntervalStyle::Microseconds => text.parse().map_err(|_| bad())?,
            };
            Value::Interval(Duration::microseconds(micros))
        }
    })
}

fn string_escape(caps: &Capabilities, path: &str) -> Result<StringEscape> {
    match caps.require(Feature::StringLiteral, path)? {
        Capability::String(escape) => Ok(escape),
        other => Err(Error::Config(format!(
            "string literal capability has unexpected value {:?}",
            other
        ))),
    }
}

fn interval_style(caps: &Capabilities, path: &str) -> Result<IntervalStyle> {
    match caps.require(Feature::IntervalLiteral, path)? {
        Capability::Interval(style) => Ok(style),
        other => Err(Error::Config(format!(
            "interval literal capability has unexpected value {:?}",
            other
        ))),
    }
}

/// Quotes a string literal. Quotes are doubled; backslashes are doubled
/// only where the dialect treats them as escapes.
pub fn quote_string(escape: StringEscape, s: &str) -> String {
    let mut body = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\'' => body.push_str("''"),
            '\\' if escape.backslash => body.push_str("\\\\"),
            c => body.push(c),
        }
    }
    match escape.prefix {
        StringPrefix::National => format!("N'{}'", body),
        StringPrefix::Escape if escape.backslash && s.contains('\\') => format!("E'{}'", body),
        _ => format!("'{}'", body),
    }
}

fn unquote_string(escape: StringEscape, text: &str) -> Option<String> {
    let (escaped, rest) = match (escape.prefix, text.as_bytes().first()) {
        (StringPrefix::National, Some(b'N')) => (false, &text[1..]),
        (StringPrefix::Escape, Some(b'E')) => (true, &text[1..]),
        // an E prefix is what turns escapes on
        (StringPrefix::Escape, _) => (false, text),
        (_, _) => (escape.backslash, text),
    };
    let body = rest.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                if chars.next() != Some('\'') {
                    return None;
                }
                out.push('\'');
            }
            '\\' if escaped => out.push(chars.next()?),
            c => out.push(c),
        }
    }
    Some(out)
}

fn unquote_plain(text: &str) -> Option<String> {
    Some(text.strip_prefix('\'')?.strip_suffix('\'')?.replace("''", "'"))
}

fn time_text(t: &NaiveTime, precision: u8) -> String {
    let base = t.format("%H:%M:%S").to_string();
    if precision == 0 {
        return base;
    }
    let digits = u32::from(precision.min(9));
    let nanos = t.nanosecond() % 1_000_000_000;
    let fraction = nanos / 10u32.pow(9 - digits);
    format!("{}.{:0width$}", base, fraction, width = digits as usize)
}

fn wrap_temporal(format: TemporalFormat, text: &str) -> String {
    match format.style {
        LiteralStyle::Keyword(keyword) => format!("{} '{}'", keyword, text),
        LiteralStyle::Cast(ty) => format!("CAST('{}' AS {})", text, ty),
        LiteralStyle::Quoted => format!("'{}'", text),
    }
}

fn unwrap_temporal(format: TemporalFormat, text: &str) -> Option<String> {
    match format.style {
        LiteralStyle::Keyword(keyword) => unquote_plain(text.strip_prefix(keyword)?.trim_start()),
        LiteralStyle::Cast(ty) => {
            let inner = text
                .strip_prefix("CAST(")?
                .strip_suffix(')')?
                .strip_suffix(ty)?
                .strip_suffix(" AS ")?;
            unquote_plain(inner)
        }
        LiteralStyle::Quoted => unquote_plain(text),
    }
}

/// `-3 days -04:05:06.789000`: both parts carry the sign of the whole.
fn interval_text(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let abs = i128::from(micros).abs();
    let days = abs / MICROS_PER_DAY;
    let rem = abs % MICROS_PER_DAY;
    format!(
        "{}{} days {}{:02}:{:02}:{:02}.{:06}",
        sign,
        days,
        sign,
        rem / 3_600_000_000,
        rem / 60_000_000 % 60,
        rem / 1_000_000 % 60,
        rem % 1_000_000
    )
}

fn parse_interval_text(text: &str) -> Option<i64> {
    let mut parts = text.split_whitespace();
    let days = parts.next()?;
    if parts.next()? != "days" {
        return None;
    }
    let time = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let negative = days.starts_with('-') || time.starts_with('-');
    let days: i128 = days.trim_start_matches('-').parse().ok()?;
    let mut fields = time.trim_start_matches('-').splitn(3, ':');
    let hours: i128 = fields.next()?.parse().ok()?;
    let minutes: i128 = fields.next()?.parse().ok()?;
    let (seconds, fraction) = fields.next()?.split_once('.')?;
    let seconds: i128 = seconds.parse().ok()?;
    if fraction.len() != 6 {
        return None;
    }
    let fraction: i128 = fraction.parse().ok()?;
    let total = days * MICROS_PER_DAY
        + hours * 3_600_000_000
        + minutes * 60_000_000
        + seconds * 1_000_000
        + fraction;
    i64::try_from(if negative { -total } else { total }).ok()
}

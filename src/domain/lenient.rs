//! Tolerant deserializers for fields coming from the origin.
//!
//! The origin is free to send `2020`, `"2020"`, `null` or `"n/a"` for a
//! number, and `320` where a string is expected. A value of the wrong shape
//! becomes `None` instead of failing the whole listing.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerces a JSON value to a finite `f64`.
#[must_use]
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

pub(crate) fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_number))
}

/// Coerces a JSON value to text. Numbers keep their JSON rendering.
#[must_use]
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_text))
}

pub(crate) fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text(deserializer)?.unwrap_or_default())
}

pub(crate) fn year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(coerce_number)
        .filter(|y| {
            y.fract() == 0.0 && *y >= f64::from(i32::MIN) && *y <= f64::from(i32::MAX)
        })
        .map(|y| y as i32))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_numbers_and_numeric_strings() {
        assert_eq!(coerce_number(&json!(42)), Some(42.0));
        assert_eq!(coerce_number(&json!(" 17.5 ")), Some(17.5));
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_number(&Value::Null), None);
    }

    #[test]
    fn numbers_are_accepted_as_text() {
        assert_eq!(coerce_text(&json!("LE")), Some("LE".to_string()));
        assert_eq!(coerce_text(&json!(320)), Some("320".to_string()));
        assert_eq!(coerce_text(&json!(2.5)), Some("2.5".to_string()));
        assert_eq!(coerce_text(&json!(false)), None);
        assert_eq!(coerce_text(&json!({"name": "LE"})), None);
    }

    #[derive(Debug, Deserialize)]
    struct Year {
        #[serde(default, deserialize_with = "year")]
        year: Option<i32>,
    }

    #[test]
    fn fractional_year_is_unparseable() {
        let Ok(whole) = serde_json::from_value::<Year>(json!({"year": "2020"})) else {
            panic!("numeric string year should decode");
        };
        assert_eq!(whole.year, Some(2020));

        let Ok(fraction) = serde_json::from_value::<Year>(json!({"year": 2020.5})) else {
            panic!("fractional year should decode to None, not fail");
        };
        assert_eq!(fraction.year, None);
    }
}

//! Serde helpers for loosely typed metadata scalars.
//!
//! Topology metadata is written by hand, so values like an event class or a
//! scaling factor show up as `1`, `"1"` or `1.0` depending on the author.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accept any YAML scalar and keep its textual form.
pub fn string_like<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.map(|scalar| match scalar {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(s) => s,
    }))
}

/// Accept an integer, a float (truncated toward zero) or a numeric string.
pub fn int_like<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Int(i)) => Ok(Some(i)),
        Some(Scalar::Float(f)) => Ok(Some(f.trunc() as i64)),
        Some(Scalar::Text(s)) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f.trunc() as i64))
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected an integer, found '{}'", s)))
        }
        Some(Scalar::Bool(b)) => Err(D::Error::custom(format!("expected an integer, found {}", b))),
    }
}

/// Accept a boolean or one of the usual truthy/falsy spellings.
pub fn bool_like<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Bool(b)) => Ok(Some(b)),
        Some(Scalar::Int(i)) => Ok(Some(i != 0)),
        Some(Scalar::Float(f)) => Err(D::Error::custom(format!("expected a boolean, found {}", f))),
        Some(Scalar::Text(s)) => match s.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(D::Error::custom(format!("expected a boolean, found '{}'", s))),
        },
    }
}

/// Distinguish an absent key from an explicit `null`.
///
/// Use together with `#[serde(default)]`: absent yields `None`, `null` yields
/// `Some(None)`.
pub fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

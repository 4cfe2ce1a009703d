//! Text to value conversion
//!
//! Scalars are parsed from trimmed base-10 text and rejected when they do not
//! fit the target type. Booleans accept `true`/`false` in any case as well as
//! `1`/`0`. Strings are taken verbatim.

use crate::core::error::{DatastoreError, Result};
use crate::core::types::{ResourceType, Value};
use std::str::FromStr;
use tracing::error;

/// Parse `text` as a value of type `ty`
///
/// # Examples
///
/// ```
/// use datastore_rs::{parse::parse_value, ResourceType, Value};
///
/// assert_eq!(parse_value(ResourceType::Uint8, " 255 ").unwrap(), Value::Uint8(255));
/// assert!(parse_value(ResourceType::Uint8, "256").is_err());
/// assert_eq!(parse_value(ResourceType::Bool, "TRUE").unwrap(), Value::Bool(true));
/// ```
pub fn parse_value(ty: ResourceType, text: &str) -> Result<Value> {
    match ty {
        ResourceType::Bool => parse_bool(text).map(Value::Bool),
        ResourceType::Uint8 => parse_number(ty, text).map(Value::Uint8),
        ResourceType::Uint32 => parse_number(ty, text).map(Value::Uint32),
        ResourceType::Int8 => parse_number(ty, text).map(Value::Int8),
        ResourceType::Int32 => parse_number(ty, text).map(Value::Int32),
        ResourceType::Float => parse_number(ty, text).map(Value::Float),
        ResourceType::Double => parse_number(ty, text).map(Value::Double),
        ResourceType::String => Ok(Value::String(text.to_owned())),
    }
}

pub fn parse_bool(text: &str) -> Result<bool> {
    let trimmed = text.trim();
    if trimmed == "1" || trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed == "0" || trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid(ResourceType::Bool, text))
    }
}

fn parse_number<T: FromStr>(ty: ResourceType, text: &str) -> Result<T> {
    text.trim().parse::<T>().map_err(|_| invalid(ty, text))
}

fn invalid(ty: ResourceType, text: &str) -> DatastoreError {
    error!("cannot parse {:?} as {}", text, ty);
    DatastoreError::InvalidRepresentation {
        ty,
        text: text.to_owned(),
    }
}

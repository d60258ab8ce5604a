//! Tool-call argument parsing.
//!
//! Each operation declares a typed params struct (see `params`). Arguments are
//! deserialized with serde, then checked by `ToolParams::validate`; the same
//! struct produces the input schema through schemars. Emails and URLs are
//! declared as plain strings (some clients reject `format` keywords) and
//! validated here instead.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde_json::{Map, Value, json};
use thiserror::Error;
use url::Url;

use crate::services::management::ids;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("Missing required argument `{0}`.")]
    Missing(String),
    #[error("{0}")]
    Invalid(String),
}

/// Arguments of one operation.
pub trait ToolParams: DeserializeOwned + JsonSchema {
    fn validate(&self) -> Result<(), ArgError> {
        Ok(())
    }
}

pub fn parse<T: ToolParams>(arguments: &Map<String, Value>) -> Result<T, ArgError> {
    let params: T = serde_json::from_value(Value::Object(arguments.clone())).map_err(|err| {
        let message = err.to_string();
        match message
            .strip_prefix("missing field `")
            .and_then(|rest| rest.strip_suffix('`'))
        {
            Some(field) => ArgError::Missing(field.to_string()),
            None => ArgError::Invalid(format!("Invalid arguments: {message}")),
        }
    })?;
    params.validate()?;
    Ok(params)
}

/// Input schema of `T`, always an object with `properties` and `required`.
pub fn schema<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
        object
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        object
            .entry("required")
            .or_insert_with(|| Value::Array(Vec::new()));
    }
    schema
}

/// Rejects absent-looking required strings, e.g. `"  "`.
pub fn require(value: &str, key: &str) -> Result<(), ArgError> {
    if value.trim().is_empty() {
        Err(ArgError::Missing(key.to_string()))
    } else {
        Ok(())
    }
}

/// Identifier with a fixed prefix, e.g. `org_123`.
pub fn prefixed(value: &str, key: &str, prefix: &str, label: &str) -> Result<(), ArgError> {
    require(value, key)?;
    if ids::has_prefix_shape(value, prefix) {
        Ok(())
    } else {
        Err(ArgError::Invalid(format!("{label} ID must start with {prefix}")))
    }
}

pub fn validate_email(value: &str) -> Result<(), ArgError> {
    let invalid = || ArgError::Invalid(format!("Invalid email passed {value}"));
    if value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if local.is_empty() || !domain_ok {
        return Err(invalid());
    }
    Ok(())
}

pub fn parse_url(value: &str) -> Result<Url, ArgError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(url),
        _ => Err(ArgError::Invalid(format!("Invalid URL(s) passed: {value}"))),
    }
}

/// Optional string where blank means absent.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

/// Optional non-negative integer; numeric strings are accepted and blank means absent.
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| {
                de::Error::custom(format!("expected a non-negative integer, got `{s}`"))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Sample {
        name: String,
        #[serde(default, deserialize_with = "blank_as_none")]
        note: Option<String>,
        #[serde(default, deserialize_with = "lenient_u64")]
        #[schemars(with = "Option<u64>")]
        page: Option<u64>,
    }

    impl ToolParams for Sample {
        fn validate(&self) -> Result<(), ArgError> {
            require(&self.name, "name")
        }
    }

    fn sample(value: Value) -> Result<Sample, ArgError> {
        parse(value.as_object().unwrap())
    }

    #[test]
    fn missing_and_blank_required_values() {
        assert_eq!(
            sample(json!({})).unwrap_err().to_string(),
            "Missing required argument `name`."
        );
        assert_eq!(
            sample(json!({"name": " "})).unwrap_err(),
            ArgError::Missing("name".into())
        );
    }

    #[test]
    fn wrong_type_is_invalid() {
        let err = sample(json!({"name": 3})).unwrap_err().to_string();
        assert!(err.starts_with("Invalid arguments: invalid type"), "{err}");
    }

    #[test]
    fn blank_optionals_are_absent() {
        let parsed = sample(json!({"name": "acme", "note": "  "})).unwrap();
        assert_eq!(parsed.note, None);
        assert_eq!(parsed.page, None);
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        assert_eq!(sample(json!({"name": "a", "page": 5})).unwrap().page, Some(5));
        assert_eq!(sample(json!({"name": "a", "page": "7"})).unwrap().page, Some(7));
        assert_eq!(sample(json!({"name": "a", "page": ""})).unwrap().page, None);
        assert!(sample(json!({"name": "a", "page": -1})).is_err());
        assert!(sample(json!({"name": "a", "page": "x"})).is_err());
    }

    #[test]
    fn schema_lists_required_fields() {
        let schema = schema::<Sample>();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["name"]));
        assert!(schema["properties"].get("page").is_some());
        assert!(schema.get("$schema").is_none());
    }

    #[test]
    fn prefixed_ids() {
        assert!(prefixed("org_42", "organizationId", "org_", "Organization").is_ok());
        assert_eq!(
            prefixed("42", "organizationId", "org_", "Organization"),
            Err(ArgError::Invalid("Organization ID must start with org_".into()))
        );
    }

    #[test]
    fn emails() {
        assert!(validate_email("a@example.com").is_ok());
        assert!(validate_email("a@b@example.com").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn urls_must_be_absolute_http() {
        assert!(parse_url("https://mcp.example.com/mcp").is_ok());
        assert!(parse_url("ftp://mcp.example.com").is_err());
        assert!(parse_url("mcp.example.com").is_err());
    }
}

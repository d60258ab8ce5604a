//! Identifier shapes accepted by the management API: a fixed prefix followed by
//! one or more ASCII letters, digits or underscores.

pub const ENVIRONMENT: &str = "env_";
pub const ORGANIZATION: &str = "org_";
pub const CONNECTION: &str = "conn_";
pub const RESOURCE: &str = "app_";

pub fn has_prefix_shape(value: &str, prefix: &str) -> bool {
    value
        .strip_prefix(prefix)
        .is_some_and(|rest| {
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

pub fn is_environment_id(value: &str) -> bool {
    has_prefix_shape(value, ENVIRONMENT)
}

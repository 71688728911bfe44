use std::{env, fmt::Display, str::FromStr};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads a boolean flag from the environment variable `name`.
pub fn env_flag(name: &str, default: bool) -> bool {
    parse_boolean_flag(env::var(name).ok(), default)
}

/// Parses `value` into `T`. Missing or unparseable values yield `Err` with a human-readable reason, so the caller can
/// decide whether to log and fall back to a default.
pub fn parse_value<T: FromStr>(value: Option<&str>) -> Result<T, String>
where T::Err: Display {
    match value.map(str::trim) {
        None | Some("") => Err("value is not set".to_string()),
        Some(v) => v.parse::<T>().map_err(|e| format!("'{v}' is invalid: {e}")),
    }
}

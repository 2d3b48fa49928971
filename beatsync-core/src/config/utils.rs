//! Configuration utility functions
//!
//! Helpers for reading typed values from environment variables, falling
//! back to a default when the variable is unset or does not parse.

use std::path::PathBuf;
use std::str::FromStr;

fn get_env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparseable value '{val}' for {key}");
            default
        }),
        Err(_) => default,
    }
}

/// Get a string value from an environment variable or use the default
pub fn get_env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

/// Get a path from an environment variable, if set and non-empty
pub fn get_env_optional_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .map(PathBuf::from)
}

/// Get a f32 value from an environment variable or use the default
pub fn get_env_f32(key: &str, default: f32) -> f32 {
    get_env_parsed(key, default)
}

/// Get a u8 value from an environment variable or use the default
pub fn get_env_u8(key: &str, default: u8) -> u8 {
    get_env_parsed(key, default)
}

/// Get a u32 value from an environment variable or use the default
pub fn get_env_u32(key: &str, default: u32) -> u32 {
    get_env_parsed(key, default)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable name so they can run in parallel.

    #[test]
    fn unset_variable_yields_default() {
        assert_eq!(get_env_u32("BEATSYNC_TEST_UNSET_U32", 7), 7);
        assert_eq!(get_env_optional_path("BEATSYNC_TEST_UNSET_PATH"), None);
    }

    #[test]
    fn parses_and_falls_back() {
        unsafe { std::env::set_var("BEATSYNC_TEST_F32", " 0.25 ") };
        assert!((get_env_f32("BEATSYNC_TEST_F32", 1.0) - 0.25).abs() < 1e-6);
        unsafe { std::env::set_var("BEATSYNC_TEST_BAD_U8", "lots") };
        assert_eq!(get_env_u8("BEATSYNC_TEST_BAD_U8", 3), 3);
    }
}

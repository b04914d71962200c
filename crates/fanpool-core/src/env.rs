//! Environment variable helpers
//!
//! All pool knobs read from the environment use the `FP_` prefix and go
//! through these helpers. Unset or unparsable values fall back to the
//! caller's default; nothing here fails.

use std::str::FromStr;
use std::time::Duration;

/// Parse `key` as `T`, `None` when unset or unparsable
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse `key` as `T`, or return `default`
///
/// ```ignore
/// let workers: usize = env_get("FP_WORKERS", 4);
/// ```
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Read `key` as a boolean flag
///
/// "1", "true", "yes", "on" (any case) are true; "0", "false", "no", "off"
/// are false; anything else, or unset, returns `default`.
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Read `key` as a whole number of microseconds
pub fn env_get_micros(key: &str, default: Duration) -> Duration {
    env_get_opt::<u64>(key)
        .map(Duration::from_micros)
        .unwrap_or(default)
}

/// Read `key` as a string, or return `default`
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test owns its variable names; tests run in parallel.

    #[test]
    fn test_unset_returns_default() {
        let val: usize = env_get("__FP_TEST_UNSET__", 42);
        assert_eq!(val, 42);
        assert!(env_get_opt::<usize>("__FP_TEST_UNSET__").is_none());
        assert_eq!(env_get_str("__FP_TEST_UNSET__", "pool"), "pool");
        assert!(env_get_bool("__FP_TEST_UNSET__", true));
    }

    #[test]
    fn test_parse_with_whitespace() {
        std::env::set_var("__FP_TEST_NUM__", " 123 ");
        let val: usize = env_get("__FP_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::remove_var("__FP_TEST_NUM__");
    }

    #[test]
    fn test_invalid_parse_falls_back() {
        std::env::set_var("__FP_TEST_BAD__", "many");
        let val: usize = env_get("__FP_TEST_BAD__", 99);
        assert_eq!(val, 99);
        std::env::remove_var("__FP_TEST_BAD__");
    }

    #[test]
    fn test_bool_variants() {
        for (raw, expected) in [("1", true), ("YES", true), ("on", true), ("0", false), ("off", false)] {
            std::env::set_var("__FP_TEST_BOOL__", raw);
            assert_eq!(env_get_bool("__FP_TEST_BOOL__", !expected), expected, "{}", raw);
        }

        std::env::set_var("__FP_TEST_BOOL__", "maybe");
        assert!(env_get_bool("__FP_TEST_BOOL__", true));
        assert!(!env_get_bool("__FP_TEST_BOOL__", false));

        std::env::remove_var("__FP_TEST_BOOL__");
    }

    #[test]
    fn test_micros() {
        std::env::set_var("__FP_TEST_US__", "250");
        assert_eq!(
            env_get_micros("__FP_TEST_US__", Duration::from_millis(1)),
            Duration::from_micros(250)
        );
        std::env::remove_var("__FP_TEST_US__");

        assert_eq!(
            env_get_micros("__FP_TEST_US__", Duration::from_millis(1)),
            Duration::from_millis(1)
        );
    }
}

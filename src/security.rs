use subtle::ConstantTimeEq;

/// Constant-time string comparison to prevent timing attacks
/// Use this for comparing API keys and other sensitive values
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check a presented admin key against the configured one.
///
/// With no key configured, admin access is disabled entirely.
pub fn authorize(configured: Option<&str>, presented: Option<&str>) -> bool {
    match (configured, presented) {
        (Some(expected), Some(given)) if !expected.is_empty() => {
            constant_time_compare(expected, given)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret123", "secret123"));
        assert!(!constant_time_compare("secret123", "secret124"));
        assert!(!constant_time_compare("secret123", "secret12"));
        assert!(!constant_time_compare("", "secret"));
    }

    #[test]
    fn test_authorize() {
        assert!(authorize(Some("key"), Some("key")));
        assert!(!authorize(Some("key"), Some("nope")));
        assert!(!authorize(Some("key"), None));
        assert!(!authorize(None, Some("key")));
        assert!(!authorize(Some(""), Some("")));
    }
}

//! Duplicate-marker stripping for the canonical-name tier.

use regex::Regex;
use std::sync::OnceLock;

fn duplicate_marker() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Editors append -1, -2, _1 ... _5 when an export name is taken
    PATTERN.get_or_init(|| Regex::new(r"^(?P<stem>.+?)[-_][1-5]$").expect("valid pattern"))
}

/// `base_name` without a trailing duplicate marker, if it has one
pub fn canonical_name(base_name: &str) -> Option<&str> {
    duplicate_marker()
        .captures(base_name)
        .and_then(|caps| caps.name("stem"))
        .map(|stem| stem.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_dash_and_underscore_markers() {
        assert_eq!(canonical_name("IMG_002-1"), Some("IMG_002"));
        assert_eq!(canonical_name("IMG_002-2"), Some("IMG_002"));
        assert_eq!(canonical_name("DSC0042_5"), Some("DSC0042"));
    }

    #[test]
    fn strips_only_one_marker() {
        assert_eq!(canonical_name("IMG_002-1-2"), Some("IMG_002-1"));
    }

    #[test]
    fn leaves_other_names_alone() {
        assert_eq!(canonical_name("IMG_002"), None);
        assert_eq!(canonical_name("IMG_002-6"), None);
        assert_eq!(canonical_name("IMG_002-10"), None);
        assert_eq!(canonical_name("-1"), None);
    }
}

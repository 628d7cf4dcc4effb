//! Solidity version gating.
//!
//! The generated constructor and fallback shapes changed at solidity 0.6.0;
//! the generator picks a shape from the version declared by the source
//! contract's pragma directive.

use semver::Version;

/// Extract the declared minimum version from a pragma requirement string
/// such as `^0.8.0` or `>=0.6.0 <0.9.0`.
pub fn declared_version(requirement: &str) -> Option<Version> {
    let first = requirement.split_whitespace().next()?;
    let trimmed = first.trim_start_matches(['^', '~', '>', '<', '=']);
    Version::parse(trimmed).ok()
}

/// Whether the declared version uses the `constructor` keyword and the
/// `fallback() external payable` form.
pub fn has_modern_constructor(version: &Version) -> bool {
    *version >= Version::new(0, 6, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pragma_forms() {
        assert_eq!(declared_version("^0.8.0"), Some(Version::new(0, 8, 0)));
        assert_eq!(declared_version(">=0.6.0 <0.9.0"), Some(Version::new(0, 6, 0)));
        assert_eq!(declared_version("0.4.21"), Some(Version::new(0, 4, 21)));
        assert_eq!(declared_version("nonsense"), None);
    }

    #[test]
    fn constructor_gate() {
        assert!(has_modern_constructor(&Version::new(0, 8, 17)));
        assert!(has_modern_constructor(&Version::new(0, 6, 0)));
        assert!(!has_modern_constructor(&Version::new(0, 4, 21)));
    }
}

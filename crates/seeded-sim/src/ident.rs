//! URL-safe identifiers derived from seeds.
//!
//! Identifiers have the shape `prefix-<sanitised seed>-<base36 hash>` and
//! only ever contain lowercase ASCII letters, digits, and hyphens, so they
//! can be embedded directly in a route path.
//!
//! # Identifier rules
//!
//! - The seed segment keeps only `[a-z0-9]` after ASCII lowercasing
//! - The seed segment is truncated to the requested length
//! - The hash segment is at most eight base-36 digits

use crate::hash::{stable_hash, to_base36};

/// Maximum number of base-36 digits kept from the seed hash.
pub const HASH_SEGMENT_MAX: usize = 8;

/// Seed segment used when sanitising leaves nothing behind.
const EMPTY_SEGMENT: &str = "x";

/// Builds a stable identifier for a seed.
///
/// The identifier is not collision-proof; two seeds that sanitise to the same
/// prefix and share a hash collide. It is stable for a given seed forever.
///
/// # Examples
///
/// ```
/// use seeded_sim::make_id;
///
/// assert_eq!(make_id("My Slug!!", "sw", 12), "sw-myslug-85tb7l");
/// assert_eq!(make_id("My Slug!!", "sw", 3), "sw-mys-85tb7l");
/// ```
#[must_use]
pub fn make_id(seed: &str, prefix: &str, seed_length: usize) -> String {
    let truncated: String = sanitize_seed(seed).chars().take(seed_length).collect();
    let segment = if truncated.is_empty() {
        EMPTY_SEGMENT.to_owned()
    } else {
        truncated
    };
    let hash: String = to_base36(stable_hash(seed))
        .chars()
        .take(HASH_SEGMENT_MAX)
        .collect();
    format!("{prefix}-{segment}-{hash}")
}

/// Lowercases ASCII letters and drops every character outside `[a-z0-9]`.
#[must_use]
pub fn sanitize_seed(seed: &str) -> String {
    seed.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Returns `true` when `value` is a valid runbook slug.
///
/// Slugs are trimmed, non-empty identifiers composed of lowercase ASCII
/// letters, digits, and hyphens.
///
/// # Examples
///
/// ```
/// use seeded_sim::is_valid_slug;
///
/// assert!(is_valid_slug("aws-hardening-2026"));
/// assert!(!is_valid_slug("AWS Hardening"));
/// assert!(!is_valid_slug(""));
/// ```
#[must_use]
pub fn is_valid_slug(value: &str) -> bool {
    is_trimmed_non_empty(value) && has_allowed_slug_chars(value)
}

fn is_trimmed_non_empty(value: &str) -> bool {
    !value.is_empty() && value.trim() == value
}

fn has_allowed_slug_chars(value: &str) -> bool {
    value
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

#[cfg(test)]
mod tests {
    //! Covers identifier shape and slug validation.

    use rstest::rstest;

    use super::*;

    fn is_url_safe(value: &str) -> bool {
        !value.is_empty() && has_allowed_slug_chars(value)
    }

    /// Checks `^{prefix}-[a-z0-9]{1,max_seed}-[a-z0-9]{1,8}$` without regex.
    fn matches_id_shape(id: &str, prefix: &str, max_seed: usize) -> bool {
        let Some(rest) = id.strip_prefix(prefix).and_then(|r| r.strip_prefix('-')) else {
            return false;
        };
        let parts: Vec<&str> = rest.split('-').collect();
        let [segment, hash] = parts.as_slice() else {
            return false;
        };
        let alnum = |s: &str| s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        (1..=max_seed).contains(&segment.len())
            && (1..=HASH_SEGMENT_MAX).contains(&hash.len())
            && alnum(*segment)
            && alnum(*hash)
    }

    #[test]
    fn make_id_matches_documented_shape() {
        let id = make_id("My Slug!!", "sw", 12);
        assert!(matches_id_shape(&id, "sw", 12), "unexpected id: {id}");
        assert_eq!(id, "sw-myslug-85tb7l");
    }

    #[rstest]
    #[case("aws-hardening-2026")]
    #[case("!!!")]
    #[case("")]
    #[case("Ünïcödé runbook")]
    #[case("xfjfxtf")]
    fn make_id_is_url_safe_for_any_seed(#[case] seed: &str) {
        let id = make_id(seed, "sw", 12);
        assert!(is_url_safe(&id), "unexpected id: {id}");
        assert!(matches_id_shape(&id, "sw", 12), "unexpected id: {id}");
    }

    #[test]
    fn make_id_substitutes_empty_segment() {
        assert_eq!(make_id("!!!", "sw", 12), "sw-x-pa9");
    }

    #[test]
    fn make_id_is_stable() {
        assert_eq!(
            make_id("nginx-rate-limit", "prov", 16),
            make_id("nginx-rate-limit", "prov", 16)
        );
    }

    #[rstest]
    #[case("Ada Lovelace", "adalovelace")]
    #[case("a-b_c.d", "abcd")]
    #[case("ÄBC123", "bc123")]
    fn sanitize_keeps_lowercase_alphanumerics(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_seed(input), expected);
    }

    #[rstest]
    #[case("ssh-hardening", true)]
    #[case("k8s-rbac-2026", true)]
    #[case(" ssh", false)]
    #[case("ssh_hardening", false)]
    #[case("SSH", false)]
    #[case("", false)]
    fn validates_slugs(#[case] slug: &str, #[case] expected: bool) {
        assert_eq!(is_valid_slug(slug), expected);
    }
}

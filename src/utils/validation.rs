//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for validating organization slugs (subdomain labels)
static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]*[a-z0-9]$").unwrap());

/// Validate an organization slug
///
/// Slugs become subdomain labels, so they follow DNS label rules: lowercase
/// alphanumeric plus hyphens, no leading digit or hyphen, max 63 characters.
pub fn validate_slug(slug: &str) -> bool {
    slug.len() >= 2 && slug.len() <= 63 && SLUG_REGEX.is_match(slug)
}

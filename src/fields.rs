//! Importance-tiered field selection.
//!
//! When a request is broad ("show me all users") the plan often arrives with
//! no projection. Rather than returning every field, the executors pick a
//! handful of high-signal columns: identity/status/time fields first, then
//! business/categorical fields, then any remaining free-text field. Large
//! free-text and binary-looking fields are never selected implicitly.

/// Upper bound on implicitly selected fields.
pub const MAX_IMPORTANT_FIELDS: usize = 4;

/// Identity, status and time markers. Highest priority.
const TIER_IDENTITY: &[&str] = &[
    "name", "username", "email", "title", "status", "state", "created", "updated", "date", "time",
];

/// Business/categorical markers.
const TIER_BUSINESS: &[&str] = &[
    "category", "type", "role", "price", "amount", "quantity", "count", "level", "city", "country",
];

/// Fields that must never be selected implicitly: large free text, binary
/// and image-like payloads, secrets, and the raw document id.
const EXCLUDED: &[&str] = &[
    "description",
    "bio",
    "about",
    "content",
    "body",
    "summary",
    "text",
    "comment",
    "image",
    "img",
    "photo",
    "picture",
    "avatar",
    "thumbnail",
    "binary",
    "blob",
    "file",
    "password",
    "secret",
    "token",
    "hash",
    "_id",
];

fn matches_any(field: &str, markers: &[&str]) -> bool {
    let lower = field.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// True for fields that must not appear in an implicit projection.
pub fn is_excluded(field: &str) -> bool {
    matches_any(field, EXCLUDED)
}

/// Pick up to [`MAX_IMPORTANT_FIELDS`] fields from `candidates`, preserving
/// the original order within each tier. Falls back to the first non-excluded
/// fields when nothing matches a tier.
pub fn important_fields<'a, I>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ranked: Vec<(u8, usize, &str)> = candidates
        .into_iter()
        .enumerate()
        .filter(|(_, f)| !is_excluded(f))
        .map(|(idx, f)| {
            let tier = if matches_any(f, TIER_IDENTITY) {
                0
            } else if matches_any(f, TIER_BUSINESS) {
                1
            } else {
                2
            };
            (tier, idx, f)
        })
        .collect();

    ranked.sort_by_key(|&(tier, idx, _)| (tier, idx));
    ranked
        .into_iter()
        .take(MAX_IMPORTANT_FIELDS)
        .map(|(_, _, f)| f.to_string())
        .collect()
}

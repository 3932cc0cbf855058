use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const MAX_SLUG_LEN: usize = 80;

/// Lowercase, keep alphanumerics, collapse everything else into single hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for c in input.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
        if slug.chars().count() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug.chars().all(|c| c.is_alphanumeric() || c == '-')
        && !slug.chars().any(|c| c.is_uppercase())
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or RFC 3339 and returns the
/// value in the `YYYY-MM-DD HH:MM:SS` storage format.
pub fn normalize_post_date(input: &str) -> Option<String> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(format_date(dt.with_timezone(&Utc).naive_utc()));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Some(format_date(ndt));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(format_date)
}

pub fn today(now_fn: fn() -> DateTime<Utc>) -> String {
    format_date(now_fn().naive_utc())
}

fn format_date(ndt: NaiveDateTime) -> String {
    ndt.format("%Y-%m-%d %H:%M:%S").to_string()
}

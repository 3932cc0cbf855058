use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq)]
pub enum LinkError {
    #[error("URL is required")]
    Empty,

    #[error("Invalid URL: {0}")]
    Invalid(String),
}

/// A fresh code of `SHORT_CODE_LEN` characters from `[a-zA-Z0-9]`.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(crate::SHORT_CODE_LEN)
        .map(char::from)
        .collect()
}

/// Draw codes until `is_taken` reports a free one, giving up after
/// `MAX_SHORT_CODE_ATTEMPTS` draws.
pub fn find_free_code<F, E>(mut is_taken: F) -> Result<Option<String>, E>
where
    F: FnMut(&str) -> Result<bool, E>,
{
    let mut rng = rand::thread_rng();
    for _ in 0..crate::MAX_SHORT_CODE_ATTEMPTS {
        let code = generate_code(&mut rng);
        if !is_taken(&code)? {
            return Ok(Some(code));
        }
    }
    Ok(None)
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() == crate::SHORT_CODE_LEN && code.chars().all(|c| c.is_ascii_alphanumeric())
}

fn has_scheme(input: &str) -> bool {
    match input.find("://") {
        Some(idx) if idx > 0 => {
            let scheme = &input[..idx];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        _ => false,
    }
}

/// Trim, default the scheme to `https://` and check that the result parses
/// with a host. Returns the normalized string, not the re-serialized `Url`.
pub fn normalize_url(input: &str) -> Result<String, LinkError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LinkError::Empty);
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).map_err(|e| LinkError::Invalid(e.to_string()))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(LinkError::Invalid("missing host".into()));
    }

    Ok(candidate)
}

/// Redirect targets must additionally be plain web URLs.
pub fn redirect_target(input: &str) -> Result<Url, LinkError> {
    let normalized = normalize_url(input)?;
    let url = Url::parse(&normalized).map_err(|e| LinkError::Invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LinkError::Invalid(format!("unsupported scheme '{}'", other))),
    }
}

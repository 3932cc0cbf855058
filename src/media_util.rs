use std::path::{Component, Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;

/// File extension for the image types we accept, `None` for anything else.
pub fn guess_extension(content_type: Option<&str>) -> Option<&'static str> {
    let m = content_type?.parse::<mime::Mime>().ok()?;
    match (m.type_(), m.subtype()) {
        (mime::IMAGE, mime::JPEG) => Some("jpg"),
        (mime::IMAGE, mime::PNG) => Some("png"),
        (mime::IMAGE, mime::GIF) => Some("gif"),
        (mime::IMAGE, mime::SVG) => Some("svg"),
        (mime::IMAGE, sub) if sub.as_str() == "webp" => Some("webp"),
        _ => None,
    }
}

/// `<unix millis>-<random suffix>.<ext>`
pub fn upload_filename(now_millis: i64, extension: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{}-{}.{}", now_millis, suffix.to_lowercase(), extension)
}

/// Resolve a request path below `root`, refusing anything that could step
/// outside it.
pub fn resolve_under(root: &Path, requested: &str) -> Option<PathBuf> {
    if requested.is_empty() || requested.contains('\\') || requested.contains('\0') {
        return None;
    }

    let relative = Path::new(requested);
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            _ => return None,
        }
    }

    if requested.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return None;
    }

    Some(resolved)
}

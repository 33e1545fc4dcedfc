use std::path::Path;

/// Extracts the lowercased extension (without the dot) from an uploaded
/// filename. Returns `None` for names with no extension or an empty stem.
pub fn extension_of(filename: &str) -> Option<String> {
    let name = Path::new(filename).file_name()?.to_str()?;
    let (stem, ext) = name.rsplit_once('.')?;

    if stem.is_empty() || ext.is_empty() {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}

/// Returns the base name of a stored reference path, e.g.
/// `model-170...-42.glb` from `/uploads/models/model-170...-42.glb`.
pub fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Build a safe `Content-Disposition: attachment` header value.
///
/// Strips characters that could break out of the quoted filename or inject
/// headers; falls back to a generic name if nothing safe remains.
pub fn attachment_disposition(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    format!("attachment; filename=\"{ascii_name}\"")
}

/// Slug helpers used as the import deduplication key.

/// Turn arbitrary text into a URL-safe slug.
///
/// Lowercases, keeps alphanumerics, and collapses every other run of characters
/// into a single `-`. Returns an empty string when nothing survives.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Derive a slug from the last path segment of a permalink.
///
/// Accepts absolute URLs and bare paths. Query strings and fragments are ignored,
/// so `https://blog.example.com/?p=12` yields `None`.
pub fn slug_from_permalink(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    let path = match url::Url::parse(link) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => link
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    path.split('/')
        .rev()
        .find(|segment| !segment.trim().is_empty())
        .map(|segment| segment.trim().to_string())
}

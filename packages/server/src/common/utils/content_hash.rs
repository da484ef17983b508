use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest for image ids.
const IMAGE_ID_LEN: usize = 32;

/// Deterministic storage id for a remote image.
///
/// Derived from the SHA-256 of the resolved URL, so downloading the same URL twice
/// (even from separate task runs that share no checkpoint) always lands on the same
/// id in the image store.
pub fn image_id_for_url(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(IMAGE_ID_LEN);
    id
}

/// Normalize comment text for duplicate detection.
///
/// Only surrounding whitespace is ignored; interior text must match exactly.
pub fn normalize_comment_content(content: &str) -> String {
    content.trim().to_string()
}

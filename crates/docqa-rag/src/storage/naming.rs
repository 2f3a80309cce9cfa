//! Collection naming policy

use std::path::Path;

use crate::config::{CollectionConfig, CollectionNaming};
use crate::types::hash_content;

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 63;

/// Hex digits of the content hash appended to lossy names
const DIGEST_LEN: usize = 8;

/// Sanitise a raw name to `[A-Za-z0-9._-]`, 3 to 63 characters
///
/// Other ASCII characters become `_`; the name starts and ends alphanumeric.
/// When non-ASCII characters are dropped or the name is cut to length, a
/// short digest of the raw name is appended so distinct inputs stay distinct.
pub fn sanitize_collection_name(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = mapped.trim_matches(|c: char| !c.is_ascii_alphanumeric());

    if raw.is_ascii() && trimmed.len() <= MAX_LEN {
        let mut name = trimmed.to_string();
        while name.len() < MIN_LEN {
            name.push('0');
        }
        return name;
    }

    let digest = hash_content(raw.as_bytes());
    let digest = &digest[..DIGEST_LEN];
    let mut name: String = trimmed.chars().take(MAX_LEN - DIGEST_LEN - 1).collect();
    while name.ends_with(|c: char| !c.is_ascii_alphanumeric()) {
        name.pop();
    }

    if name.is_empty() {
        digest.to_string()
    } else {
        format!("{}_{}", name, digest)
    }
}

/// Collection a file is indexed into
pub fn collection_name_for(config: &CollectionConfig, filename: &str) -> String {
    match config.naming {
        CollectionNaming::Fixed => sanitize_collection_name(&config.fixed_name),
        CollectionNaming::PerFile => {
            let stem = Path::new(filename)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(filename);
            sanitize_collection_name(&format!("{}{}", config.prefix, stem))
        }
    }
}

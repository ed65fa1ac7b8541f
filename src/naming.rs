//! Centralized naming for archive entries and folders.
//!
//! Every output file inside the archive is named from its source's display
//! name: the stem (everything before the last `.`) plus the extension of the
//! current output format. This module owns that derivation, the collision
//! rule, and folder-name sanitizing, so the packager never builds names by
//! hand.
//!
//! ## Collisions
//!
//! Two sources can share a stem (`dawn.jpg` and `dawn.png`). Every item whose
//! stem collides gets its id appended (`dawn-3.jpeg`, `dawn-7.jpeg`), which
//! is deterministic and never overwrites an entry.

use crate::registry::ItemId;
use std::collections::{HashMap, HashSet};

/// Folder name used when the requested one sanitizes to nothing.
pub const FALLBACK_FOLDER: &str = "images";

/// Stem used when a display name has no usable characters.
const FALLBACK_STEM: &str = "image";

/// Characters that never survive into an entry or folder name.
fn is_forbidden(c: char) -> bool {
    c == '/' || c == '\\' || c.is_control()
}

fn strip_forbidden(name: &str) -> String {
    name.chars().filter(|&c| !is_forbidden(c)).collect()
}

/// Display name without its last extension.
///
/// - `"dawn.jpg"` → `"dawn"`
/// - `"dawn.final.jpg"` → `"dawn.final"`
/// - `".hidden"` → `".hidden"`
/// - `"README"` → `"README"`
pub fn source_stem(display_name: &str) -> &str {
    match display_name.rfind('.') {
        Some(0) | None => display_name,
        Some(dot) => &display_name[..dot],
    }
}

/// Clean a user-supplied archive folder name.
///
/// Path separators and control characters are stripped and surrounding
/// whitespace trimmed. Anything that would still escape or alias the
/// folder (`""`, `"."`, `".."`) becomes [`FALLBACK_FOLDER`].
pub fn sanitize_folder_name(name: &str) -> String {
    let cleaned = strip_forbidden(name);
    let trimmed = cleaned.trim();
    match trimmed {
        "" | "." | ".." => FALLBACK_FOLDER.to_string(),
        other => other.to_string(),
    }
}

fn clean_stem(display_name: &str) -> String {
    let stem = strip_forbidden(source_stem(display_name));
    let stem = stem.trim();
    if stem.is_empty() || stem == "." || stem == ".." {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// Unique `stem.extension` file names, one per input, in input order.
pub fn unique_entry_names(items: &[(ItemId, &str)], extension: &str) -> Vec<String> {
    let stems: Vec<String> = items.iter().map(|(_, name)| clean_stem(name)).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for stem in &stems {
        *counts.entry(stem.as_str()).or_default() += 1;
    }

    let mut used = HashSet::new();
    items
        .iter()
        .zip(&stems)
        .map(|((id, _), stem)| {
            let mut candidate = if counts[stem.as_str()] > 1 {
                format!("{stem}-{id}")
            } else {
                stem.clone()
            };
            // A plain stem can still equal another item's disambiguated one.
            while !used.insert(format!("{candidate}.{extension}")) {
                candidate = format!("{candidate}-{id}");
            }
            format!("{candidate}.{extension}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::registry_with;

    fn ids(n: usize) -> Vec<ItemId> {
        let names: Vec<(&str, u32, u32)> = (0..n).map(|_| ("x", 1, 1)).collect();
        registry_with(&names).1
    }

    #[test]
    fn stem_drops_last_extension() {
        assert_eq!(source_stem("dawn.jpg"), "dawn");
        assert_eq!(source_stem("dawn.final.jpg"), "dawn.final");
    }

    #[test]
    fn stem_keeps_dotfiles_and_bare_names() {
        assert_eq!(source_stem(".hidden"), ".hidden");
        assert_eq!(source_stem("README"), "README");
    }

    #[test]
    fn folder_strips_separators_and_controls() {
        assert_eq!(sanitize_folder_name("../etc/passwd"), "..etcpasswd");
        assert_eq!(sanitize_folder_name("a\\b\u{7}c"), "abc");
        assert_eq!(sanitize_folder_name("  trips 2024 "), "trips 2024");
    }

    #[test]
    fn folder_falls_back_when_empty() {
        assert_eq!(sanitize_folder_name(""), "images");
        assert_eq!(sanitize_folder_name("///"), "images");
        assert_eq!(sanitize_folder_name(".."), "images");
        assert_eq!(sanitize_folder_name("\n\t"), "images");
    }

    #[test]
    fn unique_names_use_extension() {
        let ids = ids(2);
        let names = unique_entry_names(&[(ids[0], "a.png"), (ids[1], "b.jpg")], "webp");
        assert_eq!(names, vec!["a.webp", "b.webp"]);
    }

    #[test]
    fn colliding_stems_get_ids() {
        let ids = ids(3);
        let names = unique_entry_names(
            &[(ids[0], "dawn.jpg"), (ids[1], "dusk.jpg"), (ids[2], "dawn.png")],
            "jpeg",
        );
        assert_eq!(
            names,
            vec![
                format!("dawn-{}.jpeg", ids[0]),
                "dusk.jpeg".to_string(),
                format!("dawn-{}.jpeg", ids[2]),
            ]
        );
    }

    #[test]
    fn suffixed_name_cannot_shadow_plain_stem() {
        let ids = ids(3);
        // "a-1" is both a real stem and the disambiguated form of "a" for id 1.
        let plain = format!("a-{}.png", ids[0]);
        let names = unique_entry_names(
            &[(ids[0], "a.png"), (ids[1], "a.jpg"), (ids[2], plain.as_str())],
            "png",
        );
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), 3, "{names:?}");
    }

    #[test]
    fn names_are_deterministic() {
        let ids = ids(2);
        let input = [(ids[0], "x.jpg"), (ids[1], "x.gif")];
        assert_eq!(unique_entry_names(&input, "png"), unique_entry_names(&input, "png"));
    }

    #[test]
    fn unusable_stem_falls_back() {
        let ids = ids(1);
        assert_eq!(unique_entry_names(&[(ids[0], "/.jpg")], "png"), vec!["image.png"]);
    }
}

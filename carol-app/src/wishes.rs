//! Wish list lookup backed by a JSON file.
//!
//! `assets/wishes.json` stands in for a database. It is located by walking
//! up from the current directory (so `cargo run` works from any crate in
//! the workspace) and re-read on every tool invocation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Workspace-relative path of the wish list file.
pub const WISHES_FILE: &str = "assets/wishes.json";

/// One entry on the wish list: a person and their wishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishItem {
    pub name: String,
    pub wishes: Vec<String>,
}

/// Load all wish items from [`WISHES_FILE`].
///
/// # Errors
/// Fails when the file cannot be found in any parent directory, read, or
/// parsed.
pub fn load_wish_items() -> anyhow::Result<Vec<WishItem>> {
    let start = std::env::current_dir().context("resolving current directory")?;
    let path = find_upwards(&start, WISHES_FILE)
        .with_context(|| format!("'{WISHES_FILE}' not found in any parent directory"))?;
    read_wish_items(&path)
}

/// Read and parse a wish list file.
pub fn read_wish_items(path: &Path) -> anyhow::Result<Vec<WishItem>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Case-insensitive lookup of a person's wishes, joined with ", ".
/// Unknown names yield an empty string.
pub fn wishlist_for(items: &[WishItem], name: &str) -> String {
    items
        .iter()
        .find(|item| item.name.eq_ignore_ascii_case(name))
        .map(|item| item.wishes.join(", "))
        .unwrap_or_default()
}

/// Search for `relative` in `start` and each of its parents.
fn find_upwards(start: &Path, relative: &str) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(relative);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn sample_items() -> Vec<WishItem> {
        vec![
            WishItem {
                name: "Emma".into(),
                wishes: vec!["a wooden sleigh".into(), "a picture book".into()],
            },
            WishItem {
                name: "Noah".into(),
                wishes: vec!["a toy train".into()],
            },
        ]
    }

    #[test]
    fn parses_wish_items_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wishes.json");
        fs::write(
            &path,
            r#"[{"name": "Emma", "wishes": ["a wooden sleigh", "a picture book"]}]"#,
        )
        .unwrap();

        let items = read_wish_items(&path).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Emma");
        assert_eq!(items[0].wishes.len(), 2);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wishes.json");
        fs::write(&path, "{not json").unwrap();
        assert!(read_wish_items(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_wish_items(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let items = sample_items();
        assert_eq!(
            wishlist_for(&items, "emma"),
            "a wooden sleigh, a picture book"
        );
        assert_eq!(wishlist_for(&items, "NOAH"), "a toy train");
    }

    #[test]
    fn unknown_names_yield_an_empty_wishlist() {
        assert_eq!(wishlist_for(&sample_items(), "Grinch"), "");
    }

    #[test]
    fn find_upwards_walks_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/wishes.json"), "[]").unwrap();

        let found = find_upwards(&nested, "assets/wishes.json").unwrap();
        assert_eq!(found, dir.path().join("assets/wishes.json"));
    }

    #[test]
    fn find_upwards_returns_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_upwards(dir.path(), "assets/nope.json").is_none());
    }

    #[test]
    fn workspace_wish_file_is_present_and_valid() {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        let path = find_upwards(manifest_dir, WISHES_FILE)
            .expect("assets/wishes.json missing from the workspace");
        let items = read_wish_items(&path).unwrap();
        assert!(!items.is_empty());
    }
}

//! Snapshot artifact - every post's id, raw body and metadata in one JSON file
//!
//! The snapshot is rebuilt wholesale on every write and is never read back
//! as a source of truth.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::content::Post;

/// Snapshot file name inside the snapshot directory
pub const SNAPSHOT_FILE: &str = "posts.json";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build one snapshot entry: `id`, `content`, then the post's metadata
fn entry(post: &Post) -> Result<Value, SnapshotError> {
    let mut map = Map::new();
    map.insert("id".to_string(), Value::String(post.id.clone()));
    map.insert("content".to_string(), Value::String(post.content.clone()));

    if let Value::Object(meta) = serde_json::to_value(post)? {
        for (key, value) in meta {
            if key != "id" && key != "contentHtml" {
                map.insert(key, value);
            }
        }
    }
    Ok(Value::Object(map))
}

/// Write `posts` (already in listing order) to `<dir>/posts.json`
pub fn write(dir: &Path, posts: &[Post]) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(dir)?;

    let entries = posts.iter().map(entry).collect::<Result<Vec<_>, _>>()?;
    let content = serde_json::to_string_pretty(&entries)?;

    let path = dir.join(SNAPSHOT_FILE);
    fs::write(&path, content)?;
    tracing::debug!("Snapshot written to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FrontMatter;
    use tempfile::TempDir;

    fn post(id: &str, source: &str) -> Post {
        let (fm, body) = FrontMatter::parse(source);
        Post::from_parts(id.to_string(), fm, body).unwrap()
    }

    #[test]
    fn test_entry_key_order() {
        let p = post(
            "hello",
            "---\ntitle: Hello\ndate: 2025-01-02\ntags: [a]\nseries: intro\n---\nBody",
        );
        let value = entry(&p).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys[0], "id");
        assert_eq!(keys[1], "content");
        assert!(keys.contains(&"title"));
        assert!(keys.contains(&"series"));
        assert_eq!(value["content"], "Body");
        assert_eq!(value["tags"][0], "a");
    }

    #[test]
    fn test_write_replaces_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join(".json");

        write(&out, &[post("a", "---\ndate: 2025-01-01\n---\nA")]).unwrap();
        let path = write(&out, &[post("b", "---\ndate: 2025-01-02\n---\nB")]).unwrap();

        let json: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        let list = json.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["id"], "b");
    }

    #[test]
    fn test_write_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        assert!(write(&blocker.join("sub"), &[]).is_err());
    }
}

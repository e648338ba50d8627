//! Filesystem helpers for theme directories.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Recursively copy `src` into `dst`, creating `dst` and any intermediate
/// directories. Returns the number of files copied.
pub async fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut copied = 0u64;
    let mut pending: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from, to)) = pending.pop() {
        tokio::fs::create_dir_all(&to).await?;

        let mut entries = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let from_path = entry.path();
            let to_path = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((from_path, to_path));
            } else {
                tokio::fs::copy(&from_path, &to_path).await?;
                copied += 1;
            }
        }
    }

    debug!(
        src = %src.display(),
        dst = %dst.display(),
        files = copied,
        "copied directory tree"
    );
    Ok(copied)
}

/// Write a utf-8 text file, creating parent directories as needed.
/// Overwrites any existing content.
pub async fn write_text(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}

/// Read a utf-8 text file.
pub async fn read_text(path: &Path) -> io::Result<String> {
    tokio::fs::read_to_string(path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::write(src.join("top.txt"), "top").unwrap();
        std::fs::write(src.join("a/mid.txt"), "mid").unwrap();
        std::fs::write(src.join("a/b/leaf.txt"), "leaf").unwrap();

        let dst = dir.path().join("dst");
        let copied = copy_dir_recursive(&src, &dst).await.unwrap();

        assert_eq!(copied, 3);
        assert_eq!(std::fs::read_to_string(dst.join("top.txt")).unwrap(), "top");
        assert_eq!(
            std::fs::read_to_string(dst.join("a/b/leaf.txt")).unwrap(),
            "leaf"
        );
    }

    #[tokio::test]
    async fn copies_empty_directories() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("empty")).unwrap();

        let dst = dir.path().join("dst");
        let copied = copy_dir_recursive(&src, &dst).await.unwrap();

        assert_eq!(copied, 0);
        assert!(dst.join("empty").is_dir());
    }

    #[tokio::test]
    async fn write_text_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/nested/file.css");

        write_text(&path, ":root {}").await.unwrap();

        assert_eq!(read_text(&path).await.unwrap(), ":root {}");
    }
}

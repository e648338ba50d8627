//! Snapshot of the live theme directory, taken before any write of a run.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

/// Where a run's pre-mutation snapshot lives. The copied directory tree
/// itself is the artifact of record; this struct only points at it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BackupRecord {
    pub source_path: String,
    pub backup_path: String,
    pub timestamp: DateTime<Utc>,
}

/// Recursively copy the live theme directory to a timestamped sibling path.
/// Must complete before any other stage writes to the live path; on error
/// the caller aborts the run with the live directory untouched.
pub async fn snapshot(theme_dir: &Path, run_id: Uuid) -> io::Result<BackupRecord> {
    let timestamp = Utc::now();
    let backup_path = backup_path_for(theme_dir, timestamp, run_id);

    let copied = utils::fs::copy_dir_recursive(theme_dir, &backup_path).await?;

    info!(
        theme_dir = %theme_dir.display(),
        backup = %backup_path.display(),
        files = copied,
        "Theme backup: snapshot complete"
    );

    Ok(BackupRecord {
        source_path: theme_dir.display().to_string(),
        backup_path: backup_path.display().to_string(),
        timestamp,
    })
}

/// Sibling of the live directory, named with a second-resolution UTC stamp
/// plus a run-id fragment so concurrent-second runs cannot collide.
fn backup_path_for(theme_dir: &Path, timestamp: DateTime<Utc>, run_id: Uuid) -> std::path::PathBuf {
    let name = theme_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "theme".to_string());
    let run_fragment = &run_id.simple().to_string()[..8];
    let file_name = format!(
        "{name}.backup.{}.{run_fragment}",
        timestamp.format("%Y%m%d%H%M%S")
    );
    match theme_dir.parent() {
        Some(parent) => parent.join(file_name),
        None => std::path::PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_copies_full_tree() {
        let dir = tempfile::tempdir().unwrap();
        let theme = dir.path().join("theme");
        std::fs::create_dir_all(theme.join("ui")).unwrap();
        std::fs::create_dir_all(theme.join("styles")).unwrap();
        std::fs::write(theme.join("ui/header.html"), "<header/>").unwrap();
        std::fs::write(theme.join("styles/theme.css"), ":root {}").unwrap();

        let record = snapshot(&theme, Uuid::new_v4()).await.unwrap();

        let backup = Path::new(&record.backup_path);
        assert!(backup.parent().unwrap().ends_with(dir.path().file_name().unwrap()));
        assert_eq!(
            std::fs::read_to_string(backup.join("ui/header.html")).unwrap(),
            "<header/>"
        );
        assert_eq!(
            std::fs::read_to_string(backup.join("styles/theme.css")).unwrap(),
            ":root {}"
        );
    }

    #[tokio::test]
    async fn snapshot_of_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        assert!(snapshot(&missing, Uuid::new_v4()).await.is_err());
    }

    #[test]
    fn backup_paths_differ_per_run() {
        let stamp = Utc::now();
        let theme = Path::new("/sites/acme/theme");
        let a = backup_path_for(theme, stamp, Uuid::new_v4());
        let b = backup_path_for(theme, stamp, Uuid::new_v4());

        assert_ne!(a, b);
        assert!(a.starts_with("/sites/acme"));
        assert!(a.file_name().unwrap().to_string_lossy().starts_with("theme.backup."));
    }
}

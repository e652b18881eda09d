//! Bounded retention for result artifacts kept for debugging.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Remove artifacts older than `max_age`, then the oldest ones until at most
/// `max_entries` remain. Returns how many files were removed.
///
/// Only `*.json` files directly inside `dir` are considered. A missing
/// directory is treated as empty.
pub async fn prune_artifacts(dir: &Path, max_entries: usize, max_age: Duration) -> io::Result<usize> {
    let mut entries: Vec<(PathBuf, SystemTime)> = Vec::new();
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => continue,
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push((path, modified));
    }

    let now = SystemTime::now();
    let mut removed = 0;
    let mut kept = Vec::with_capacity(entries.len());
    for (path, modified) in entries {
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            if remove(&path).await {
                removed += 1;
            }
        } else {
            kept.push((path, modified));
        }
    }

    if kept.len() <= max_entries {
        return Ok(removed);
    }

    kept.sort_by_key(|(_, modified)| *modified);
    let excess = kept.len() - max_entries;
    for (path, _) in kept.into_iter().take(excess) {
        if remove(&path).await {
            removed += 1;
        }
    }

    Ok(removed)
}

async fn remove(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(artifact = %path.display(), "Could not prune artifact: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let removed = prune_artifacts(&tmp.path().join("absent"), 10, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn keeps_newest_within_count_bound() {
        let tmp = tempfile::tempdir().unwrap();
        for idx in 0..5 {
            std::fs::write(tmp.path().join(format!("plan-{}.json", idx)), "{}").unwrap();
            // Distinct modification times.
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        std::fs::write(tmp.path().join("notes.txt"), "keep me").unwrap();

        let removed = prune_artifacts(tmp.path(), 2, Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 3);
        assert!(tmp.path().join("plan-3.json").exists());
        assert!(tmp.path().join("plan-4.json").exists());
        assert!(!tmp.path().join("plan-0.json").exists());
        assert!(tmp.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn removes_expired_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("old.json"), "{}").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let removed = prune_artifacts(tmp.path(), 100, Duration::from_millis(10)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!tmp.path().join("old.json").exists());
    }
}

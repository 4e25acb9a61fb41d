//! Append-only group digest store.
//!
//! Monitored group chatter is logged to disk for a separate daily-digest
//! process to consume. Layout: `<base>/<group dir>/<YYYY-MM-DD>.ndjson`,
//! one JSON record per line. Entries are only ever appended; nothing in
//! this crate reads them back.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// One logged group message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLogEntry {
    /// Unix timestamp in seconds, as reported by the network.
    pub ts: i64,
    /// Phone-number JID of the message author (may be empty).
    pub sender: String,
    pub content: String,
}

/// Date-partitioned, per-group NDJSON log.
pub struct GroupLogStore {
    base_dir: PathBuf,
}

impl GroupLogStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory segment for a group JID, safe for the filesystem.
    pub fn group_dir_name(group_jid: &str) -> String {
        group_jid.replace('@', "_at_")
    }

    /// Append one entry to today's (UTC) log file for `group_jid`.
    ///
    /// The record plus terminator goes out in a single `write_all`, so two
    /// appends to the same file never interleave partial lines.
    pub async fn append(&self, group_jid: &str, entry: &GroupLogEntry) -> std::io::Result<()> {
        let dir = self.base_dir.join(Self::group_dir_name(group_jid));
        tokio::fs::create_dir_all(&dir).await?;

        let file_path = dir.join(format!("{}.ndjson", Utc::now().format("%Y-%m-%d")));

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&file_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(group = %group_jid, "Logged group message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: i64, content: &str) -> GroupLogEntry {
        GroupLogEntry {
            ts,
            sender: "456".into(),
            content: content.into(),
        }
    }

    fn today_file(dir: &std::path::Path, group_jid: &str) -> PathBuf {
        dir.join(GroupLogStore::group_dir_name(group_jid))
            .join(format!("{}.ndjson", Utc::now().format("%Y-%m-%d")))
    }

    #[test]
    fn group_dir_name_replaces_separator() {
        assert_eq!(GroupLogStore::group_dir_name("G1@g.net"), "G1_at_g.net");
        assert_eq!(GroupLogStore::group_dir_name("no-separator"), "no-separator");
    }

    #[tokio::test]
    async fn append_creates_dated_file_with_record() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GroupLogStore::new(tmp.path());

        store.append("G1@g.net", &entry(1_700_000_000, "yo")).await.unwrap();

        let contents = tokio::fs::read_to_string(today_file(tmp.path(), "G1@g.net"))
            .await
            .unwrap();
        let parsed: GroupLogEntry = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(parsed, entry(1_700_000_000, "yo"));
    }

    #[tokio::test]
    async fn appends_accumulate_without_rewriting() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GroupLogStore::new(tmp.path());

        store.append("G1@g.net", &entry(1, "first")).await.unwrap();
        store.append("G1@g.net", &entry(2, "second")).await.unwrap();

        let contents = tokio::fs::read_to_string(today_file(tmp.path(), "G1@g.net"))
            .await
            .unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: GroupLogEntry = serde_json::from_str(lines[0]).unwrap();
        let second: GroupLogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first.content, "first");
        assert_eq!(second.content, "second");
    }

    #[tokio::test]
    async fn concurrent_appends_yield_complete_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GroupLogStore::new(tmp.path());

        let long_a = "a".repeat(2048);
        let long_b = "b".repeat(2048);
        let entry_a = entry(1, &long_a);
        let entry_b = entry(2, &long_b);
        let (ra, rb) = tokio::join!(
            store.append("G1@g.net", &entry_a),
            store.append("G1@g.net", &entry_b),
        );
        ra.unwrap();
        rb.unwrap();

        let contents = tokio::fs::read_to_string(today_file(tmp.path(), "G1@g.net"))
            .await
            .unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            // every line must parse on its own — no interleaved fragments
            let parsed: GroupLogEntry = serde_json::from_str(line).unwrap();
            assert!(parsed.content.chars().all(|c| c == 'a') || parsed.content.chars().all(|c| c == 'b'));
        }
    }

    #[tokio::test]
    async fn groups_are_partitioned_by_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GroupLogStore::new(tmp.path());

        store.append("G1@g.net", &entry(1, "one")).await.unwrap();
        store.append("G2@g.net", &entry(2, "two")).await.unwrap();

        assert!(today_file(tmp.path(), "G1@g.net").exists());
        assert!(today_file(tmp.path(), "G2@g.net").exists());
    }

    #[tokio::test]
    async fn record_shape_matches_digest_contract() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GroupLogStore::new(tmp.path());

        store.append("G1@g.net", &entry(1_700_000_000, "yo")).await.unwrap();

        let contents = tokio::fs::read_to_string(today_file(tmp.path(), "G1@g.net"))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(value["ts"], 1_700_000_000_i64);
        assert_eq!(value["sender"], "456");
        assert_eq!(value["content"], "yo");
    }
}

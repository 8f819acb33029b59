//! The access log: one JSON document mapping each visitor id to the
//! history of their verifications.
//!
//! Every append rewrites the whole document. The new content is written to
//! a temporary file next to the log and renamed over it, so readers never
//! observe a half-written file. Appends from this process are serialized;
//! separate processes writing the same file are not coordinated and the
//! last writer wins.

use crate::client_info::ClientInfo;
use crate::metrics_defs::RECORDER_FAILURES;
use crate::oauth::User;
use chrono::{SecondsFormat, Utc};
use geo::GeoRecord;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shared::counter;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(thiserror::Error, Debug)]
pub enum RecorderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("access log {path:?} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One verification of one visitor.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AccessRecord {
    pub visitor_id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub discriminator: Option<String>,
    pub email: Option<String>,
    pub locale: Option<String>,
    pub verified: Option<bool>,
    pub mfa_enabled: Option<bool>,
    pub avatar_url: Option<String>,
    pub geo: GeoRecord,
    pub client: ClientInfo,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

impl AccessRecord {
    pub fn new(user: &User, geo: GeoRecord, client: ClientInfo) -> Self {
        AccessRecord {
            visitor_id: user.id.clone(),
            username: user.username.clone(),
            global_name: user.global_name.clone(),
            discriminator: user.discriminator.clone(),
            email: user.email.clone(),
            locale: user.locale.clone(),
            verified: user.verified,
            mfa_enabled: user.mfa_enabled,
            avatar_url: user.avatar_url(),
            geo,
            client,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct VisitorHistory {
    pub history: Vec<AccessRecord>,
}

/// Visitors in the order they were first seen.
pub type AccessLog = IndexMap<String, VisitorHistory>;

pub struct Recorder {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Recorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Recorder {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds a record to the end of the visitor's history, creating the
    /// history (and the file) if needed.
    pub fn append(&self, visitor_id: &str, record: AccessRecord) -> Result<(), RecorderError> {
        // The guard protects no data, so a poisoned lock is still usable.
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let result = self.load().and_then(|mut log| {
            log.entry(visitor_id.to_string())
                .or_default()
                .history
                .push(record);
            self.persist(&log)
        });

        if result.is_err() {
            counter!(RECORDER_FAILURES).increment(1);
        }
        result
    }

    pub fn history(&self, visitor_id: &str) -> Result<Vec<AccessRecord>, RecorderError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut log = self.load()?;
        Ok(log
            .swap_remove(visitor_id)
            .map(|visitor| visitor.history)
            .unwrap_or_default())
    }

    /// Reads the whole log. A missing or blank file is an empty log.
    pub fn load(&self) -> Result<AccessLog, RecorderError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(AccessLog::new()),
            Err(e) => return Err(e.into()),
        };

        if data.trim().is_empty() {
            return Ok(AccessLog::new());
        }

        serde_json::from_str(&data).map_err(|source| RecorderError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, log: &AccessLog) -> Result<(), RecorderError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, log)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(path = ?self.path, visitors = log.len(), "Stored access log");
        Ok(())
    }
}

/// Creates the log file's directory if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    pub(crate) fn record(visitor_id: &str, city: &str) -> AccessRecord {
        AccessRecord {
            visitor_id: visitor_id.into(),
            username: "nelly".into(),
            global_name: Some("Nelly".into()),
            discriminator: Some("0".into()),
            email: Some("nelly@example.com".into()),
            locale: Some("ja".into()),
            verified: Some(true),
            mfa_enabled: Some(false),
            avatar_url: None,
            geo: GeoRecord {
                city: Some(city.into()),
                ..GeoRecord::unknown("203.0.113.5")
            },
            client: ClientInfo::from_user_agent("curl/8.5.0"),
            timestamp: "2026-10-18T09:00:00Z".into(),
        }
    }

    #[test]
    fn test_append_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(dir.path().join("access_log.json"));

        // Missing file reads as empty
        assert!(recorder.history("123").unwrap().is_empty());

        recorder.append("123", record("123", "Shibuya")).unwrap();
        recorder.append("123", record("123", "Minato")).unwrap();
        recorder.append("456", record("456", "Osaka")).unwrap();

        let history = recorder.history("123").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].geo.city.as_deref(), Some("Shibuya"));
        assert_eq!(history[1].geo.city.as_deref(), Some("Minato"));

        assert_eq!(recorder.history("456").unwrap().len(), 1);
    }

    #[test]
    fn test_on_disk_format() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(dir.path().join("access_log.json"));

        recorder.append("b", record("b", "Shibuya")).unwrap();
        recorder.append("a", record("a", "Osaka")).unwrap();
        recorder.append("b", record("b", "Minato")).unwrap();

        let raw = std::fs::read_to_string(recorder.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        // Visitors keep first-seen order
        let log = recorder.load().unwrap();
        let keys: Vec<&str> = log.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert!(raw.find("\"b\": {").unwrap() < raw.find("\"a\": {").unwrap());

        let first = &value["b"]["history"][0];
        assert_eq!(first["geo"]["city"], "Shibuya");
        assert_eq!(first["geo"]["region"], serde_json::Value::Null);
        assert_eq!(first["client"]["browser"], "curl");
        assert_eq!(first["timestamp"], "2026-10-18T09:00:00Z");
    }

    #[test]
    fn test_malformed_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access_log.json");
        std::fs::write(&path, "{ not json").unwrap();

        let recorder = Recorder::new(&path);
        assert!(matches!(
            recorder.append("123", record("123", "Shibuya")),
            Err(RecorderError::Malformed { .. })
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_blank_file_is_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access_log.json");
        std::fs::write(&path, "\n").unwrap();

        let recorder = Recorder::new(&path);
        recorder.append("123", record("123", "Shibuya")).unwrap();
        assert_eq!(recorder.history("123").unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_appends() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::new(dir.path().join("access_log.json")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let recorder = recorder.clone();
                std::thread::spawn(move || {
                    recorder
                        .append("123", record("123", &format!("city-{i}")))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(recorder.history("123").unwrap().len(), 8);
    }

    #[test]
    fn test_record_from_user() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "42",
            "username": "nelly",
            "avatar": "abc"
        }))
        .unwrap();
        let record = AccessRecord::new(
            &user,
            GeoRecord::unknown("203.0.113.5"),
            ClientInfo::default(),
        );

        assert_eq!(record.visitor_id, "42");
        assert_eq!(
            record.avatar_url.as_deref(),
            Some("https://cdn.discordapp.com/avatars/42/abc.png")
        );
        assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
        assert!(record.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/access_log.json");
        ensure_parent_dir(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
        ensure_parent_dir(Path::new("access_log.json")).unwrap();
    }
}

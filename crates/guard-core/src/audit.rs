//! Append-only security event log
//!
//! One JSON object per line. `details` is a `BTreeMap`, and nested objects
//! serialize with sorted keys, so identical events produce identical lines.
//!
//! Writers take an in-process mutex and then an exclusive lock on the file,
//! so records from other processes sharing the log never interleave.
//!
//! Logging is fail-open: [`SecurityLog::log_event`] never returns an error.
//! Callers that need to know use [`SecurityLog::try_log_event`].

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use crate::error::Result;

/// Placeholder recorded when the client address or agent is not known
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Free-form event payload with canonical key order
pub type EventDetails = BTreeMap<String, Value>;

/// Request-side information attached to every event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            user_agent: Some(user_agent.into()),
        }
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub actor_id: Option<String>,
    pub ip: String,
    pub user_agent: String,
    pub details: EventDetails,
}

impl SecurityEvent {
    pub fn new(
        event: &str,
        actor_id: Option<&str>,
        client: &ClientInfo,
        details: EventDetails,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            event: event.to_string(),
            actor_id: actor_id.map(str::to_string),
            ip: client.ip.clone().unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
            user_agent: client
                .user_agent
                .clone()
                .unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
            details,
        }
    }
}

/// File-backed security log
pub struct SecurityLog {
    path: PathBuf,
    /// Serializes writers within this process; the file lock covers other processes
    write_lock: Mutex<()>,
}

impl SecurityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event, reporting failures to the operational log only
    pub fn log_event(
        &self,
        event: &str,
        actor_id: Option<&str>,
        client: &ClientInfo,
        details: EventDetails,
    ) {
        if let Err(e) = self.try_log_event(event, actor_id, client, details) {
            // Fail open: a broken audit sink must not break the request.
            warn!(
                "Failed to write security event '{}' to {:?}: {}",
                event, self.path, e
            );
        }
    }

    /// Append an event and surface any I/O or serialization error
    pub fn try_log_event(
        &self,
        event: &str,
        actor_id: Option<&str>,
        client: &ClientInfo,
        details: EventDetails,
    ) -> Result<()> {
        let record = SecurityEvent::new(event, actor_id, client, details);
        self.append(&record)
    }

    /// Append a prepared record as a single line
    pub fn append(&self, record: &SecurityEvent) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        let _ = FileExt::unlock(&file);
        written?;

        debug!("Logged security event: {}", record.event);
        Ok(())
    }

    /// Read every record back, oldest first
    pub fn read_events(&self) -> Result<Vec<SecurityEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn details(pairs: &[(&str, Value)]) -> EventDetails {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_log_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let log = SecurityLog::new(temp_dir.path().join("security.log"));
        let client = ClientInfo::new("203.0.113.9", "Mozilla/5.0");

        log.log_event(
            "login_failed",
            Some("42"),
            &client,
            details(&[("attempts", json!(3))]),
        );
        log.log_event("logout", None, &ClientInfo::default(), EventDetails::new());

        let events = log.read_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "login_failed");
        assert_eq!(events[0].actor_id.as_deref(), Some("42"));
        assert_eq!(events[0].ip, "203.0.113.9");
        assert_eq!(events[0].details["attempts"], json!(3));
        assert_eq!(events[1].actor_id, None);
        assert_eq!(events[1].ip, UNKNOWN_CLIENT);
        assert_eq!(events[1].user_agent, UNKNOWN_CLIENT);
    }

    #[test]
    fn test_details_serialize_in_key_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("security.log");
        let log = SecurityLog::new(&path);

        let payload = details(&[
            ("zeta", json!(1)),
            ("alpha", json!({"y": 2, "b": 1})),
            ("mid", json!("x")),
        ]);
        log.try_log_event("ordered", None, &ClientInfo::default(), payload)
            .unwrap();

        let line = std::fs::read_to_string(&path).unwrap();
        let alpha = line.find("\"alpha\"").unwrap();
        let mid = line.find("\"mid\"").unwrap();
        let zeta = line.find("\"zeta\"").unwrap();
        assert!(alpha < mid && mid < zeta);
        assert!(line.contains(r#"{"b":1,"y":2}"#));
        assert!(line.ends_with('\n'));
        assert_eq!(line.lines().count(), 1);
    }

    #[test]
    fn test_unwritable_target_fails_open() {
        let temp_dir = TempDir::new().unwrap();
        let log = SecurityLog::new(temp_dir.path().join("missing-dir").join("security.log"));

        // Must not panic or surface an error.
        log.log_event("csrf_mismatch", None, &ClientInfo::default(), EventDetails::new());

        let err = log.try_log_event("csrf_mismatch", None, &ClientInfo::default(), EventDetails::new());
        assert!(err.is_err());
    }

    #[test]
    fn test_append_waits_for_external_file_lock() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("security.log");
        std::fs::write(&path, "").unwrap();

        // Another process holds the log.
        let holder = OpenOptions::new().append(true).open(&path).unwrap();
        holder.lock_exclusive().unwrap();

        let log = std::sync::Arc::new(SecurityLog::new(&path));
        let writer = {
            let log = std::sync::Arc::clone(&log);
            std::thread::spawn(move || {
                log.try_log_event("locked", None, &ClientInfo::default(), EventDetails::new())
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        FileExt::unlock(&holder).unwrap();
        writer.join().unwrap().unwrap();

        let events = log.read_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "locked");
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = SecurityLog::new(temp_dir.path().join("none.log"));
        assert!(log.read_events().unwrap().is_empty());
    }
}

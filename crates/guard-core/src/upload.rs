//! Validation and storage of uploaded course files
//!
//! The web server has already written the upload to a temporary path. This
//! module checks it, moves it under the upload directory with a generated
//! name, and describes the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::{Database, SqlValue};
use crate::error::{GuardError, Result};

/// Upload limits and destination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadSettings {
    /// Destination directory
    pub dir: PathBuf,
    /// Largest accepted file in bytes
    pub max_size_bytes: u64,
    /// Lowercase extensions accepted, without the dot
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            max_size_bytes: 10 * 1024 * 1024,
            allowed_extensions: [
                "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "txt", "zip", "jpg", "jpeg",
                "png", "gif",
            ]
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
        }
    }
}

/// What the upload transport hands over
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Client-supplied file name
    pub original_name: String,
    /// Where the transport stored the bytes
    pub temp_path: PathBuf,
}

/// Metadata for a stored upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub original_name: String,
    pub stored_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Content type guessed from the extension
pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "zip" => "application/zip",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Validates and persists uploads
pub struct UploadHandler {
    settings: UploadSettings,
}

impl UploadHandler {
    pub fn new(settings: UploadSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Validate `file` and move it into the upload directory
    pub async fn store(&self, file: &IncomingFile) -> Result<UploadedFile> {
        let extension = self.check_name(&file.original_name)?;

        let metadata = tokio::fs::metadata(&file.temp_path).await.map_err(|e| {
            warn!("Upload temp file {:?} unreadable: {}", file.temp_path, e);
            GuardError::UploadRejected("Uploaded file is missing".to_string())
        })?;
        let size = metadata.len();

        if size == 0 {
            return Err(GuardError::UploadRejected("Uploaded file is empty".to_string()));
        }
        if size > self.settings.max_size_bytes {
            return Err(GuardError::UploadRejected(format!(
                "File exceeds the {} byte limit",
                self.settings.max_size_bytes
            )));
        }

        tokio::fs::create_dir_all(&self.settings.dir).await?;

        let stored_name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let path = self.settings.dir.join(&stored_name);
        move_file(&file.temp_path, &path).await?;

        info!(
            "Stored upload {:?} as {} ({} bytes)",
            file.original_name, stored_name, size
        );

        Ok(UploadedFile {
            original_name: file.original_name.clone(),
            stored_name,
            path,
            size,
            content_type: content_type_for(&extension).to_string(),
            uploaded_at: Utc::now(),
        })
    }

    /// Reject path components and disallowed extensions; returns the lowercase extension
    fn check_name(&self, original_name: &str) -> Result<String> {
        let base = Path::new(original_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        if base.is_empty() || base != original_name || original_name.contains('\\') {
            return Err(GuardError::UploadRejected("Invalid file name".to_string()));
        }

        let extension = Path::new(base)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if !self
            .settings
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
        {
            return Err(GuardError::UploadRejected(format!(
                "File type '{}' is not allowed",
                extension
            )));
        }

        Ok(extension)
    }
}

/// Rename, falling back to copy + delete across filesystems
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Err(e) = tokio::fs::rename(from, to).await {
        debug!("Rename {:?} -> {:?} failed ({}), copying instead", from, to, e);
        tokio::fs::copy(from, to).await?;
        tokio::fs::remove_file(from).await?;
    }
    Ok(())
}

/// Insert a row describing `file` into `uploads` and return its id
pub async fn save_upload_record(
    db: &dyn Database,
    file: &UploadedFile,
    owner_id: i64,
) -> Result<i64> {
    let size = i64::try_from(file.size)
        .map_err(|_| GuardError::UploadRejected("File size out of range".to_string()))?;

    let params = [
        SqlValue::Int(owner_id),
        SqlValue::from(file.original_name.as_str()),
        SqlValue::from(file.stored_name.as_str()),
        SqlValue::from(file.path.to_string_lossy().into_owned()),
        SqlValue::Int(size),
        SqlValue::from(file.content_type.as_str()),
        SqlValue::from(file.uploaded_at.to_rfc3339()),
    ];

    let id = db
        .insert(
            "INSERT INTO uploads (owner_id, original_name, stored_name, file_path, file_size, content_type, uploaded_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            &params,
        )
        .await?;

    debug!("Recorded upload {} as row {}", file.stored_name, id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn handler(dir: &Path, max: u64) -> UploadHandler {
        UploadHandler::new(UploadSettings {
            dir: dir.join("store"),
            max_size_bytes: max,
            ..UploadSettings::default()
        })
    }

    fn incoming(dir: &Path, name: &str, bytes: &[u8]) -> IncomingFile {
        let temp_path = dir.join(format!("php{}.tmp", Uuid::new_v4().simple()));
        std::fs::write(&temp_path, bytes).unwrap();
        IncomingFile {
            original_name: name.to_string(),
            temp_path,
        }
    }

    #[tokio::test]
    async fn test_store_moves_file() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(temp_dir.path(), 1024);
        let file = incoming(temp_dir.path(), "Syllabus.PDF", b"%PDF-1.4 body");

        let stored = handler.store(&file).await.unwrap();

        assert_eq!(stored.original_name, "Syllabus.PDF");
        assert!(stored.stored_name.ends_with(".pdf"));
        assert_eq!(stored.size, 13);
        assert_eq!(stored.content_type, "application/pdf");
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"%PDF-1.4 body");
        assert!(!file.temp_path.exists());
    }

    #[tokio::test]
    async fn test_stored_names_are_unique() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(temp_dir.path(), 1024);

        let a = handler
            .store(&incoming(temp_dir.path(), "notes.txt", b"a"))
            .await
            .unwrap();
        let b = handler
            .store(&incoming(temp_dir.path(), "notes.txt", b"b"))
            .await
            .unwrap();
        assert_ne!(a.stored_name, b.stored_name);
    }

    #[tokio::test]
    async fn test_rejects_oversize_and_empty() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(temp_dir.path(), 4);

        let big = handler
            .store(&incoming(temp_dir.path(), "big.txt", b"12345"))
            .await;
        assert!(matches!(big, Err(GuardError::UploadRejected(_))));

        let empty = handler
            .store(&incoming(temp_dir.path(), "empty.txt", b""))
            .await;
        assert!(matches!(empty, Err(GuardError::UploadRejected(_))));
    }

    #[tokio::test]
    async fn test_rejects_bad_names() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(temp_dir.path(), 1024);

        for name in ["shell.php", "../../etc/passwd.txt", "dir/notes.txt", "..\\x.txt", "noext", ""] {
            let result = handler.store(&incoming(temp_dir.path(), name, b"x")).await;
            assert!(
                matches!(result, Err(GuardError::UploadRejected(_))),
                "accepted {:?}",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_missing_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(temp_dir.path(), 1024);
        let file = IncomingFile {
            original_name: "notes.txt".to_string(),
            temp_path: temp_dir.path().join("gone.tmp"),
        };
        assert!(matches!(
            handler.store(&file).await,
            Err(GuardError::UploadRejected(_))
        ));
    }

    #[derive(Default)]
    struct RecordingDatabase {
        inserts: Mutex<Vec<(String, Vec<SqlValue>)>>,
    }

    #[async_trait]
    impl Database for RecordingDatabase {
        async fn execute(&self, _sql: &str, _params: &[SqlValue]) -> Result<u64> {
            Ok(0)
        }

        async fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<i64> {
            let mut inserts = self.inserts.lock().unwrap();
            inserts.push((sql.to_string(), params.to_vec()));
            Ok(inserts.len() as i64)
        }

        async fn query_scalar(&self, _sql: &str, _params: &[SqlValue]) -> Result<Option<SqlValue>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_save_upload_record() {
        let temp_dir = TempDir::new().unwrap();
        let handler = handler(temp_dir.path(), 1024);
        let stored = handler
            .store(&incoming(temp_dir.path(), "slides.pptx", b"deck"))
            .await
            .unwrap();

        let db = RecordingDatabase::default();
        let id = save_upload_record(&db, &stored, 17).await.unwrap();
        assert_eq!(id, 1);

        let inserts = db.inserts.lock().unwrap();
        let (sql, params) = &inserts[0];
        assert!(sql.starts_with("INSERT INTO uploads"));
        assert_eq!(sql.matches('?').count(), params.len());
        assert_eq!(params[0], SqlValue::Int(17));
        assert_eq!(params[1], SqlValue::Text("slides.pptx".to_string()));
        assert_eq!(params[2], SqlValue::Text(stored.stored_name.clone()));
        assert_eq!(params[4], SqlValue::Int(4));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for("jpeg"), "image/jpeg");
        assert_eq!(content_type_for("unknown"), "application/octet-stream");
    }
}

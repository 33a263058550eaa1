use std::fs;
use std::path::{Path, PathBuf};

use tracing::{instrument, warn};

use crate::document::SessionDocument;
use crate::error::{IoError, Result};

/// Compute `root/YYYY/MM/DD/HH-MM-SS.json` from an `fid` of the form
/// `YYYY-MM-DD-HH-MM-SS`.
pub fn path_for_fid(root: impl AsRef<Path>, fid: &str) -> PathBuf {
    let parts: Vec<&str> = fid.splitn(6, '-').collect();
    let (year, month, day, hour, minute, second) = match parts.as_slice() {
        [y, mo, d, h, mi, s] => (*y, *mo, *d, *h, *mi, *s),
        _ => {
            // Malformed fid: fall back to a flat filename under root rather
            // than panicking — callers will fail loudly on the subsequent
            // read/write instead.
            return root.as_ref().join(format!("{fid}.json"));
        }
    };
    root.as_ref()
        .join(year)
        .join(month)
        .join(day)
        .join(format!("{hour}-{minute}-{second}.json"))
}

/// Serialize/deserialize a full session document to/from its per-session
/// file.
pub struct SessionFileIO {
    root: PathBuf,
}

impl SessionFileIO {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, fid: &str) -> PathBuf {
        path_for_fid(&self.root, fid)
    }

    /// Whether `fid`'s document exists and has non-zero length, without
    /// reading or parsing it. `Manager::load_sessions` uses this to skip
    /// garbage rows before even attempting a `Placeholder.load`.
    pub fn document_exists_and_non_empty(&self, fid: &str) -> bool {
        fs::metadata(self.path_for(fid))
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }

    /// Atomic write: write to a sibling temp file, then rename over the
    /// destination. A crash mid-write leaves the prior version intact.
    #[instrument(skip(self, document), fields(fid = %document.fid))]
    pub fn write(&self, document: &SessionDocument) -> Result<()> {
        let path = self.path_for(&document.fid);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_vec_pretty(document)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &json)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            warn!(fid = %document.fid, error = %e, "atomic rename failed");
            e
        })?;
        Ok(())
    }

    /// Read a document from `path`. Only invoked by `Placeholder::load`
    /// — a `Loaded` session's own re-read is a no-op.
    #[instrument(skip(self))]
    pub fn read(&self, path: impl AsRef<Path>) -> Result<SessionDocument> {
        let bytes = fs::read(path.as_ref())?;
        if bytes.is_empty() {
            return Err(IoError::Empty);
        }
        let document: SessionDocument = serde_json::from_slice(&bytes)?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::{Message, ModelUsage, Role};

    fn sample_document(fid: &str) -> SessionDocument {
        SessionDocument {
            id: 1,
            fid: fid.to_string(),
            updated_at: 0,
            title: "Test".to_string(),
            model_usage: ModelUsage::new("local", "llama3"),
            agent_name: "just-ask".to_string(),
            total_messages: 1,
            total_tokens: 0,
            duration_seconds: 0,
            child_chats: serde_json::Value::Array(Vec::new()),
            messages: vec![Message::new(Role::UserSent, "hi")],
        }
    }

    #[test]
    fn path_for_fid_splits_date_components() {
        let root = Path::new("/history");
        let path = path_for_fid(root, "2026-07-28-10-30-00");
        assert_eq!(path, Path::new("/history/2026/07/28/10-30-00.json"));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let io = SessionFileIO::new(dir.path());
        let doc = sample_document("2026-07-28-10-30-00");
        io.write(&doc).unwrap();

        let path = io.path_for(&doc.fid);
        let read_back = io.read(&path).unwrap();
        assert_eq!(read_back, doc);
    }

    #[test]
    fn read_empty_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, b"").unwrap();
        let io = SessionFileIO::new(dir.path());
        assert!(matches!(io.read(&path), Err(IoError::Empty)));
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let io = SessionFileIO::new(dir.path());
        let doc = sample_document("2026-01-05-00-00-00");
        io.write(&doc).unwrap();
        assert!(dir.path().join("2026/01/05/00-00-00.json").exists());
    }

    #[test]
    fn unknown_fields_are_ignored_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let io = SessionFileIO::new(dir.path());
        let doc = sample_document("2026-02-02-02-02-02");
        let mut value = serde_json::to_value(&doc).unwrap();
        value["some_future_field"] = serde_json::json!("unused");
        let path = io.path_for(&doc.fid);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        let read_back = io.read(&path).unwrap();
        assert_eq!(read_back.fid, doc.fid);
    }
}

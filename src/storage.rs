//! Durable per-session cart storage
//!
//! One JSON document of cart lines per session under the data directory,
//! read at first touch and rewritten on every mutation. Writes are
//! best-effort: a failure is logged and swallowed, never surfaced to the
//! caller, and never blocks the in-memory mutation.

use std::fs;
use std::path::PathBuf;

use crate::domain::aggregates::cart::CartLine;

#[derive(Clone, Debug)]
pub struct CartStorage {
    dir: PathBuf,
}

impl CartStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, session: &str) -> PathBuf {
        // session ids come from the client; keep the file name safe
        let key: String = session
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.dir.join(format!("cart-{key}.json"))
    }

    /// Read a session's saved lines. Missing or unreadable data yields an
    /// empty cart rather than an error.
    pub fn load(&self, session: &str) -> Vec<CartLine> {
        match fs::read(self.path(session)) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(session, error = %e, "discarding unreadable cart snapshot");
                vec![]
            }),
            Err(_) => vec![],
        }
    }

    pub fn save(&self, session: &str, lines: &[CartLine]) {
        let result = fs::create_dir_all(&self.dir)
            .and_then(|()| serde_json::to_vec(lines).map_err(Into::into))
            .and_then(|bytes| fs::write(self.path(session), bytes));
        if let Err(e) = result {
            tracing::warn!(session, error = %e, "cart snapshot write failed");
        }
    }

    pub fn delete(&self, session: &str) {
        if let Err(e) = fs::remove_file(self.path(session)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(session, error = %e, "cart snapshot delete failed");
            }
        }
    }
}

// Pagination cursors: opaque to consumers, internally a base64-wrapped JSON
// payload binding the index version and the exact query they were issued
// for. Any mismatch on consumption fails closed with InvalidCursor.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Index version at issuance.
    pub v: u64,
    /// Exact query string the cursor was issued for.
    pub q: String,
    /// Zero-based offset into the deterministic result order.
    pub off: usize,
}

impl Cursor {
    pub fn new(version: u64, query: &str, offset: usize) -> Self {
        Cursor { v: version, q: query.to_string(), off: offset }
    }

    pub fn encode(&self) -> String {
        // Serializing a struct of scalars cannot fail.
        let json = serde_json::to_vec(self).expect("cursor serialization");
        STANDARD.encode(json)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(raw)
            .map_err(|e| DiscoveryError::invalid_cursor(format!("bad base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DiscoveryError::invalid_cursor(format!("bad payload: {e}")))
    }

    /// Validate against the current index version and caller-supplied query.
    pub fn check(&self, version: u64, query: &str) -> Result<()> {
        if self.v != version {
            return Err(DiscoveryError::invalid_cursor(format!(
                "stale cursor: issued at version {}, index at {}",
                self.v, version
            )));
        }
        if self.q != query {
            return Err(DiscoveryError::invalid_cursor("cursor issued for a different query"));
        }
        Ok(())
    }
}

/// Resolve an optional cursor string into a starting offset, enforcing the
/// version/query binding. `None` or empty means the first page.
pub fn resolve_offset(cursor: Option<&str>, version: u64, query: &str) -> Result<usize> {
    match cursor {
        None => Ok(0),
        Some(raw) if raw.is_empty() => Ok(0),
        Some(raw) => {
            let cursor = Cursor::decode(raw)?;
            cursor.check(version, query)?;
            Ok(cursor.off)
        }
    }
}

/// Encode the next-page cursor, or `None` when the stream is exhausted.
pub fn next_cursor(version: u64, query: &str, next_offset: usize, total: usize) -> Option<String> {
    if next_offset >= total {
        return None;
    }
    Some(Cursor::new(version, query, next_offset).encode())
}

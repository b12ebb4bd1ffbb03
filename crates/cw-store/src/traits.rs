use crate::error::{StoreError, StoreResult};

/// Opaque durable key-value blob store.
///
/// All implementations must satisfy these invariants:
/// - A successful `write` fully replaces the previous value for the key.
/// - A `read` after a successful `write` returns exactly the written bytes.
/// - The store never interprets value contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait DurableStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing has been written under the key.
    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Check whether a value exists under `key`.
    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.read(key)?.is_some())
    }

    /// Delete the value under `key`. Returns `true` if it existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// All keys currently stored, sorted.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// Keys are `/`-separated segments of `[a-z0-9_-]`.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-'))
        });
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

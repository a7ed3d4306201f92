//! Token generation for run ids and unnamed temp files.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generate a unique u64 token.
///
/// Mixes the current timestamp (nanoseconds), process id, thread id, and an
/// atomic counter through SHA-256, so two draws never collide even within
/// the same nanosecond on the same thread.
pub fn rand_u64() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(format!("{:?}", std::thread::current().id()).as_bytes());
    hasher.update(counter.to_le_bytes());
    let digest = hasher.finalize();

    u64::from_le_bytes(digest[..8].try_into().expect("digest is 32 bytes"))
}

/// A 16-hex-char unique token, used for unnamed tracked files.
pub fn unique_token() -> String {
    hex::encode(rand_u64().to_be_bytes())
}

/// Generate a run identifier of the form `run_0123456789abcdef`.
pub fn run_id() -> String {
    format!("run_{}", unique_token())
}

// ============================================================================
// Tests
// ============================================================================

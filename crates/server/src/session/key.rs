//! Session key generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Builds a 64-hex-char key from the client identity and the current time.
///
/// The first half is stable per client, the second changes with every call
/// (nanosecond time plus a process-wide sequence number).
pub fn generate_key(client: &str) -> String {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_nanos())
		.unwrap_or_default();
	let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);

	let identity = hex::encode(Sha256::digest(client.as_bytes()));
	let moment = hex::encode(Sha256::digest(format!("{nanos}:{sequence}").as_bytes()));
	format!("{}{}", &identity[..32], &moment[..32])
}

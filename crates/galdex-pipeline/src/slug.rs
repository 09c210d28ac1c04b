//! External-facing slug generation.

use galdex_core::defaults::SLUG_RANDOM_BYTES;
use rand::RngCore;

/// Generate a fresh slug: random bytes, hex-encoded.
///
/// Uniqueness is enforced by the database constraint; at 4 random bytes a
/// collision simply fails the insert and the caller retries the request.
pub fn new_slug() -> String {
    let mut bytes = [0u8; SLUG_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

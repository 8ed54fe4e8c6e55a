//! Cache key derivation.

use sha2::{Digest, Sha256};

/// A value identifying one independently cached result sequence.
///
/// Derivation must be pure: equal inputs always produce equal hashes, and
/// distinct keys never share cached pages.
pub trait QueryKey {
  /// Stable content describing the key. Hashed to form the cache's
  /// internal map key.
  fn key_material(&self) -> String;

  /// Human-readable description for logs.
  fn description(&self) -> String;

  /// SHA256 hash of the key material, for stable fixed-length keys.
  fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.key_material().as_bytes());
    hex::encode(hasher.finalize())
  }
}

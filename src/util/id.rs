//! ID utilities.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Short human-typeable room code: 6 uppercase alphanumerics. The registry
/// retries on the (unlikely) collision.
pub fn room_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}

// src/utils/token.rs

use rand::RngCore;
use rand::rngs::OsRng;

/// Number of random bytes behind a confirmation code.
const CONFIRMATION_CODE_BYTES: usize = 20;

/// Generates a confirmation code: 20 bytes from the OS RNG, hex encoded (40 chars).
pub fn generate_confirmation_code() -> String {
    let mut bytes = [0u8; CONFIRMATION_CODE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

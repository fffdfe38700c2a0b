//! Small shared helpers

pub mod encoding;
pub mod hashing;

pub use encoding::{decode_bytes, detect_encoding};
pub use hashing::sha256_hex;

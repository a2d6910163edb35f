//! ID prefix constants and generation helpers.
//!
//! IDs are `prefix_<16 lowercase hex chars>`, following the
//! `<prefix>_<random>` convention used for every entity kind.

use getrandom::fill;

/// Generate a new id of the form `<prefix>_<16 hex chars>`.
#[must_use]
pub fn new_id(prefix: &str) -> String {
    let mut buf = [0u8; 8];
    fill(&mut buf).expect("system randomness unavailable");
    format!("{prefix}_{}", hex::encode(buf))
}

pub const CHUNK: &str = "chunk";
pub const NODE: &str = "node";
pub const EDGE: &str = "edge";
pub const MEMORY: &str = "mem";
pub const UPLOAD_SESSION: &str = "upload";

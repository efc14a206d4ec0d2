// utils/reference.rs
use rand::Rng;

pub const REF_PREFIX: &str = "KS";
pub const REF_LENGTH: usize = 6;

// no 0/O or 1/I so refs survive being read out over the phone
const REF_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn generate_ref() -> String {
    let mut rng = rand::rng();
    let body: String = (0..REF_LENGTH)
        .map(|_| REF_ALPHABET[rng.random_range(0..REF_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", REF_PREFIX, body)
}

/// Refs are matched case-insensitively from user input.
pub fn normalize_ref(raw: &str) -> String {
    raw.trim().to_uppercase()
}

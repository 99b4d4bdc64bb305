//! Seeded random streams for reproducible simulations.
//!
//! A single user-visible seed fans out into independent streams per domain
//! (`b"match"`, `b"loot"`, ...) so that adding draws in one domain never shifts
//! the sequence seen by another.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;
use std::hash::Hasher;
use twox_hash::XxHash64;

/// RNG used for match simulation and loot rolls.
pub type MatchRng = ChaCha20Rng;

pub const MATCH_DOMAIN: &[u8] = b"match";
pub const LOOT_DOMAIN: &[u8] = b"loot";

/// Derive the seed of one domain stream from a user seed.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed ^ XxHash64::oneshot(0, domain_tag);
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Stream for `domain_tag` seeded from `user_seed`.
#[must_use]
pub fn stream_rng(user_seed: u64, domain_tag: &[u8]) -> MatchRng {
    MatchRng::seed_from_u64(derive_stream_seed(user_seed, domain_tag))
}

/// Reproducible seed for one fixture between two teams.
///
/// `nonce` distinguishes repeated fixtures between the same pair, typically the
/// number of matches the pair has already played.
#[must_use]
pub fn match_seed(home_id: &str, away_id: &str, nonce: u64) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(home_id.as_bytes());
    hasher.write(&[0xFF]);
    hasher.write(away_id.as_bytes());
    hasher.write(&nonce.to_le_bytes());
    hasher.finish()
}

/// Parse a seed given either as a decimal number or as free text.
///
/// Text that is not a number is hashed so `"finals"` is a usable seed.
#[must_use]
pub fn parse_seed(input: &str) -> u64 {
    let trimmed = input.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if let Ok(value) = u64::from_str_radix(hex, 16) {
            return value;
        }
    }
    trimmed
        .parse::<u64>()
        .unwrap_or_else(|_| XxHash64::oneshot(0, trimmed.as_bytes()))
}

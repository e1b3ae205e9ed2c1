//! Seeded randomness shared by seed selection, mutation and action generation.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng as _};

pub type FuzzRng = ChaCha20Rng;

pub fn gen_seed() -> u64 {
    let mut seed = [0u8; 8];
    rand_core::OsRng.fill_bytes(&mut seed);
    u64::from_le_bytes(seed)
}

pub fn rng_from_seed(seed: u64) -> FuzzRng {
    let seed_bytes = blake3::hash(&seed.to_le_bytes()).as_bytes().to_owned();
    let mut seed32 = [0u8; 32];
    seed32.copy_from_slice(&seed_bytes[..32]);
    ChaCha20Rng::from_seed(seed32)
}

/// Index in `0..len`. `len` must be non-zero.
pub fn pick_index(rng: &mut impl RngCore, len: usize) -> usize {
    debug_assert!(len > 0);
    (rng.next_u64() % len as u64) as usize
}

/// Value in `lo..=hi`.
pub fn range_inclusive(rng: &mut impl RngCore, lo: usize, hi: usize) -> usize {
    debug_assert!(lo <= hi);
    let span = (hi - lo) as u64 + 1;
    lo + (rng.next_u64() % span) as usize
}

//! Reproducible linear-congruential generator plus seed derivation helpers.
//!
//! Update rule: `state = (state * 1103515245 + 12345) & 0x7fffffff`, sample =
//! `state / 0x7fffffff`. Any implementation using exact integer arithmetic for
//! the low 31 bits reproduces the same sequence for the same seed.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;

const LCG_MULTIPLIER: u64 = 1_103_515_245;
const LCG_INCREMENT: u64 = 12_345;
const LCG_MASK: u64 = 0x7fff_ffff;

/// Seeded pseudo-random source producing samples in `[0, 1]`.
///
/// The divisor equals the mask, so a state of exactly `0x7fffffff` yields
/// `1.0`; index selection clamps for that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcgRng {
    state: u64,
    draws: u64,
}

impl LcgRng {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed,
            draws: 0,
        }
    }

    /// Advance the generator and return the next sample.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.step()) / f64::from(LCG_MASK as u32)
    }

    /// Number of samples drawn so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    /// Current internal state (the last 31-bit output once drawn).
    #[must_use]
    pub const fn state(&self) -> u64 {
        self.state
    }

    fn step(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT)
            & LCG_MASK;
        self.draws = self.draws.saturating_add(1);
        (self.state & LCG_MASK) as u32
    }
}

impl rand::RngCore for LcgRng {
    fn next_u32(&mut self) -> u32 {
        // High 16 bits of two consecutive 31-bit outputs.
        let hi = self.step() >> 15;
        let lo = self.step() >> 15;
        (hi << 16) | (lo & 0xFFFF)
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_u32());
        let lo = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Derive an independent worker seed from the user-visible seed.
#[must_use]
pub fn derive_worker_seed(seed: u64, worker_index: u32) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(b"storyflow-worker");
    mac.update(&worker_index.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Time-derived seed for runs without an explicit seed.
#[must_use]
pub fn entropy_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let folded = (nanos as u64) ^ ((nanos >> 64) as u64);
    folded ^ (u64::from(std::process::id()) << 32)
}

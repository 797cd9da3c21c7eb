//! The work function itself.
//!
//! For nonce `n` the seed is the base seed multiplied `n + 1` times by a
//! fixed multiplier, XORed into the four big-endian words of SHA-256(data).
//! The resulting state drives xoshiro256+ to fill the buffer, then 1024
//! pseudo-random lookups are XORed together. A nonce is valid when that value
//! has at least `difficulty` leading zero bits.

use cairn_crypto::sha256;

use crate::WorkError;

const SEED: u64 = 8_682_522_807_148_012;
const SEED_MULTIPLIER: u64 = 1_181_783_497_276_652_981;
const BOUNCES: usize = 1024;

/// Seed used for `nonce`.
pub fn seed_for_nonce(nonce: u32) -> u64 {
    let mut base = SEED_MULTIPLIER;
    let mut exp = u64::from(nonce) + 1;
    let mut factor: u64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            factor = factor.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    SEED.wrapping_mul(factor)
}

/// Scratch space reused across attempts by one searcher.
pub(crate) struct Worker {
    hash_words: [u64; 4],
    buffer: Vec<u64>,
}

impl Worker {
    pub(crate) fn new(data: &[u8], buffer_bytes: usize) -> Result<Self, WorkError> {
        let words = buffer_bytes / 8;
        if words == 0 {
            return Err(WorkError::BufferTooSmall(buffer_bytes));
        }
        let hash = sha256(data);
        let mut hash_words = [0u64; 4];
        for (i, chunk) in hash.chunks_exact(8).enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            hash_words[i] = u64::from_be_bytes(word);
        }
        Ok(Self {
            hash_words,
            buffer: vec![0u64; words],
        })
    }

    /// Run one attempt with the given seed and return the leading zero count.
    pub(crate) fn attempt(&mut self, seed: u64) -> u32 {
        let mut state = [
            self.hash_words[0] ^ seed,
            self.hash_words[1] ^ seed,
            self.hash_words[2] ^ seed,
            self.hash_words[3] ^ seed,
        ];

        for word in self.buffer.iter_mut() {
            *word = xoshiro256p(&mut state);
        }

        let len = self.buffer.len();
        let mut result = self.buffer[0];
        for _ in 0..BOUNCES {
            let index = (xoshiro256p(&mut state) & i32::MAX as u64) as usize % len;
            result ^= self.buffer[index];
        }
        result.leading_zeros()
    }
}

fn xoshiro256p(state: &mut [u64; 4]) -> u64 {
    let result = state[0].wrapping_add(state[3]);
    let temp = state[1] << 17;

    state[2] ^= state[0];
    state[3] ^= state[1];
    state[1] ^= state[2];
    state[0] ^= state[3];

    state[2] ^= temp;
    state[3] = state[3].rotate_left(45);

    result
}

/// Find the lowest nonce meeting `difficulty`, searching sequentially from 0.
pub fn compute(data: &[u8], buffer_bytes: usize, difficulty: u32) -> Result<u32, WorkError> {
    let mut worker = Worker::new(data, buffer_bytes)?;
    let mut seed = SEED;
    for nonce in 0..=u32::MAX {
        seed = seed.wrapping_mul(SEED_MULTIPLIER);
        if worker.attempt(seed) >= difficulty {
            return Ok(nonce);
        }
    }
    Err(WorkError::Exhausted(difficulty))
}

/// Check a single nonce.
pub fn verify(data: &[u8], buffer_bytes: usize, difficulty: u32, nonce: u32) -> bool {
    match Worker::new(data, buffer_bytes) {
        Ok(mut worker) => worker.attempt(seed_for_nonce(nonce)) >= difficulty,
        Err(_) => false,
    }
}

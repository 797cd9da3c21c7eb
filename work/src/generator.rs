//! Multi-threaded nonce search.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use rayon::prelude::*;

use crate::memory_pow::{seed_for_nonce, Worker};
use crate::WorkError;

/// Searches the nonce space on the rayon pool.
///
/// Threads take interleaved nonces and record hits with `fetch_min`, so the
/// answer is always the lowest valid nonce, the same one [`crate::compute`]
/// returns.
pub struct WorkGenerator {
    cancel: AtomicBool,
}

/// Nonces tried per thread before re-checking the shared flags.
const BATCH_SIZE: u32 = 64;

impl Default for WorkGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkGenerator {
    pub fn new() -> Self {
        Self {
            cancel: AtomicBool::new(false),
        }
    }

    /// Ask a running `generate` to stop. It returns [`WorkError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn generate(
        &self,
        data: &[u8],
        buffer_bytes: usize,
        difficulty: u32,
    ) -> Result<u32, WorkError> {
        self.cancel.store(false, Ordering::Relaxed);
        if buffer_bytes / 8 == 0 {
            return Err(WorkError::BufferTooSmall(buffer_bytes));
        }

        let found = AtomicU32::new(u32::MAX);
        let num_threads = rayon::current_num_threads().max(1) as u32;

        (0..num_threads)
            .into_par_iter()
            .try_for_each(|thread_id| -> Result<(), WorkError> {
                let mut worker = Worker::new(data, buffer_bytes)?;
                let mut nonce = thread_id;

                loop {
                    if self.cancel.load(Ordering::Relaxed) {
                        return Ok(());
                    }
                    for _ in 0..BATCH_SIZE {
                        // Anything past the best hit so far cannot win.
                        if nonce >= found.load(Ordering::Relaxed) {
                            return Ok(());
                        }
                        if worker.attempt(seed_for_nonce(nonce)) >= difficulty {
                            found.fetch_min(nonce, Ordering::Relaxed);
                            return Ok(());
                        }
                        nonce = match nonce.checked_add(num_threads) {
                            Some(next) => next,
                            None => return Ok(()),
                        };
                    }
                }
            })?;

        let result = found.load(Ordering::Relaxed);
        if result != u32::MAX {
            Ok(result)
        } else if self.cancel.load(Ordering::Relaxed) {
            Err(WorkError::Cancelled)
        } else {
            Err(WorkError::Exhausted(difficulty))
        }
    }
}

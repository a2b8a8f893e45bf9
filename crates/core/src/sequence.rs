//! Descriptor sequence generator
//!
//! Every descriptor write is stamped with a value from this counter so that
//! the freshest replica can be recognised on the next boot. Zero is reserved
//! as "uninitialized" and is never handed out.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::SequenceError;

/// Value the counter starts from, and wraps to instead of 0.
pub const SEQUENCE_DEFAULT: u32 = 1;

/// Monotonic descriptor sequence counter.
///
/// Writes are serialized by the single boot-control thread; the atomic only
/// makes the handle shareable.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    current: AtomicU32,
}

impl SequenceGenerator {
    /// Create an uninitialized generator.
    pub fn new() -> Self {
        Self {
            current: AtomicU32::new(0),
        }
    }

    /// Reset to the default. Used when the system drives are initialized
    /// from scratch.
    pub fn initialize(&self) {
        self.current.store(SEQUENCE_DEFAULT, Ordering::Release);
    }

    /// Adopt the sequence of the standard descriptor found at boot.
    ///
    /// Adopting 0 leaves the generator uninitialized.
    pub fn adopt(&self, value: u32) -> Result<(), SequenceError> {
        if value == 0 {
            self.current.store(0, Ordering::Release);
            return Err(SequenceError::ZeroSequence);
        }
        self.current.store(value, Ordering::Release);
        Ok(())
    }

    /// Advance and return the value to stamp into the next descriptor write.
    pub fn next(&self) -> Result<u32, SequenceError> {
        let current = self.current.load(Ordering::Acquire);
        if current == 0 {
            return Err(SequenceError::Uninitialized);
        }
        let next = match current.wrapping_add(1) {
            0 => SEQUENCE_DEFAULT,
            n => n,
        };
        self.current.store(next, Ordering::Release);
        Ok(next)
    }

    /// Last value handed out or adopted; 0 when uninitialized.
    pub fn current(&self) -> u32 {
        self.current.load(Ordering::Acquire)
    }

    pub fn is_initialized(&self) -> bool {
        self.current() != 0
    }
}

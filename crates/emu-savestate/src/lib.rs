//! Save-state store contract.
//!
//! Components write their state as individually named values grouped under a
//! section name: scalars as `u64`, opaque records as fixed-size byte buffers.
//! Fields are looked up by key rather than by position, so a component can
//! add or reorder fields without invalidating older saves.
//!
//! [`MemoryStore`] is the bundled implementation. It derives serde traits so a
//! host can persist it with whatever format it already uses.

mod error;
mod memory;

pub use error::{Result, StateError};
pub use memory::{MemoryStore, Section};

/// A store that hands out named sections.
pub trait StateStore {
    type Writer<'a>: SectionWriter
    where
        Self: 'a;
    type Reader<'a>: SectionReader
    where
        Self: 'a;

    /// Open a section for writing. Any previous contents are discarded.
    fn open_for_write(&mut self, section: &str) -> Self::Writer<'_>;

    /// Open an existing section for reading.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::MissingSection`] if nothing was saved under
    /// `section`.
    fn open_for_read(&self, section: &str) -> Result<Self::Reader<'_>>;
}

/// Write side of a section.
pub trait SectionWriter {
    fn set(&mut self, key: &str, value: u64);

    fn set_buffer(&mut self, key: &str, data: &[u8]);

    fn set_bool(&mut self, key: &str, value: bool) {
        self.set(key, u64::from(value));
    }

    /// Signed values are stored sign-extended to 64 bits.
    fn set_i64(&mut self, key: &str, value: i64) {
        self.set(key, value as u64);
    }
}

/// Read side of a section.
pub trait SectionReader {
    /// # Errors
    ///
    /// Returns [`StateError::MissingKey`] if `key` was never written.
    fn get(&self, key: &str) -> Result<u64>;

    /// Fill `out` from a stored buffer. The stored length must match exactly.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::MissingKey`] or [`StateError::BufferLength`].
    fn get_buffer(&self, key: &str, out: &mut [u8]) -> Result<()>;

    /// # Errors
    ///
    /// Fails if the key is missing or the value does not fit in 32 bits.
    fn get_u32(&self, key: &str) -> Result<u32> {
        let value = self.get(key)?;
        u32::try_from(value).map_err(|_| StateError::OutOfRange {
            key: key.to_string(),
            value,
        })
    }

    /// # Errors
    ///
    /// Fails if the key is missing or holds anything other than 0 or 1.
    fn get_bool(&self, key: &str) -> Result<bool> {
        match self.get(key)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(StateError::OutOfRange {
                key: key.to_string(),
                value,
            }),
        }
    }

    /// # Errors
    ///
    /// Returns [`StateError::MissingKey`] if `key` was never written.
    fn get_i64(&self, key: &str) -> Result<i64> {
        self.get(key).map(|value| value as i64)
    }
}

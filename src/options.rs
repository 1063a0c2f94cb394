//! Options controlling the string table and value channels (Spec 5.4, Table 5-1).
//!
//! Nur die Tabellen-relevanten Optionen leben hier: valuePartitionCapacity,
//! valueMaxLength und blockSize. Alles andere aus Table 5-1 (Alignment,
//! Preserve, Schema-Id, ...) gehoert der aufrufenden Session.
//!
//! # Beispiel
//!
//! ```
//! use exidict::options::DictOptions;
//!
//! let opts = DictOptions::default()
//!     .with_value_partition_capacity(64)
//!     .with_value_max_length(1024);
//!
//! opts.validate().unwrap();
//! assert_eq!(opts.value_partition_capacity(), 64);
//! assert_eq!(opts.value_max_length(), Some(1024));
//! ```

use crate::{Error, Result};

/// Effective interpretation of the valuePartitionCapacity option (Spec 7.3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCapacity {
    /// No bound; the global value partition grows for the whole stream.
    Unbounded,
    /// Value caching is disabled entirely; no value is ever added.
    Disabled,
    /// At most this many live global entries; older entries are evicted
    /// in insertion order once the bound is reached.
    Bounded(u32),
}

/// Options for the dictionary core (Spec 5.4, Table 5-1 subset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictOptions {
    pub(crate) value_partition_capacity: i32,
    pub(crate) value_max_length: Option<u32>,
    pub(crate) block_size: u32,
}

impl Default for DictOptions {
    /// Creates options with the Table 5-1 defaults: unbounded value
    /// partition, unbounded value length, block size 1,000,000.
    fn default() -> Self {
        Self {
            value_partition_capacity: -1,
            value_max_length: None,
            block_size: 1_000_000,
        }
    }
}

impl DictOptions {
    // --- Getter ---

    /// Raw valuePartitionCapacity: -1 unbounded, 0 disabled, n > 0 bounded (Spec 7.3.3).
    pub fn value_partition_capacity(&self) -> i32 { self.value_partition_capacity }
    /// Maximum string length for value partition addition (Spec 7.3.3).
    pub fn value_max_length(&self) -> Option<u32> { self.value_max_length }
    /// Block size for compression-aligned value channels (Spec 9.1).
    pub fn block_size(&self) -> u32 { self.block_size }

    /// Interpretierte Kapazitaet; setzt einen validierten Wert voraus.
    pub fn effective_value_capacity(&self) -> ValueCapacity {
        match self.value_partition_capacity {
            -1 => ValueCapacity::Unbounded,
            0 => ValueCapacity::Disabled,
            n => ValueCapacity::Bounded(n as u32),
        }
    }

    // --- Builder-Setter (Fluent API) ---

    /// Setzt die Value-Partition-Capacity (-1 = unbegrenzt, 0 = aus).
    pub fn with_value_partition_capacity(mut self, cap: i32) -> Self { self.value_partition_capacity = cap; self }
    /// Setzt das Value-Max-Length-Limit (Zeichen, nicht Bytes).
    pub fn with_value_max_length(mut self, len: u32) -> Self { self.value_max_length = Some(len); self }
    /// Setzt die Block-Groesse.
    pub fn with_block_size(mut self, size: u32) -> Self { self.block_size = size; self }

    // --- Mutable Setter (fuer nachtraegliche Aenderungen) ---

    /// Setzt die Value-Partition-Capacity.
    pub fn set_value_partition_capacity(&mut self, cap: i32) { self.value_partition_capacity = cap; }
    /// Setzt das Value-Max-Length-Limit.
    pub fn set_value_max_length(&mut self, len: Option<u32>) { self.value_max_length = len; }
    /// Setzt die Block-Groesse.
    pub fn set_block_size(&mut self, size: u32) { self.block_size = size; }

    /// Validates the options before a session starts.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBlockSize`] wenn `block_size == 0` (Spec 9.1)
    /// - [`Error::InvalidValuePartitionCapacity`] wenn die Kapazitaet
    ///   unter -1 liegt (Spec 7.3.3)
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidBlockSize);
        }
        if self.value_partition_capacity < -1 {
            return Err(Error::InvalidValuePartitionCapacity {
                capacity: self.value_partition_capacity,
            });
        }
        Ok(())
    }
}

//! Central error types for the string table and channel configuration.
//!
//! Each variant references the relevant W3C EXI 1.0 Second Edition spec
//! section. The table itself performs error-free bookkeeping; everything
//! fallible lives in option validation before a session starts.

use core::fmt;

/// Configuration errors detected before any stream processing begins.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The block size option is zero (Spec 9.1 requires at least one value per block).
    InvalidBlockSize,
    /// The valuePartitionCapacity option is below -1 (Spec 7.3.3, Table 5-1).
    ///
    /// `-1` steht fuer unbegrenzt, `0` schaltet das Value-Caching ab,
    /// positive Werte begrenzen die globale Partition.
    InvalidValuePartitionCapacity {
        /// Der abgelehnte Wert.
        capacity: i32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBlockSize => write!(f, "block size must be greater than zero (Spec 9.1)"),
            Self::InvalidValuePartitionCapacity { capacity } => write!(
                f,
                "value partition capacity {capacity} is invalid; expected -1 (unbounded), 0 (disabled) or a positive bound (Spec 7.3.3)"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Every variant must produce a Display string carrying its spec section.

    #[test]
    fn invalid_block_size_display() {
        let e = Error::InvalidBlockSize;
        let msg = e.to_string();
        assert!(msg.contains("block size"), "{msg}");
        assert!(msg.contains("9.1"), "{msg}");
    }

    #[test]
    fn invalid_value_partition_capacity_display() {
        let e = Error::InvalidValuePartitionCapacity { capacity: -7 };
        let msg = e.to_string();
        assert!(msg.contains("-7"), "{msg}");
        assert!(msg.contains("7.3.3"), "{msg}");
    }

    #[test]
    fn error_trait_object_safe() {
        let e: Box<dyn std::error::Error> = Box::new(Error::InvalidBlockSize);
        assert!(!e.to_string().is_empty());
    }
}

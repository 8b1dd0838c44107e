//! Error type shared by every container in the crate.

use core::fmt;

/// Failures reported synchronously to the caller. State is unchanged when
/// any of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A raw slot index did not name a live slot.
    IndexOutOfBounds { index: usize, len: usize },
    /// `trim` asked for fewer slots than there are entries.
    InvalidCapacity { requested: usize, len: usize },
    /// The requested capacity does not fit the slot encoding.
    CapacityOverflow { requested: usize },
    /// A token was stale, or a chain walk ran past its bound.
    ConcurrentStructuralChange,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IndexOutOfBounds { index, len } => {
                write!(f, "slot index {index} is not live (slot range is {len})")
            }
            Error::InvalidCapacity { requested, len } => {
                write!(f, "capacity {requested} is smaller than current size {len}")
            }
            Error::CapacityOverflow { requested } => {
                write!(f, "capacity {requested} exceeds the maximum slot count")
            }
            Error::ConcurrentStructuralChange => {
                f.write_str("table was structurally modified during traversal")
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = core::result::Result<T, E>;

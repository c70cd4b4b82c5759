use core::alloc::Layout;

/// Errors reported by the fallible (`try_*`) container operations.
///
/// The infallible counterparts treat the same conditions as fatal: allocation
/// failure goes through [`handle_alloc_error`](alloc::alloc::handle_alloc_error)
/// and precondition violations are `debug_assert!`s.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested capacity does not fit the container's index or size
    /// limits.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// The global allocator returned null for the given layout.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocFailed {
        /// Layout of the allocation that failed.
        layout: Layout,
    },

    /// `try_add` was called with a key that is already present.
    #[error("key already present")]
    DuplicateKey,

    /// An element index was outside the active range.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the container at the time of the call.
        len: usize,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// How an allocation path reacts to failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OnError {
    /// Panic on overflow, abort on allocator failure.
    Abort,
    /// Hand the error back to the caller.
    ReturnErr,
}

impl OnError {
    #[inline]
    pub(crate) fn overflow(self) -> Error {
        match self {
            OnError::Abort => panic!("capacity overflow"),
            OnError::ReturnErr => Error::CapacityOverflow,
        }
    }

    #[inline]
    pub(crate) fn alloc_failed(self, layout: Layout) -> Error {
        match self {
            OnError::Abort => alloc::alloc::handle_alloc_error(layout),
            OnError::ReturnErr => Error::AllocFailed { layout },
        }
    }
}

/// Unwraps a result produced under [`OnError::Abort`], which never yields
/// `Err`.
#[inline]
pub(crate) fn infallible<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => unreachable!("infallible allocation path returned {err}"),
    }
}

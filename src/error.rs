//! Error types used in the [`functionalize`](crate) crate.

/// Functionalize Error type.
///
/// The meta projection never produces errors of its own. Errors of the tensor allocator are propagated unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum Error {
    /* Logical errors */
    //
    /// User provided an invalid argument, for example a negative size or sizes and strides of different lengths.
    InvalidArgument,
    /// Object is an invalid type for the operation, for example a scalar type mismatch or an unexpected value tag.
    InvalidType,
    /// Operation is not supported in the current context, for example allocating on an unsupported device or
    /// with a non-strided layout.
    NotSupported,

    /* Resource errors */
    //
    /// The number of bytes required by a tensor's storage does not fit in `usize`.
    StorageSizeOverflow,
    /// The tensor has no storage, either because it is a meta tensor or because it is undefined.
    NoStorage,
    /// A view reaches outside of the storage it was created from.
    OutOfBounds,

    /* Memory overlap errors */
    //
    /// The tensor has elements that refer to the same memory location.
    InternalOverlap,
}
impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, fmt)
    }
}
#[cfg(feature = "std")]
impl std::error::Error for Error {}
#[cfg(all(error_in_core, not(feature = "std")))]
impl core::error::Error for Error {}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }

    #[test]
    fn display_matches_debug() {
        for err in [
            Error::InvalidArgument,
            Error::InvalidType,
            Error::NotSupported,
            Error::StorageSizeOverflow,
            Error::NoStorage,
            Error::OutOfBounds,
            Error::InternalOverlap,
        ] {
            assert_eq!(format!("{err}"), format!("{err:?}"));
        }
    }

    #[test]
    fn error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(Error::NoStorage);
        assert_eq!(err.to_string(), "NoStorage");
    }
}

//! The tensor metadata model.
//!
//! A [`Tensor`] is a cheap handle that is either undefined or points to shared, immutable metadata: possibly
//! symbolic sizes and strides ([`SymInt`]), a storage offset, a [`ScalarType`], a [`Layout`] and a [`Device`].
//! Tensors on the CPU own a [`Storage`] with their bytes; tensors on the meta device have no storage and exist only to
//! carry metadata through shape inference.
//!
//! New tensors are created with [`Tensor::from_slice`], [`Tensor::zeros`], [`Tensor::empty_strided`] or, for meta
//! tensors with symbolic shapes, [`empty_strided_meta_symint`]. Views sharing a storage are created with
//! [`Tensor::as_strided`].

mod scalar;
pub use scalar::{Scalar, ScalarType};

mod sym;
pub use sym::{SymInt, Symbol};

mod layout;
pub use layout::*;

mod storage;
pub use storage::Storage;

pub(crate) mod base;
pub use base::Tensor;

mod empty;
pub use empty::{compute_storage_nbytes, empty_strided_meta_symint};

#[cfg(feature = "ndarray")]
mod array;

mod fmt;

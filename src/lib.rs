#![cfg_attr(deny_warnings, deny(warnings))]
// some new clippy::lint annotations are supported in latest Rust but not recognized by older versions
#![cfg_attr(deny_warnings, allow(unknown_lints))]
#![cfg_attr(deny_warnings, deny(missing_docs))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Meta-device shape and stride inference for a tensor functionalization pass.
//!
//! Functionalization rewrites mutating (in-place) tensor operations into pure, non-aliasing equivalents. To do so it
//! must often know the sizes and strides an operation would produce without running it on real data. The pass
//! achieves that by re-dispatching the operation on the `meta` device: every tensor argument is replaced by a tensor
//! that carries the same sizes, strides, dtype and layout, but no storage, and the meta kernel computes the output
//! metadata only.
//!
//! This crate provides the three pieces of policy the pass applies around that re-dispatch:
//! - [`dispatch::EXCLUDE_KEYS_FOR_META_DISPATCH`]: the constant set of dispatch keys (functorch transforms, dynamic
//!   layer modes, Python and pre-dispatch) that must not run while inferring shapes on meta tensors.
//! - [`overlap::has_internal_overlap_helper`]: a conservative boolean view of the three-valued internal memory overlap
//!   analysis, used by the pass to decide whether an in-place op can be functionalized.
//! - [`meta::to_meta`] and the [`meta::ToMeta`] trait: projection of tensors, optional tensors, tensor lists and
//!   optional tensor lists onto their storage-less meta counterparts.
//!
//! ```rust
//! use functionalize::meta::to_meta;
//! use functionalize::tensor::{Device, Tensor};
//!
//! let t = Tensor::from_slice(&[1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
//! let m = to_meta(&t).unwrap();
//! assert_eq!(m.device(), Device::META);
//! assert_eq!(m.sizes(), t.sizes());
//! assert_eq!(m.strides(), t.strides());
//! assert!(m.data_bytes().is_none());
//! ```
//!
//! ## Cargo Features
//! - `std`:
//!   Enable the standard library. Required for the thread-local dispatch key guards, [`meta::infer_meta`] and the
//!   default stderr log sink. This feature is enabled by default.
//!   Without it the crate is `no_std`, but still requires a global allocator through the `alloc` crate.
//! - `ndarray`:
//!   Conversions between tensors and `ndarray` arrays.
//!   Adds a dependency to the `ndarray` crate.
//!   This feature is enabled by default.
//! - `half`:
//!   Adds a dependency to the `half` crate, which provides a fully capable `f16` and `bf16` types.
//!   Without this feature enabled, both of these types are available with a simple conversions to/from `u16` only.
//! - `num-complex`:
//!   Adds a dependency to the `num-complex` crate, which provides a fully capable complex number type.
//!   Without this feature enabled, complex numbers are available as a simple struct with two public fields without any
//!   operations.
//!
//! By default the `std` and `ndarray` features are enabled.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate core as std;

#[doc(hidden)]
pub mod __private {
    cfg_if::cfg_if! { if #[cfg(feature = "std")] {
        pub mod alloc {
            pub use std::boxed::Box;
            pub use std::string::String;
            pub use std::sync::Arc;
            pub use std::vec::Vec;
        }
    } else {
        pub mod alloc {
            extern crate alloc;
            pub use alloc::boxed::Box;
            pub use alloc::string::String;
            pub use alloc::sync::Arc;
            pub use alloc::vec::Vec;
        }
    } }
}

#[allow(unused_imports)]
use crate::__private::alloc;

#[macro_use]
mod private;
mod log;
pub mod dispatch;
mod error;
pub mod evalue;
pub mod meta;
pub mod overlap;
pub mod platform;
pub mod scalar;
pub mod tensor;

pub(crate) use error::Result;
pub use error::Error;

#[cfg(feature = "ndarray")]
pub use ndarray;

#[cfg(feature = "half")]
pub use half;

#[cfg(feature = "num-complex")]
pub use num_complex;


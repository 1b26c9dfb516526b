//! Element types without a native Rust counterpart.
//!
//! With the `half` and `num-complex` features these are re-exports of [`half::f16`], [`half::bf16`] and
//! [`num_complex::Complex`]. Without them, plain storage types take their place. The storage types expose the same
//! constructors and bit accessors as the full types, so code written against them keeps compiling when a feature is
//! turned on.

cfg_if::cfg_if! { if #[cfg(feature = "half")] {
    pub use half::{bf16, f16};
} else {
    /// IEEE 754 half precision float, stored as its raw `u16` bits.
    ///
    /// No arithmetic is available. Enable the `half` feature for a complete `f16`.
    #[allow(non_camel_case_types)]
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct f16(u16);
    impl f16 {
        /// Reinterpret raw bits as a half precision float.
        pub const fn from_bits(bits: u16) -> Self {
            Self(bits)
        }

        /// The raw bits of the value.
        pub const fn to_bits(self) -> u16 {
            self.0
        }
    }

    /// Brain float, the upper half of an IEEE 754 single precision float, stored as its raw `u16` bits.
    ///
    /// No arithmetic is available. Enable the `half` feature for a complete `bf16`.
    #[allow(non_camel_case_types)]
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct bf16(u16);
    impl bf16 {
        /// Reinterpret raw bits as a brain float.
        pub const fn from_bits(bits: u16) -> Self {
            Self(bits)
        }

        /// The raw bits of the value.
        pub const fn to_bits(self) -> u16 {
            self.0
        }
    }
} }

cfg_if::cfg_if! { if #[cfg(feature = "num-complex")] {
    pub use num_complex::Complex;
} else {
    /// A complex number with real part `re` and imaginary part `im`.
    ///
    /// Laid out as two consecutive `T`, matching the element layout of complex tensors. Enable the `num-complex`
    /// feature for arithmetic.
    #[derive(Copy, Clone, Debug, Default, PartialEq)]
    #[repr(C)]
    pub struct Complex<T> {
        /// Real part
        pub re: T,
        /// Imaginary part
        pub im: T,
    }
    impl<T> Complex<T> {
        /// Create a complex number from its parts.
        pub const fn new(re: T, im: T) -> Self {
            Self { re, im }
        }
    }
} }

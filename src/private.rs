/// Marker type used to seal public traits.
///
/// The type is public so it can appear in trait method signatures, but it lives in a private module and can not be
/// named outside of the crate, which prevents downstream implementations.
#[doc(hidden)]
pub struct Private;

/// Declare a hidden method on a public trait that only this crate can implement.
macro_rules! private_decl {
    () => {
        #[doc(hidden)]
        fn __private_sealed(&self, _: crate::private::Private);
    };
}

/// Implement the hidden method declared by [`private_decl`].
macro_rules! private_impl {
    () => {
        fn __private_sealed(&self, _: crate::private::Private) {}
    };
}

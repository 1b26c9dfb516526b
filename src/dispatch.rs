//! Dispatch keys and the set of keys excluded while inferring shapes on meta tensors.
//!
//! Every operator call is routed through a stack of execution layers (backends, autograd, functorch transforms,
//! Python modes, ...). Each layer is identified by a [`DispatchKey`], and the layers a call passes through are a
//! [`DispatchKeySet`]. When the functionalization pass re-dispatches an operation on meta tensors to compute output
//! metadata, the layers in [`EXCLUDE_KEYS_FOR_META_DISPATCH`] must not run, as they would wrap, trace or transform a
//! call that exists only for shape inference.
//!
//! With the `std` feature, the keys to include and exclude on the current thread are tracked by a thread-local
//! [`LocalDispatchKeySet`], which is modified with the RAII guards [`IncludeDispatchKeyGuard`] and
//! [`ExcludeDispatchKeyGuard`].

/// A single execution layer of the dispatcher.
///
/// Keys are ordered by priority: a key with a larger discriminant runs before keys with smaller ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum DispatchKey {
    CPU,
    CUDA,
    XPU,
    MPS,
    /// The backend of storage-less tensors, computing output metadata only.
    Meta,
    SparseCPU,
    SparseCUDA,
    BackendSelect,
    /// Python tensor subclasses and modes.
    Python,
    FuncTorchDynamicLayerBackMode,
    Functionalize,
    ADInplaceOrView,
    AutogradOther,
    AutogradCPU,
    AutogradCUDA,
    AutogradMeta,
    Tracer,
    AutocastCPU,
    AutocastCUDA,
    FuncTorchBatched,
    FuncTorchVmapMode,
    Batched,
    VmapMode,
    FuncTorchGradWrapper,
    PythonTLSSnapshot,
    FuncTorchDynamicLayerFrontMode,
    /// Tracing before any other layer runs, used to export pre-dispatch graphs.
    PreDispatch,
    PythonDispatcher,
}
impl DispatchKey {
    const ALL: [DispatchKey; 28] = [
        DispatchKey::CPU,
        DispatchKey::CUDA,
        DispatchKey::XPU,
        DispatchKey::MPS,
        DispatchKey::Meta,
        DispatchKey::SparseCPU,
        DispatchKey::SparseCUDA,
        DispatchKey::BackendSelect,
        DispatchKey::Python,
        DispatchKey::FuncTorchDynamicLayerBackMode,
        DispatchKey::Functionalize,
        DispatchKey::ADInplaceOrView,
        DispatchKey::AutogradOther,
        DispatchKey::AutogradCPU,
        DispatchKey::AutogradCUDA,
        DispatchKey::AutogradMeta,
        DispatchKey::Tracer,
        DispatchKey::AutocastCPU,
        DispatchKey::AutocastCUDA,
        DispatchKey::FuncTorchBatched,
        DispatchKey::FuncTorchVmapMode,
        DispatchKey::Batched,
        DispatchKey::VmapMode,
        DispatchKey::FuncTorchGradWrapper,
        DispatchKey::PythonTLSSnapshot,
        DispatchKey::FuncTorchDynamicLayerFrontMode,
        DispatchKey::PreDispatch,
        DispatchKey::PythonDispatcher,
    ];

    fn from_index(index: u32) -> Option<DispatchKey> {
        Self::ALL.get(index as usize).copied()
    }

    const fn bit(self) -> u64 {
        1_u64 << self as u8
    }
}

/// A set of [`DispatchKey`]s, stored as a bitset.
///
/// All constructors and set operations are `const fn`, allowing masks to be defined as constants.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DispatchKeySet(u64);
impl DispatchKeySet {
    /// Create an empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create a set containing a single key.
    pub const fn from_key(key: DispatchKey) -> Self {
        Self(key.bit())
    }

    /// Create a set containing the given keys.
    pub const fn from_keys(keys: &[DispatchKey]) -> Self {
        let mut repr = 0;
        let mut i = 0;
        while i < keys.len() {
            repr |= keys[i].bit();
            i += 1;
        }
        Self(repr)
    }

    /// The union of both sets.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// The keys of this set that are not in `other`.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// The keys in both sets.
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Whether the set contains the key.
    pub const fn has(self, key: DispatchKey) -> bool {
        self.0 & key.bit() != 0
    }

    /// Whether the set contains any key of `other`.
    pub const fn has_any(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// This set with the key added.
    pub const fn add(self, key: DispatchKey) -> Self {
        Self(self.0 | key.bit())
    }

    /// This set with the key removed.
    pub const fn remove(self, key: DispatchKey) -> Self {
        Self(self.0 & !key.bit())
    }

    /// Whether the set is empty.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The number of keys in the set.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// The key with the highest priority in the set, the one the dispatcher would run first.
    pub fn highest_priority_key(self) -> Option<DispatchKey> {
        if self.is_empty() {
            return None;
        }
        DispatchKey::from_index(63 - self.0.leading_zeros())
    }

    /// Iterate over the keys of the set, in ascending priority order.
    pub fn iter(self) -> impl Iterator<Item = DispatchKey> {
        let mut remaining = self.0;
        core::iter::from_fn(move || {
            while remaining != 0 {
                let index = remaining.trailing_zeros();
                remaining &= remaining - 1;
                if let Some(key) = DispatchKey::from_index(index) {
                    return Some(key);
                }
            }
            None
        })
    }
}
impl From<DispatchKey> for DispatchKeySet {
    fn from(key: DispatchKey) -> Self {
        Self::from_key(key)
    }
}
impl core::ops::BitOr for DispatchKeySet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}
impl core::ops::BitAnd for DispatchKeySet {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}
impl core::ops::Sub for DispatchKeySet {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}
impl std::fmt::Debug for DispatchKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// The keys of all functorch transforms.
pub const FUNCTORCH_TRANSFORMS_KS: DispatchKeySet = DispatchKeySet::from_keys(&[
    DispatchKey::FuncTorchBatched,
    DispatchKey::FuncTorchVmapMode,
    DispatchKey::Batched,
    DispatchKey::VmapMode,
    DispatchKey::FuncTorchGradWrapper,
]);

/// The keys that must be excluded while re-dispatching an operation on meta tensors to infer output metadata.
///
/// That is every functorch transform, both dynamic layer modes, the Python key and the pre-dispatch key. The set is a
/// compile time constant and is identical on every thread.
pub const EXCLUDE_KEYS_FOR_META_DISPATCH: DispatchKeySet =
    FUNCTORCH_TRANSFORMS_KS.union(DispatchKeySet::from_keys(&[
        DispatchKey::FuncTorchDynamicLayerBackMode,
        DispatchKey::FuncTorchDynamicLayerFrontMode,
        DispatchKey::Python,
        DispatchKey::PreDispatch,
    ]));

#[cfg(feature = "std")]
pub use local::*;

#[cfg(feature = "std")]
mod local {
    use std::cell::Cell;
    use std::marker::PhantomData;

    use super::DispatchKeySet;

    /// The keys included and excluded on the current thread.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LocalDispatchKeySet {
        /// Keys added to every dispatch on this thread.
        pub included: DispatchKeySet,
        /// Keys removed from every dispatch on this thread.
        pub excluded: DispatchKeySet,
    }

    thread_local! {
        static LOCAL_DISPATCH_KEY_SET: Cell<LocalDispatchKeySet> = const {
            Cell::new(LocalDispatchKeySet {
                included: DispatchKeySet::empty(),
                excluded: DispatchKeySet::empty(),
            })
        };
    }

    /// Get the keys included and excluded on the current thread.
    pub fn tls_local_dispatch_key_set() -> LocalDispatchKeySet {
        LOCAL_DISPATCH_KEY_SET.with(Cell::get)
    }

    fn update(f: impl FnOnce(&mut LocalDispatchKeySet)) {
        LOCAL_DISPATCH_KEY_SET.with(|tls| {
            let mut local = tls.get();
            f(&mut local);
            tls.set(local);
        });
    }

    /// The keys a dispatch of a call with the given keys goes through on the current thread.
    pub fn compute_dispatch_key_set(keys: DispatchKeySet) -> DispatchKeySet {
        let local = tls_local_dispatch_key_set();
        (keys | local.included) - local.excluded
    }

    /// Adds keys to the thread-local included set for the lifetime of the guard.
    ///
    /// On drop, only the keys this guard added are removed, so keys that were already included before the guard was
    /// created stay included.
    #[must_use = "the keys are removed when the guard is dropped"]
    pub struct IncludeDispatchKeyGuard {
        added: DispatchKeySet,
        _not_send: PhantomData<*const ()>,
    }
    impl IncludeDispatchKeyGuard {
        /// Include the keys on the current thread until the guard is dropped.
        pub fn new(keys: impl Into<DispatchKeySet>) -> Self {
            let keys = keys.into();
            let mut added = DispatchKeySet::empty();
            update(|local| {
                added = keys - local.included;
                local.included = local.included | keys;
            });
            Self {
                added,
                _not_send: PhantomData,
            }
        }
    }
    impl Drop for IncludeDispatchKeyGuard {
        fn drop(&mut self) {
            let added = self.added;
            update(|local| local.included = local.included - added);
        }
    }

    /// Adds keys to the thread-local excluded set for the lifetime of the guard.
    ///
    /// On drop, only the keys this guard added are removed, so keys that were already excluded before the guard was
    /// created stay excluded.
    #[must_use = "the keys are removed when the guard is dropped"]
    pub struct ExcludeDispatchKeyGuard {
        added: DispatchKeySet,
        _not_send: PhantomData<*const ()>,
    }
    impl ExcludeDispatchKeyGuard {
        /// Exclude the keys on the current thread until the guard is dropped.
        pub fn new(keys: impl Into<DispatchKeySet>) -> Self {
            let keys = keys.into();
            let mut added = DispatchKeySet::empty();
            update(|local| {
                added = keys - local.excluded;
                local.excluded = local.excluded | keys;
            });
            Self {
                added,
                _not_send: PhantomData,
            }
        }
    }
    impl Drop for ExcludeDispatchKeyGuard {
        fn drop(&mut self) {
            let added = self.added;
            update(|local| local.excluded = local.excluded - added);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Vec;

    #[test]
    fn exclude_mask_contents() {
        let expected = [
            DispatchKey::Python,
            DispatchKey::FuncTorchDynamicLayerBackMode,
            DispatchKey::FuncTorchBatched,
            DispatchKey::FuncTorchVmapMode,
            DispatchKey::Batched,
            DispatchKey::VmapMode,
            DispatchKey::FuncTorchGradWrapper,
            DispatchKey::FuncTorchDynamicLayerFrontMode,
            DispatchKey::PreDispatch,
        ];
        assert_eq!(EXCLUDE_KEYS_FOR_META_DISPATCH.iter().collect::<Vec<_>>(), expected);
        assert_eq!(EXCLUDE_KEYS_FOR_META_DISPATCH.len(), 9);
        assert!(EXCLUDE_KEYS_FOR_META_DISPATCH.has_any(FUNCTORCH_TRANSFORMS_KS));
        assert_eq!(
            EXCLUDE_KEYS_FOR_META_DISPATCH & FUNCTORCH_TRANSFORMS_KS,
            FUNCTORCH_TRANSFORMS_KS
        );
        for key in [
            DispatchKey::Meta,
            DispatchKey::CPU,
            DispatchKey::Functionalize,
            DispatchKey::AutogradMeta,
            DispatchKey::PythonDispatcher,
        ] {
            assert!(!EXCLUDE_KEYS_FOR_META_DISPATCH.has(key), "{key:?}");
        }
    }

    #[cfg(feature = "std")]
    #[test]
    fn exclude_mask_is_stable() {
        let first = EXCLUDE_KEYS_FOR_META_DISPATCH;
        for _ in 0..10 {
            assert_eq!(EXCLUDE_KEYS_FOR_META_DISPATCH, first);
        }
        std::thread::scope(|s| {
            let handles = (0..4)
                .map(|_| s.spawn(|| EXCLUDE_KEYS_FOR_META_DISPATCH))
                .collect::<Vec<_>>();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), first);
            }
        });
    }

    #[test]
    fn key_set_operations() {
        let set = DispatchKeySet::from_key(DispatchKey::CPU).add(DispatchKey::AutogradCPU);
        assert!(set.has(DispatchKey::CPU));
        assert!(!set.has(DispatchKey::Meta));
        assert_eq!(set.len(), 2);
        assert_eq!(set.highest_priority_key(), Some(DispatchKey::AutogradCPU));
        assert_eq!(set.remove(DispatchKey::AutogradCPU), DispatchKey::CPU.into());
        assert_eq!(set - set, DispatchKeySet::empty());
        assert!(DispatchKeySet::empty().is_empty());
        assert_eq!(DispatchKeySet::empty().highest_priority_key(), None);
        assert_eq!(
            set | DispatchKey::PythonDispatcher.into(),
            DispatchKeySet::from_keys(&[
                DispatchKey::CPU,
                DispatchKey::AutogradCPU,
                DispatchKey::PythonDispatcher
            ])
        );
    }

    #[test]
    fn key_set_debug() {
        let set = DispatchKeySet::from_keys(&[DispatchKey::PreDispatch, DispatchKey::Meta]);
        assert_eq!(format!("{set:?}"), "{Meta, PreDispatch}");
        assert_eq!(format!("{:?}", DispatchKeySet::empty()), "{}");
    }

    #[cfg(feature = "std")]
    #[test]
    fn exclude_guard_nesting() {
        let before = tls_local_dispatch_key_set();
        assert!(!before.excluded.has(DispatchKey::Python));
        {
            let _python = ExcludeDispatchKeyGuard::new(DispatchKey::Python);
            {
                let _meta = ExcludeDispatchKeyGuard::new(EXCLUDE_KEYS_FOR_META_DISPATCH);
                assert_eq!(
                    tls_local_dispatch_key_set().excluded,
                    EXCLUDE_KEYS_FOR_META_DISPATCH
                );
            }
            // the inner guard did not add Python, so it must not remove it
            assert_eq!(
                tls_local_dispatch_key_set().excluded,
                DispatchKey::Python.into()
            );
        }
        assert_eq!(tls_local_dispatch_key_set(), before);
    }

    #[cfg(feature = "std")]
    #[test]
    fn include_guard_and_compute() {
        let keys = DispatchKeySet::from_keys(&[DispatchKey::Meta, DispatchKey::Python]);
        assert_eq!(compute_dispatch_key_set(keys), keys);
        {
            let _include = IncludeDispatchKeyGuard::new(DispatchKey::FuncTorchBatched);
            let _exclude = ExcludeDispatchKeyGuard::new(EXCLUDE_KEYS_FOR_META_DISPATCH);
            let computed = compute_dispatch_key_set(keys);
            assert_eq!(computed, DispatchKey::Meta.into());
            assert!(!computed.has_any(EXCLUDE_KEYS_FOR_META_DISPATCH));
        }
        assert_eq!(compute_dispatch_key_set(keys), keys);
    }

    #[cfg(feature = "std")]
    #[test]
    fn guards_are_thread_local() {
        let _exclude = ExcludeDispatchKeyGuard::new(EXCLUDE_KEYS_FOR_META_DISPATCH);
        std::thread::scope(|s| {
            let other = s.spawn(tls_local_dispatch_key_set).join().unwrap();
            assert!(other.excluded.is_empty());
        });
    }
}

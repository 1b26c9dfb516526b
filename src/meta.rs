//! Projection of tensors onto the meta device.
//!
//! The functionalization pass infers the sizes and strides an operation produces by running it on meta tensors:
//! tensors with the same sizes, strides, dtype and layout as the real arguments, but without storage. [`to_meta`]
//! performs that projection for every argument shape the pass deals with:
//!
//! | Argument                                  | Projection                                             |
//! |-------------------------------------------|--------------------------------------------------------|
//! | [`Tensor`]                                | a fresh meta tensor, undefined tensors stay undefined |
//! | `Option<Tensor>`                          | `None` stays `None`                                    |
//! | `[Tensor]`, `Vec<Tensor>`, [`TensorListRef`] | element-wise, same length and order                 |
//! | `[Option<Tensor>]`, `Vec<Option<Tensor>>` | element-wise, same length and order                    |
//!
//! All of them share the single tensor rule through the generic implementations of [`ToMeta`], so absence is
//! handled identically everywhere.

use crate::alloc::Vec;
use crate::evalue::EValue;
use crate::tensor::{empty_strided_meta_symint, Device, Tensor};
use crate::{Error, Result};

/// A value that can be projected onto the meta device.
pub trait ToMeta {
    /// The projected value.
    type Meta;

    /// Project the value onto the meta device.
    ///
    /// Failures of the meta allocator are returned unchanged.
    fn to_meta(&self) -> Result<Self::Meta>;
}

/// Project a value onto the meta device.
///
/// See the [module documentation](self) for the supported values.
///
/// ```
/// use functionalize::meta::to_meta;
/// use functionalize::tensor::Tensor;
///
/// let a = Tensor::from_slice(&[1_i64, 2, 3], &[3]).unwrap();
/// let args = vec![Some(a), None];
/// let metas = to_meta(&args).unwrap();
/// assert_eq!(metas.len(), 2);
/// assert!(metas[0].as_ref().unwrap().is_meta());
/// assert!(metas[1].is_none());
/// ```
pub fn to_meta<T: ToMeta + ?Sized>(value: &T) -> Result<T::Meta> {
    value.to_meta()
}

impl ToMeta for Tensor {
    type Meta = Tensor;

    /// Allocate a new meta tensor with the same sizes, strides, dtype and layout.
    ///
    /// An undefined tensor is returned as is, without allocating anything. The storage offset of the new tensor is
    /// zero, as it is a fresh allocation rather than a view.
    fn to_meta(&self) -> Result<Tensor> {
        if !self.defined() {
            return Ok(self.clone());
        }
        crate::log::debug!(
            "to_meta: projecting a {}-dim {:?} tensor from {}",
            self.dim(),
            self.scalar_type(),
            self.device()
        );
        empty_strided_meta_symint(
            self.sym_sizes(),
            self.sym_strides(),
            Some(self.scalar_type()),
            Some(self.layout()),
            Some(Device::META),
            None,
        )
    }
}

impl<T: ToMeta> ToMeta for Option<T> {
    type Meta = Option<T::Meta>;
    fn to_meta(&self) -> Result<Self::Meta> {
        self.as_ref().map(ToMeta::to_meta).transpose()
    }
}

impl<T: ToMeta> ToMeta for [T] {
    type Meta = Vec<T::Meta>;
    fn to_meta(&self) -> Result<Self::Meta> {
        let mut metas = Vec::with_capacity(self.len());
        for value in self {
            metas.push(value.to_meta()?);
        }
        Ok(metas)
    }
}

impl<T: ToMeta> ToMeta for Vec<T> {
    type Meta = Vec<T::Meta>;
    fn to_meta(&self) -> Result<Self::Meta> {
        self.as_slice().to_meta()
    }
}

impl<T: ToMeta, const N: usize> ToMeta for [T; N] {
    type Meta = Vec<T::Meta>;
    fn to_meta(&self) -> Result<Self::Meta> {
        self.as_slice().to_meta()
    }
}

impl<T: ToMeta + ?Sized> ToMeta for &T {
    type Meta = T::Meta;
    fn to_meta(&self) -> Result<Self::Meta> {
        (**self).to_meta()
    }
}

impl ToMeta for EValue {
    type Meta = EValue;

    /// Project the tensors held by the value. Values of other types are cloned.
    fn to_meta(&self) -> Result<EValue> {
        Ok(match self {
            EValue::Tensor(t) => EValue::Tensor(t.to_meta()?),
            EValue::ListTensor(ts) => EValue::ListTensor(ts.to_meta()?),
            EValue::ListOptionalTensor(ts) => EValue::ListOptionalTensor(ts.to_meta()?),
            other => other.clone(),
        })
    }
}

/// A borrowed list of tensors, independent of how the list is stored.
///
/// The list is either a slice of tensors, a slice of tensor references, or a slice of boxed [`EValue`]s that all hold
/// a tensor.
#[derive(Clone, Copy)]
pub struct TensorListRef<'a>(Repr<'a>);

#[derive(Clone, Copy)]
enum Repr<'a> {
    Slice(&'a [Tensor]),
    Refs(&'a [&'a Tensor]),
    Boxed(&'a [EValue]),
}

impl<'a> TensorListRef<'a> {
    /// Create a list from a slice of tensors.
    pub fn from_slice(tensors: &'a [Tensor]) -> Self {
        Self(Repr::Slice(tensors))
    }

    /// Create a list from a slice of tensor references.
    pub fn from_refs(tensors: &'a [&'a Tensor]) -> Self {
        Self(Repr::Refs(tensors))
    }

    /// Create a list from a slice of boxed values.
    ///
    /// Fails with [`Error::InvalidType`] if any of the values does not hold a tensor.
    pub fn from_boxed(values: &'a [EValue]) -> Result<Self> {
        if let Some(value) = values.iter().find(|v| !matches!(v, EValue::Tensor(_))) {
            crate::log::error!(
                "boxed tensor list holds a value of type {:?}",
                value.tag()
            );
            return Err(Error::InvalidType);
        }
        Ok(Self(Repr::Boxed(values)))
    }

    /// The number of tensors in the list.
    pub fn len(&self) -> usize {
        match self.0 {
            Repr::Slice(tensors) => tensors.len(),
            Repr::Refs(tensors) => tensors.len(),
            Repr::Boxed(values) => values.len(),
        }
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the tensors of the list, in order.
    pub fn iter(&self) -> TensorListIter<'a> {
        TensorListIter(match self.0 {
            Repr::Slice(tensors) => IterRepr::Slice(tensors.iter()),
            Repr::Refs(tensors) => IterRepr::Refs(tensors.iter()),
            Repr::Boxed(values) => IterRepr::Boxed(values.iter()),
        })
    }
}
impl<'a> From<&'a [Tensor]> for TensorListRef<'a> {
    fn from(tensors: &'a [Tensor]) -> Self {
        Self::from_slice(tensors)
    }
}
impl<'a> From<&'a Vec<Tensor>> for TensorListRef<'a> {
    fn from(tensors: &'a Vec<Tensor>) -> Self {
        Self::from_slice(tensors)
    }
}
impl<'a> From<&'a [&'a Tensor]> for TensorListRef<'a> {
    fn from(tensors: &'a [&'a Tensor]) -> Self {
        Self::from_refs(tensors)
    }
}
impl<'a> IntoIterator for TensorListRef<'a> {
    type Item = &'a Tensor;
    type IntoIter = TensorListIter<'a>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
impl std::fmt::Debug for TensorListRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// An iterator over the tensors of a [`TensorListRef`].
pub struct TensorListIter<'a>(IterRepr<'a>);

enum IterRepr<'a> {
    Slice(core::slice::Iter<'a, Tensor>),
    Refs(core::slice::Iter<'a, &'a Tensor>),
    Boxed(core::slice::Iter<'a, EValue>),
}

impl<'a> Iterator for TensorListIter<'a> {
    type Item = &'a Tensor;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.0 {
            IterRepr::Slice(it) => it.next(),
            IterRepr::Refs(it) => it.next().copied(),
            // every boxed value was checked to hold a tensor on construction
            IterRepr::Boxed(it) => it.find_map(|value| match value {
                EValue::Tensor(t) => Some(t),
                _ => None,
            }),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = match &self.0 {
            IterRepr::Slice(it) => it.len(),
            IterRepr::Refs(it) => it.len(),
            IterRepr::Boxed(it) => it.len(),
        };
        (len, Some(len))
    }
}
impl ExactSizeIterator for TensorListIter<'_> {}

impl ToMeta for TensorListRef<'_> {
    type Meta = Vec<Tensor>;
    fn to_meta(&self) -> Result<Vec<Tensor>> {
        let mut metas = Vec::with_capacity(self.len());
        for tensor in self.iter() {
            metas.push(tensor.to_meta()?);
        }
        Ok(metas)
    }
}

#[cfg(feature = "std")]
pub use redispatch::infer_meta;

#[cfg(feature = "std")]
mod redispatch {
    use super::ToMeta;
    use crate::dispatch::{ExcludeDispatchKeyGuard, EXCLUDE_KEYS_FOR_META_DISPATCH};
    use crate::Result;

    /// Run a shape inference kernel on the meta projection of the given arguments.
    ///
    /// The arguments are projected with [`to_meta`](super::to_meta), and the kernel runs with the keys of
    /// [`EXCLUDE_KEYS_FOR_META_DISPATCH`] excluded on the current thread. The exclusion is lifted when the kernel
    /// returns, including on panic.
    ///
    /// ```
    /// use functionalize::dispatch::{compute_dispatch_key_set, DispatchKey, DispatchKeySet};
    /// use functionalize::meta::infer_meta;
    /// use functionalize::tensor::Tensor;
    ///
    /// let t = Tensor::from_slice(&[1.0_f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    /// let keys = DispatchKeySet::from_keys(&[DispatchKey::Meta, DispatchKey::Python]);
    /// let (sizes, dispatched) = infer_meta(&t, |meta| Ok((meta.sizes(), compute_dispatch_key_set(keys)))).unwrap();
    /// assert_eq!(sizes, vec![2, 2]);
    /// assert_eq!(dispatched, DispatchKey::Meta.into());
    /// ```
    pub fn infer_meta<A, R, F>(args: &A, kernel: F) -> Result<R>
    where
        A: ToMeta + ?Sized,
        F: FnOnce(A::Meta) -> Result<R>,
    {
        let meta_args = args.to_meta()?;
        let _guard = ExcludeDispatchKeyGuard::new(EXCLUDE_KEYS_FOR_META_DISPATCH);
        kernel(meta_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{Layout, ScalarType, SymInt, Symbol, TensorOptions};

    fn assert_projection(t: &Tensor, m: &Tensor) {
        assert!(m.defined());
        assert!(m.is_meta());
        assert_eq!(m.device(), Device::META);
        assert_eq!(m.sym_sizes(), t.sym_sizes());
        assert_eq!(m.sym_strides(), t.sym_strides());
        assert_eq!(m.scalar_type(), t.scalar_type());
        assert_eq!(m.layout(), t.layout());
        assert!(!m.has_storage());
        assert!(m.data_bytes().is_none());
        assert!(!m.is_same(t));
    }

    fn float_2x3() -> Tensor {
        Tensor::from_slice(&[1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap()
    }

    #[test]
    fn tensor_projection() {
        let t = float_2x3();
        let m = to_meta(&t).unwrap();
        assert_projection(&t, &m);
        assert_eq!(m.sizes(), vec![2, 3]);
        assert_eq!(m.strides(), vec![3, 1]);
        assert_eq!(m.scalar_type(), ScalarType::Float);
        // the source is left untouched
        assert_eq!(t.device(), Device::CPU);
        assert_eq!(t.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn view_projection() {
        let t = float_2x3();
        let view = t.as_strided(&[3, 2], &[1, 3], 0).unwrap();
        assert_projection(&view, &to_meta(&view).unwrap());

        let sliced = t.as_strided(&[2], &[3], 1).unwrap();
        let m = to_meta(&sliced).unwrap();
        assert_projection(&sliced, &m);
        assert_eq!(m.storage_offset(), 0);
    }

    #[test]
    fn meta_projection_of_meta_tensor() {
        let t = Tensor::empty_strided(&[4, 1], &[1, 1], TensorOptions::new().device(Device::META))
            .unwrap();
        assert_projection(&t, &to_meta(&t).unwrap());
    }

    #[test]
    fn projection_is_referentially_idempotent() {
        let t = float_2x3();
        let a = to_meta(&t).unwrap();
        let b = to_meta(&t).unwrap();
        assert!(!a.is_same(&b));
        assert_eq!(a.sym_sizes(), b.sym_sizes());
        assert_eq!(a.sym_strides(), b.sym_strides());
        assert_eq!(a.scalar_type(), b.scalar_type());
        let aa = to_meta(&a).unwrap();
        assert_eq!(aa.sym_sizes(), a.sym_sizes());
        assert_eq!(aa.device(), a.device());
    }

    #[test]
    fn symbolic_sizes_survive() {
        let s0 = SymInt::symbolic(Symbol::new(0), Some(4));
        let t = empty_strided_meta_symint(
            &[s0, SymInt::new(3)],
            &[SymInt::new(3), SymInt::new(1)],
            Some(ScalarType::BFloat16),
            None,
            None,
            None,
        )
        .unwrap();
        let m = to_meta(&t).unwrap();
        assert_projection(&t, &m);
        assert!(m.has_symbolic_sizes_strides());
    }

    #[test]
    fn undefined_stays_undefined() {
        let m = to_meta(&Tensor::undefined()).unwrap();
        assert!(!m.defined());
    }

    #[test]
    fn optional_projection() {
        assert!(to_meta(&None::<Tensor>).unwrap().is_none());

        let t = float_2x3();
        let m = to_meta(&Some(t.clone())).unwrap().unwrap();
        assert_projection(&t, &m);

        let m = to_meta(&Some(Tensor::undefined())).unwrap();
        assert!(matches!(m, Some(ref t) if !t.defined()));
    }

    #[test]
    fn list_with_undefined_middle() {
        let a = float_2x3();
        let c = Tensor::from_slice(&[1_i64, 2], &[2]).unwrap();
        let list = vec![a.clone(), Tensor::undefined(), c.clone()];

        let metas = to_meta(&list).unwrap();
        assert_eq!(metas.len(), 3);
        assert_projection(&a, &metas[0]);
        assert!(!metas[1].defined());
        assert_projection(&c, &metas[2]);

        let metas = to_meta(list.as_slice()).unwrap();
        assert_eq!(metas.len(), 3);
        assert!(!metas[1].defined());

        let metas = to_meta(&[a, Tensor::undefined(), c]).unwrap();
        assert_eq!(metas.len(), 3);
        assert!(!metas[1].defined());
    }

    #[test]
    fn list_projection_matches_element_projection() {
        let t = float_2x3();
        let list = vec![
            t.clone(),
            t.as_strided(&[3, 2], &[1, 3], 0).unwrap(),
            t.as_strided(&[6], &[1], 0).unwrap(),
        ];
        let metas = to_meta(&list).unwrap();
        assert_eq!(metas.len(), list.len());
        for (t, m) in list.iter().zip(&metas) {
            let expected = to_meta(t).unwrap();
            assert_eq!(m.sym_sizes(), expected.sym_sizes());
            assert_eq!(m.sym_strides(), expected.sym_strides());
            assert_projection(t, m);
        }
        assert!(to_meta(&Vec::<Tensor>::new()).unwrap().is_empty());
    }

    #[test]
    fn optional_list_projection() {
        let t = float_2x3();
        let list = vec![None, Some(t.clone()), Some(Tensor::undefined()), None];
        let metas = to_meta(&list).unwrap();
        assert_eq!(metas.len(), 4);
        assert!(metas[0].is_none());
        assert_projection(&t, metas[1].as_ref().unwrap());
        assert!(!metas[2].as_ref().unwrap().defined());
        assert!(metas[3].is_none());
    }

    #[test]
    fn tensor_list_ref_representations() {
        let a = float_2x3();
        let b = Tensor::from_slice(&[true, false], &[2]).unwrap();
        let owned = vec![a.clone(), Tensor::undefined(), b.clone()];
        let refs = [&a, &owned[1], &b];
        let boxed = [
            EValue::from(a.clone()),
            EValue::Tensor(Tensor::undefined()),
            EValue::from(b.clone()),
        ];

        for list in [
            TensorListRef::from(&owned),
            TensorListRef::from(&refs[..]),
            TensorListRef::from_boxed(&boxed).unwrap(),
        ] {
            assert_eq!(list.len(), 3);
            assert!(!list.is_empty());
            assert_eq!(list.iter().len(), 3);
            assert!(list.iter().nth(1).is_some_and(|t| !t.defined()));

            let metas = to_meta(&list).unwrap();
            assert_eq!(metas.len(), 3);
            assert_projection(&a, &metas[0]);
            assert!(!metas[1].defined());
            assert_projection(&b, &metas[2]);
        }
    }

    #[test]
    fn tensor_list_ref_rejects_non_tensor_values() {
        let boxed = [EValue::from(float_2x3()), EValue::from(3_i64)];
        assert_eq!(
            TensorListRef::from_boxed(&boxed).err(),
            Some(Error::InvalidType)
        );
        assert!(TensorListRef::from_boxed(&[]).unwrap().is_empty());
    }

    #[test]
    fn evalue_projection() {
        let t = float_2x3();
        let m = to_meta(&EValue::from(t.clone())).unwrap();
        assert_projection(&t, m.as_tensor());

        let m = to_meta(&EValue::from(vec![t.clone(), Tensor::undefined()])).unwrap();
        assert_projection(&t, &m.as_tensor_list()[0]);
        assert!(!m.as_tensor_list()[1].defined());

        let m = to_meta(&EValue::from(vec![None, Some(t.clone())])).unwrap();
        assert!(m.as_optional_tensor_list()[0].is_none());
        assert_projection(&t, m.as_optional_tensor_list()[1].as_ref().unwrap());

        assert_eq!(to_meta(&EValue::from(5_i64)).unwrap().as_i64(), 5);
        assert_eq!(to_meta(&EValue::from(vec![1_i64, 2])).unwrap().as_i64_list(), &[1, 2]);
        assert_eq!(to_meta(&EValue::from("sum")).unwrap().as_str(), "sum");
        assert!(to_meta(&EValue::None).unwrap().is_none());
    }

    #[test]
    fn allocator_errors_propagate() {
        let sparse = Tensor::from_impl(crate::tensor::base::TensorImpl {
            sizes: vec![SymInt::new(4)],
            strides: vec![SymInt::new(1)],
            storage_offset: 0,
            dtype: ScalarType::Float,
            layout: Layout::Sparse,
            device: Device::CPU,
            storage: None,
        });
        assert_eq!(to_meta(&sparse).err(), Some(Error::NotSupported));
        assert_eq!(
            to_meta(&vec![float_2x3(), sparse.clone()]).err(),
            Some(Error::NotSupported)
        );
        assert_eq!(to_meta(&Some(sparse)).err(), Some(Error::NotSupported));
    }

    #[cfg(feature = "std")]
    #[test]
    fn infer_meta_excludes_keys() {
        use crate::dispatch::{
            compute_dispatch_key_set, tls_local_dispatch_key_set, DispatchKey, DispatchKeySet,
            EXCLUDE_KEYS_FOR_META_DISPATCH,
        };

        let a = float_2x3();
        let b = Tensor::from_slice(&[1.0_f32, 2.0, 3.0], &[3]).unwrap();
        let keys = DispatchKeySet::from_keys(&[
            DispatchKey::Meta,
            DispatchKey::AutogradMeta,
            DispatchKey::FuncTorchBatched,
            DispatchKey::Python,
            DispatchKey::PreDispatch,
        ]);
        let before = tls_local_dispatch_key_set();

        let out = infer_meta(&[Some(a.clone()), None, Some(b)], |metas| {
            assert_eq!(metas.len(), 3);
            assert!(metas[1].is_none());
            let dispatched = compute_dispatch_key_set(keys);
            assert!(!dispatched.has_any(EXCLUDE_KEYS_FOR_META_DISPATCH));
            assert_eq!(dispatched.highest_priority_key(), Some(DispatchKey::AutogradMeta));
            let a = metas[0].as_ref().ok_or(Error::InvalidArgument)?;
            empty_strided_meta_symint(
                a.sym_sizes(),
                a.sym_strides(),
                Some(a.scalar_type()),
                None,
                None,
                None,
            )
        })
        .unwrap();
        assert_projection(&a, &out);
        assert_eq!(tls_local_dispatch_key_set(), before);
        assert_eq!(compute_dispatch_key_set(keys), keys);
    }

    #[cfg(feature = "std")]
    #[test]
    fn infer_meta_propagates_kernel_errors() {
        let before = crate::dispatch::tls_local_dispatch_key_set();
        let result = infer_meta(&float_2x3(), |_| Err::<(), _>(Error::NotSupported));
        assert_eq!(result, Err(Error::NotSupported));
        assert_eq!(crate::dispatch::tls_local_dispatch_key_set(), before);
    }
}

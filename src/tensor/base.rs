use crate::alloc::{Arc, Vec};
use crate::tensor::sym::{as_concrete, from_concrete};
use crate::tensor::{
    compute_storage_nbytes, Device, Layout, Scalar, ScalarType, Storage, SymInt, TensorOptions,
};
use crate::{Error, Result};

/// The shared metadata and storage of a defined tensor.
pub(crate) struct TensorImpl {
    pub(crate) sizes: Vec<SymInt>,
    pub(crate) strides: Vec<SymInt>,
    pub(crate) storage_offset: i64,
    pub(crate) dtype: ScalarType,
    pub(crate) layout: Layout,
    pub(crate) device: Device,
    pub(crate) storage: Option<Storage>,
}

/// A tensor handle.
///
/// A tensor is either *undefined*, a handle that points to nothing, or points to immutable shared metadata (sizes,
/// strides, storage offset, dtype, layout, device) and an optional [`Storage`]. Cloning a tensor is cheap and yields
/// another handle to the same tensor, see [`is_same`](Self::is_same).
///
/// Most accessors panic on an undefined tensor, check [`defined`](Self::defined) first when the tensor may be
/// undefined.
#[derive(Clone, Default)]
pub struct Tensor(Option<Arc<TensorImpl>>);
impl Tensor {
    /// Create an undefined tensor.
    pub const fn undefined() -> Self {
        Self(None)
    }

    pub(crate) fn from_impl(tensor_impl: TensorImpl) -> Self {
        Self(Some(Arc::new(tensor_impl)))
    }

    /// Whether the tensor is defined.
    pub fn defined(&self) -> bool {
        self.0.is_some()
    }

    #[track_caller]
    fn imp(&self) -> &TensorImpl {
        match &self.0 {
            Some(tensor_impl) => tensor_impl,
            None => panic!("called a metadata accessor on an undefined tensor"),
        }
    }

    /// Returns the number of dimensions of the tensor.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn dim(&self) -> usize {
        self.imp().sizes.len()
    }

    /// Returns the possibly symbolic sizes of the tensor.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn sym_sizes(&self) -> &[SymInt] {
        &self.imp().sizes
    }

    /// Returns the possibly symbolic strides of the tensor.
    ///
    /// Strides are in units of the elements size, not in bytes.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn sym_strides(&self) -> &[SymInt] {
        &self.imp().strides
    }

    /// Returns the concrete sizes of the tensor, or `None` if any of them is symbolic.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn concrete_sizes(&self) -> Option<Vec<i64>> {
        as_concrete(self.sym_sizes())
    }

    /// Returns the concrete strides of the tensor, or `None` if any of them is symbolic.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn concrete_strides(&self) -> Option<Vec<i64>> {
        as_concrete(self.sym_strides())
    }

    /// Returns the sizes of the tensor.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined or has symbolic sizes. Use [`sym_sizes`](Self::sym_sizes) for tensors that may
    /// have symbolic sizes.
    #[track_caller]
    pub fn sizes(&self) -> Vec<i64> {
        match self.concrete_sizes() {
            Some(sizes) => sizes,
            None => panic!("tensor has symbolic sizes, use sym_sizes() instead"),
        }
    }

    /// Returns the strides of the tensor.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined or has symbolic strides. Use [`sym_strides`](Self::sym_strides) for tensors that
    /// may have symbolic strides.
    #[track_caller]
    pub fn strides(&self) -> Vec<i64> {
        match self.concrete_strides() {
            Some(strides) => strides,
            None => panic!("tensor has symbolic strides, use sym_strides() instead"),
        }
    }

    /// Whether any of the sizes or strides is symbolic.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn has_symbolic_sizes_strides(&self) -> bool {
        let imp = self.imp();
        imp.sizes.iter().chain(&imp.strides).any(SymInt::is_symbolic)
    }

    /// Returns the offset of the first element in the storage, in elements.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn storage_offset(&self) -> i64 {
        self.imp().storage_offset
    }

    /// Returns the scalar type of the tensor elements.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn scalar_type(&self) -> ScalarType {
        self.imp().dtype
    }

    /// Returns the layout of the tensor.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn layout(&self) -> Layout {
        self.imp().layout
    }

    /// Returns the device of the tensor.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn device(&self) -> Device {
        self.imp().device
    }

    /// Whether the tensor lives on the meta device.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn is_meta(&self) -> bool {
        self.device().is_meta()
    }

    /// Returns the size of a single element in bytes.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn element_size(&self) -> usize {
        self.scalar_type().element_size()
    }

    /// Returns the number of elements in the tensor.
    ///
    /// Broadcast views and meta tensors may describe more elements than fit in an `i64`, see
    /// [`checked_numel`](Self::checked_numel).
    ///
    /// # Panics
    ///
    /// If the tensor is undefined, has symbolic sizes, or the number of elements overflows an `i64`.
    #[track_caller]
    pub fn numel(&self) -> i64 {
        match self.checked_numel() {
            Some(numel) => numel,
            None => panic!("number of elements of tensor overflows i64"),
        }
    }

    /// Returns the number of elements in the tensor, or `None` if it overflows an `i64`.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined or has symbolic sizes.
    #[track_caller]
    pub fn checked_numel(&self) -> Option<i64> {
        self.sizes().iter().try_fold(1_i64, |acc, &s| acc.checked_mul(s))
    }

    /// Returns the number of bytes of the logical elements of the tensor, `numel() * element_size()`.
    ///
    /// This is not the size of the storage, which may be larger for views, and is absent for meta tensors.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined, has symbolic sizes, or the number of bytes overflows a `usize`.
    #[track_caller]
    pub fn nbytes(&self) -> usize {
        match self.checked_nbytes() {
            Some(nbytes) => nbytes,
            None => panic!("number of bytes of tensor overflows usize"),
        }
    }

    /// Returns the number of bytes of the logical elements of the tensor, or `None` if it overflows a `usize`.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined or has symbolic sizes.
    #[track_caller]
    pub fn checked_nbytes(&self) -> Option<usize> {
        let numel = usize::try_from(self.checked_numel()?).ok()?;
        numel.checked_mul(self.element_size())
    }

    /// Whether the tensor is defined and has a storage holding data.
    pub fn has_storage(&self) -> bool {
        self.storage().is_some()
    }

    /// Returns the storage of the tensor, or `None` for undefined and meta tensors.
    pub fn storage(&self) -> Option<&Storage> {
        self.0.as_ref().and_then(|imp| imp.storage.as_ref())
    }

    /// Returns the bytes of the storage starting at the tensor's storage offset.
    ///
    /// Returns `None` for undefined and meta tensors, which have no accessible data.
    pub fn data_bytes(&self) -> Option<&[u8]> {
        let imp = self.0.as_ref()?;
        let storage = imp.storage.as_ref()?;
        let start = byte_offset(imp.storage_offset, imp.dtype.element_size())?;
        storage.data().get(start..)
    }

    /// Whether both handles point to the same tensor.
    ///
    /// Two undefined tensors are the same.
    pub fn is_same(&self, other: &Tensor) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Whether the tensor is contiguous in row-major order.
    ///
    /// Tensors with symbolic sizes or strides are reported as non contiguous.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn is_contiguous(&self) -> bool {
        match (self.concrete_sizes(), self.concrete_strides()) {
            (Some(sizes), Some(strides)) => compute_contiguous(&sizes, &strides),
            _ => false,
        }
    }

    /// Whether the elements of the tensor occupy a dense, non overlapping memory region in some dimension order.
    ///
    /// Tensors with symbolic sizes or strides are reported as not dense.
    ///
    /// # Panics
    ///
    /// If the tensor is undefined.
    #[track_caller]
    pub fn is_non_overlapping_and_dense(&self) -> bool {
        match (self.concrete_sizes(), self.concrete_strides()) {
            (Some(sizes), Some(strides)) => compute_non_overlapping_and_dense(&sizes, &strides),
            _ => false,
        }
    }

    /// Create a contiguous CPU tensor holding a copy of the given data.
    ///
    /// # Arguments
    ///
    /// * `data` - The elements, in row-major order.
    /// * `sizes` - The sizes of the tensor. Their product must match the number of elements.
    pub fn from_slice<S: Scalar>(data: &[S], sizes: &[i64]) -> Result<Self> {
        if sizes.iter().any(|&s| s < 0) {
            return Err(Error::InvalidArgument);
        }
        let numel = sizes
            .iter()
            .try_fold(1_i64, |acc, &s| acc.checked_mul(s))
            .ok_or(Error::StorageSizeOverflow)?;
        if numel != data.len() as i64 {
            return Err(Error::InvalidArgument);
        }

        let nbytes = core::mem::size_of_val(data);
        // Safety: `S` is a sealed scalar type without padding, any initialized value is viewable as bytes
        let data_bytes = unsafe { core::slice::from_raw_parts(data.as_ptr() as *const u8, nbytes) };
        let mut bytes = Vec::with_capacity(nbytes);
        bytes.extend_from_slice(data_bytes);

        Ok(Self::from_impl(TensorImpl {
            sizes: from_concrete(sizes),
            strides: from_concrete(&contiguous_strides(sizes)),
            storage_offset: 0,
            dtype: S::TYPE,
            layout: Layout::Strided,
            device: Device::CPU,
            storage: Some(Storage::from_bytes(bytes, false)),
        }))
    }

    /// Create a contiguous zero-filled CPU tensor.
    pub fn zeros(sizes: &[i64], dtype: ScalarType) -> Result<Self> {
        Self::empty_strided(
            sizes,
            &contiguous_strides(sizes),
            TensorOptions::new().dtype(dtype),
        )
    }

    /// Create a view of the tensor with the given sizes, strides and storage offset.
    ///
    /// The view shares the storage of this tensor. Strides may be zero (broadcasting) or make elements overlap, but
    /// must not be negative, and the view must not reach outside the storage. Views of meta tensors are meta tensors
    /// and are not bounds checked, as there is no storage.
    pub fn as_strided(&self, sizes: &[i64], strides: &[i64], storage_offset: i64) -> Result<Self> {
        let Some(imp) = self.0.as_ref() else {
            return Err(Error::InvalidArgument);
        };
        if imp.layout != Layout::Strided {
            return Err(Error::NotSupported);
        }
        if sizes.len() != strides.len()
            || storage_offset < 0
            || sizes.iter().chain(strides).any(|&v| v < 0)
        {
            return Err(Error::InvalidArgument);
        }
        // the offset is addressed in bytes even when the view is empty
        byte_offset(storage_offset, imp.dtype.element_size()).ok_or(Error::StorageSizeOverflow)?;
        if let Some(storage) = &imp.storage {
            let required =
                compute_storage_nbytes(sizes, strides, imp.dtype.element_size(), storage_offset)?;
            if required > storage.nbytes() {
                return Err(Error::OutOfBounds);
            }
        }
        Ok(Self::from_impl(TensorImpl {
            sizes: from_concrete(sizes),
            strides: from_concrete(strides),
            storage_offset,
            dtype: imp.dtype,
            layout: imp.layout,
            device: imp.device,
            storage: imp.storage.clone(),
        }))
    }

    /// Copy the elements of the tensor into a vector, in row-major order.
    ///
    /// Fails with [`Error::InvalidType`] if `S` does not match the scalar type of the tensor, and with
    /// [`Error::NoStorage`] for undefined and meta tensors.
    pub fn to_vec<S: Scalar>(&self) -> Result<Vec<S>> {
        let imp = self.0.as_ref().ok_or(Error::NoStorage)?;
        if imp.dtype != S::TYPE {
            return Err(Error::InvalidType);
        }
        let storage = imp.storage.as_ref().ok_or(Error::NoStorage)?;
        let sizes = as_concrete(&imp.sizes).ok_or(Error::InvalidArgument)?;
        let strides = as_concrete(&imp.strides).ok_or(Error::InvalidArgument)?;
        let itemsize = core::mem::size_of::<S>();
        if compute_storage_nbytes(&sizes, &strides, itemsize, imp.storage_offset)? > storage.nbytes() {
            return Err(Error::OutOfBounds);
        }

        let numel = sizes
            .iter()
            .try_fold(1_usize, |acc, &s| acc.checked_mul(s as usize))
            .ok_or(Error::StorageSizeOverflow)?;
        let mut out = Vec::new();
        out.try_reserve_exact(numel).map_err(|_| Error::StorageSizeOverflow)?;
        let bytes = storage.data();
        for_each_offset(&sizes, &strides, imp.storage_offset, |offset| {
            let start = offset as usize * itemsize;
            // Safety: the whole strided range was checked against the storage size above, and `S` is a sealed
            // scalar type matching the dtype the storage was written with
            out.push(unsafe { core::ptr::read_unaligned(bytes.as_ptr().add(start) as *const S) });
        });
        Ok(out)
    }
}

/// Byte offset of an element offset, or `None` if it is negative or not addressable.
pub(crate) fn byte_offset(storage_offset: i64, element_size: usize) -> Option<usize> {
    usize::try_from(storage_offset).ok()?.checked_mul(element_size)
}

/// Row-major strides of a contiguous tensor with the given sizes.
pub(crate) fn contiguous_strides(sizes: &[i64]) -> Vec<i64> {
    let mut strides = Vec::with_capacity(sizes.len());
    strides.resize(sizes.len(), 1);
    let mut stride = 1_i64;
    for d in (0..sizes.len()).rev() {
        strides[d] = stride;
        stride = stride.saturating_mul(sizes[d].max(1));
    }
    strides
}

pub(crate) fn compute_contiguous(sizes: &[i64], strides: &[i64]) -> bool {
    if sizes.iter().any(|&s| s == 0) {
        return true;
    }
    let mut expected = 1_i64;
    for d in (0..sizes.len()).rev() {
        if sizes[d] == 1 {
            continue;
        }
        if strides[d] != expected {
            return false;
        }
        expected = expected.saturating_mul(sizes[d]);
    }
    true
}

pub(crate) fn compute_non_overlapping_and_dense(sizes: &[i64], strides: &[i64]) -> bool {
    if sizes.len() == 1 {
        return sizes[0] < 2 || strides[0] == 1;
    }
    // dims of size 0 or 1 can be placed anywhere, sort them last
    let mut perm: Vec<usize> = (0..sizes.len()).collect();
    perm.sort_by_key(|&d| (sizes[d] < 2, strides[d]));

    let mut require_stride = 1_i64;
    for d in perm {
        if sizes[d] < 2 {
            return true;
        }
        if strides[d] != require_stride {
            return false;
        }
        require_stride = require_stride.saturating_mul(sizes[d]);
    }
    true
}

/// Call `f` with the storage offset (in elements) of every element, in row-major order.
fn for_each_offset(sizes: &[i64], strides: &[i64], offset: i64, mut f: impl FnMut(i64)) {
    if sizes.iter().any(|&s| s == 0) {
        return;
    }
    let mut index = Vec::with_capacity(sizes.len());
    index.resize(sizes.len(), 0_i64);
    let mut current = offset;
    loop {
        f(current);
        let mut d = sizes.len();
        loop {
            if d == 0 {
                return;
            }
            d -= 1;
            index[d] += 1;
            current += strides[d];
            if index[d] < sizes[d] {
                break;
            }
            current -= strides[d] * sizes[d];
            index[d] = 0;
        }
    }
}

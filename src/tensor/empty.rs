//! Allocation of new tensors from sizes, strides and options.
//!
//! CPU tensors are zero filled. Meta tensors get no storage at all, only metadata.

use crate::alloc::Vec;
use crate::tensor::base::TensorImpl;
use crate::tensor::sym::{as_concrete, from_concrete};
use crate::tensor::{Device, Layout, ScalarType, Storage, SymInt, Tensor, TensorOptions};
use crate::{Error, Result};

/// Compute the number of bytes a storage must have to hold a strided tensor.
///
/// That is the byte offset one past the furthest element reachable from `storage_offset` with the given sizes and
/// strides. A tensor with a zero size holds no elements and requires no bytes.
///
/// Fails with [`Error::InvalidArgument`] for mismatched lengths or negative values, and with
/// [`Error::StorageSizeOverflow`] if the result does not fit in `usize`.
pub fn compute_storage_nbytes(
    sizes: &[i64],
    strides: &[i64],
    itemsize: usize,
    storage_offset: i64,
) -> Result<usize> {
    if sizes.len() != strides.len() || storage_offset < 0 {
        return Err(Error::InvalidArgument);
    }
    if sizes.iter().chain(strides).any(|&v| v < 0) {
        return Err(Error::InvalidArgument);
    }
    if sizes.iter().any(|&s| s == 0) {
        return Ok(0);
    }

    let mut nelems = (storage_offset as u64)
        .checked_add(1)
        .ok_or(Error::StorageSizeOverflow)?;
    for (&size, &stride) in sizes.iter().zip(strides) {
        let extent = (stride as u64)
            .checked_mul(size as u64 - 1)
            .ok_or(Error::StorageSizeOverflow)?;
        nelems = nelems
            .checked_add(extent)
            .ok_or(Error::StorageSizeOverflow)?;
    }
    let nbytes = nelems
        .checked_mul(itemsize as u64)
        .ok_or(Error::StorageSizeOverflow)?;
    usize::try_from(nbytes).map_err(|_| Error::StorageSizeOverflow)
}

/// Allocate a storage-less tensor on the meta device.
///
/// The new tensor has exactly the given (possibly symbolic) sizes and strides, a zero storage offset, and no
/// storage. Unset options default to [`ScalarType::Float`], [`Layout::Strided`] and the meta device.
///
/// # Errors
///
/// - [`Error::NotSupported`] if the device is not the meta device, the layout is not strided, or pinned memory is
///   requested. A storage-less tensor can not be pinned.
/// - [`Error::InvalidArgument`] if sizes and strides have different lengths, or a concrete size or stride is
///   negative.
/// - [`Error::StorageSizeOverflow`] if the storage a real tensor of this shape would need is not addressable.
///   Checked only when all sizes and strides are concrete.
pub fn empty_strided_meta_symint(
    sizes: &[SymInt],
    strides: &[SymInt],
    dtype: Option<ScalarType>,
    layout: Option<Layout>,
    device: Option<Device>,
    pin_memory: Option<bool>,
) -> Result<Tensor> {
    let device = device.unwrap_or(Device::META);
    if !device.is_meta() {
        crate::log::error!("empty_strided_meta: expected the meta device, got {device}");
        return Err(Error::NotSupported);
    }
    let layout = layout.unwrap_or_default();
    if layout != Layout::Strided {
        crate::log::error!("empty_strided_meta: non-strided layout {layout:?} is not supported");
        return Err(Error::NotSupported);
    }
    if pin_memory.unwrap_or(false) {
        crate::log::error!("empty_strided_meta: meta tensors can not be pinned");
        return Err(Error::NotSupported);
    }
    if sizes.len() != strides.len() {
        return Err(Error::InvalidArgument);
    }
    let is_negative = |v: &SymInt| matches!(v.maybe_as_int(), Some(v) if v < 0);
    if sizes.iter().chain(strides).any(is_negative) {
        crate::log::error!("empty_strided_meta: negative size or stride in {sizes:?} / {strides:?}");
        return Err(Error::InvalidArgument);
    }

    let dtype = dtype.unwrap_or(ScalarType::Float);
    if let (Some(sizes), Some(strides)) = (as_concrete(sizes), as_concrete(strides)) {
        compute_storage_nbytes(&sizes, &strides, dtype.element_size(), 0)?;
    }

    Ok(Tensor::from_impl(TensorImpl {
        sizes: Vec::from(sizes),
        strides: Vec::from(strides),
        storage_offset: 0,
        dtype,
        layout,
        device,
        storage: None,
    }))
}

impl Tensor {
    /// Allocate a new tensor with the given sizes and strides.
    ///
    /// CPU tensors get a zero filled storage large enough for the strided layout. Meta tensors are allocated with
    /// [`empty_strided_meta_symint`] and get no storage. Other devices are not supported.
    pub fn empty_strided(sizes: &[i64], strides: &[i64], options: TensorOptions) -> Result<Tensor> {
        let device = options.device_or_default();
        if device.is_meta() {
            return empty_strided_meta_symint(
                &from_concrete(sizes),
                &from_concrete(strides),
                Some(options.dtype_or_default()),
                Some(options.layout_or_default()),
                Some(device),
                Some(options.pinned_memory_or_default()),
            );
        }
        if !device.is_cpu() || options.layout_or_default() != Layout::Strided {
            return Err(Error::NotSupported);
        }

        let dtype = options.dtype_or_default();
        let nbytes = compute_storage_nbytes(sizes, strides, dtype.element_size(), 0)?;
        Ok(Tensor::from_impl(TensorImpl {
            sizes: from_concrete(sizes),
            strides: from_concrete(strides),
            storage_offset: 0,
            dtype,
            layout: Layout::Strided,
            device,
            storage: Some(Storage::zeroed(
                nbytes,
                options.pinned_memory_or_default(),
            )),
        }))
    }
}

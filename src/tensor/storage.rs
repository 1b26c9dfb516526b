use crate::alloc::{Arc, Vec};

/// A shared, immutable byte buffer backing one or more tensors.
///
/// Views created with [`Tensor::as_strided`](crate::tensor::Tensor::as_strided) share the storage of their base
/// tensor. Meta tensors have no storage at all.
#[derive(Clone)]
pub struct Storage {
    bytes: Arc<[u8]>,
    pinned: bool,
}
impl Storage {
    pub(crate) fn zeroed(nbytes: usize, pinned: bool) -> Self {
        let mut bytes = Vec::with_capacity(nbytes);
        bytes.resize(nbytes, 0);
        Self::from_bytes(bytes, pinned)
    }

    pub(crate) fn from_bytes(bytes: Vec<u8>, pinned: bool) -> Self {
        Self {
            bytes: Arc::from(bytes),
            pinned,
        }
    }

    /// The size of the storage in bytes.
    pub fn nbytes(&self) -> usize {
        self.bytes.len()
    }

    /// The raw bytes of the storage.
    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether the storage was allocated in pinned memory.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Whether both storages are the same allocation.
    pub fn is_alias_of(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}
impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("nbytes", &self.nbytes())
            .field("pinned", &self.pinned)
            .finish()
    }
}

use crate::dispatch::DispatchKey;
use crate::tensor::ScalarType;

/// Describes how the elements of a tensor are laid out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    /// Dense tensor addressed by sizes, strides and a storage offset.
    #[default]
    Strided,
    /// Sparse tensor in coordinate format.
    Sparse,
    /// Sparse tensor in compressed sparse row format.
    SparseCsr,
    /// Sparse tensor in compressed sparse column format.
    SparseCsc,
    /// Sparse tensor in block compressed sparse row format.
    SparseBsr,
    /// Sparse tensor in block compressed sparse column format.
    SparseBsc,
    /// Opaque layout owned by the MKL-DNN backend.
    Mkldnn,
    /// Nested tensor with one ragged dimension.
    Jagged,
}

/// The kind of a [`Device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum DeviceType {
    Cpu,
    Cuda,
    Mps,
    Xpu,
    /// The placeholder device: tensors on it carry metadata only and never hold data.
    Meta,
}

/// A device a tensor lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    device_type: DeviceType,
    index: Option<u8>,
}
impl Device {
    /// The CPU device.
    pub const CPU: Device = Device::new(DeviceType::Cpu, None);
    /// The meta device.
    pub const META: Device = Device::new(DeviceType::Meta, None);

    /// Create a new device of the given type and optional index.
    pub const fn new(device_type: DeviceType, index: Option<u8>) -> Self {
        Self { device_type, index }
    }

    /// The CUDA device with the given index.
    pub const fn cuda(index: u8) -> Self {
        Self::new(DeviceType::Cuda, Some(index))
    }

    /// The type of the device.
    pub const fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// The index of the device, if any.
    pub const fn index(&self) -> Option<u8> {
        self.index
    }

    /// Whether this is the meta device.
    pub const fn is_meta(&self) -> bool {
        matches!(self.device_type, DeviceType::Meta)
    }

    /// Whether this is the CPU device.
    pub const fn is_cpu(&self) -> bool {
        matches!(self.device_type, DeviceType::Cpu)
    }

    /// The dispatch key of the backend kernels for this device.
    pub const fn backend_key(&self) -> DispatchKey {
        match self.device_type {
            DeviceType::Cpu => DispatchKey::CPU,
            DeviceType::Cuda => DispatchKey::CUDA,
            DeviceType::Mps => DispatchKey::MPS,
            DeviceType::Xpu => DispatchKey::XPU,
            DeviceType::Meta => DispatchKey::Meta,
        }
    }
}
impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self.device_type {
            DeviceType::Cpu => "cpu",
            DeviceType::Cuda => "cuda",
            DeviceType::Mps => "mps",
            DeviceType::Xpu => "xpu",
            DeviceType::Meta => "meta",
        };
        match self.index {
            Some(index) => write!(f, "{name}:{index}"),
            None => f.write_str(name),
        }
    }
}

/// Options for allocating a new tensor.
///
/// Every option is optional, and unset options take the default value when the tensor is allocated:
/// [`ScalarType::Float`], [`Layout::Strided`], [`Device::CPU`] and non-pinned memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TensorOptions {
    dtype: Option<ScalarType>,
    layout: Option<Layout>,
    device: Option<Device>,
    pinned_memory: Option<bool>,
}
impl TensorOptions {
    /// Create new options with all fields unset.
    pub const fn new() -> Self {
        Self {
            dtype: None,
            layout: None,
            device: None,
            pinned_memory: None,
        }
    }

    /// Set the scalar type.
    pub const fn dtype(mut self, dtype: ScalarType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    /// Set the layout.
    pub const fn layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Set the device.
    pub const fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Set whether the memory should be pinned.
    pub const fn pinned_memory(mut self, pinned_memory: bool) -> Self {
        self.pinned_memory = Some(pinned_memory);
        self
    }

    /// The scalar type, or the default [`ScalarType::Float`].
    pub fn dtype_or_default(&self) -> ScalarType {
        self.dtype.unwrap_or(ScalarType::Float)
    }

    /// The layout, or the default [`Layout::Strided`].
    pub fn layout_or_default(&self) -> Layout {
        self.layout.unwrap_or_default()
    }

    /// The device, or the default [`Device::CPU`].
    pub fn device_or_default(&self) -> Device {
        self.device.unwrap_or(Device::CPU)
    }

    /// Whether pinned memory was requested, `false` by default.
    pub fn pinned_memory_or_default(&self) -> bool {
        self.pinned_memory.unwrap_or(false)
    }
}

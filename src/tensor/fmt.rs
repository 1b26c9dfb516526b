use crate::tensor::{SymInt, Tensor};

struct SymList<'a>(&'a [SymInt]);
impl std::fmt::Debug for SymList<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if !self.defined() {
            return f.write_str("Tensor(undefined)");
        }
        let mut st = f.debug_struct("Tensor");
        st.field("sizes", &SymList(self.sym_sizes()))
            .field("strides", &SymList(self.sym_strides()))
            .field("storage_offset", &self.storage_offset())
            .field("dtype", &self.scalar_type())
            .field("layout", &self.layout())
            .field("device", &format_args!("{}", self.device()));
        #[cfg(feature = "ndarray")]
        if self.has_storage() {
            array_based::add_data_field(self, &mut st);
        }
        st.finish()
    }
}

#[cfg(feature = "ndarray")]
mod array_based {
    use crate::tensor::{Scalar, ScalarType, Tensor};

    pub(super) fn add_data_field(this: &Tensor, st: &mut std::fmt::DebugStruct) {
        fn add<S: Scalar + std::fmt::Debug>(this: &Tensor, st: &mut std::fmt::DebugStruct) {
            if let Ok(array) = this.to_array::<S>() {
                st.field("data", &array);
            }
        }

        match this.scalar_type() {
            ScalarType::Byte => add::<u8>(this, st),
            ScalarType::Char => add::<i8>(this, st),
            ScalarType::Short => add::<i16>(this, st),
            ScalarType::Int => add::<i32>(this, st),
            ScalarType::Long => add::<i64>(this, st),
            ScalarType::Half => add::<crate::scalar::f16>(this, st),
            ScalarType::Float => add::<f32>(this, st),
            ScalarType::Double => add::<f64>(this, st),
            ScalarType::ComplexHalf => add::<crate::scalar::Complex<crate::scalar::f16>>(this, st),
            ScalarType::ComplexFloat => add::<crate::scalar::Complex<f32>>(this, st),
            ScalarType::ComplexDouble => add::<crate::scalar::Complex<f64>>(this, st),
            ScalarType::Bool => add::<bool>(this, st),
            ScalarType::BFloat16 => add::<crate::scalar::bf16>(this, st),
            ScalarType::UInt16 => add::<u16>(this, st),
            ScalarType::UInt32 => add::<u32>(this, st),
            ScalarType::UInt64 => add::<u64>(this, st),
            // quantized, bit packed and 8-bit float types have no element type to show
            _ => {}
        }
    }
}

/// Data types (dtypes) that can be used as element types in Tensors.
///
/// The enum contain all the scalar types known to the tensor engine.
/// Only some of them have a Rust counterpart that can be used to read and write tensor data, see [`Scalar`].
/// All of them can be carried by meta tensors, which never hold data.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarType {
    /// 8-bit unsigned integer, `u8`
    Byte,
    /// 8-bit signed, integer, `i8`
    Char,
    /// 16-bit signed integer, `i16`
    Short,
    /// 32-bit signed integer, `i32`
    Int,
    /// 64-bit signed integer, `i64`
    Long,
    /// 16-bit floating point, [`functionalize::scalar::f16`](`crate::scalar::f16`).
    Half,
    /// 32-bit floating point, `f32`
    Float,
    /// 64-bit floating point, `f64`
    Double,
    /// 16-bit complex floating point, [`functionalize::scalar::Complex<functionalize::scalar::f16>`](`crate::scalar::Complex`).
    ComplexHalf,
    /// 32-bit complex floating point, [`functionalize::scalar::Complex<f32>`](`crate::scalar::Complex`).
    ComplexFloat,
    /// 64-bit complex floating point, [`functionalize::scalar::Complex<f64>`](`crate::scalar::Complex`).
    ComplexDouble,
    /// Boolean, `bool`
    Bool,
    /// 8-bit quantized integer.
    QInt8,
    /// 8-bit quantized unsigned integer.
    QUInt8,
    /// 32-bit quantized integer.
    QInt32,
    /// 16-bit floating point using the bfloat16 format, [`functionalize::scalar::bf16`](`crate::scalar::bf16`).
    BFloat16,
    /// Two 4-bit unsigned quantized integers packed into a byte.
    QUInt4x2,
    /// Four 2-bit unsigned quantized integers packed into a byte.
    QUInt2x4,
    /// Eight 1-bit values packed into a byte.
    Bits1x8,
    /// Four 2-bit values packed into a byte.
    Bits2x4,
    /// Two 4-bit values packed into a byte.
    Bits4x2,
    /// 8-bit bitfield (1 byte).
    Bits8,
    /// 16-bit bitfield (2 bytes).
    Bits16,
    /// 8-bit floating-point with 1 bit for the sign, 5 bits for the exponents, 2 bits for the mantissa.
    #[allow(non_camel_case_types)]
    Float8_e5m2,
    /// 8-bit floating-point with 1 bit for the sign, 4 bits for the exponents, 3 bits for the mantissa,
    /// only nan values and no infinite values (FN).
    #[allow(non_camel_case_types)]
    Float8_e4m3fn,
    /// 8-bit floating-point with 1 bit for the sign, 5 bits for the exponents, 2 bits for the mantissa,
    /// only nan values and no infinite values (FN), no negative zero (UZ).
    #[allow(non_camel_case_types)]
    Float8_e5m2fnuz,
    /// 8-bit floating-point with 1 bit for the sign, 4 bits for the exponents, 3 bits for the mantissa,
    /// only nan values and no infinite values (FN), no negative zero (UZ).
    #[allow(non_camel_case_types)]
    Float8_e4m3fnuz,
    /// 16-bit unsigned integer, `u16`
    UInt16,
    /// 32-bit unsigned integer, `u32`
    UInt32,
    /// 64-bit unsigned integer, `u64`
    UInt64,
}
impl ScalarType {
    /// The size of a single element of this type in bytes.
    pub const fn element_size(self) -> usize {
        match self {
            ScalarType::Byte
            | ScalarType::Char
            | ScalarType::Bool
            | ScalarType::QInt8
            | ScalarType::QUInt8
            | ScalarType::QUInt4x2
            | ScalarType::QUInt2x4
            | ScalarType::Bits1x8
            | ScalarType::Bits2x4
            | ScalarType::Bits4x2
            | ScalarType::Bits8
            | ScalarType::Float8_e5m2
            | ScalarType::Float8_e4m3fn
            | ScalarType::Float8_e5m2fnuz
            | ScalarType::Float8_e4m3fnuz => 1,
            ScalarType::Short
            | ScalarType::Half
            | ScalarType::BFloat16
            | ScalarType::Bits16
            | ScalarType::UInt16 => 2,
            ScalarType::Int
            | ScalarType::Float
            | ScalarType::ComplexHalf
            | ScalarType::QInt32
            | ScalarType::UInt32 => 4,
            ScalarType::Long
            | ScalarType::Double
            | ScalarType::ComplexFloat
            | ScalarType::UInt64 => 8,
            ScalarType::ComplexDouble => 16,
        }
    }

    /// Whether this is a real floating point type, including the reduced precision ones.
    pub const fn is_floating_point(self) -> bool {
        matches!(
            self,
            ScalarType::Half
                | ScalarType::Float
                | ScalarType::Double
                | ScalarType::BFloat16
                | ScalarType::Float8_e5m2
                | ScalarType::Float8_e4m3fn
                | ScalarType::Float8_e5m2fnuz
                | ScalarType::Float8_e4m3fnuz
        )
    }

    /// Whether this is a complex type.
    pub const fn is_complex(self) -> bool {
        matches!(
            self,
            ScalarType::ComplexHalf | ScalarType::ComplexFloat | ScalarType::ComplexDouble
        )
    }

    /// Whether this is a quantized type.
    pub const fn is_quantized(self) -> bool {
        matches!(
            self,
            ScalarType::QInt8
                | ScalarType::QUInt8
                | ScalarType::QInt32
                | ScalarType::QUInt4x2
                | ScalarType::QUInt2x4
        )
    }
}

/// A trait for types that can be used as scalar types in Tensors.
///
/// The trait is sealed: every implementor is a plain value type without padding or invalid bit patterns
/// for the bytes the crate writes, which is what allows tensor data to be read back as `Self`.
pub trait Scalar: Copy + 'static {
    /// The [`ScalarType`] enum variant of the implementing type.
    const TYPE: ScalarType;
    private_decl! {}
}
macro_rules! impl_scalar {
    ($rust_type:path, $scalar_type_variant:ident) => {
        impl Scalar for $rust_type {
            const TYPE: ScalarType = ScalarType::$scalar_type_variant;
            private_impl! {}
        }
    };
}

impl_scalar!(u8, Byte);
impl_scalar!(i8, Char);
impl_scalar!(i16, Short);
impl_scalar!(i32, Int);
impl_scalar!(i64, Long);
impl_scalar!(crate::scalar::f16, Half);
impl_scalar!(f32, Float);
impl_scalar!(f64, Double);
impl_scalar!(crate::scalar::Complex<crate::scalar::f16>, ComplexHalf);
impl_scalar!(crate::scalar::Complex<f32>, ComplexFloat);
impl_scalar!(crate::scalar::Complex<f64>, ComplexDouble);
impl_scalar!(bool, Bool);
impl_scalar!(crate::scalar::bf16, BFloat16);
impl_scalar!(u16, UInt16);
impl_scalar!(u32, UInt32);
impl_scalar!(u64, UInt64);

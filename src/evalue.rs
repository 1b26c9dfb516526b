//! Module for [`EValue`] and related types.
//!
//! [`EValue`] is a type-erased value that can hold different types like scalars, lists or tensors. It is the boxed
//! form of operator arguments, and is used where an argument is passed without its static type, for example in the
//! boxed representation of a [`TensorListRef`](crate::meta::TensorListRef).

use crate::alloc::{String, Vec};
use crate::tensor::{SymInt, Tensor};
use crate::{Error, Result};

/// A tag indicating the type of the value stored in an [`EValue`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Tag {
    /// Tag for an empty EValue.
    None,
    /// Tag for value [`Tensor`].
    Tensor,
    /// Tag for value [`String`].
    String,
    /// Tag for value `f64`.
    Double,
    /// Tag for value `i64`.
    Int,
    /// Tag for value [`SymInt`].
    SymInt,
    /// Tag for value `bool`.
    Bool,
    /// Tag for value `&[bool]`.
    ListBool,
    /// Tag for value `&[f64]`.
    ListDouble,
    /// Tag for value `&[i64]`.
    ListInt,
    /// Tag for value `&[SymInt]`.
    ListSymInt,
    /// Tag for value `&[Tensor]`.
    ListTensor,
    /// Tag for value `&[Option<Tensor>]`.
    ListOptionalTensor,
}

/// A type-erased operator argument.
#[derive(Debug, Clone, Default)]
#[allow(missing_docs)]
pub enum EValue {
    /// The empty value, also used for absent optional arguments.
    #[default]
    None,
    Tensor(Tensor),
    String(String),
    Double(f64),
    Int(i64),
    SymInt(SymInt),
    Bool(bool),
    ListBool(Vec<bool>),
    ListDouble(Vec<f64>),
    ListInt(Vec<i64>),
    ListSymInt(Vec<SymInt>),
    ListTensor(Vec<Tensor>),
    ListOptionalTensor(Vec<Option<Tensor>>),
}
impl EValue {
    /// Get the tag indicating the type of the value.
    pub fn tag(&self) -> Tag {
        match self {
            EValue::None => Tag::None,
            EValue::Tensor(_) => Tag::Tensor,
            EValue::String(_) => Tag::String,
            EValue::Double(_) => Tag::Double,
            EValue::Int(_) => Tag::Int,
            EValue::SymInt(_) => Tag::SymInt,
            EValue::Bool(_) => Tag::Bool,
            EValue::ListBool(_) => Tag::ListBool,
            EValue::ListDouble(_) => Tag::ListDouble,
            EValue::ListInt(_) => Tag::ListInt,
            EValue::ListSymInt(_) => Tag::ListSymInt,
            EValue::ListTensor(_) => Tag::ListTensor,
            EValue::ListOptionalTensor(_) => Tag::ListOptionalTensor,
        }
    }

    /// Check if the value is of type `None`.
    pub fn is_none(&self) -> bool {
        self.tag() == Tag::None
    }

    /// Get the value as an `i64`.
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    /// To avoid panics, use the [`try_into`][TryInto::try_into] method or check the type of the value with the
    /// [`tag`][Self::tag] method.
    #[track_caller]
    pub fn as_i64(&self) -> i64 {
        match self {
            EValue::Int(v) => *v,
            _ => self.wrong_tag(Tag::Int),
        }
    }

    /// Get a reference to the value as a `&[i64]`.
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    /// To avoid panics, use the [`try_into`][TryInto::try_into] method or check the type of the value with the
    /// [`tag`][Self::tag] method.
    #[track_caller]
    pub fn as_i64_list(&self) -> &[i64] {
        match self {
            EValue::ListInt(v) => v,
            _ => self.wrong_tag(Tag::ListInt),
        }
    }

    /// Get the value as an `f64`.
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    /// To avoid panics, use the [`try_into`][TryInto::try_into] method or check the type of the value with the
    /// [`tag`][Self::tag] method.
    #[track_caller]
    pub fn as_f64(&self) -> f64 {
        match self {
            EValue::Double(v) => *v,
            _ => self.wrong_tag(Tag::Double),
        }
    }

    /// Get a reference to the value as a `&[f64]`.
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    /// To avoid panics, use the [`try_into`][TryInto::try_into] method or check the type of the value with the
    /// [`tag`][Self::tag] method.
    #[track_caller]
    pub fn as_f64_list(&self) -> &[f64] {
        match self {
            EValue::ListDouble(v) => v,
            _ => self.wrong_tag(Tag::ListDouble),
        }
    }

    /// Get the value as a `bool`.
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    /// To avoid panics, use the [`try_into`][TryInto::try_into] method or check the type of the value with the
    /// [`tag`][Self::tag] method.
    #[track_caller]
    pub fn as_bool(&self) -> bool {
        match self {
            EValue::Bool(v) => *v,
            _ => self.wrong_tag(Tag::Bool),
        }
    }

    /// Get a reference to the value as a `&[bool]`.
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    #[track_caller]
    pub fn as_bool_list(&self) -> &[bool] {
        match self {
            EValue::ListBool(v) => v,
            _ => self.wrong_tag(Tag::ListBool),
        }
    }

    /// Get the value as a [`SymInt`].
    ///
    /// Concrete integers are accepted as well.
    ///
    /// # Panics
    ///
    /// Panics if the value is neither a [`SymInt`] nor an `i64`.
    #[track_caller]
    pub fn as_sym_int(&self) -> SymInt {
        match self {
            EValue::SymInt(v) => *v,
            EValue::Int(v) => SymInt::new(*v),
            _ => self.wrong_tag(Tag::SymInt),
        }
    }

    /// Get a reference to the value as a `&[SymInt]`.
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    #[track_caller]
    pub fn as_sym_int_list(&self) -> &[SymInt] {
        match self {
            EValue::ListSymInt(v) => v,
            _ => self.wrong_tag(Tag::ListSymInt),
        }
    }

    /// Get a reference to the value as a `&str`.
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    #[track_caller]
    pub fn as_str(&self) -> &str {
        match self {
            EValue::String(v) => v,
            _ => self.wrong_tag(Tag::String),
        }
    }

    /// Get a reference to the value as a [`Tensor`].
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    /// To avoid panics, use the [`try_into`][TryInto::try_into] method or check the type of the value with the
    /// [`tag`][Self::tag] method.
    #[track_caller]
    pub fn as_tensor(&self) -> &Tensor {
        match self {
            EValue::Tensor(v) => v,
            _ => self.wrong_tag(Tag::Tensor),
        }
    }

    /// Get a reference to the value as a `&[Tensor]`.
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    #[track_caller]
    pub fn as_tensor_list(&self) -> &[Tensor] {
        match self {
            EValue::ListTensor(v) => v,
            _ => self.wrong_tag(Tag::ListTensor),
        }
    }

    /// Get a reference to the value as a `&[Option<Tensor>]`.
    ///
    /// # Panics
    ///
    /// Panics if the value is of different type.
    #[track_caller]
    pub fn as_optional_tensor_list(&self) -> &[Option<Tensor>] {
        match self {
            EValue::ListOptionalTensor(v) => v,
            _ => self.wrong_tag(Tag::ListOptionalTensor),
        }
    }

    #[track_caller]
    fn wrong_tag(&self, expected: Tag) -> ! {
        panic!("expected an EValue of type {:?}, got {:?}", expected, self.tag())
    }
}

macro_rules! impl_try_from_evalue {
    ($tag:ident, $ty:ty, |$v:ident| $conv:expr) => {
        impl<'a> TryFrom<&'a EValue> for $ty {
            type Error = Error;
            fn try_from(value: &'a EValue) -> Result<Self> {
                match value {
                    EValue::$tag($v) => Ok($conv),
                    _ => Err(Error::InvalidType),
                }
            }
        }
    };
}
impl_try_from_evalue!(Int, i64, |v| *v);
impl_try_from_evalue!(Double, f64, |v| *v);
impl_try_from_evalue!(Bool, bool, |v| *v);
impl_try_from_evalue!(SymInt, SymInt, |v| *v);
impl_try_from_evalue!(String, &'a str, |v| v.as_str());
impl_try_from_evalue!(Tensor, &'a Tensor, |v| v);
impl_try_from_evalue!(ListInt, &'a [i64], |v| v.as_slice());
impl_try_from_evalue!(ListDouble, &'a [f64], |v| v.as_slice());
impl_try_from_evalue!(ListBool, &'a [bool], |v| v.as_slice());
impl_try_from_evalue!(ListSymInt, &'a [SymInt], |v| v.as_slice());
impl_try_from_evalue!(ListTensor, &'a [Tensor], |v| v.as_slice());
impl_try_from_evalue!(ListOptionalTensor, &'a [Option<Tensor>], |v| v.as_slice());

macro_rules! impl_from_for_evalue {
    ($ty:ty, $tag:ident) => {
        impl From<$ty> for EValue {
            fn from(value: $ty) -> Self {
                EValue::$tag(value)
            }
        }
    };
}
impl_from_for_evalue!(i64, Int);
impl_from_for_evalue!(f64, Double);
impl_from_for_evalue!(bool, Bool);
impl_from_for_evalue!(SymInt, SymInt);
impl_from_for_evalue!(String, String);
impl_from_for_evalue!(Tensor, Tensor);
impl_from_for_evalue!(Vec<i64>, ListInt);
impl_from_for_evalue!(Vec<f64>, ListDouble);
impl_from_for_evalue!(Vec<bool>, ListBool);
impl_from_for_evalue!(Vec<SymInt>, ListSymInt);
impl_from_for_evalue!(Vec<Tensor>, ListTensor);
impl_from_for_evalue!(Vec<Option<Tensor>>, ListOptionalTensor);

impl From<&str> for EValue {
    fn from(value: &str) -> Self {
        EValue::String(String::from(value))
    }
}
impl From<Option<Tensor>> for EValue {
    fn from(value: Option<Tensor>) -> Self {
        value.map_or(EValue::None, EValue::Tensor)
    }
}

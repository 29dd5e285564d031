use bytemuck::Pod;
use derive_more::Display;
use half::{bf16, f16};
use num_traits::ToPrimitive;
use std::fmt::Debug;

mod sealed {
    use half::{bf16, f16};

    #[doc(hidden)]
    pub trait Sealed {}

    macro_rules! impl_sealed {
        ($($t:ty),+) => {
            $(
                impl Sealed for $t {}
            )+
        };
    }

    impl_sealed! {u8, i8, u16, i16, f16, bf16, u32, i32, f32, u64, i64, f64}
}
use sealed::Sealed;

/// Numerical types that can be stored in a [`Tensor`](crate::Tensor).
#[allow(missing_docs)]
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash)]
pub enum ScalarType {
    U8,
    I8,
    U16,
    I16,
    F16,
    BF16,
    U32,
    I32,
    F32,
    U64,
    I64,
    F64,
}

impl ScalarType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        use ScalarType::*;
        match self {
            U8 | I8 => 1,
            U16 | I16 | F16 | BF16 => 2,
            U32 | I32 | F32 => 4,
            U64 | I64 | F64 => 8,
        }
    }
    /// Whether the type is a floating point type.
    pub fn is_float(&self) -> bool {
        use ScalarType::*;
        matches!(self, F16 | BF16 | F32 | F64)
    }
    /// Whether the type is a signed integer type.
    pub fn is_signed_int(&self) -> bool {
        use ScalarType::*;
        matches!(self, I8 | I16 | I32 | I64)
    }
    /// The rust name of the type, ie "u8", "bf16", "f32".
    pub fn name(&self) -> &'static str {
        use ScalarType::*;
        match self {
            U8 => "u8",
            I8 => "i8",
            U16 => "u16",
            I16 => "i16",
            F16 => "f16",
            BF16 => "bf16",
            U32 => "u32",
            I32 => "i32",
            F32 => "f32",
            U64 => "u64",
            I64 => "i64",
            F64 => "f64",
        }
    }
}

/// Base trait for numerical types that can be dumped.
pub trait Scalar: Pod + ToPrimitive + Debug + PartialEq + Send + Sync + Sealed {
    /// The [`ScalarType`] of the scalar.
    fn scalar_type() -> ScalarType;
}

macro_rules! impl_scalar {
    ($($t:ty => $s:ident),+) => {
        $(
            impl Scalar for $t {
                fn scalar_type() -> ScalarType {
                    ScalarType::$s
                }
            }
        )+
    };
}

impl_scalar! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    f16 => F16,
    bf16 => BF16,
    u32 => U32,
    i32 => I32,
    f32 => F32,
    u64 => U64,
    i64 => I64,
    f64 => F64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    fn size_matches<T: Scalar>() {
        assert_eq!(T::scalar_type().size(), size_of::<T>(), "{}", T::scalar_type());
    }

    #[test]
    fn scalar_type_size() {
        size_matches::<u8>();
        size_matches::<i8>();
        size_matches::<u16>();
        size_matches::<i16>();
        size_matches::<f16>();
        size_matches::<bf16>();
        size_matches::<u32>();
        size_matches::<i32>();
        size_matches::<f32>();
        size_matches::<u64>();
        size_matches::<i64>();
        size_matches::<f64>();
    }

    #[test]
    fn scalar_type_display() {
        assert_eq!(ScalarType::BF16.to_string(), "BF16");
        assert_eq!(ScalarType::BF16.name(), "bf16");
        assert!(ScalarType::F16.is_float());
        assert!(!ScalarType::U64.is_float());
        assert!(ScalarType::I8.is_signed_int());
        assert!(!ScalarType::U8.is_signed_int());
    }
}

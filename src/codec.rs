/*!
Encoding strategies.

A [`Codec`] turns a [`DumpValue`] into bytes and back. [`ArrayDumper`](crate::ArrayDumper) holds
one by value, so the format is chosen where the dumper is built rather than registered globally.
*/
use crate::{
    error::{Error, Result},
    scalar::Scalar,
    tensor::{Tensor, TensorBundle},
};
use derive_more::{From, IsVariant};
use ndarray::{ArrayBase, Data as ArrayData, Dimension};

mod numpy;
pub use numpy::NumpyMsgpack;

/// The contents of one dump file.
#[derive(Clone, Debug, PartialEq, Eq, From, IsVariant)]
pub enum DumpValue {
    /// A single tensor.
    Tensor(Tensor),
    /// Tensors by name.
    Bundle(TensorBundle),
}

impl DumpValue {
    /// "tensor" or "bundle".
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tensor(_) => "tensor",
            Self::Bundle(_) => "bundle",
        }
    }
    /// Unwraps a tensor.
    ///
    /// **Errors**
    /// - The value is a bundle.
    pub fn into_tensor(self) -> Result<Tensor> {
        match self {
            Self::Tensor(tensor) => Ok(tensor),
            Self::Bundle(_) => Err(Error::UnexpectedValue { expected: "tensor" }),
        }
    }
    /// Unwraps a bundle.
    ///
    /// **Errors**
    /// - The value is a tensor.
    pub fn into_bundle(self) -> Result<TensorBundle> {
        match self {
            Self::Bundle(bundle) => Ok(bundle),
            Self::Tensor(_) => Err(Error::UnexpectedValue { expected: "bundle" }),
        }
    }
}

impl<T, S, D> From<ArrayBase<S, D>> for DumpValue
where
    T: Scalar,
    S: ArrayData<Elem = T>,
    D: Dimension,
{
    fn from(array: ArrayBase<S, D>) -> Self {
        Self::Tensor(Tensor::from_array(&array))
    }
}

impl<T, S, D> From<&ArrayBase<S, D>> for DumpValue
where
    T: Scalar,
    S: ArrayData<Elem = T>,
    D: Dimension,
{
    fn from(array: &ArrayBase<S, D>) -> Self {
        Self::Tensor(Tensor::from_array(array))
    }
}

impl From<&Tensor> for DumpValue {
    fn from(tensor: &Tensor) -> Self {
        Self::Tensor(tensor.clone())
    }
}

impl From<&TensorBundle> for DumpValue {
    fn from(bundle: &TensorBundle) -> Self {
        Self::Bundle(bundle.clone())
    }
}

/// Encodes and decodes dump files.
///
/// Implementations must be deterministic: encoding equal values yields equal bytes.
pub trait Codec {
    /// Encodes `value`.
    ///
    /// **Errors**
    /// - The value contains a type the format can not represent.
    fn encode(&self, value: &DumpValue) -> Result<Vec<u8>>;
    /// Decodes one value from `bytes`.
    ///
    /// **Errors**
    /// - `bytes` is not a valid encoding.
    fn decode(&self, bytes: &[u8]) -> Result<DumpValue>;
}

impl<C: Codec + ?Sized> Codec for &C {
    fn encode(&self, value: &DumpValue) -> Result<Vec<u8>> {
        (**self).encode(value)
    }
    fn decode(&self, bytes: &[u8]) -> Result<DumpValue> {
        (**self).decode(bytes)
    }
}

impl<C: Codec + ?Sized> Codec for Box<C> {
    fn encode(&self, value: &DumpValue) -> Result<Vec<u8>> {
        (**self).encode(value)
    }
    fn decode(&self, bytes: &[u8]) -> Result<DumpValue> {
        (**self).decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn dump_value_unwrap() {
        let value = DumpValue::from(arr1(&[1u8, 2]));
        assert!(value.is_tensor());
        assert_eq!(value.kind(), "tensor");
        assert!(matches!(
            value.clone().into_bundle(),
            Err(Error::UnexpectedValue { expected: "bundle" })
        ));
        assert_eq!(value.into_tensor().unwrap().shape(), &[2]);

        let value = DumpValue::from(TensorBundle::new());
        assert!(value.is_bundle());
        assert!(value.into_tensor().is_err());
    }
}

use crate::{
    error::{Error, Result},
    scalar::{Scalar, ScalarType},
};
use derive_more::{Deref, DerefMut};
use dry::macro_for;
use half::{bf16, f16};
use ndarray::{Array, ArrayBase, ArrayD, Data as ArrayData, Dimension, IxDyn};
use num_traits::ToPrimitive;
use std::{
    collections::{btree_map, BTreeMap},
    mem::size_of,
};

pub(crate) fn swap_bytes(data: &mut [u8], width: usize) {
    if width > 1 {
        data.chunks_exact_mut(width).for_each(<[u8]>::reverse);
    }
}

/// A type erased n-dimensional array.
///
/// Elements are stored contiguously in standard (row major) order as little endian bytes, so
/// two tensors are equal only if their scalar types, shapes and bytes are equal. Floats compare
/// bit for bit, ie NaN == NaN and 0. != -0.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tensor {
    scalar_type: ScalarType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl Tensor {
    /// Copies `array` into a tensor.
    ///
    /// Elements are copied in logical order, so arrays that are not in standard layout (ie
    /// transposed) produce the same tensor as their standard layout copy.
    pub fn from_array<T, S, D>(array: &ArrayBase<S, D>) -> Self
    where
        T: Scalar,
        S: ArrayData<Elem = T>,
        D: Dimension,
    {
        let width = size_of::<T>();
        let mut data = Vec::with_capacity(array.len() * width);
        if let Some(slice) = array.as_slice() {
            data.extend_from_slice(bytemuck::cast_slice(slice));
        } else {
            for x in array.iter() {
                data.extend_from_slice(bytemuck::bytes_of(x));
            }
        }
        if cfg!(target_endian = "big") {
            swap_bytes(&mut data, width);
        }
        Self {
            scalar_type: T::scalar_type(),
            shape: array.shape().to_vec(),
            data,
        }
    }
    /// A 0 dimensional tensor holding `x`.
    pub fn scalar<T: Scalar>(x: T) -> Self {
        Self::from_array(&ndarray::arr0(x))
    }
    /// Creates a tensor from little endian `data`.
    ///
    /// **Errors**
    /// - The length of `data` is not the product of `shape` times the size of `scalar_type`.
    pub fn from_parts(scalar_type: ScalarType, shape: Vec<usize>, data: Vec<u8>) -> Result<Self> {
        let expected = shape
            .iter()
            .try_fold(scalar_type.size(), |acc, d| acc.checked_mul(*d));
        if expected != Some(data.len()) {
            return Err(Error::Shape {
                shape,
                len: data.len(),
            });
        }
        Ok(Self {
            scalar_type,
            shape,
            data,
        })
    }
    /// The [`ScalarType`] of the elements.
    pub fn scalar_type(&self) -> ScalarType {
        self.scalar_type
    }
    /// The dimensions of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
    /// The number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
    /// The number of elements.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }
    /// Whether the tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// The elements as little endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
    /// Copies the tensor into an array.
    ///
    /// **Errors**
    /// - `T` is not the scalar type of the tensor.
    pub fn to_array<T: Scalar>(&self) -> Result<ArrayD<T>> {
        if T::scalar_type() != self.scalar_type {
            return Err(Error::ScalarTypeMismatch {
                expected: T::scalar_type(),
                found: self.scalar_type,
            });
        }
        let width = size_of::<T>();
        let read = |data: &[u8]| -> Vec<T> {
            data.chunks_exact(width)
                .map(bytemuck::pod_read_unaligned::<T>)
                .collect()
        };
        let vec = if cfg!(target_endian = "big") {
            let mut data = self.data.clone();
            swap_bytes(&mut data, width);
            read(&data)
        } else {
            read(&self.data)
        };
        Array::from_shape_vec(IxDyn(&self.shape), vec).map_err(|_| Error::Shape {
            shape: self.shape.clone(),
            len: self.data.len(),
        })
    }
    /// Converts the elements to f64, whatever the scalar type.
    ///
    /// Useful for comparing dumps of different precision. Integers wider than 53 bits may lose
    /// precision.
    pub fn to_f64_array(&self) -> Result<ArrayD<f64>> {
        macro_for!($T in [u8, i8, u16, i16, f16, bf16, u32, i32, f32, u64, i64, f64] {
            if self.scalar_type == $T::scalar_type() {
                let array = self.to_array::<$T>()?;
                return Ok(array.mapv(|x| ToPrimitive::to_f64(&x).unwrap_or(f64::NAN)));
            }
        });
        Err(Error::UnsupportedScalarType(self.scalar_type.to_string()))
    }
}

impl<T, S, D> From<ArrayBase<S, D>> for Tensor
where
    T: Scalar,
    S: ArrayData<Elem = T>,
    D: Dimension,
{
    fn from(array: ArrayBase<S, D>) -> Self {
        Self::from_array(&array)
    }
}

impl<T, S, D> From<&ArrayBase<S, D>> for Tensor
where
    T: Scalar,
    S: ArrayData<Elem = T>,
    D: Dimension,
{
    fn from(array: &ArrayBase<S, D>) -> Self {
        Self::from_array(array)
    }
}

/// Tensors by name.
///
/// Keys are kept sorted, so a bundle always encodes the same way regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deref, DerefMut)]
pub struct TensorBundle(BTreeMap<String, Tensor>);

impl TensorBundle {
    /// An empty bundle.
    pub fn new() -> Self {
        Self::default()
    }
    /// Inserts `tensor` under `key`, returning the previous tensor if any.
    pub fn insert(&mut self, key: impl Into<String>, tensor: impl Into<Tensor>) -> Option<Tensor> {
        self.0.insert(key.into(), tensor.into())
    }
    /// Inserts `tensor` under `key`, returning self.
    pub fn with(mut self, key: impl Into<String>, tensor: impl Into<Tensor>) -> Self {
        self.insert(key, tensor);
        self
    }
    /// Unwraps the map.
    pub fn into_inner(self) -> BTreeMap<String, Tensor> {
        self.0
    }
}

impl From<BTreeMap<String, Tensor>> for TensorBundle {
    fn from(map: BTreeMap<String, Tensor>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Tensor>> FromIterator<(K, V)> for TensorBundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, tensor)| (key.into(), tensor.into()))
                .collect(),
        )
    }
}

impl IntoIterator for TensorBundle {
    type Item = (String, Tensor);
    type IntoIter = btree_map::IntoIter<String, Tensor>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TensorBundle {
    type Item = (&'a String, &'a Tensor);
    type IntoIter = btree_map::Iter<'a, String, Tensor>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

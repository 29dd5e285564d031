use super::{Codec, DumpValue};
use crate::{
    error::{BoxError, Error, Result},
    scalar::ScalarType,
    tensor::{swap_bytes, Tensor, TensorBundle},
};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_bytes::Bytes;
use std::{borrow::Cow, collections::BTreeMap, io::Cursor};

/// The [msgpack-numpy](<https://github.com/lebedov/msgpack-numpy>) format.
///
/// A tensor is a map `{nd, type, kind, shape, data}`, where `type` is the numpy dtype string (eg
/// "<f8") and `data` holds the elements in C order. A bundle is a map from names to tensors.
/// Files written by python's `msgpack.packb(x, default=msgpack_numpy.encode)` can be loaded, and
/// files written here can be loaded with `msgpack.unpackb(b, object_hook=msgpack_numpy.decode)`.
///
/// BF16 has no numpy dtype and fails to encode.
#[derive(Clone, Copy, Debug, Default)]
pub struct NumpyMsgpack;

#[derive(Deserialize)]
struct NdRecord<'a> {
    nd: bool,
    #[serde(rename = "type", borrow)]
    descr: Cow<'a, str>,
    #[serde(default, with = "serde_bytes", borrow)]
    kind: Cow<'a, [u8]>,
    #[serde(default)]
    shape: Option<Vec<usize>>,
    #[serde(with = "serde_bytes", borrow)]
    data: Cow<'a, [u8]>,
}

// msgpack_numpy.decode only recognizes bytes keys.
impl Serialize for NdRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.shape.is_some() { 5 } else { 4 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(Bytes::new(b"nd"), &self.nd)?;
        map.serialize_entry(Bytes::new(b"type"), self.descr.as_ref())?;
        map.serialize_entry(Bytes::new(b"kind"), Bytes::new(&self.kind))?;
        if let Some(shape) = self.shape.as_ref() {
            map.serialize_entry(Bytes::new(b"shape"), shape)?;
        }
        map.serialize_entry(Bytes::new(b"data"), Bytes::new(&self.data))?;
        map.end()
    }
}

fn descr(scalar_type: ScalarType) -> Result<&'static str> {
    use ScalarType::*;
    let descr = match scalar_type {
        U8 => "|u1",
        I8 => "|i1",
        U16 => "<u2",
        I16 => "<i2",
        F16 => "<f2",
        U32 => "<u4",
        I32 => "<i4",
        F32 => "<f4",
        U64 => "<u8",
        I64 => "<i8",
        F64 => "<f8",
        _ => return Err(Error::UnsupportedScalarType(scalar_type.name().to_string())),
    };
    Ok(descr)
}

/// Returns the scalar type and whether the data is big endian.
fn parse_descr(descr: &str) -> Result<(ScalarType, bool)> {
    use ScalarType::*;
    let unsupported = || Error::UnsupportedScalarType(descr.to_string());
    let (big_endian, code) = match descr.as_bytes().first() {
        Some(b'<') | Some(b'|') => (false, &descr[1..]),
        Some(b'>') => (true, &descr[1..]),
        Some(b'=') => (cfg!(target_endian = "big"), &descr[1..]),
        Some(_) => (cfg!(target_endian = "big"), descr),
        None => return Err(unsupported()),
    };
    let scalar_type = match code {
        "u1" => U8,
        "i1" => I8,
        "u2" => U16,
        "i2" => I16,
        "f2" => F16,
        "u4" => U32,
        "i4" => I32,
        "f4" => F32,
        "u8" => U64,
        "i8" => I64,
        "f8" => F64,
        _ => return Err(unsupported()),
    };
    Ok((scalar_type, big_endian))
}

impl<'a> NdRecord<'a> {
    fn from_tensor(tensor: &'a Tensor) -> Result<Self> {
        Ok(Self {
            nd: true,
            descr: Cow::Borrowed(descr(tensor.scalar_type())?),
            kind: Cow::Borrowed(&[]),
            shape: Some(tensor.shape().to_vec()),
            data: Cow::Borrowed(tensor.as_bytes()),
        })
    }
    fn into_tensor(self) -> Result<Tensor> {
        if !self.kind.is_empty() {
            // structured arrays
            return Err(Error::UnsupportedScalarType(format!(
                "{} (kind {:?})",
                self.descr,
                String::from_utf8_lossy(&self.kind)
            )));
        }
        let (scalar_type, big_endian) = parse_descr(&self.descr)?;
        let shape = match (self.nd, self.shape) {
            (true, Some(shape)) => shape,
            (true, None) => return Err(Error::Decode("ndarray without a shape".into())),
            // numpy scalar
            (false, _) => Vec::new(),
        };
        let mut data = self.data.into_owned();
        if big_endian {
            swap_bytes(&mut data, scalar_type.size());
        }
        Tensor::from_parts(scalar_type, shape, data)
    }
}

/// Decodes a single value that spans all of `bytes`.
fn from_slice_exact<'de, T: Deserialize<'de>>(bytes: &[u8]) -> Result<T, BoxError> {
    let mut de = rmp_serde::Deserializer::new(Cursor::new(bytes));
    let value = T::deserialize(&mut de)?;
    let trailing = bytes.len() as u64 - de.position();
    if trailing > 0 {
        return Err(format!("{trailing} trailing bytes").into());
    }
    Ok(value)
}

fn encode_error(err: rmp_serde::encode::Error) -> Error {
    Error::Encode(err.into())
}

impl Codec for NumpyMsgpack {
    fn encode(&self, value: &DumpValue) -> Result<Vec<u8>> {
        match value {
            DumpValue::Tensor(tensor) => {
                rmp_serde::to_vec_named(&NdRecord::from_tensor(tensor)?).map_err(encode_error)
            }
            DumpValue::Bundle(bundle) => {
                let records = bundle
                    .iter()
                    .map(|(key, tensor)| Ok((key.as_str(), NdRecord::from_tensor(tensor)?)))
                    .collect::<Result<BTreeMap<_, _>>>()?;
                rmp_serde::to_vec_named(&records).map_err(encode_error)
            }
        }
    }
    fn decode(&self, bytes: &[u8]) -> Result<DumpValue> {
        let tensor_err = match from_slice_exact::<NdRecord>(bytes) {
            Ok(record) => return record.into_tensor().map(DumpValue::Tensor),
            Err(err) => err,
        };
        let bundle_err = match from_slice_exact::<BTreeMap<String, NdRecord>>(bytes) {
            Ok(records) => {
                return records
                    .into_iter()
                    .map(|(key, record)| Ok((key, record.into_tensor()?)))
                    .collect::<Result<BTreeMap<_, _>>>()
                    .map(|map| DumpValue::Bundle(TensorBundle::from(map)))
            }
            Err(err) => err,
        };
        Err(Error::Decode(BoxError::from(format!(
            "expected an ndarray ({tensor_err}) or a map of ndarrays ({bundle_err})"
        ))))
    }
}

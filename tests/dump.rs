use anyhow::Result;
use ndarray::{arr1, arr2, Array, Array3, Ix2};
use std::{collections::BTreeMap, fs};
use tempfile::tempdir;
use tensordump::{
    ArrayDumper, Codec, DumpValue, Error, NamedTensors, ScalarType, Selection, Tensor,
    TensorBundle,
};

struct Conv {
    w: Array<f32, ndarray::Ix4>,
    b: ndarray::Array1<f32>,
    dw: Array<f32, ndarray::Ix4>,
    db: ndarray::Array1<f32>,
}

impl Conv {
    fn new(filters: usize, channels: usize, size: usize) -> Self {
        let dim = [filters, channels, size, size];
        let n = dim.iter().product::<usize>();
        let w = Array::from_shape_vec(dim, (0..n).map(|i| i as f32 * 0.01).collect()).unwrap();
        let dw = w.mapv(|x| -x / 3.);
        Self {
            w,
            b: Array::zeros(filters),
            dw,
            db: Array::from_elem(filters, 0.125),
        }
    }
}

impl NamedTensors for Conv {
    fn attribute(&self, name: &str) -> Option<Tensor> {
        match name {
            "W" => Some(Tensor::from(&self.w)),
            "b" => Some(Tensor::from(&self.b)),
            "dW" => Some(Tensor::from(&self.dw)),
            "db" => Some(Tensor::from(&self.db)),
            _ => None,
        }
    }
}

#[test]
fn int_2_3() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("int_2_3.mp");
    let x = arr2(&[[1i64, 2, 3], [4, 5, 6]]);
    tensordump::dump(&path, &x)?;
    let tensor = tensordump::load(&path)?.into_tensor()?;
    assert_eq!(tensor.scalar_type(), ScalarType::I64);
    assert_eq!(tensor.to_array::<i64>()?.into_dimensionality::<Ix2>()?, x);
    Ok(())
}

#[test]
fn float_3_2() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("float_3_2.mp");
    let x = arr2(&[[1.0f64, 2.0], [3.0, 4.0], [5.0, 6.0]]);
    tensordump::dump(&path, x.view())?;
    let tensor = tensordump::load(&path)?.into_tensor()?;
    assert_eq!(tensor.scalar_type(), ScalarType::F64);
    assert_eq!(tensor.shape(), &[3, 2]);
    assert_eq!(tensor.to_array::<f64>()?.into_dimensionality::<Ix2>()?, x);
    Ok(())
}

#[test]
fn layer_snapshot_keys() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("conv1.mp");
    let conv = Conv::new(30, 1, 5);
    tensordump::dump_named_bundle(&path, &conv, &Selection::layer_gradients())?;
    let bundle = tensordump::load(&path)?.into_bundle()?;
    let keys: Vec<_> = bundle.keys().map(String::as_str).collect();
    assert_eq!(keys, ["W", "dW", "db"]);
    assert_eq!(bundle["W"], Tensor::from(&conv.w));
    assert_eq!(bundle["dW"], Tensor::from(&conv.dw));
    assert_eq!(bundle["db"], Tensor::from(&conv.db));
    assert_eq!(bundle["W"].shape(), &[30, 1, 5, 5]);
    Ok(())
}

#[test]
fn network_gradients() -> Result<()> {
    let dir = tempdir()?;
    let mut network = BTreeMap::new();
    network.insert("Conv1".to_string(), Conv::new(4, 1, 3));
    network.insert("Affine1".to_string(), Conv::new(2, 4, 1));
    network.insert("Affine2".to_string(), Conv::new(1, 2, 1));
    let dumper = ArrayDumper::builder().dir(dir.path()).build();
    dumper.dump_named_bundle("grads.mp", &network, &Selection::conv_net_gradients())?;
    let bundle = dumper.load_bundle("grads.mp")?;
    assert_eq!(bundle.len(), 6);
    assert_eq!(bundle["W2"], Tensor::from(&network["Affine1"].dw));
    assert_eq!(bundle["b3"], Tensor::from(&network["Affine2"].db));
    Ok(())
}

#[test]
fn missing_attribute_writes_nothing() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("grads.mp");
    let conv = Conv::new(1, 1, 1);
    let selection = Selection::layer_gradients().select("dx", "dx");
    let err = tensordump::dump_named_bundle(&path, &conv, &selection).unwrap_err();
    assert!(matches!(err, Error::MissingAttribute(ref name) if name == "dx"), "{err}");
    assert!(!path.exists());
    Ok(())
}

#[test]
fn dump_is_deterministic() -> Result<()> {
    let dir = tempdir()?;
    let dumper = ArrayDumper::builder().dir(dir.path()).build();
    let bundle = TensorBundle::new()
        .with("x", Array3::<f32>::from_elem([2, 3, 4], 0.1))
        .with("t", arr1(&[7u8, 2, 1]));
    let a = dumper.dump("a.mp", &bundle)?;
    let b = dumper.dump("b.mp", &bundle)?;
    let first = fs::read(&a)?;
    assert_eq!(first, fs::read(&b)?);
    dumper.dump("a.mp", &bundle)?;
    assert_eq!(first, fs::read(&a)?);
    Ok(())
}

#[test]
fn overwrite_leaves_no_residue() -> Result<()> {
    let dir = tempdir()?;
    let dumper = ArrayDumper::builder().dir(dir.path()).build();
    let large = Array::from_shape_vec([100], (0..100i32).collect())?;
    let small = arr1(&[1i32]);
    let path = dumper.dump("x.mp", &large)?;
    let large_len = fs::metadata(&path)?.len();
    dumper.dump("x.mp", &small)?;
    assert!(fs::metadata(&path)?.len() < large_len);
    assert_eq!(dumper.load_tensor("x.mp")?, Tensor::from(&small));
    assert_eq!(
        fs::read(&path)?,
        dumper.codec().encode(&DumpValue::from(&small))?
    );
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn missing_directory_is_io_error() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("does").join("not").join("exist.mp");
    let err = tensordump::dump(&path, arr1(&[1f32])).unwrap_err();
    assert!(matches!(err, Error::Io { .. }), "{err}");
    assert!(!path.exists());
    assert!(!dir.path().join("does").exists());
    Ok(())
}

#[test]
fn unsupported_type_writes_nothing() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("bf16.mp");
    let x = arr1(&[half::bf16::from_f32(1.5)]);
    let err = tensordump::dump(&path, &x).unwrap_err();
    assert!(matches!(err, Error::UnsupportedScalarType(_)), "{err}");
    assert!(!path.exists());
    Ok(())
}

#[test]
fn failed_dump_keeps_previous_file() -> Result<()> {
    let dir = tempdir()?;
    let dumper = ArrayDumper::builder().dir(dir.path()).build();
    let x = arr1(&[1f32, 2.]);
    dumper.dump("x.mp", &x)?;
    let conv = Conv::new(1, 1, 1);
    let selection = Selection::new().select("y", "y");
    assert!(dumper.dump_named_bundle("x.mp", &conv, &selection).is_err());
    assert_eq!(dumper.load_tensor("x.mp")?, Tensor::from(&x));
    Ok(())
}

#[test]
fn non_finite_floats() -> Result<()> {
    let dir = tempdir()?;
    let dumper = ArrayDumper::builder().dir(dir.path()).build();
    let x = arr1(&[f32::NAN, f32::INFINITY, -0.0, f32::MIN_POSITIVE / 2.]);
    dumper.dump("x.mp", &x)?;
    let y = dumper.load_tensor("x.mp")?.to_array::<f32>()?;
    for (a, b) in x.iter().zip(y.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
    Ok(())
}

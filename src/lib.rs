/*!
Dump network tensors to disk and load them back.

Weights, activations and gradients are written in the
[msgpack-numpy](<https://github.com/lebedov/msgpack-numpy>) format, one value per file, so runs
can be compared offline against each other or against a numpy reference.

```no_run
# fn main() -> tensordump::Result<()> {
use ndarray::Array;
use tensordump::{ArrayDumper, Selection, TensorBundle};

let x = Array::from_shape_vec([2, 3], vec![1i64, 2, 3, 4, 5, 6]).unwrap();
tensordump::dump("int_2_3.mp", &x)?;

let layer = TensorBundle::new()
    .with("W", x.mapv(|x| x as f32))
    .with("dW", x.mapv(|x| -x as f32))
    .with("db", ndarray::arr1(&[0f32, 0., 0.]));
let dumper = ArrayDumper::builder().dir("dumps").create_dirs(true).build();
dumper.dump_named_bundle("conv1.mp", &layer, &Selection::layer_gradients())?;

let grads = dumper.load_bundle("conv1.mp")?;
assert_eq!(grads.len(), 3);
# Ok(())
# }
```
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
/// ArrayDumper.
pub mod dumper;
/// Errors.
pub mod error;
pub mod named;
/// Scalar types.
pub mod scalar;
/// Tensors.
pub mod tensor;

pub use codec::{Codec, DumpValue, NumpyMsgpack};
pub use dumper::{dump, dump_named_bundle, load, ArrayDumper};
pub use error::{Error, Result};
pub use named::{lookup, NamedTensors, Selection};
pub use scalar::{Scalar, ScalarType};
pub use tensor::{Tensor, TensorBundle};

pub use ndarray;

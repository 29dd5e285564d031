use anyhow::Result;
use ndarray::{Array, Array1, Array2, Axis};
use std::collections::BTreeMap;
use tensordump::{ArrayDumper, NamedTensors, Selection, Tensor};

// Stand in for a real layer, only here to produce something worth dumping.
struct Affine {
    w: Array2<f32>,
    b: Array1<f32>,
    x: Option<Array2<f32>>,
    dw: Array2<f32>,
    db: Array1<f32>,
}

impl Affine {
    fn new(inputs: usize, outputs: usize, seed: f32) -> Self {
        let w = Array::from_shape_fn([inputs, outputs], |(i, j)| {
            ((i * outputs + j) as f32 * seed).sin() * 0.01
        });
        Self {
            w,
            b: Array::zeros(outputs),
            x: None,
            dw: Array::zeros([inputs, outputs]),
            db: Array::zeros(outputs),
        }
    }
    fn forward(&mut self, x: &Array2<f32>) -> Array2<f32> {
        self.x.replace(x.clone());
        x.dot(&self.w) + &self.b
    }
    fn backward(&mut self, dy: &Array2<f32>) -> Array2<f32> {
        if let Some(x) = self.x.as_ref() {
            self.dw = x.t().dot(dy);
        }
        self.db = dy.sum_axis(Axis(0));
        dy.dot(&self.w.t())
    }
}

impl NamedTensors for Affine {
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

// Runs a forward / backward pass over a batch of 3 and dumps the intermediate values to capture/.
fn main() -> Result<()> {
    let dumper = ArrayDumper::builder()
        .dir("capture")
        .create_dirs(true)
        .build();

    let x0 = Array::from_shape_fn([3, 16], |(i, j)| ((i * 16 + j) % 7) as f32 / 7.);
    let t = Array1::from(vec![1u8, 0, 2]);
    dumper.dump("x0.mp", &x0)?;
    dumper.dump("t0.mp", &t)?;

    let mut affine1 = Affine::new(16, 8, 0.3);
    let mut affine2 = Affine::new(8, 3, 0.7);
    dumper.dump("W0.mp", &affine1.w)?;

    let x1 = affine1.forward(&x0);
    dumper.dump("x1.mp", &x1)?;
    let x2 = x1.mapv(|x| x.max(0.));
    dumper.dump("x2.mp", &x2)?;
    let x3 = affine2.forward(&x2);
    dumper.dump("x3.mp", &x3)?;

    let y3 = affine2.backward(&x3);
    dumper.dump("y3.mp", &y3)?;
    let y2 = Array::from_shape_fn(y3.raw_dim(), |ix| if x1[ix] > 0. { y3[ix] } else { 0. });
    dumper.dump("y2.mp", &y2)?;
    let y1 = affine1.backward(&y2);
    dumper.dump("y1.mp", &y1)?;

    let mut layers = BTreeMap::new();
    layers.insert("Affine1".to_string(), affine1);
    layers.insert("Affine2".to_string(), affine2);
    dumper.dump_named_bundle(
        "affine1.mp",
        &layers["Affine1"],
        &Selection::layer_gradients(),
    )?;
    let grads = Selection::new()
        .select("W1", "Affine1.dW")
        .select("b1", "Affine1.db")
        .select("W2", "Affine2.dW")
        .select("b2", "Affine2.db");
    let path = dumper.dump_named_bundle("grads.mp", &layers, &grads)?;

    for (key, tensor) in dumper.load_bundle(&path)?.iter() {
        println!("{key}: {} {:?}", tensor.scalar_type(), tensor.shape());
    }
    Ok(())
}

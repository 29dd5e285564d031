/*!
Named tensor lookup.

Networks and layers expose their parameters and gradients by implementing [`NamedTensors`]. A
[`Selection`] picks a fixed set of them into a [`TensorBundle`].

```
# use tensordump::{Selection, TensorBundle, Tensor};
# use std::collections::BTreeMap;
# use ndarray::arr1;
let conv1 = TensorBundle::new()
    .with("dW", arr1(&[0.5f32]))
    .with("db", arr1(&[0.25f32]));
let mut network = BTreeMap::new();
network.insert("Conv1".to_string(), conv1);
let bundle = Selection::new()
    .select("W1", "Conv1.dW")
    .select("b1", "Conv1.db")
    .extract(&network)
    .unwrap();
assert_eq!(bundle["W1"], Tensor::from(arr1(&[0.5f32])));
```
*/
use crate::{
    error::{Error, Result},
    tensor::{Tensor, TensorBundle},
};
use std::collections::{BTreeMap, HashMap};

/// Tensors and sub components addressable by name.
pub trait NamedTensors {
    /// Returns the tensor `name`, ie "W" or "dW".
    fn attribute(&self, name: &str) -> Option<Tensor>;
    /// Returns the sub component `name`, ie "Conv1".
    fn component(&self, name: &str) -> Option<&dyn NamedTensors> {
        let _ = name;
        None
    }
}

impl NamedTensors for TensorBundle {
    fn attribute(&self, name: &str) -> Option<Tensor> {
        self.get(name).cloned()
    }
}

impl<T: NamedTensors> NamedTensors for BTreeMap<String, T> {
    fn attribute(&self, _name: &str) -> Option<Tensor> {
        None
    }
    fn component(&self, name: &str) -> Option<&dyn NamedTensors> {
        self.get(name).map(|x| x as &dyn NamedTensors)
    }
}

impl<T: NamedTensors> NamedTensors for HashMap<String, T> {
    fn attribute(&self, _name: &str) -> Option<Tensor> {
        None
    }
    fn component(&self, name: &str) -> Option<&dyn NamedTensors> {
        self.get(name).map(|x| x as &dyn NamedTensors)
    }
}

impl<T: NamedTensors + ?Sized> NamedTensors for &T {
    fn attribute(&self, name: &str) -> Option<Tensor> {
        (**self).attribute(name)
    }
    fn component(&self, name: &str) -> Option<&dyn NamedTensors> {
        (**self).component(name)
    }
}

/// Looks up a dot separated `path`, ie "Conv1.dW" is attribute "dW" of component "Conv1".
///
/// **Errors**
/// - A component or the attribute was not found.
pub fn lookup<S: NamedTensors + ?Sized>(source: &S, path: &str) -> Result<Tensor> {
    let missing = || Error::MissingAttribute(path.to_string());
    let (components, attribute) = match path.rsplit_once('.') {
        Some((components, attribute)) => (Some(components), attribute),
        None => (None, path),
    };
    match components {
        Some(components) => {
            let mut names = components.split('.');
            let first = names.next().ok_or_else(missing)?;
            let mut component = source.component(first).ok_or_else(missing)?;
            for name in names {
                component = component.component(name).ok_or_else(missing)?;
            }
            component.attribute(attribute).ok_or_else(missing)
        }
        None => source.attribute(attribute).ok_or_else(missing),
    }
}

/// An ordered list of `key <- path` entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    entries: Vec<(String, String)>,
}

impl Selection {
    /// An empty selection.
    pub fn new() -> Self {
        Self::default()
    }
    /// Adds `key <- path`.
    pub fn select(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.entries.push((key.into(), path.into()));
        self
    }
    /// Selects `names`, each stored under its own name.
    pub fn attributes<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let entries = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                (name.clone(), name)
            })
            .collect();
        Self { entries }
    }
    /// The weight and the gradients of a single layer: "W", "dW", "db".
    pub fn layer_gradients() -> Self {
        Self::attributes(["W", "dW", "db"])
    }
    /// The gradients of a conv - affine - affine network, keyed like its parameters.
    ///
    /// W1 / b1 from "Conv1", W2 / b2 from "Affine1" and W3 / b3 from "Affine2".
    pub fn conv_net_gradients() -> Self {
        [("1", "Conv1"), ("2", "Affine1"), ("3", "Affine2")]
            .into_iter()
            .fold(Self::new(), |selection, (index, layer)| {
                selection
                    .select(format!("W{index}"), format!("{layer}.dW"))
                    .select(format!("b{index}"), format!("{layer}.db"))
            })
    }
    /// The `(key, path)` entries.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
    /// Extracts the selected tensors from `source`.
    ///
    /// **Errors**
    /// - A path was not found, see [`lookup`].
    pub fn extract<S: NamedTensors + ?Sized>(&self, source: &S) -> Result<TensorBundle> {
        let mut bundle = TensorBundle::new();
        for (key, path) in self.entries.iter() {
            bundle.insert(key.as_str(), lookup(source, path)?);
        }
        Ok(bundle)
    }
}

pub mod tensor;
pub mod layer;
pub mod loss;
pub mod optimizer;

use tensor::Tensor;
use layer::{Layer, Dense};
use loss::Loss;
use optimizer::Optimizer;

use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize)]
pub struct Sequential {
    pub layers: Vec<Box<dyn Layer>>
}

// kind and parameter shapes of one layer, used to check that two stacks line up
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerSignature {
    pub name: &'static str,
    pub parameter_shapes: Vec<Vec<usize>>
}

impl Sequential {
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Self {
        Self {
            layers
        }
    }

    // caching forward pass, call before backward
    pub fn predict(&mut self, input: &Tensor) -> Tensor {
        let mut output = input.clone();
        for layer in &mut self.layers {
            output = layer.forward(&output);
        }
        output
    }

    pub fn infer(&self, input: &Tensor) -> Tensor {
        let mut output = input.clone();
        for layer in &self.layers {
            output = layer.infer(&output);
        }
        output
    }

    pub fn backward(&mut self, d_output: &Tensor) -> Tensor {
        let mut d = d_output.clone();
        for layer in self.layers.iter_mut().rev() {
            d = layer.backward(&d);
        }
        d
    }

    // forward, loss, backprop, optimizer step; returns the loss before the step
    pub fn train_on_batch(&mut self, x_batch: &Tensor, y_batch: &Tensor, loss: &dyn Loss, optimizer: &mut dyn Optimizer) -> f32 {
        let y_pred = self.predict(x_batch);
        let value = loss.calculate(&y_pred, y_batch);
        let d_output = loss.gradient(&y_pred, y_batch);
        self.backward(&d_output);
        self.step(optimizer);
        value
    }

    pub fn step(&mut self, optimizer: &mut dyn Optimizer) {
        optimizer.step(&mut self.layers);
    }

    // moves the parameter gradients of the last backward pass out, one entry per layer
    pub fn take_gradients(&mut self) -> Vec<Option<(Tensor, Tensor)>> {
        self.layers
            .iter_mut()
            .map(|layer| {
                let dense = layer.as_any_mut().downcast_mut::<Dense>()?;
                Some((dense.d_weights.take()?, dense.d_biases.take()?))
            })
            .collect()
    }

    // adds gradients from `take_gradients` onto the ones of the last backward pass
    pub fn add_gradients(&mut self, gradients: Vec<Option<(Tensor, Tensor)>>) {
        for (layer, gradient) in self.layers.iter_mut().zip(gradients) {
            let (Some(dense), Some((d_weights, d_biases))) = (layer.as_any_mut().downcast_mut::<Dense>(), gradient) else {
                continue;
            };
            dense.d_weights = Some(match dense.d_weights.take() {
                Some(current) => current.map2(&d_weights, |a, b| a + b),
                None => d_weights,
            });
            dense.d_biases = Some(match dense.d_biases.take() {
                Some(current) => current.map2(&d_biases, |a, b| a + b),
                None => d_biases,
            });
        }
    }

    pub fn signature(&self) -> Vec<LayerSignature> {
        self.layers
            .iter()
            .map(|layer| LayerSignature {
                name: layer.name(),
                parameter_shapes: layer.parameter_shapes()
            })
            .collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.signature()
            .iter()
            .flat_map(|s| s.parameter_shapes.iter())
            .map(|shape| shape.iter().product::<usize>())
            .sum()
    }

    // caller must make sure both signatures are equal
    pub fn copy_weights_from(&mut self, other: &Self) {
        debug_assert_eq!(self.signature(), other.signature());
        for (self_layer, other_layer) in self.layers.iter_mut().zip(other.layers.iter()) {
            if let (Some(self_dense), Some(other_dense)) = (self_layer.as_any_mut().downcast_mut::<Dense>(), other_layer.as_any().downcast_ref::<Dense>()) {
                self_dense.weights = other_dense.weights.clone();
                self_dense.biases = other_dense.biases.clone();
            }
        }
    }
}

impl Clone for Sequential {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.iter().map(|layer| layer.clone_box()).collect()
        }
    }
}

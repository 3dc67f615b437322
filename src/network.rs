use std::fs;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CheckpointError;
use crate::sequential::layer::{Dense, Layer, ReLU, Softmax};
use crate::sequential::loss::{Loss, MeanSquaredError};
use crate::sequential::optimizer::Optimizer;
use crate::sequential::tensor::Tensor;
use crate::sequential::{LayerSignature, Sequential};

pub const HIDDEN_SIZES: [usize; 2] = [128, 64];

// Dense(input -> 128) -> ReLU -> Dense(128 -> 64) -> ReLU -> Dense(64 -> output) -> Softmax
// the softmax head makes every score vector a distribution over actions
#[derive(Clone)]
pub struct QNetwork {
    pub(crate) model: Sequential,
    input_size: usize,
    output_size: usize,
}

#[derive(Serialize)]
struct CheckpointRef<'a> {
    input_size: usize,
    output_size: usize,
    model: &'a Sequential,
}

#[derive(Deserialize)]
struct Checkpoint {
    input_size: usize,
    output_size: usize,
    model: Sequential,
}

fn layer_dims(input_size: usize, output_size: usize) -> [usize; 4] {
    [input_size, HIDDEN_SIZES[0], HIDDEN_SIZES[1], output_size]
}

fn expected_signature(input_size: usize, output_size: usize) -> Vec<LayerSignature> {
    let dims = layer_dims(input_size, output_size);
    let mut signature = Vec::new();
    for (i, pair) in dims.windows(2).enumerate() {
        signature.push(LayerSignature {
            name: "dense",
            parameter_shapes: vec![vec![pair[0], pair[1]], vec![1, pair[1]]],
        });
        let activation = if i + 2 == dims.len() { "softmax" } else { "relu" };
        signature.push(LayerSignature {
            name: activation,
            parameter_shapes: Vec::new(),
        });
    }
    signature
}

impl QNetwork {
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let dims = layer_dims(input_size, output_size);
        let mut layers: Vec<Box<dyn Layer>> = Vec::new();
        for (i, pair) in dims.windows(2).enumerate() {
            layers.push(Box::new(Dense::new(pair[0], pair[1], rng)));
            if i + 2 == dims.len() {
                layers.push(Box::new(Softmax::new()));
            } else {
                layers.push(Box::new(ReLU::new()));
            }
        }

        Self {
            model: Sequential::new(layers),
            input_size,
            output_size,
        }
    }

    pub fn from_checkpoint(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let path = path.as_ref();
        let checkpoint = read_checkpoint(path)?;
        check_signature(
            &expected_signature(checkpoint.input_size, checkpoint.output_size),
            &checkpoint.model.signature(),
        )?;

        info!(path = %path.display(), input_size = checkpoint.input_size, output_size = checkpoint.output_size, "loaded checkpoint");
        Ok(Self {
            model: checkpoint.model,
            input_size: checkpoint.input_size,
            output_size: checkpoint.output_size,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn parameter_count(&self) -> usize {
        self.model.parameter_count()
    }

    // pure, nothing is cached for backprop
    pub fn forward(&self, x: &[f32]) -> Vec<f32> {
        assert_eq!(x.len(), self.input_size, "state vector length must match the network input size");
        self.model.infer(&Tensor::row(x)).into_vec()
    }

    // one Q-learning step, returns the loss before the step
    // target is `reward + max(next scores)` at `action`, the current scores elsewhere;
    // the error also flows back through the best next-state score
    pub fn fit_transition(&mut self, state: &[f32], action: usize, reward: f32, next_state: &[f32], optimizer: &mut dyn Optimizer) -> f32 {
        assert_eq!(state.len(), self.input_size, "state vector length must match the network input size");
        assert_eq!(next_state.len(), self.input_size, "state vector length must match the network input size");
        assert!(action < self.output_size, "action {} is not scored by the network", action);

        let next_scores = self.model.predict(&Tensor::row(next_state));
        let td_target = reward + next_scores.max();

        let x = Tensor::row(state);
        let mut target = self.model.infer(&x).into_vec();
        let coefficient = 2.0 * (target[action] - td_target) / target.len() as f32;
        target[action] = td_target;

        if let Some(best) = next_scores.argmax() {
            let mut d_next = Tensor::zeros(next_scores.shape.clone());
            d_next.write()[best] = -coefficient;
            self.model.backward(&d_next);
        }
        let next_gradients = self.model.take_gradients();

        let y = Tensor::row(&target);
        let y_pred = self.model.predict(&x);
        let loss = MeanSquaredError.calculate(&y_pred, &y);
        self.model.backward(&MeanSquaredError.gradient(&y_pred, &y));
        self.model.add_gradients(next_gradients);
        self.model.step(optimizer);

        loss
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CheckpointError> {
        let path = path.as_ref();
        let checkpoint = CheckpointRef {
            input_size: self.input_size,
            output_size: self.output_size,
            model: &self.model,
        };
        let bytes = bincode::serialize(&checkpoint).map_err(|source| CheckpointError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, bytes).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), parameters = self.parameter_count(), "saved checkpoint");
        Ok(())
    }

    // on any error the current parameters are kept as they were
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), CheckpointError> {
        let path = path.as_ref();
        let checkpoint = read_checkpoint(path)?;

        if (checkpoint.input_size, checkpoint.output_size) != (self.input_size, self.output_size) {
            return Err(CheckpointError::ArchitectureMismatch(format!(
                "checkpoint maps {} -> {}, network maps {} -> {}",
                checkpoint.input_size, checkpoint.output_size, self.input_size, self.output_size
            )));
        }
        check_signature(&self.model.signature(), &checkpoint.model.signature())?;

        self.model.copy_weights_from(&checkpoint.model);
        info!(path = %path.display(), "loaded checkpoint");
        Ok(())
    }
}

fn read_checkpoint(path: &Path) -> Result<Checkpoint, CheckpointError> {
    let bytes = fs::read(path).map_err(|source| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    bincode::deserialize(&bytes).map_err(|source| CheckpointError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn check_signature(expected: &[LayerSignature], found: &[LayerSignature]) -> Result<(), CheckpointError> {
    if expected.len() != found.len() {
        return Err(CheckpointError::ArchitectureMismatch(format!(
            "expected {} layers, found {}",
            expected.len(),
            found.len()
        )));
    }
    for (i, (e, f)) in expected.iter().zip(found).enumerate() {
        if e != f {
            return Err(CheckpointError::ArchitectureMismatch(format!(
                "layer {i}: expected {} {:?}, found {} {:?}",
                e.name, e.parameter_shapes, f.name, f.parameter_shapes
            )));
        }
    }
    Ok(())
}

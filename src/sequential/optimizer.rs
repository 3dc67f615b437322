use super::layer::{Layer, Dense};
use super::tensor::Tensor;

pub trait Optimizer {
    fn step(&mut self, layers: &mut [Box<dyn Layer>]);
}


// adam

#[derive(Clone, Default)]
struct Moments {
    m: Vec<f32>,
    v: Vec<f32>
}

// bias-corrected; a freshly built Adam starts from step one
#[derive(Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    // one entry per parameter tensor, in layer order
    moments: Vec<Moments>
}

impl Adam {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            moments: Vec::new()
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn update(&mut self, slot: usize, param: &mut Tensor, grad: &Tensor) {
        assert_eq!(param.shape, grad.shape, "gradient shape must match parameter");

        if self.moments.len() <= slot {
            self.moments.resize_with(slot + 1, Moments::default);
        }
        let moments = &mut self.moments[slot];
        if moments.m.len() != grad.read().len() {
            moments.m = vec![0.0; grad.read().len()];
            moments.v = vec![0.0; grad.read().len()];
        }

        let bias_correction1 = 1.0 - self.beta1.powi(self.t);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t);

        for (((p, &g), m), v) in param.write().iter_mut().zip(grad.read()).zip(moments.m.iter_mut()).zip(moments.v.iter_mut()) {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            let m_hat = *m / bias_correction1;
            let v_hat = *v / bias_correction2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, layers: &mut [Box<dyn Layer>]) {
        self.t += 1;

        let mut slot = 0;
        for layer in layers {
            if let Some(dense_layer) = layer.as_any_mut().downcast_mut::<Dense>() {
                if let (Some(d_weights), Some(d_biases)) = (dense_layer.d_weights.take(), dense_layer.d_biases.take()) {
                    self.update(slot, &mut dense_layer.weights, &d_weights);
                    self.update(slot + 1, &mut dense_layer.biases, &d_biases);
                    dense_layer.d_weights = Some(d_weights);
                    dense_layer.d_biases = Some(d_biases);
                }
                slot += 2;
            }
        }
    }
}

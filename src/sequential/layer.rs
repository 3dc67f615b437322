use super::tensor::Tensor;
use rand::Rng;
use std::any::Any;
use serde::{Serialize, Deserialize};

#[typetag::serde]
pub trait Layer {
    // caches what backward needs
    fn forward(&mut self, input: &Tensor) -> Tensor;
    // same output as forward, no caching and no gradient bookkeeping
    fn infer(&self, input: &Tensor) -> Tensor;
    fn backward(&mut self, d_output: &Tensor) -> Tensor;
    fn name(&self) -> &'static str;
    fn parameter_shapes(&self) -> Vec<Vec<usize>> {
        Vec::new()
    }
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn Layer>;
}


// dense layer

#[derive(Serialize, Deserialize, Clone)]
pub struct Dense {
    pub weights: Tensor,
    pub biases: Tensor,
    #[serde(skip)]
    cached_input: Option<Tensor>, // for back propagation
    #[serde(skip)]
    pub d_weights: Option<Tensor>,
    #[serde(skip)]
    pub d_biases: Option<Tensor>
}

impl Dense {
    // He init: weights ~ N(0, 2 / input_size), zero biases
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let std = (2.0 / input_size.max(1) as f32).sqrt();
        Self::from_parameters(
            Tensor::random(vec![input_size, output_size], std, rng),
            Tensor::zeros(vec![1, output_size])
        )
    }

    pub fn from_parameters(weights: Tensor, biases: Tensor) -> Self {
        assert_eq!(biases.shape, vec![1, weights.cols()], "biases must be [1, output_size]");
        Self {
            weights,
            biases,
            cached_input: None,
            d_weights: None,
            d_biases: None
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.cols()
    }

    fn affine(&self, input: &Tensor) -> Tensor {
        let mut output = input.matmul(&self.weights);
        let output_size = output.cols();
        let biases = self.biases.read();

        for row in output.write().chunks_mut(output_size.max(1)) {
            for (x, b) in row.iter_mut().zip(biases) {
                *x += b;
            }
        }

        output
    }
}

#[typetag::serde]
impl Layer for Dense {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        self.cached_input = Some(input.clone());
        self.affine(input)
    }

    fn infer(&self, input: &Tensor) -> Tensor {
        self.affine(input)
    }

    fn backward(&mut self, d_output: &Tensor) -> Tensor {
        let Some(cached_input) = &self.cached_input else {
            panic!("complete forward pass first.");
        };

        // dL/dW = input.T @ dL/dY
        self.d_weights = Some(cached_input.transpose().matmul(d_output));

        // dL/db = dL/dY summed over the batch
        self.d_biases = Some(d_output.sum_rows());

        // dL/dX = dL/dY @ weights.T
        d_output.matmul(&self.weights.transpose())
    }

    fn name(&self) -> &'static str {
        "dense"
    }

    fn parameter_shapes(&self) -> Vec<Vec<usize>> {
        vec![self.weights.shape.clone(), self.biases.shape.clone()]
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}


// relu layer

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ReLU {
    #[serde(skip)]
    cached_input: Option<Tensor>
}

impl ReLU {
    pub fn new() -> Self {
        Self::default()
    }
}

#[typetag::serde]
impl Layer for ReLU {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        self.cached_input = Some(input.clone());
        self.infer(input)
    }

    fn infer(&self, input: &Tensor) -> Tensor {
        input.map(|x| x.max(0.0))
    }

    fn backward(&mut self, d_output: &Tensor) -> Tensor {
        let Some(cached_input) = &self.cached_input else {
            panic!("complete forward pass first.");
        };

        cached_input.map2(d_output, |input_val, output_val| {
            if input_val > 0.0 {
                output_val
            } else {
                0.0
            }
        })
    }

    fn name(&self) -> &'static str {
        "relu"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}


// softmax layer, normalises each row

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct Softmax {
    #[serde(skip)]
    cached_output: Option<Tensor>
}

impl Softmax {
    pub fn new() -> Self {
        Self::default()
    }
}

#[typetag::serde]
impl Layer for Softmax {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        let output = self.infer(input);
        self.cached_output = Some(output.clone());
        output
    }

    fn infer(&self, input: &Tensor) -> Tensor {
        let num_classes = input.cols();
        let mut output = input.clone();

        for row in output.write().chunks_mut(num_classes.max(1)) {
            let max_val = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));

            let mut sum = 0.0;
            for x in row.iter_mut() {
                *x = (*x - max_val).exp();
                sum += *x;
            }

            for x in row.iter_mut() {
                *x /= sum;
            }
        }

        output
    }

    // dL/dx_i = y_i * (dL/dy_i - sum_j dL/dy_j * y_j)
    fn backward(&mut self, d_output: &Tensor) -> Tensor {
        let Some(cached_output) = &self.cached_output else {
            panic!("complete forward pass first.");
        };
        assert_eq!(cached_output.shape, d_output.shape, "gradient shape must match softmax output");

        let num_classes = d_output.cols();
        let mut d_input = d_output.clone();

        for (d_row, y_row) in d_input.write().chunks_mut(num_classes.max(1)).zip(cached_output.read().chunks(num_classes.max(1))) {
            let dot: f32 = d_row.iter().zip(y_row).map(|(g, y)| g * y).sum();
            for (g, &y) in d_row.iter_mut().zip(y_row) {
                *g = y * (*g - dot);
            }
        }

        d_input
    }

    fn name(&self) -> &'static str {
        "softmax"
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_vec_approx_eq(a: &[f32], b: &[f32], tolerance: f32) {
        assert_eq!(a.len(), b.len(), "vectors have different lengths");
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() < tolerance, "mismatch at index {}: {} vs {}", i, x, y);
        }
    }

    fn dense(weights: Vec<f32>, biases: Vec<f32>) -> Dense {
        let n = biases.len();
        let m = weights.len() / n;
        Dense::from_parameters(Tensor::from_vec(weights, vec![m, n]), Tensor::from_vec(biases, vec![1, n]))
    }

    #[test]
    fn test_dense_forward() {
        let input = Tensor::row(&[1.0, 2.0]);
        let mut layer = dense(vec![10.0, 20.0, 30.0, 40.0], vec![1.0, 2.0]);

        // matmul: [1, 2] @ [[10, 20], [30, 40]] = [70, 100]
        // + bias: [70, 100] + [1, 2] = [71, 102]
        let output = layer.forward(&input);

        assert_eq!(output.shape, vec![1, 2]);
        assert_vec_approx_eq(output.read(), &[71.0, 102.0], 1e-6);
        assert_eq!(layer.infer(&input), output);
    }

    #[test]
    fn test_dense_backward() {
        let input = Tensor::row(&[1.0, 2.0]);
        let d_output = Tensor::row(&[5.0, 8.0]);
        let mut layer = dense(vec![10.0, 20.0, 30.0, 40.0], vec![0.0, 0.0]);

        layer.forward(&input);

        // d_input = d_output @ weights.T
        // [5, 8] @ [[10, 30], [20, 40]] = [210, 470]
        let d_input = layer.backward(&d_output);
        assert_vec_approx_eq(d_input.read(), &[210.0, 470.0], 1e-6);

        // d_weights = input.T @ d_output = [[5, 8], [10, 16]]
        assert_vec_approx_eq(layer.d_weights.as_ref().unwrap().read(), &[5.0, 8.0, 10.0, 16.0], 1e-6);

        // d_biases = d_output.sum(axis=0)
        assert_vec_approx_eq(layer.d_biases.as_ref().unwrap().read(), &[5.0, 8.0], 1e-6);
    }

    #[test]
    fn test_dense_he_init_shapes() {
        let layer = Dense::new(10, 128, &mut StdRng::seed_from_u64(3));
        assert_eq!(layer.parameter_shapes(), vec![vec![10, 128], vec![1, 128]]);
        assert!(layer.biases.read().iter().all(|&b| b == 0.0));
    }

    #[test]
    #[should_panic(expected = "complete forward pass first.")]
    fn test_backward_before_forward() {
        let mut layer = ReLU::new();
        layer.backward(&Tensor::row(&[1.0]));
    }

    #[test]
    fn test_relu_forward_backward() {
        let input = Tensor::row(&[-10.0, -0.5, 0.0, 0.5, 10.0]);
        let mut layer = ReLU::new();

        let output = layer.forward(&input);
        assert_vec_approx_eq(output.read(), &[0.0, 0.0, 0.0, 0.5, 10.0], 1e-6);

        let d_input = layer.backward(&Tensor::row(&[1.0; 5]));
        assert_vec_approx_eq(d_input.read(), &[0.0, 0.0, 0.0, 1.0, 1.0], 1e-6);
    }

    #[test]
    fn test_softmax_forward() {
        let input = Tensor::row(&[0.0, 1.0, 2.0]);
        let mut layer = Softmax::new();
        let output = layer.forward(&input);

        let sum: f32 = output.read().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);

        // e^0/sum, e^1/sum, e^2/sum
        assert_vec_approx_eq(output.read(), &[0.09003057, 0.24472847, 0.66524094], 1e-6);
    }

    #[test]
    fn test_softmax_backward_matches_finite_difference() {
        let x = [0.3, -1.2, 0.8, 0.1];
        let g = [0.5, -0.25, 1.0, 0.0];
        let mut layer = Softmax::new();

        layer.forward(&Tensor::row(&x));
        let analytic = layer.backward(&Tensor::row(&g));

        // L(x) = g . softmax(x)
        let objective = |x: &[f32]| -> f32 {
            let y = Softmax::new().infer(&Tensor::row(x));
            y.read().iter().zip(g.iter()).map(|(a, b)| a * b).sum()
        };

        let h = 1e-3;
        let numeric: Vec<f32> = (0..x.len())
            .map(|i| {
                let mut plus = x;
                let mut minus = x;
                plus[i] += h;
                minus[i] -= h;
                (objective(&plus) - objective(&minus)) / (2.0 * h)
            })
            .collect();

        assert_vec_approx_eq(analytic.read(), &numeric, 1e-3);
    }
}

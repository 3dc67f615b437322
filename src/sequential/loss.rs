use super::tensor::Tensor;

pub trait Loss {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32;
    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor;
}


// mean squared error, averaged over every element

#[derive(Clone, Copy, Debug, Default)]
pub struct MeanSquaredError;

impl Loss for MeanSquaredError {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32 {
        let n = y_pred.read().len();
        if n == 0 {
            return 0.0;
        }
        let squared_errors = y_pred.map2(y_true, |pred_x, true_x| (pred_x - true_x).powi(2));
        squared_errors.read().iter().sum::<f32>() / n as f32
    }

    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor {
        let n = y_pred.read().len().max(1) as f32;
        y_pred.map2(y_true, move |pred_x, true_x| 2.0 * (pred_x - true_x) / n)
    }
}

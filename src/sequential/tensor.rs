use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

// row-major 2D tensor, owned outright by whoever holds it

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Tensor {
    pub shape: Vec<usize>,
    data: Vec<f32>
}

impl Tensor {
    pub fn zeros(shape: Vec<usize>) -> Self {
        let data = vec![0.0; shape.iter().product()];
        Self {
            shape,
            data
        }
    }

    pub fn random<R: Rng + ?Sized>(shape: Vec<usize>, std: f32, rng: &mut R) -> Self {
        let data = (0..shape.iter().product())
            .map(|_| {
                let z: f32 = StandardNormal.sample(rng);
                z * std
            })
            .collect();
        Self {
            shape,
            data
        }
    }

    pub fn from_vec(data: Vec<f32>, shape: Vec<usize>) -> Self {
        assert_eq!(data.len(), shape.iter().product::<usize>(), "data length must match shape");
        Self {
            shape,
            data
        }
    }

    // single sample as a [1, n] batch
    pub fn row(data: &[f32]) -> Self {
        Self::from_vec(data.to_vec(), vec![1, data.len()])
    }

    pub fn read(&self) -> &[f32] {
        &self.data
    }

    pub fn write(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    pub fn cols(&self) -> usize {
        self.shape[1]
    }

    pub fn transpose(&self) -> Self {
        assert_eq!(self.shape.len(), 2, "transpose only works for 2D tensors");

        let (m, n) = (self.rows(), self.cols());
        let mut data = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                data[j * m + i] = self.data[i * n + j];
            }
        }
        Self::from_vec(data, vec![n, m])
    }

    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.shape.len(), 2, "self must be a 2D tensor.");
        assert_eq!(other.shape.len(), 2, "other must be a 2D tensor.");
        assert_eq!(self.shape[1], other.shape[0], "self columns must equal other rows");

        let k = self.shape[1];
        let n = other.shape[1];

        let mut c = Tensor::zeros(vec![self.shape[0], n]);
        let a_data = &self.data;
        let b_data = &other.data;

        // each output row is accumulated in a fixed order, so results do not depend on scheduling
        c.data.par_chunks_mut(n.max(1)).enumerate().for_each(|(m_idx, c_row)| {
            for k_idx in 0..k {
                let a_val = a_data[m_idx * k + k_idx];
                let b_row = &b_data[k_idx * n..(k_idx + 1) * n];
                for (c_val, &b_val) in c_row.iter_mut().zip(b_row) {
                    *c_val += a_val * b_val;
                }
            }
        });

        c
    }

    // column totals as a [1, cols] row
    pub fn sum_rows(&self) -> Tensor {
        assert_eq!(self.shape.len(), 2, "sum only works for 2D tensors");

        let n = self.cols();
        let mut acc = vec![0.0; n];
        for row in self.data.chunks(n.max(1)) {
            for (a, &x) in acc.iter_mut().zip(row) {
                *a += x;
            }
        }
        Tensor::from_vec(acc, vec![1, n])
    }

    pub fn map<F>(&self, f: F) -> Tensor
    where F: Fn(f32) -> f32 + Sync + Send {
        let new_data = self.data.par_iter().map(|&x| f(x)).collect();
        Tensor::from_vec(new_data, self.shape.clone())
    }

    // map through self allowing access to second tensor
    pub fn map2<F>(&self, other: &Tensor, f: F) -> Tensor
    where F: Fn(f32, f32) -> f32 + Sync + Send {
        assert_eq!(self.shape, other.shape, "tensors must have the same shape");

        let new_data = self.data.par_iter().zip(other.data.par_iter()).map(|(&x1, &x2)| f(x1, x2)).collect();
        Tensor::from_vec(new_data, self.shape.clone())
    }

    pub fn argmax(&self) -> Option<usize> {
        argmax(&self.data)
    }

    pub fn max(&self) -> f32 {
        self.data.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b))
    }
}

pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v))
        }
    }
    best.map(|(i, _)| i)
}

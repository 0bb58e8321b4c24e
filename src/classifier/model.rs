use candle_core::{DType, Device, Module, Result, Tensor, D};
use candle_nn::{linear, Linear, VarBuilder};
use std::path::Path;

const HIDDEN_1: usize = 256;
const HIDDEN_2: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSummary {
    pub name: &'static str,
    pub output_dim: usize,
    pub params: usize,
}

/// Two ReLU hidden layers followed by a linear output layer.
///
/// `forward` returns logits. Use [`GenreClassifier::predict_proba`] for the
/// softmax probabilities.
pub struct GenreClassifier {
    dense_1: Linear,
    dense_2: Linear,
    output: Linear,
    input_dim: usize,
    num_classes: usize,
}

impl GenreClassifier {
    pub fn new(input_dim: usize, num_classes: usize, vb: VarBuilder) -> Result<Self> {
        let dense_1 = linear(input_dim, HIDDEN_1, vb.pp("dense_1"))?;
        let dense_2 = linear(HIDDEN_1, HIDDEN_2, vb.pp("dense_2"))?;
        let output = linear(HIDDEN_2, num_classes, vb.pp("output"))?;
        Ok(Self {
            dense_1,
            dense_2,
            output,
            input_dim,
            num_classes,
        })
    }

    /// Loads weights written by a trained model. The input width is read
    /// from the first layer, the class count must match the label file.
    pub fn load(weights_path: &Path, num_classes: usize, device: &Device) -> Result<Self> {
        let tensors = candle_core::safetensors::load(weights_path, device)?;
        let input_dim = match tensors.get("dense_1.weight") {
            Some(weight) => weight.dim(1)?,
            None => {
                return Err(candle_core::Error::Msg(format!(
                    "missing tensor dense_1.weight in {:?}",
                    weights_path
                )))
            }
        };
        let vb = VarBuilder::from_tensors(tensors, DType::F32, device);
        Self::new(input_dim, num_classes, vb)
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn predict_proba(&self, xs: &Tensor) -> Result<Tensor> {
        candle_nn::ops::softmax(&self.forward(xs)?, D::Minus1)
    }

    /// Layer shapes for a network of the given size, without building it.
    pub fn layer_summary(input_dim: usize, num_classes: usize) -> Vec<LayerSummary> {
        let dense = |name: &'static str, input: usize, output: usize| LayerSummary {
            name,
            output_dim: output,
            params: input * output + output,
        };
        vec![
            dense("dense_1", input_dim, HIDDEN_1),
            dense("dense_2", HIDDEN_1, HIDDEN_2),
            dense("output", HIDDEN_2, num_classes),
        ]
    }

    pub fn summary(&self) -> Vec<LayerSummary> {
        Self::layer_summary(self.input_dim, self.num_classes)
    }

    pub fn parameter_count(&self) -> usize {
        self.summary().iter().map(|l| l.params).sum()
    }
}

impl Module for GenreClassifier {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = self.dense_1.forward(xs)?.relu()?;
        let xs = self.dense_2.forward(&xs)?.relu()?;
        self.output.forward(&xs)
    }
}

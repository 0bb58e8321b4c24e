use super::{
    dataset::{load_waveform, LabeledFile, TARGET_SAMPLE_RATE},
    embedding::{mean_over_time, EmbeddingExtractor},
    labels::{one_hot, LabelEncoder},
    model::GenreClassifier,
    split::train_test_split,
    TrainingError,
};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use indicatif::ProgressBar;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::path::Path;
use tracing::{debug, info};

pub const WEIGHTS_FILE_NAME: &str = "genre_yamnet_nn.safetensors";
pub const LABELS_FILE_NAME: &str = "genre_labels.json";

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 30,
            batch_size: 16,
            learning_rate: 1e-3,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// One averaged embedding per audio file, with its genre label.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingDataset {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<String>,
}

impl EmbeddingDataset {
    pub fn push(&mut self, features: Vec<f32>, label: String) {
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Width shared by every feature vector.
    pub fn feature_dim(&self) -> Result<usize, TrainingError> {
        let dim = match self.features.first() {
            Some(first) => first.len(),
            None => return Err(TrainingError::InvalidDataset("dataset is empty".to_string())),
        };
        if let Some(bad) = self.features.iter().find(|f| f.len() != dim) {
            return Err(TrainingError::InvalidDataset(format!(
                "feature width {} differs from {}",
                bad.len(),
                dim
            )));
        }
        Ok(dim)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub train_loss: f32,
    pub test_loss: f32,
    pub test_accuracy: f32,
}

pub struct TrainedClassifier {
    pub model: GenreClassifier,
    pub labels: LabelEncoder,
    pub reports: Vec<EpochReport>,
    varmap: VarMap,
}

impl TrainedClassifier {
    /// Writes the weights and the label list into `model_dir`.
    pub fn save(&self, model_dir: &Path) -> Result<(), TrainingError> {
        std::fs::create_dir_all(model_dir)?;
        self.varmap.save(model_dir.join(WEIGHTS_FILE_NAME))?;
        self.labels.save(&model_dir.join(LABELS_FILE_NAME))?;
        Ok(())
    }

    /// Loads a classifier previously written by [`TrainedClassifier::save`].
    pub fn load(model_dir: &Path) -> Result<(GenreClassifier, LabelEncoder), TrainingError> {
        let labels = LabelEncoder::load(&model_dir.join(LABELS_FILE_NAME))?;
        let model =
            GenreClassifier::load(&model_dir.join(WEIGHTS_FILE_NAME), labels.len(), &Device::Cpu)?;
        Ok((model, labels))
    }
}

/// Decodes every file and turns it into one averaged embedding.
///
/// Any failure aborts the whole run.
pub async fn extract_dataset(
    files: &[LabeledFile],
    extractor: &dyn EmbeddingExtractor,
    progress: &ProgressBar,
) -> Result<EmbeddingDataset, TrainingError> {
    let mut dataset = EmbeddingDataset::default();
    for file in files {
        progress.set_message(file.label.clone());
        let waveform = load_waveform(&file.path).await?;
        let frames = extractor
            .extract(&waveform, TARGET_SAMPLE_RATE)
            .await
            .map_err(|e| TrainingError::Embedding {
                path: file.path.clone(),
                message: format!("{:#}", e),
            })?;
        dataset.push(mean_over_time(&frames)?, file.label.clone());
        progress.inc(1);
    }
    progress.finish_and_clear();
    Ok(dataset)
}

fn batch_tensors(
    dataset: &EmbeddingDataset,
    targets: &[usize],
    indices: &[usize],
    num_classes: usize,
    device: &Device,
) -> Result<(Tensor, Tensor), TrainingError> {
    let dim = dataset.features[indices[0]].len();
    let mut xs = Vec::with_capacity(indices.len() * dim);
    let mut ys = Vec::with_capacity(indices.len() * num_classes);
    for &i in indices {
        xs.extend_from_slice(&dataset.features[i]);
        ys.extend(one_hot(targets[i], num_classes));
    }
    let xs = Tensor::from_vec(xs, (indices.len(), dim), device)?;
    let ys = Tensor::from_vec(ys, (indices.len(), num_classes), device)?;
    Ok((xs, ys))
}

fn categorical_cross_entropy(logits: &Tensor, targets: &Tensor) -> candle_core::Result<Tensor> {
    let log_probs = candle_nn::ops::log_softmax(logits, D::Minus1)?;
    targets.mul(&log_probs)?.sum(D::Minus1)?.neg()?.mean_all()
}

fn evaluate(
    model: &GenreClassifier,
    xs: &Tensor,
    ys: &Tensor,
) -> Result<(f32, f32), TrainingError> {
    let logits = model.forward(xs)?;
    let loss = categorical_cross_entropy(&logits, ys)?.to_scalar::<f32>()?;
    let predicted = logits.argmax(D::Minus1)?.to_vec1::<u32>()?;
    let expected = ys.argmax(D::Minus1)?.to_vec1::<u32>()?;
    let correct = predicted
        .iter()
        .zip(&expected)
        .filter(|(p, e)| p == e)
        .count();
    Ok((loss, correct as f32 / expected.len() as f32))
}

/// Trains a fresh classifier on `dataset`, evaluating on a held-out split
/// after every epoch.
pub fn train(
    dataset: &EmbeddingDataset,
    config: &TrainingConfig,
) -> Result<TrainedClassifier, TrainingError> {
    if config.batch_size == 0 || config.epochs == 0 {
        return Err(TrainingError::InvalidDataset(
            "epochs and batch size must be positive".to_string(),
        ));
    }

    let input_dim = dataset.feature_dim()?;
    let labels = LabelEncoder::fit(&dataset.labels);
    if labels.len() < 2 {
        return Err(TrainingError::InvalidDataset(format!(
            "need at least two genres, got {}",
            labels.len()
        )));
    }
    let num_classes = labels.len();
    let targets: Vec<usize> = dataset
        .labels
        .iter()
        .map(|l| labels.encode(l).unwrap_or_default())
        .collect();

    let indices: Vec<usize> = (0..dataset.len()).collect();
    let (mut train_indices, test_indices) =
        train_test_split(indices, config.test_fraction, config.seed)?;
    info!(
        "Training on {} samples, evaluating on {}",
        train_indices.len(),
        test_indices.len()
    );

    let device = Device::Cpu;
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = GenreClassifier::new(input_dim, num_classes, vb)?;
    let mut optimizer = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        },
    )?;

    let (test_xs, test_ys) =
        batch_tensors(dataset, &targets, &test_indices, num_classes, &device)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut reports = Vec::with_capacity(config.epochs);
    for epoch in 1..=config.epochs {
        train_indices.shuffle(&mut rng);

        let mut loss_sum = 0.0_f32;
        for batch in train_indices.chunks(config.batch_size) {
            let (xs, ys) = batch_tensors(dataset, &targets, batch, num_classes, &device)?;
            let loss = categorical_cross_entropy(&model.forward(&xs)?, &ys)?;
            optimizer.backward_step(&loss)?;
            loss_sum += loss.to_scalar::<f32>()? * batch.len() as f32;
        }
        let train_loss = loss_sum / train_indices.len() as f32;

        let (test_loss, test_accuracy) = evaluate(&model, &test_xs, &test_ys)?;
        info!(
            "Epoch {}/{} - loss: {:.4} - val_loss: {:.4} - val_accuracy: {:.4}",
            epoch, config.epochs, train_loss, test_loss, test_accuracy
        );
        reports.push(EpochReport {
            epoch,
            train_loss,
            test_loss,
            test_accuracy,
        });
    }
    debug!("Training finished after {} epochs", config.epochs);

    Ok(TrainedClassifier {
        model,
        labels,
        reports,
        varmap,
    })
}

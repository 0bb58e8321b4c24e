use super::TrainingError;
use std::path::Path;

/// Maps genre names to contiguous indices in sorted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(|s| s.as_str())
    }

    pub fn save(&self, path: &Path) -> Result<(), TrainingError> {
        let json = serde_json::to_string_pretty(&self.classes)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, TrainingError> {
        let content = std::fs::read_to_string(path)?;
        let classes: Vec<String> = serde_json::from_str(&content)?;
        Ok(Self::fit(&classes))
    }
}

pub fn one_hot(index: usize, num_classes: usize) -> Vec<f32> {
    let mut row = vec![0.0; num_classes];
    if let Some(slot) = row.get_mut(index) {
        *slot = 1.0;
    }
    row
}

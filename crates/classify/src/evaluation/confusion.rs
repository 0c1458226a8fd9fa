//! Confusion matrix over the union of expected and predicted labels.

use media_butler_core::error::MediaButlerError;
use media_butler_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Square confusion matrix; rows are actual classes, columns predicted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Sorted union of expected and predicted labels
    pub labels: Vec<String>,
    /// matrix[actual][predicted]
    pub matrix: Vec<Vec<usize>>,
    pub total: usize,
}

impl ConfusionMatrix {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self> {
        if pairs.is_empty() {
            return Err(MediaButlerError::EmptyDataset);
        }

        let labels: Vec<String> = pairs
            .iter()
            .flat_map(|(expected, predicted)| [expected.clone(), predicted.clone()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let index = |label: &str| labels.iter().position(|l| l == label);
        let n = labels.len();
        let mut matrix = vec![vec![0usize; n]; n];
        for (expected, predicted) in pairs {
            if let (Some(row), Some(col)) = (index(expected), index(predicted)) {
                matrix[row][col] += 1;
            }
        }

        Ok(Self {
            labels,
            matrix,
            total: pairs.len(),
        })
    }

    fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn true_positives(&self, label: &str) -> usize {
        self.label_index(label)
            .map(|i| self.matrix[i][i])
            .unwrap_or(0)
    }

    pub fn false_positives(&self, label: &str) -> usize {
        let Some(col) = self.label_index(label) else {
            return 0;
        };
        (0..self.labels.len())
            .filter(|row| *row != col)
            .map(|row| self.matrix[row][col])
            .sum()
    }

    pub fn false_negatives(&self, label: &str) -> usize {
        let Some(row) = self.label_index(label) else {
            return 0;
        };
        (0..self.labels.len())
            .filter(|col| *col != row)
            .map(|col| self.matrix[row][col])
            .sum()
    }

    pub fn true_negatives(&self, label: &str) -> usize {
        self.total
            - self.true_positives(label)
            - self.false_positives(label)
            - self.false_negatives(label)
    }

    /// Row sums: per-class actual support
    pub fn row_sums(&self) -> Vec<usize> {
        self.matrix.iter().map(|row| row.iter().sum()).collect()
    }

    /// Column sums: per-class prediction counts
    pub fn column_sums(&self) -> Vec<usize> {
        (0..self.labels.len())
            .map(|col| self.matrix.iter().map(|row| row[col]).sum())
            .collect()
    }

    /// Human-readable table with padded rows and columns
    pub fn format_table(&self) -> String {
        let label_width = self
            .labels
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max("actual \\ predicted".len());
        let cell_width = self
            .matrix
            .iter()
            .flatten()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1)
            .max(3)
            .max(self.labels.iter().map(|l| l.chars().count()).max().unwrap_or(1));

        let mut out = String::new();
        out.push_str(&format!("{:label_width$}", "actual \\ predicted"));
        for label in &self.labels {
            out.push_str(&format!(" | {label:>cell_width$}"));
        }
        out.push('\n');

        for (row_idx, label) in self.labels.iter().enumerate() {
            out.push_str(&format!("{label:label_width$}"));
            for value in &self.matrix[row_idx] {
                out.push_str(&format!(" | {value:>cell_width$}"));
            }
            out.push('\n');
        }
        out
    }
}

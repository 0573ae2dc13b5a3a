//! Acurácia por token.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Contagem de acertos por token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accuracy {
    pub correct: usize,
    pub total: usize,
}

impl Accuracy {
    /// Compara duas sequências posição a posição.
    pub fn compare<T: PartialEq>(gold: &[T], predicted: &[T]) -> Self {
        let correct = gold
            .iter()
            .zip(predicted)
            .filter(|(g, p)| g == p)
            .count();
        Self {
            correct,
            total: gold.len(),
        }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            correct: self.correct + other.correct,
            total: self.total + other.total,
        }
    }

    /// Fração de acertos; `0.0` quando não há tokens.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}% ({}/{})", self.ratio() * 100.0, self.correct, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_and_merge() {
        let a = Accuracy::compare(&["AT", "NN"], &["AT", "VB"]);
        let b = Accuracy::compare(&["."], &["."]);
        let total = a.merge(b);
        assert_eq!(total, Accuracy { correct: 2, total: 3 });
        assert_eq!(total.to_string(), "66.67% (2/3)");
    }

    #[test]
    fn test_empty_ratio() {
        assert_eq!(Accuracy::default().ratio(), 0.0);
    }
}

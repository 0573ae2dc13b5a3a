//! # Configuração de Treino
//!
//! Parâmetros serializáveis (JSON) que controlam o laço de treino do
//! perceptron e os limiares do atalho de palavras não ambíguas.

use serde::{Deserialize, Serialize};

/// Parâmetros do treino online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Número de passadas completas pelo corpus.
    pub passes: usize,
    /// Semente do embaralhamento entre passadas. `None` mantém a ordem do corpus.
    pub shuffle_seed: Option<u64>,
    /// Se ligado, um corpus vazio vira `SeqTagError::EmptyCorpus` em vez de um aviso.
    pub reject_empty: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            passes: 5,
            shuffle_seed: None,
            reject_empty: false,
        }
    }
}

impl TrainConfig {
    pub fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn rejecting_empty(mut self) -> Self {
        self.reject_empty = true;
        self
    }
}

/// Limiares do estágio de palavras não ambíguas.
///
/// Uma palavra entra no dicionário quando aparece ao menos `min_frequency`
/// vezes e sua tag mais frequente cobre ao menos `min_ratio` das ocorrências.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnambiguousConfig {
    pub min_frequency: usize,
    pub min_ratio: f64,
}

impl Default for UnambiguousConfig {
    fn default() -> Self {
        Self {
            min_frequency: 20,
            min_ratio: 0.97,
        }
    }
}

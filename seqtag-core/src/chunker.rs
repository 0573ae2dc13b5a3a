//! # Chunker (Análise Sintática Rasa)
//!
//! Agrupa uma sentença já etiquetada com POS em *chunks* não recursivos
//! (`[NP The dog] [VP jumped] .`). Cada token recebe um rótulo de fronteira
//! previsto por um Averaged Perceptron, e uma máquina de estados reconstrói
//! os chunks a partir desses rótulos.
//!
//! ## Rótulos de fronteira
//!
//! | Rótulo   | Texto   | Efeito                                                   |
//! |----------|---------|----------------------------------------------------------|
//! | Begin    | `B-NP`  | fecha o chunk aberto (se houver) e abre um novo          |
//! | Continue | `I-NP`  | estende o chunk aberto do mesmo tipo; senão vira `Begin` |
//! | Chink    | `O`     | fecha o chunk aberto e emite o token isolado             |
//!
//! ## Máquina de estados
//!
//! ```text
//!            B-X                 I-X (mesmo tipo)
//! Outside ─────────► Inside(X) ◄──────────┐
//!    ▲                  │  │              │
//!    │       O          │  └──────────────┘
//!    └──────────────────┘
//! ```
//!
//! Dois `B-NP` seguidos produzem **dois** chunks: chunks adjacentes nunca são
//! fundidos. O fim da sentença fecha qualquer chunk aberto, e todo token da
//! entrada aparece exatamente uma vez na saída, na ordem original.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::TrainConfig;
use crate::error::{Result, SeqTagError};
use crate::evaluate::Accuracy;
use crate::features::{chunk_features, FeatureVector, BOS};
use crate::payload;
use crate::perceptron::{AveragedPerceptron, Example, PerceptronPayload};
use crate::sentence::{Chunk, ChunkPiece, ChunkedSentence, TaggedSentence, TaggedToken};
use crate::vocabulary::{LabelId, Vocabulary, OUTSIDE_LABEL};

/// Rótulo de fronteira de um token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoundaryLabel {
    /// Primeiro token de um chunk do tipo dado.
    Begin(String),
    /// Continuação de um chunk do tipo dado.
    Continue(String),
    /// Fora de qualquer chunk.
    Chink,
}

impl BoundaryLabel {
    /// Forma textual (`B-NP`, `I-NP`, `O`).
    pub fn label(&self) -> String {
        match self {
            BoundaryLabel::Begin(kind) => format!("B-{kind}"),
            BoundaryLabel::Continue(kind) => format!("I-{kind}"),
            BoundaryLabel::Chink => OUTSIDE_LABEL.to_string(),
        }
    }

    /// Parseia a forma textual (ex: `"B-NP"` -> `Begin("NP")`).
    pub fn from_label(s: &str) -> Option<Self> {
        if s == OUTSIDE_LABEL {
            return Some(BoundaryLabel::Chink);
        }
        let (prefix, kind) = s.split_once('-')?;
        if kind.is_empty() {
            return None;
        }
        match prefix {
            "B" => Some(BoundaryLabel::Begin(kind.to_string())),
            "I" => Some(BoundaryLabel::Continue(kind.to_string())),
            _ => None,
        }
    }

    /// Tipo do chunk (`None` para `Chink`).
    pub fn kind(&self) -> Option<&str> {
        match self {
            BoundaryLabel::Begin(kind) | BoundaryLabel::Continue(kind) => Some(kind),
            BoundaryLabel::Chink => None,
        }
    }
}

impl fmt::Display for BoundaryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Estado da máquina de montagem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkState {
    Outside,
    Inside(String),
}

/// Monta um [`ChunkedSentence`] token a token a partir dos rótulos de fronteira.
#[derive(Debug, Default)]
pub struct Assembler {
    pieces: Vec<ChunkPiece>,
    open: Option<Chunk>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChunkState {
        match &self.open {
            Some(chunk) => ChunkState::Inside(chunk.kind.clone()),
            None => ChunkState::Outside,
        }
    }

    fn close(&mut self) {
        if let Some(chunk) = self.open.take() {
            self.pieces.push(ChunkPiece::Chunk(chunk));
        }
    }

    /// Consome um token com seu rótulo. `Continue` ilegal é tratado como `Begin`.
    pub fn push(&mut self, token: TaggedToken, label: &BoundaryLabel) {
        match label {
            BoundaryLabel::Continue(kind) => match self.open.as_mut() {
                Some(chunk) if chunk.kind == *kind => chunk.tokens.push(token),
                _ => {
                    self.close();
                    self.open = Some(Chunk::new(kind.clone(), vec![token]));
                }
            },
            BoundaryLabel::Begin(kind) => {
                self.close();
                self.open = Some(Chunk::new(kind.clone(), vec![token]));
            }
            BoundaryLabel::Chink => {
                self.close();
                self.pieces.push(ChunkPiece::Chink(token));
            }
        }
    }

    /// Fecha o chunk aberto (fim de sentença) e devolve o resultado.
    pub fn finish(mut self) -> ChunkedSentence {
        self.close();
        ChunkedSentence::new(self.pieces)
    }
}

/// Aplica rótulos explícitos a uma sentença etiquetada.
///
/// # Errors
/// `LengthMismatch` se houver um número de rótulos diferente do de tokens.
pub fn assemble(tokens: &[TaggedToken], labels: &[BoundaryLabel]) -> Result<ChunkedSentence> {
    if tokens.len() != labels.len() {
        return Err(SeqTagError::LengthMismatch {
            expected: tokens.len(),
            found: labels.len(),
        });
    }
    let mut assembler = Assembler::new();
    for (token, label) in tokens.iter().zip(labels) {
        assembler.push(token.clone(), label);
    }
    Ok(assembler.finish())
}

/// Rótulos de fronteira de uma sentença anotada: primeiro token do chunk ->
/// `Begin`, demais -> `Continue`, chink -> `Chink`.
pub fn boundary_labels(sentence: &ChunkedSentence) -> Vec<BoundaryLabel> {
    let mut labels = Vec::with_capacity(sentence.token_count());
    for piece in sentence.iter() {
        match piece {
            ChunkPiece::Chunk(chunk) => {
                for i in 0..chunk.tokens.len() {
                    labels.push(if i == 0 {
                        BoundaryLabel::Begin(chunk.kind.clone())
                    } else {
                        BoundaryLabel::Continue(chunk.kind.clone())
                    });
                }
            }
            ChunkPiece::Chink(_) => labels.push(BoundaryLabel::Chink),
        }
    }
    labels
}

struct ChunkExample {
    tokens: TaggedSentence,
    gold: Vec<LabelId>,
}

impl Example for ChunkExample {
    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn gold(&self, i: usize) -> LabelId {
        self.gold[i]
    }

    fn features(&self, i: usize, history: &[LabelId], vocabulary: &Vocabulary) -> FeatureVector {
        features_at(&self.tokens, i, history, vocabulary)
    }
}

fn features_at(tokens: &[TaggedToken], i: usize, history: &[LabelId], vocabulary: &Vocabulary) -> FeatureVector {
    let prev = if i == 0 { BOS } else { vocabulary.label(history[i - 1]) };
    chunk_features(tokens, i, prev)
}

/// Chunker baseado em Averaged Perceptron.
#[derive(Debug, Clone)]
pub struct Chunker {
    model: AveragedPerceptron,
    /// Rótulo de fronteira de cada [`LabelId`] do vocabulário.
    boundaries: Vec<BoundaryLabel>,
}

impl Chunker {
    /// Chunker vazio sobre um vocabulário de rótulos de fronteira.
    ///
    /// # Errors
    /// `UnknownLabel` se algum rótulo do vocabulário não for `B-X`, `I-X` ou `O`.
    pub fn new(vocabulary: impl Into<Arc<Vocabulary>>) -> Result<Self> {
        Self::from_model(AveragedPerceptron::new(vocabulary.into()))
    }

    fn from_model(model: AveragedPerceptron) -> Result<Self> {
        let vocabulary = model.vocabulary();
        let boundaries = vocabulary
            .labels()
            .iter()
            .map(|label| {
                BoundaryLabel::from_label(label).ok_or_else(|| SeqTagError::UnknownLabel {
                    tagset: vocabulary.name().to_string(),
                    label: label.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { model, boundaries })
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        self.model.vocabulary()
    }

    pub fn model(&self) -> &AveragedPerceptron {
        &self.model
    }

    /// Rótulos previstos (ainda não normalizados), da esquerda para a direita.
    pub fn boundary_labels(&self, sentence: &TaggedSentence) -> Vec<BoundaryLabel> {
        let vocabulary = self.model.vocabulary();
        let mut history = Vec::with_capacity(sentence.len());
        for i in 0..sentence.len() {
            let fv = features_at(sentence, i, &history, vocabulary);
            history.push(self.model.predict(&fv));
        }
        history
            .into_iter()
            .map(|id| self.boundaries[id.index()].clone())
            .collect()
    }

    /// Agrupa uma sentença etiquetada em chunks.
    pub fn chunk(&self, sentence: &TaggedSentence) -> ChunkedSentence {
        let labels = self.boundary_labels(sentence);
        let mut assembler = Assembler::new();
        for (token, label) in sentence.iter().zip(&labels) {
            assembler.push(token.clone(), label);
        }
        assembler.finish()
    }

    pub fn chunk_batch(&self, sentences: &[TaggedSentence]) -> Vec<ChunkedSentence> {
        sentences.par_iter().map(|s| self.chunk(s)).collect()
    }

    pub fn train(&self, sentences: &[ChunkedSentence]) -> Result<Chunker> {
        self.train_with(sentences, &TrainConfig::default())
    }

    /// Deriva os rótulos de fronteira de `sentences` e treina o perceptron.
    ///
    /// Devolve um novo chunker; `self` não é alterado.
    pub fn train_with(&self, sentences: &[ChunkedSentence], config: &TrainConfig) -> Result<Chunker> {
        if sentences.is_empty() {
            if config.reject_empty {
                return Err(SeqTagError::EmptyCorpus);
            }
            warn!("empty chunk corpus, chunker left unchanged");
            return Ok(self.clone());
        }

        let vocabulary = self.model.vocabulary();
        let examples = sentences
            .iter()
            .map(|sentence| {
                let gold = boundary_labels(sentence)
                    .iter()
                    .map(|b| vocabulary.id(&b.label()))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ChunkExample {
                    tokens: sentence.to_tagged(),
                    gold,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(sentences = examples.len(), "training chunker");
        let mut model = self.model.clone();
        model.train(&examples, config)?;
        model.finalize();

        Ok(Chunker {
            model,
            boundaries: self.boundaries.clone(),
        })
    }

    /// Acurácia dos rótulos de fronteira (após normalização) contra um corpus anotado.
    pub fn evaluate(&self, gold: &[ChunkedSentence]) -> Accuracy {
        gold.par_iter()
            .map(|sentence| {
                let predicted = self.chunk(&sentence.to_tagged());
                Accuracy::compare(&boundary_labels(sentence), &boundary_labels(&predicted))
            })
            .reduce(Accuracy::default, Accuracy::merge)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = self.model.to_payload();
        debug!(weights = payload.weights.len(), "serializing chunker");
        payload::encode("chunker", &payload)
    }

    pub fn deserialize(vocabulary: impl Into<Arc<Vocabulary>>, bytes: &[u8]) -> Result<Chunker> {
        let payload: PerceptronPayload = payload::decode("chunker", bytes)?;
        debug!(weights = payload.weights.len(), "deserializing chunker");
        let model = AveragedPerceptron::from_payload(vocabulary.into(), &payload)?;
        Self::from_model(model)
    }
}

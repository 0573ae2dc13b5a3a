//! # seqtag-core — Etiquetagem Morfossintática (POS) e Chunking
//!
//! Este crate implementa um toolkit de rotulação de sequências para inglês:
//! um tagger POS composável e um chunker de sintagmas, ambos apoiados num
//! Averaged Perceptron com média preguiçosa (*lazy averaging*).
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Entrada**: Sentença já tokenizada (`&[&str]`).
//! 2.  **Features** ([`features`]): cada posição vira um conjunto de features binárias.
//! 3.  **Tagging** ([`tagger`]): cadeia de estágios com fallback
//!     (`Lexicon`, `Unambiguous`, `Perceptron`, `Constant`).
//! 4.  **Chunking** ([`chunker`]): rótulos de fronteira `B-X`/`I-X`/`O` + máquina de estados.
//! 5.  **Saída**: [`TaggedSentence`] e [`ChunkedSentence`].
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use seqtag_core::{Pipeline, TrainConfig};
//!
//! // 1. Treina tagger e chunker sobre o corpus embutido
//! let pipeline = Pipeline::demo(&TrainConfig::default()).unwrap();
//!
//! // 2. Analisa uma sentença tokenizada
//! let analysis = pipeline.analyze(&["The", "dog", "jumped", "."]);
//!
//! // 3. Exibe o resultado
//! println!("{}", analysis.tagged);  // The/AT dog/NN jumped/VBD ./.
//! println!("{}", analysis.chunked); // [NP The/AT dog/NN] [VP jumped/VBD] ./.
//! ```
//!
//! ## Módulos Principais
//!
//! - [`vocabulary`]: tagsets (Brown, Penn, CoNLL chunk) e ids de rótulo.
//! - [`perceptron`]: o classificador, com treino, média e serialização.
//! - [`tagger`]: a cadeia de estágios.
//! - [`chunker`]: fronteiras de chunk e montagem dos chunks.
//! - [`pipeline`]: tagger + chunker.
//! - [`corpus`]: dados de treino e teste anotados.

pub mod chunker;
pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod payload;
pub mod perceptron;
pub mod pipeline;
pub mod sentence;
pub mod tagger;
pub mod vocabulary;

pub use chunker::{assemble, boundary_labels, BoundaryLabel, Chunker};
pub use config::{TrainConfig, UnambiguousConfig};
pub use error::{Result, SeqTagError};
pub use evaluate::Accuracy;
pub use perceptron::{AveragedPerceptron, TrainStats};
pub use pipeline::{Analysis, Pipeline};
pub use sentence::{Chunk, ChunkPiece, ChunkedSentence, TaggedSentence, TaggedToken, Token};
pub use tagger::{ChainBuilder, Stage, StageId, Tagger};
pub use vocabulary::{LabelId, Vocabulary};

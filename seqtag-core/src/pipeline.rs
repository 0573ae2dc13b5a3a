//! # Pipeline POS + Chunking
//!
//! Encadeia o [`Tagger`] e o [`Chunker`]: tokens -> sentença etiquetada ->
//! sentença com chunks.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunker::Chunker;
use crate::config::{TrainConfig, UnambiguousConfig};
use crate::corpus::{chunked_corpus, tagged_corpus};
use crate::error::Result;
use crate::sentence::{ChunkedSentence, TaggedSentence};
use crate::tagger::Tagger;
use crate::vocabulary::Vocabulary;

/// Resultado da análise de uma sentença.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub tagged: TaggedSentence,
    pub chunked: ChunkedSentence,
}

/// O pipeline principal.
///
/// Imutável após a construção: `analyze` pode ser chamado de várias threads.
#[derive(Debug, Clone)]
pub struct Pipeline {
    tagger: Tagger,
    chunker: Chunker,
}

impl Pipeline {
    pub fn new(tagger: Tagger, chunker: Chunker) -> Self {
        Self { tagger, chunker }
    }

    /// Pipeline treinado sobre o corpus embutido (tags Brown, chunks CoNLL).
    pub fn demo(config: &TrainConfig) -> Result<Self> {
        info!("training demo pipeline on the built-in corpus");
        let tagger = Tagger::standard(Vocabulary::brown(), UnambiguousConfig::default())
            .train_with(&tagged_corpus(), config)?;
        let chunker = Chunker::new(Vocabulary::conll_chunk())?.train_with(&chunked_corpus()?, config)?;
        Ok(Self { tagger, chunker })
    }

    pub fn tagger(&self) -> &Tagger {
        &self.tagger
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Etiqueta e agrupa uma sentença tokenizada.
    pub fn analyze<S: AsRef<str>>(&self, tokens: &[S]) -> Analysis {
        let tagged = self.tagger.tag(tokens);
        let chunked = self.chunker.chunk(&tagged);
        Analysis { tagged, chunked }
    }

    /// Analisa várias sentenças em paralelo.
    pub fn analyze_batch<S: AsRef<str> + Sync>(&self, sentences: &[Vec<S>]) -> Vec<Analysis> {
        sentences.par_iter().map(|tokens| self.analyze(tokens)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::demo_sentences;

    #[test]
    fn test_demo_pipeline() {
        let pipeline = Pipeline::demo(&TrainConfig::default()).unwrap();
        let analysis = pipeline.analyze(&["The", "dog", "jumped", "."]);
        assert_eq!(analysis.tagged.tags(), vec!["AT", "NN", "VBD", "."]);
        assert_eq!(analysis.chunked.to_string(), "[NP The/AT dog/NN] [VP jumped/VBD] ./.");
    }

    #[test]
    fn test_batch_matches_sequential() {
        let pipeline = Pipeline::demo(&TrainConfig::default()).unwrap();
        let sentences = demo_sentences();
        let batch = pipeline.analyze_batch(&sentences);
        assert_eq!(batch.len(), sentences.len());
        for (tokens, analysis) in sentences.iter().zip(&batch) {
            assert_eq!(&pipeline.analyze(tokens), analysis);
            assert_eq!(analysis.chunked.token_count(), tokens.len());
        }
    }
}

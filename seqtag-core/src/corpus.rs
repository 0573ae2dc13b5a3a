//! # Corpus de Demonstração em Inglês
//!
//! Pequeno corpus anotado à mão com tags POS do Brown e rótulos de chunk no
//! formato do CoNLL-2000 (`B-X`, `I-X`, `O`). Serve aos testes, à documentação
//! e ao servidor web quando nenhum modelo treinado é informado.
//!
//! ## Domínios Cobertos
//! - Animais
//! - Cotidiano
//! - Viagens e estudo

use crate::chunker::{Assembler, BoundaryLabel};
use crate::error::{Result, SeqTagError};
use crate::sentence::{ChunkedSentence, TaggedSentence, TaggedToken};

/// Uma sentença com POS e fronteira de chunk por token.
pub struct AnnotatedSentence {
    /// O texto completo da sentença.
    pub text: &'static str,
    /// Domínio temático.
    pub domain: &'static str,
    /// Triplas (palavra, tag POS, rótulo de chunk).
    /// Exemplo: `[("The", "AT", "B-NP"), ("dog", "NN", "I-NP")]`
    pub annotations: &'static [(&'static str, &'static str, &'static str)],
}

impl AnnotatedSentence {
    pub fn tagged(&self) -> TaggedSentence {
        self.annotations
            .iter()
            .map(|(word, pos, _)| TaggedToken::new(*word, *pos))
            .collect()
    }

    /// Monta os chunks a partir dos rótulos anotados.
    ///
    /// # Errors
    /// `UnknownLabel` se algum rótulo não for `B-X`, `I-X` ou `O`.
    pub fn chunked(&self) -> Result<ChunkedSentence> {
        let mut assembler = Assembler::new();
        for (word, pos, chunk) in self.annotations {
            let label = BoundaryLabel::from_label(chunk).ok_or_else(|| SeqTagError::UnknownLabel {
                tagset: "conll-chunk".to_string(),
                label: chunk.to_string(),
            })?;
            assembler.push(TaggedToken::new(*word, *pos), &label);
        }
        Ok(assembler.finish())
    }

    pub fn words(&self) -> Vec<&'static str> {
        self.annotations.iter().map(|(word, _, _)| *word).collect()
    }
}

/// Retorna o corpus completo.
pub fn get_corpus() -> Vec<AnnotatedSentence> {
    vec![
        // ===== ANIMAIS =====
        AnnotatedSentence {
            text: "The dog jumped.",
            domain: "animais",
            annotations: &[
                ("The", "AT", "B-NP"), ("dog", "NN", "I-NP"), ("jumped", "VBD", "B-VP"), (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "The cat slept on the mat.",
            domain: "animais",
            annotations: &[
                ("The", "AT", "B-NP"), ("cat", "NN", "I-NP"), ("slept", "VBD", "B-VP"),
                ("on", "IN", "B-PP"), ("the", "AT", "B-NP"), ("mat", "NN", "I-NP"), (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "The dog chased the cat.",
            domain: "animais",
            annotations: &[
                ("The", "AT", "B-NP"), ("dog", "NN", "I-NP"), ("chased", "VBD", "B-VP"),
                ("the", "AT", "B-NP"), ("cat", "NN", "I-NP"), (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "A bird sang in the tree.",
            domain: "animais",
            annotations: &[
                ("A", "AT", "B-NP"), ("bird", "NN", "I-NP"), ("sang", "VBD", "B-VP"),
                ("in", "IN", "B-PP"), ("the", "AT", "B-NP"), ("tree", "NN", "I-NP"), (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "The dog is happy.",
            domain: "animais",
            annotations: &[
                ("The", "AT", "B-NP"), ("dog", "NN", "I-NP"), ("is", "BEZ", "B-VP"),
                ("happy", "JJ", "B-ADJP"), (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "The old man and his dog walked slowly.",
            domain: "animais",
            annotations: &[
                ("The", "AT", "B-NP"), ("old", "JJ", "I-NP"), ("man", "NN", "I-NP"), ("and", "CC", "O"),
                ("his", "PP$", "B-NP"), ("dog", "NN", "I-NP"), ("walked", "VBD", "B-VP"),
                ("slowly", "RB", "B-ADVP"), (".", ".", "O"),
            ],
        },
        // ===== COTIDIANO =====
        AnnotatedSentence {
            text: "A small boy ran to the old house.",
            domain: "cotidiano",
            annotations: &[
                ("A", "AT", "B-NP"), ("small", "JJ", "I-NP"), ("boy", "NN", "I-NP"), ("ran", "VBD", "B-VP"),
                ("to", "IN", "B-PP"), ("the", "AT", "B-NP"), ("old", "JJ", "I-NP"), ("house", "NN", "I-NP"),
                (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "She reads books in the library.",
            domain: "cotidiano",
            annotations: &[
                ("She", "PPS", "B-NP"), ("reads", "VBZ", "B-VP"), ("books", "NNS", "B-NP"),
                ("in", "IN", "B-PP"), ("the", "AT", "B-NP"), ("library", "NN", "I-NP"), (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "John gave Mary a red book.",
            domain: "cotidiano",
            annotations: &[
                ("John", "NP", "B-NP"), ("gave", "VBD", "B-VP"), ("Mary", "NP", "B-NP"),
                ("a", "AT", "B-NP"), ("red", "JJ", "I-NP"), ("book", "NN", "I-NP"), (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "The children played in the park, and the dogs barked.",
            domain: "cotidiano",
            annotations: &[
                ("The", "AT", "B-NP"), ("children", "NNS", "I-NP"), ("played", "VBD", "B-VP"),
                ("in", "IN", "B-PP"), ("the", "AT", "B-NP"), ("park", "NN", "I-NP"), (",", ",", "O"),
                ("and", "CC", "O"), ("the", "AT", "B-NP"), ("dogs", "NNS", "I-NP"), ("barked", "VBD", "B-VP"),
                (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "We bought three new cars last year.",
            domain: "cotidiano",
            annotations: &[
                ("We", "PPSS", "B-NP"), ("bought", "VBD", "B-VP"), ("three", "CD", "B-NP"),
                ("new", "JJ", "I-NP"), ("cars", "NNS", "I-NP"), ("last", "AP", "B-NP"), ("year", "NN", "I-NP"),
                (".", ".", "O"),
            ],
        },
        // ===== VIAGENS E ESTUDO =====
        AnnotatedSentence {
            text: "They will visit the city in June.",
            domain: "viagens",
            annotations: &[
                ("They", "PPSS", "B-NP"), ("will", "MD", "B-VP"), ("visit", "VB", "I-VP"),
                ("the", "AT", "B-NP"), ("city", "NN", "I-NP"), ("in", "IN", "B-PP"), ("June", "NP", "B-NP"),
                (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "The teacher wanted to read the letter.",
            domain: "estudo",
            annotations: &[
                ("The", "AT", "B-NP"), ("teacher", "NN", "I-NP"), ("wanted", "VBD", "B-VP"),
                ("to", "TO", "I-VP"), ("read", "VB", "I-VP"), ("the", "AT", "B-NP"), ("letter", "NN", "I-NP"),
                (".", ".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "He was very tired after the long day.",
            domain: "estudo",
            annotations: &[
                ("He", "PPS", "B-NP"), ("was", "BEDZ", "B-VP"), ("very", "QL", "B-ADJP"),
                ("tired", "JJ", "I-ADJP"), ("after", "IN", "B-PP"), ("the", "AT", "B-NP"), ("long", "JJ", "I-NP"),
                ("day", "NN", "I-NP"), (".", ".", "O"),
            ],
        },
    ]
}

/// Corpus como sentenças etiquetadas (POS).
pub fn tagged_corpus() -> Vec<TaggedSentence> {
    get_corpus().iter().map(AnnotatedSentence::tagged).collect()
}

/// Corpus como sentenças com chunks.
pub fn chunked_corpus() -> Result<Vec<ChunkedSentence>> {
    get_corpus().iter().map(AnnotatedSentence::chunked).collect()
}

/// Sentenças tokenizadas para demonstração (fora do corpus de treino).
pub fn demo_sentences() -> Vec<Vec<&'static str>> {
    vec![
        vec!["The", "cat", "jumped", "."],
        vec!["A", "dog", "slept", "in", "the", "house", "."],
        vec!["She", "gave", "the", "boy", "a", "book", "."],
    ]
}

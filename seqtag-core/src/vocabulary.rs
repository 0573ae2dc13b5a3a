//! # Vocabulários de Rótulos (Tagsets)
//!
//! Um [`Vocabulary`] enumera os rótulos de um esquema de etiquetagem e mapeia
//! cada forma textual canônica para um identificador interno ([`LabelId`]).
//!
//! ## Tagsets embutidos
//!
//! | Construtor                     | Esquema                                   | Rótulo padrão |
//! |--------------------------------|-------------------------------------------|---------------|
//! | [`Vocabulary::brown`]          | Tags POS do corpus Brown (`AT`, `NN`, ...)| `UNK`         |
//! | [`Vocabulary::penn`]           | Tags POS do Penn Treebank / CoNLL         | `UNK`         |
//! | [`Vocabulary::conll_chunk`]    | Fronteiras de chunk `B-X`, `I-X`, `O`     | `O`           |
//!
//! ## Ordem dos rótulos
//!
//! Os rótulos são sempre ordenados pela forma textual, nunca pela ordem de
//! inserção. O desempate do classificador segue essa ordem, o que torna a
//! inferência reproduzível para qualquer vocabulário equivalente.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chunker::boundary_labels;
use crate::error::{Result, SeqTagError};
use crate::sentence::{ChunkedSentence, TaggedSentence};

/// Rótulo reservado para tokens que nenhuma estratégia conseguiu resolver.
pub const UNKNOWN_LABEL: &str = "UNK";

/// Rótulo de "fora de chunk" no esquema de fronteiras.
pub const OUTSIDE_LABEL: &str = "O";

/// Tipos de chunk do CoNLL-2000.
pub const CONLL_CHUNK_TYPES: [&str; 11] = [
    "ADJP", "ADVP", "CONJP", "INTJ", "LST", "NP", "PP", "PRT", "SBAR", "UCP", "VP",
];

const BROWN_TAGS: &[&str] = &[
    "'", "''", "(", ")", "*", ",", "--", ".", ":", "``", "ABL", "ABN", "ABX", "AP", "AT",
    "BE", "BED", "BEDZ", "BEG", "BEM", "BEN", "BER", "BEZ", "CC", "CD", "CS", "DO", "DOD",
    "DOZ", "DT", "DTI", "DTS", "DTX", "EX", "FW", "HV", "HVD", "HVG", "HVN", "HVZ", "IN",
    "JJ", "JJR", "JJS", "JJT", "MD", "NC", "NN", "NN$", "NNS", "NNS$", "NP", "NP$", "NPS",
    "NPS$", "NR", "NRS", "OD", "PN", "PN$", "PP$", "PP$$", "PPL", "PPLS", "PPO", "PPS",
    "PPSS", "QL", "QLP", "RB", "RBR", "RBT", "RN", "RP", "TO", "UH", "VB", "VBD", "VBG",
    "VBN", "VBZ", "WDT", "WP$", "WPO", "WPS", "WQL", "WRB",
];

const PENN_TAGS: &[&str] = &[
    "#", "$", "''", "(", ")", ",", ".", ":", "``", "CC", "CD", "DT", "EX", "FW", "IN", "JJ",
    "JJR", "JJS", "LS", "MD", "NN", "NNP", "NNPS", "NNS", "PDT", "POS", "PRP", "PRP$", "RB",
    "RBR", "RBS", "RP", "SYM", "TO", "UH", "VB", "VBD", "VBG", "VBN", "VBP", "VBZ", "WDT",
    "WP", "WP$", "WRB",
];

/// Identificador interno de um rótulo dentro de um [`Vocabulary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabelId(u32);

impl LabelId {
    /// Posição do rótulo na ordem canônica do vocabulário.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        LabelId(index as u32)
    }
}

/// Conjunto nomeado de rótulos com mapeamento bidirecional texto <-> id.
///
/// Invariantes:
/// - nunca é vazio (um vocabulário sem rótulos recebe [`UNKNOWN_LABEL`]);
/// - o mapeamento é injetivo e total sobre os rótulos declarados;
/// - o rótulo padrão (desempate) pertence ao vocabulário.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    name: String,
    labels: Vec<String>,
    index: HashMap<String, LabelId>,
    default: LabelId,
}

impl Vocabulary {
    /// Cria um vocabulário a partir de rótulos em qualquer ordem (duplicatas são ignoradas).
    ///
    /// O rótulo padrão é o primeiro na ordem canônica; use [`Vocabulary::with_default`]
    /// para reservar um rótulo específico.
    pub fn new<I, S>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        if set.is_empty() {
            set.insert(UNKNOWN_LABEL.to_string());
        }
        let labels: Vec<String> = set.into_iter().collect();
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), LabelId(i as u32)))
            .collect();
        Self {
            name: name.into(),
            labels,
            index,
            default: LabelId(0),
        }
    }

    /// Reserva `label` como rótulo padrão, inserindo-o se necessário.
    pub fn with_default(self, label: &str) -> Self {
        let mut vocab = if self.index.contains_key(label) {
            self
        } else {
            let name = self.name.clone();
            let mut labels = self.labels;
            labels.push(label.to_string());
            Vocabulary::new(name, labels)
        };
        vocab.default = vocab.index[label];
        vocab
    }

    /// Tagset POS do corpus Brown, com `UNK` reservado.
    pub fn brown() -> Self {
        Vocabulary::new("brown", BROWN_TAGS.iter().copied()).with_default(UNKNOWN_LABEL)
    }

    /// Tagset POS do Penn Treebank (usado no CoNLL-2000), com `UNK` reservado.
    pub fn penn() -> Self {
        Vocabulary::new("penn", PENN_TAGS.iter().copied()).with_default(UNKNOWN_LABEL)
    }

    /// Rótulos de fronteira de chunk do CoNLL-2000: `B-X`, `I-X` e `O`.
    pub fn conll_chunk() -> Self {
        let labels = CONLL_CHUNK_TYPES
            .iter()
            .flat_map(|t| [format!("B-{t}"), format!("I-{t}")]);
        Vocabulary::new("conll-chunk", labels).with_default(OUTSIDE_LABEL)
    }

    /// Tagset aberto derivado das tags de um corpus anotado.
    pub fn from_tagged(name: impl Into<String>, sentences: &[TaggedSentence]) -> Self {
        let tags = sentences
            .iter()
            .flat_map(|s| s.iter().map(|t| t.tag.clone()));
        Vocabulary::new(name, tags).with_default(UNKNOWN_LABEL)
    }

    /// Rótulos de fronteira derivados de um corpus de chunks.
    pub fn from_chunked(name: impl Into<String>, sentences: &[ChunkedSentence]) -> Self {
        let labels = sentences
            .iter()
            .flat_map(|s| boundary_labels(s).into_iter().map(|b| b.label()));
        Vocabulary::new(name, labels).with_default(OUTSIDE_LABEL)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Sempre `false`: um vocabulário tem ao menos um rótulo.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rótulos na ordem canônica.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn get(&self, label: &str) -> Option<LabelId> {
        self.index.get(label).copied()
    }

    /// Resolve um rótulo, falhando com `UnknownLabel` se ele não existir.
    pub fn id(&self, label: &str) -> Result<LabelId> {
        self.get(label).ok_or_else(|| SeqTagError::UnknownLabel {
            tagset: self.name.clone(),
            label: label.to_string(),
        })
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Forma textual de um id.
    ///
    /// # Panics
    /// Se `id` não veio deste vocabulário.
    pub fn label(&self, id: LabelId) -> &str {
        &self.labels[id.index()]
    }

    /// Rótulo de desempate: vence qualquer empate de que participe.
    pub fn default_label(&self) -> LabelId {
        self.default
    }

    pub fn iter(&self) -> impl Iterator<Item = (LabelId, &str)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, l)| (LabelId(i as u32), l.as_str()))
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} labels)", self.name, self.labels.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_sorted_and_deduplicated() {
        let vocab = Vocabulary::new("t", ["NN", "AT", "NN", "VBD"]);
        assert_eq!(vocab.labels(), &["AT", "NN", "VBD"]);
        assert_eq!(vocab.label(vocab.default_label()), "AT");
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = Vocabulary::new("t", ["VBD", "AT", "NN"]);
        let b = Vocabulary::new("t", ["NN", "VBD", "AT"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        let vocab = Vocabulary::brown();
        let err = vocab.id("NOT-A-TAG").unwrap_err();
        assert!(matches!(err, SeqTagError::UnknownLabel { ref label, .. } if label == "NOT-A-TAG"));
    }

    #[test]
    fn test_brown_reserves_unknown() {
        let vocab = Vocabulary::brown();
        assert_eq!(vocab.label(vocab.default_label()), UNKNOWN_LABEL);
        for tag in ["AT", "NN", "VBD", "."] {
            let id = vocab.id(tag).unwrap();
            assert_eq!(vocab.label(id), tag);
        }
    }

    #[test]
    fn test_conll_chunk_labels() {
        let vocab = Vocabulary::conll_chunk();
        assert_eq!(vocab.len(), CONLL_CHUNK_TYPES.len() * 2 + 1);
        assert!(vocab.contains("B-NP"));
        assert!(vocab.contains("I-VP"));
        assert_eq!(vocab.label(vocab.default_label()), OUTSIDE_LABEL);
    }

    #[test]
    fn test_empty_vocabulary_gets_unknown() {
        let vocab = Vocabulary::new("empty", Vec::<String>::new());
        assert_eq!(vocab.len(), 1);
        assert!(!vocab.is_empty());
        assert_eq!(vocab.label(vocab.default_label()), UNKNOWN_LABEL);
    }

    #[test]
    fn test_from_tagged() {
        let sentences = vec![TaggedSentence::from_pairs(&[("The", "AT"), ("dog", "NN")])];
        let vocab = Vocabulary::from_tagged("mini", &sentences);
        assert_eq!(vocab.labels(), &["AT", "NN", "UNK"]);
    }
}

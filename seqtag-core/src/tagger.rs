//! # Tagger Composável
//!
//! Um [`Tagger`] é uma cadeia de estágios ([`Stage`]) guardada numa arena:
//! cada estágio tem no máximo um *fallback* e a cadeia é acíclica. Para cada
//! token, os estágios são consultados na ordem da cadeia e o primeiro rótulo
//! definido é adotado.
//!
//! ```text
//! Lexicon ──► Unambiguous ──► Perceptron (total)
//!    │             │
//!    └ "sim" → tag └ "sim" → tag
//! ```
//!
//! ## Estágios
//!
//! | Estágio        | Origem                          | Treinável |
//! |----------------|---------------------------------|-----------|
//! | `Lexicon`      | dicionário fornecido            | não       |
//! | `Unambiguous`  | palavras com tag dominante      | sim       |
//! | `Perceptron`   | Averaged Perceptron (total)     | sim       |
//! | `Constant`     | sempre o mesmo rótulo           | não       |
//!
//! Cada estágio treinável aprende das tags **corretas** do corpus, nunca da
//! saída dos estágios anteriores: o perceptron de `Unambiguous -> Perceptron`
//! aprende exatamente os mesmos pesos que um perceptron sozinho.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{TrainConfig, UnambiguousConfig};
use crate::error::{Result, SeqTagError};
use crate::evaluate::Accuracy;
use crate::features::{pos_features, FeatureVector, BOS};
use crate::payload::{self, Alphabet, WeightTriple};
use crate::perceptron::{AveragedPerceptron, Example, Weights};
use crate::sentence::{TaggedSentence, TaggedToken};
use crate::vocabulary::{LabelId, Vocabulary};

/// Índice de um estágio na arena do tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageId(usize);

impl StageId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Um estágio da cadeia.
#[derive(Debug, Clone)]
pub enum Stage {
    /// Dicionário palavra -> tag (busca exata, depois em minúsculas).
    Lexicon { entries: BTreeMap<String, LabelId> },
    /// Palavras frequentes cuja tag dominante cobre quase todas as ocorrências.
    Unambiguous {
        config: UnambiguousConfig,
        words: BTreeMap<String, LabelId>,
    },
    /// Classificador total.
    Perceptron(AveragedPerceptron),
    /// Sempre propõe o mesmo rótulo.
    Constant(LabelId),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Lexicon { .. } => "lexicon",
            Stage::Unambiguous { .. } => "unambiguous",
            Stage::Perceptron(_) => "perceptron",
            Stage::Constant(_) => "constant",
        }
    }

    pub fn is_trainable(&self) -> bool {
        matches!(self, Stage::Unambiguous { .. } | Stage::Perceptron(_))
    }

    pub fn as_perceptron(&self) -> Option<&AveragedPerceptron> {
        match self {
            Stage::Perceptron(model) => Some(model),
            _ => None,
        }
    }

    /// `true` se todos os rótulos do estágio pertencem a `vocabulary`.
    fn fits(&self, vocabulary: &Vocabulary) -> bool {
        let in_range = |id: &LabelId| id.index() < vocabulary.len();
        match self {
            Stage::Lexicon { entries } => entries.values().all(in_range),
            Stage::Unambiguous { words, .. } => words.values().all(in_range),
            Stage::Perceptron(model) => **model.vocabulary() == *vocabulary,
            Stage::Constant(label) => in_range(label),
        }
    }

    /// Rótulo proposto para o token `i`, ou `None` para passar ao fallback.
    ///
    /// `history` contém os rótulos já adotados para os tokens anteriores.
    pub fn propose(
        &self,
        words: &[&str],
        i: usize,
        history: &[LabelId],
        vocabulary: &Vocabulary,
    ) -> Option<LabelId> {
        match self {
            Stage::Lexicon { entries } => {
                let word = words[i];
                entries
                    .get(word)
                    .or_else(|| entries.get(&word.to_lowercase()))
                    .copied()
            }
            Stage::Unambiguous { words: known, .. } => known.get(words[i]).copied(),
            Stage::Perceptron(model) => {
                Some(model.predict(&features_at(words, i, history, vocabulary)))
            }
            Stage::Constant(label) => Some(*label),
        }
    }

    /// Versão treinada deste estágio. Estágios não treináveis são copiados.
    fn trained(
        &self,
        examples: &[PosExample<'_>],
        config: &TrainConfig,
    ) -> Result<Stage> {
        match self {
            Stage::Perceptron(model) => {
                let mut model = model.clone();
                model.train(examples, config)?;
                model.finalize();
                Ok(Stage::Perceptron(model))
            }
            Stage::Unambiguous { config: thresholds, .. } => Ok(Stage::Unambiguous {
                config: thresholds.clone(),
                words: unambiguous_words(examples, thresholds),
            }),
            other => Ok(other.clone()),
        }
    }
}

/// Palavras com frequência >= `min_frequency` cuja tag mais comum cobre
/// ao menos `min_ratio` das ocorrências.
fn unambiguous_words(
    examples: &[PosExample<'_>],
    config: &UnambiguousConfig,
) -> BTreeMap<String, LabelId> {
    let mut counts: HashMap<&str, BTreeMap<LabelId, usize>> = HashMap::new();
    for example in examples {
        for (word, tag) in example.words.iter().zip(&example.gold) {
            *counts.entry(*word).or_default().entry(*tag).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .filter_map(|(word, tags)| {
            let total: usize = tags.values().sum();
            // empate: menor id vence
            let (best, count) = tags
                .iter()
                .fold(None, |acc: Option<(LabelId, usize)>, (tag, n)| match acc {
                    Some((_, m)) if m >= *n => acc,
                    _ => Some((*tag, *n)),
                })?;
            let ratio = count as f64 / total as f64;
            (total >= config.min_frequency && ratio >= config.min_ratio)
                .then(|| (word.to_string(), best))
        })
        .collect()
}

fn history_tag<'v>(history: &[LabelId], vocabulary: &'v Vocabulary, i: usize, back: usize) -> &'v str {
    if i < back {
        BOS
    } else {
        vocabulary.label(history[i - back])
    }
}

fn features_at(words: &[&str], i: usize, history: &[LabelId], vocabulary: &Vocabulary) -> FeatureVector {
    pos_features(
        words,
        i,
        history_tag(history, vocabulary, i, 1),
        history_tag(history, vocabulary, i, 2),
    )
}

/// Sentença de treino de POS já resolvida para ids.
pub(crate) struct PosExample<'a> {
    words: Vec<&'a str>,
    gold: Vec<LabelId>,
}

impl<'a> PosExample<'a> {
    fn resolve(sentence: &'a TaggedSentence, vocabulary: &Vocabulary) -> Result<Self> {
        let gold = sentence
            .iter()
            .map(|t| vocabulary.id(&t.tag))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            words: sentence.words(),
            gold,
        })
    }
}

impl Example for PosExample<'_> {
    fn len(&self) -> usize {
        self.words.len()
    }

    fn gold(&self, i: usize) -> LabelId {
        self.gold[i]
    }

    fn features(&self, i: usize, history: &[LabelId], vocabulary: &Vocabulary) -> FeatureVector {
        features_at(&self.words, i, history, vocabulary)
    }
}

/// Montagem incremental de uma cadeia de estágios.
///
/// ```
/// use seqtag_core::{ChainBuilder, UnambiguousConfig, Vocabulary};
///
/// let mut chain = ChainBuilder::new(Vocabulary::brown());
/// let shortcut = chain.unambiguous(UnambiguousConfig::default());
/// let model = chain.perceptron();
/// chain.link(shortcut, model).unwrap();
/// let tagger = chain.build(shortcut).unwrap();
/// assert_eq!(tagger.chain().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    vocabulary: Arc<Vocabulary>,
    stages: Vec<Stage>,
    fallback: Vec<Option<StageId>>,
}

impl ChainBuilder {
    pub fn new(vocabulary: impl Into<Arc<Vocabulary>>) -> Self {
        Self {
            vocabulary: vocabulary.into(),
            stages: Vec::new(),
            fallback: Vec::new(),
        }
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// Adiciona um estágio sem fallback.
    ///
    /// # Errors
    /// `VocabularyMismatch` se o estágio foi montado sobre outro vocabulário
    /// (perceptron com vocabulário diferente ou `LabelId` fora do alfabeto).
    pub fn add(&mut self, stage: Stage) -> Result<StageId> {
        if !stage.fits(&self.vocabulary) {
            return Err(SeqTagError::VocabularyMismatch {
                tagset: self.vocabulary.name().to_string(),
            });
        }
        Ok(self.push(stage))
    }

    fn push(&mut self, stage: Stage) -> StageId {
        self.stages.push(stage);
        self.fallback.push(None);
        StageId(self.stages.len() - 1)
    }

    /// Dicionário fixo. Falha com `UnknownLabel` se alguma tag não existir.
    pub fn lexicon<I, K, V>(&mut self, entries: I) -> Result<StageId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(word, tag)| Ok((word.into(), self.vocabulary.id(tag.as_ref())?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(self.push(Stage::Lexicon { entries }))
    }

    pub fn unambiguous(&mut self, config: UnambiguousConfig) -> StageId {
        self.push(Stage::Unambiguous {
            config,
            words: BTreeMap::new(),
        })
    }

    /// Perceptron vazio (prevê o rótulo padrão até ser treinado).
    pub fn perceptron(&mut self) -> StageId {
        let model = AveragedPerceptron::new(self.vocabulary.clone());
        self.push(Stage::Perceptron(model))
    }

    pub fn constant(&mut self, label: &str) -> Result<StageId> {
        let id = self.vocabulary.id(label)?;
        Ok(self.push(Stage::Constant(id)))
    }

    /// Define `fallback` como o próximo estágio consultado depois de `stage`.
    ///
    /// # Errors
    /// - `UnknownStage` se algum id não existe;
    /// - `CyclicTaggerChain` se o link fecharia um ciclo (inclusive `stage == fallback`).
    pub fn link(&mut self, stage: StageId, fallback: StageId) -> Result<()> {
        link_checked(&mut self.fallback, stage, fallback)
    }

    /// Finaliza a cadeia começando em `head`.
    pub fn build(self, head: StageId) -> Result<Tagger> {
        if head.0 >= self.stages.len() {
            return Err(SeqTagError::UnknownStage(head.0));
        }
        Ok(Tagger {
            vocabulary: self.vocabulary,
            stages: self.stages,
            fallback: self.fallback,
            head,
        })
    }
}

fn link_checked(fallback: &mut [Option<StageId>], stage: StageId, target: StageId) -> Result<()> {
    for id in [stage, target] {
        if id.0 >= fallback.len() {
            return Err(SeqTagError::UnknownStage(id.0));
        }
    }
    // Segue a cadeia a partir do alvo; se voltar a `stage`, há ciclo.
    let mut cursor = Some(target);
    while let Some(current) = cursor {
        if current == stage {
            return Err(SeqTagError::CyclicTaggerChain { stage: stage.0 });
        }
        cursor = fallback[current.0];
    }
    fallback[stage.0] = Some(target);
    Ok(())
}

/// Tagger POS composto por uma cadeia acíclica de estágios.
///
/// Imutável durante a inferência (`&self`), portanto `Send + Sync` e seguro
/// para uso concorrente. O treino devolve um **novo** tagger.
#[derive(Debug, Clone)]
pub struct Tagger {
    vocabulary: Arc<Vocabulary>,
    stages: Vec<Stage>,
    fallback: Vec<Option<StageId>>,
    head: StageId,
}

impl Tagger {
    /// Cadeia de um único perceptron.
    pub fn perceptron(vocabulary: impl Into<Arc<Vocabulary>>) -> Self {
        let mut chain = ChainBuilder::new(vocabulary);
        let head = chain.perceptron();
        Tagger {
            vocabulary: chain.vocabulary,
            stages: chain.stages,
            fallback: chain.fallback,
            head,
        }
    }

    /// `Unambiguous -> Perceptron`, a configuração clássica.
    pub fn standard(vocabulary: impl Into<Arc<Vocabulary>>, config: UnambiguousConfig) -> Self {
        let mut chain = ChainBuilder::new(vocabulary);
        let head = chain.unambiguous(config);
        let model = chain.perceptron();
        chain.fallback[head.0] = Some(model);
        Tagger {
            vocabulary: chain.vocabulary,
            stages: chain.stages,
            fallback: chain.fallback,
            head,
        }
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(id.0)
    }

    pub fn fallback_of(&self, id: StageId) -> Option<StageId> {
        self.fallback.get(id.0).copied().flatten()
    }

    pub fn head(&self) -> StageId {
        self.head
    }

    /// Ids dos estágios na ordem de consulta.
    pub fn chain(&self) -> Vec<StageId> {
        let mut order = Vec::new();
        let mut cursor = Some(self.head);
        while let Some(id) = cursor {
            order.push(id);
            cursor = self.fallback_of(id);
        }
        order
    }

    /// Etiqueta uma sentença já tokenizada, da esquerda para a direita.
    ///
    /// Se nenhum estágio decidir, usa o rótulo padrão do vocabulário.
    pub fn tag<S: AsRef<str>>(&self, tokens: &[S]) -> TaggedSentence {
        let words: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
        let chain = self.chain();
        let mut history = Vec::with_capacity(words.len());

        for i in 0..words.len() {
            let label = chain
                .iter()
                .find_map(|id| self.stages[id.0].propose(&words, i, &history, &self.vocabulary))
                .unwrap_or_else(|| self.vocabulary.default_label());
            history.push(label);
        }

        words
            .iter()
            .zip(&history)
            .map(|(word, label)| TaggedToken::new(*word, self.vocabulary.label(*label)))
            .collect()
    }

    /// Etiqueta várias sentenças em paralelo (uma sentença por tarefa).
    pub fn tag_batch<S: AsRef<str> + Sync>(&self, sentences: &[Vec<S>]) -> Vec<TaggedSentence> {
        sentences.par_iter().map(|tokens| self.tag(tokens)).collect()
    }

    /// Treina com a configuração padrão. Ver [`Tagger::train_with`].
    pub fn train(&self, sentences: &[TaggedSentence]) -> Result<Tagger> {
        self.train_with(sentences, &TrainConfig::default())
    }

    /// Treina todos os estágios treináveis com as tags corretas de `sentences`.
    ///
    /// Devolve um novo tagger; `self` não é alterado. Um perceptron já treinado
    /// continua a partir dos pesos atuais.
    ///
    /// # Errors
    /// `UnknownLabel` se alguma tag do corpus não existir no vocabulário (nada é
    /// treinado nesse caso); `EmptyCorpus` se o corpus for vazio e
    /// `config.reject_empty` estiver ligado.
    pub fn train_with(&self, sentences: &[TaggedSentence], config: &TrainConfig) -> Result<Tagger> {
        if sentences.is_empty() {
            if config.reject_empty {
                return Err(SeqTagError::EmptyCorpus);
            }
            warn!(tagset = self.vocabulary.name(), "empty training corpus, tagger left unchanged");
            return Ok(self.clone());
        }

        let examples = sentences
            .iter()
            .map(|s| PosExample::resolve(s, &self.vocabulary))
            .collect::<Result<Vec<_>>>()?;

        info!(
            sentences = examples.len(),
            stages = self.stages.len(),
            "training tagger chain"
        );
        let stages = self
            .stages
            .iter()
            .map(|stage| stage.trained(&examples, config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Tagger {
            vocabulary: self.vocabulary.clone(),
            stages,
            fallback: self.fallback.clone(),
            head: self.head,
        })
    }

    /// Acurácia por token contra um corpus anotado.
    pub fn evaluate(&self, gold: &[TaggedSentence]) -> Accuracy {
        gold.par_iter()
            .map(|sentence| {
                let predicted = self.tag(&sentence.words());
                Accuracy::compare(&sentence.tags(), &predicted.tags())
            })
            .reduce(Accuracy::default, Accuracy::merge)
    }

    fn to_payload(&self) -> TaggerPayload {
        let stages = self
            .stages
            .iter()
            .zip(&self.fallback)
            .map(|(stage, fallback)| StageRecord {
                fallback: fallback.map(StageId::index),
                stage: StageBody::of(stage, &self.vocabulary),
            })
            .collect();
        TaggerPayload {
            alphabet: Alphabet::of(&self.vocabulary),
            head: self.head.0,
            stages,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        debug!(stages = self.stages.len(), "serializing tagger");
        payload::encode("tagger", &self.to_payload())
    }

    /// Reconstrói um tagger com a mesma topologia de fallbacks.
    ///
    /// # Errors
    /// `UnknownLabel`, `MalformedModel` (estrutura, índices fora da arena) ou
    /// `CyclicTaggerChain` se os links gravados formarem um ciclo.
    pub fn deserialize(vocabulary: impl Into<Arc<Vocabulary>>, bytes: &[u8]) -> Result<Tagger> {
        let vocabulary = vocabulary.into();
        let payload: TaggerPayload = payload::decode("tagger", bytes)?;
        payload.alphabet.check(&vocabulary)?;
        debug!(stages = payload.stages.len(), "deserializing tagger");

        let stages = payload
            .stages
            .iter()
            .map(|record| record.stage.restore(&vocabulary))
            .collect::<Result<Vec<_>>>()?;

        let mut fallback = vec![None; stages.len()];
        for (index, record) in payload.stages.iter().enumerate() {
            if let Some(target) = record.fallback {
                link_checked(&mut fallback, StageId(index), StageId(target)).map_err(|e| match e {
                    SeqTagError::UnknownStage(id) => {
                        SeqTagError::MalformedModel(format!("fallback points to missing stage {id}"))
                    }
                    other => other,
                })?;
            }
        }
        if payload.head >= stages.len() {
            return Err(SeqTagError::MalformedModel(format!(
                "head stage {} out of range ({} stages)",
                payload.head,
                stages.len()
            )));
        }

        Ok(Tagger {
            vocabulary,
            stages,
            fallback,
            head: StageId(payload.head),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaggerPayload {
    alphabet: Alphabet,
    head: usize,
    stages: Vec<StageRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StageRecord {
    fallback: Option<usize>,
    stage: StageBody,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StageBody {
    Lexicon {
        entries: Vec<(String, String)>,
    },
    Unambiguous {
        config: UnambiguousConfig,
        words: Vec<(String, String)>,
    },
    Perceptron {
        weights: Vec<WeightTriple>,
    },
    Constant {
        label: String,
    },
}

fn label_pairs(map: &BTreeMap<String, LabelId>, vocabulary: &Vocabulary) -> Vec<(String, String)> {
    map.iter()
        .map(|(word, id)| (word.clone(), vocabulary.label(*id).to_string()))
        .collect()
}

fn resolve_pairs(pairs: &[(String, String)], vocabulary: &Vocabulary) -> Result<BTreeMap<String, LabelId>> {
    pairs
        .iter()
        .map(|(word, tag)| Ok((word.clone(), vocabulary.id(tag)?)))
        .collect()
}

impl StageBody {
    fn of(stage: &Stage, vocabulary: &Vocabulary) -> Self {
        match stage {
            Stage::Lexicon { entries } => StageBody::Lexicon {
                entries: label_pairs(entries, vocabulary),
            },
            Stage::Unambiguous { config, words } => StageBody::Unambiguous {
                config: config.clone(),
                words: label_pairs(words, vocabulary),
            },
            Stage::Perceptron(model) => StageBody::Perceptron {
                weights: model.weights().to_triples(vocabulary),
            },
            Stage::Constant(label) => StageBody::Constant {
                label: vocabulary.label(*label).to_string(),
            },
        }
    }

    fn restore(&self, vocabulary: &Arc<Vocabulary>) -> Result<Stage> {
        Ok(match self {
            StageBody::Lexicon { entries } => Stage::Lexicon {
                entries: resolve_pairs(entries, vocabulary)?,
            },
            StageBody::Unambiguous { config, words } => Stage::Unambiguous {
                config: config.clone(),
                words: resolve_pairs(words, vocabulary)?,
            },
            StageBody::Perceptron { weights } => {
                let weights = Weights::from_triples(vocabulary, weights)?;
                Stage::Perceptron(AveragedPerceptron::from_weights(vocabulary.clone(), weights))
            }
            StageBody::Constant { label } => Stage::Constant(vocabulary.id(label)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mini_corpus() -> Vec<TaggedSentence> {
        vec![
            TaggedSentence::from_pairs(&[("The", "AT"), ("dog", "NN"), ("jumped", "VBD"), (".", ".")]),
            TaggedSentence::from_pairs(&[("The", "AT"), ("cat", "NN"), ("slept", "VBD"), (".", ".")]),
        ]
    }

    #[test]
    fn test_tagger_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Tagger>();
    }

    #[test]
    fn test_untrained_tagger_uses_default() {
        let tagger = Tagger::perceptron(Vocabulary::brown());
        let tagged = tagger.tag(&["The", "dog"]);
        assert_eq!(tagged.tags(), vec!["UNK", "UNK"]);
    }

    #[test]
    fn test_lexicon_then_constant() {
        let mut chain = ChainBuilder::new(Vocabulary::brown());
        let lexicon = chain.lexicon([("the", "AT"), ("dog", "NN")]).unwrap();
        let fallback = chain.constant("NN").unwrap();
        chain.link(lexicon, fallback).unwrap();
        let tagger = chain.build(lexicon).unwrap();

        // "The" resolve pela forma em minúsculas
        let tagged = tagger.tag(&["The", "dog", "barked"]);
        assert_eq!(tagged.tags(), vec!["AT", "NN", "NN"]);
    }

    #[test]
    fn test_exhausted_chain_uses_default() {
        let mut chain = ChainBuilder::new(Vocabulary::brown());
        let lexicon = chain.lexicon([("dog", "NN")]).unwrap();
        let tagger = chain.build(lexicon).unwrap();
        assert_eq!(tagger.tag(&["dog", "cat"]).tags(), vec!["NN", "UNK"]);
    }

    #[test]
    fn test_lexicon_rejects_unknown_tag() {
        let mut chain = ChainBuilder::new(Vocabulary::brown());
        let err = chain.lexicon([("dog", "NOUN")]).unwrap_err();
        assert!(matches!(err, SeqTagError::UnknownLabel { .. }));
    }

    #[test]
    fn test_add_rejects_stage_from_other_vocabulary() {
        let small = Vocabulary::new("small", ["A", "B"]);
        let mut chain = ChainBuilder::new(small.clone());
        let foreign = AveragedPerceptron::new(Arc::new(Vocabulary::brown()));
        assert!(matches!(
            chain.add(Stage::Perceptron(foreign)),
            Err(SeqTagError::VocabularyMismatch { ref tagset }) if tagset == "small"
        ));

        let brown = Vocabulary::brown();
        let nn = brown.id("NN").unwrap();
        assert!(nn.index() >= small.len());
        assert!(chain.add(Stage::Constant(nn)).is_err());
        let entries = BTreeMap::from([("dog".to_string(), nn)]);
        assert!(chain.add(Stage::Lexicon { entries }).is_err());

        // nada entrou na arena; a cadeia continua utilizável
        let own = AveragedPerceptron::new(Arc::new(small.clone()));
        let head = chain.add(Stage::Perceptron(own)).unwrap();
        assert_eq!(head.index(), 0);
        let tagger = chain.build(head).unwrap();
        assert_eq!(tagger.tag(&["x"]).tags(), vec![small.label(small.default_label())]);
        assert!(tagger.serialize().is_ok());
    }

    #[test]
    fn test_self_link_is_cyclic() {
        let mut chain = ChainBuilder::new(Vocabulary::brown());
        let a = chain.perceptron();
        assert!(matches!(
            chain.link(a, a),
            Err(SeqTagError::CyclicTaggerChain { stage: 0 })
        ));
    }

    #[test]
    fn test_long_cycle_is_rejected() {
        let mut chain = ChainBuilder::new(Vocabulary::brown());
        let a = chain.unambiguous(UnambiguousConfig::default());
        let b = chain.unambiguous(UnambiguousConfig::default());
        let c = chain.perceptron();
        chain.link(a, b).unwrap();
        chain.link(b, c).unwrap();
        assert!(matches!(
            chain.link(c, a),
            Err(SeqTagError::CyclicTaggerChain { stage: 2 })
        ));
        // a cadeia anterior continua válida
        let tagger = chain.build(a).unwrap();
        assert_eq!(tagger.chain(), vec![a, b, c]);
    }

    #[test]
    fn test_link_to_missing_stage() {
        let mut chain = ChainBuilder::new(Vocabulary::brown());
        let a = chain.perceptron();
        assert!(matches!(
            chain.link(a, StageId(7)),
            Err(SeqTagError::UnknownStage(7))
        ));
        assert!(matches!(
            ChainBuilder::new(Vocabulary::brown()).build(StageId(0)),
            Err(SeqTagError::UnknownStage(0))
        ));
    }

    #[test]
    fn test_train_returns_new_value() {
        let tagger = Tagger::perceptron(Vocabulary::brown());
        let trained = tagger.train(&mini_corpus()).unwrap();
        assert_eq!(tagger.tag(&["dog"]).tags(), vec!["UNK"]);
        assert_eq!(trained.tag(&["The", "dog", "jumped", "."]).tags(), vec!["AT", "NN", "VBD", "."]);
    }

    #[test]
    fn test_train_rejects_unknown_gold_tag() {
        let tagger = Tagger::perceptron(Vocabulary::brown());
        let corpus = vec![TaggedSentence::from_pairs(&[("dog", "NOUN")])];
        let err = tagger.train(&corpus).unwrap_err();
        assert!(matches!(err, SeqTagError::UnknownLabel { ref label, .. } if label == "NOUN"));
    }

    #[test]
    fn test_empty_corpus() {
        let tagger = Tagger::perceptron(Vocabulary::brown());
        let same = tagger.train(&[]).unwrap();
        assert_eq!(same.tag(&["dog"]).tags(), vec!["UNK"]);
        assert!(matches!(
            tagger.train_with(&[], &TrainConfig::default().rejecting_empty()),
            Err(SeqTagError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_unambiguous_thresholds() {
        let mut corpus = Vec::new();
        for _ in 0..3 {
            corpus.push(TaggedSentence::from_pairs(&[("the", "AT"), ("run", "NN")]));
        }
        corpus.push(TaggedSentence::from_pairs(&[("run", "VB")]));

        let config = UnambiguousConfig {
            min_frequency: 3,
            min_ratio: 0.9,
        };
        let mut chain = ChainBuilder::new(Vocabulary::brown());
        let head = chain.unambiguous(config);
        let tagger = chain.build(head).unwrap().train(&corpus).unwrap();

        match tagger.stage(head) {
            Some(Stage::Unambiguous { words, .. }) => {
                let vocab = tagger.vocabulary();
                assert_eq!(words.get("the"), Some(&vocab.id("AT").unwrap()));
                // 3/4 < 0.9
                assert!(!words.contains_key("run"));
            }
            other => panic!("unexpected stage {other:?}"),
        }
    }

    #[test]
    fn test_serialize_keeps_topology() {
        let mut chain = ChainBuilder::new(Vocabulary::brown());
        let lexicon = chain.lexicon([(".", ".")]).unwrap();
        let model = chain.perceptron();
        let orphan = chain.constant("NN").unwrap();
        chain.link(lexicon, model).unwrap();
        let tagger = chain.build(lexicon).unwrap().train(&mini_corpus()).unwrap();

        let bytes = tagger.serialize().unwrap();
        let restored = Tagger::deserialize(Vocabulary::brown(), &bytes).unwrap();
        assert_eq!(restored.head(), lexicon);
        assert_eq!(restored.fallback_of(lexicon), Some(model));
        assert_eq!(restored.fallback_of(orphan), None);
        assert_eq!(restored.stages().len(), 3);

        let tokens = ["The", "cat", "jumped", "."];
        assert_eq!(restored.tag(&tokens), tagger.tag(&tokens));
    }

    #[test]
    fn test_deserialize_rejects_cyclic_payload() {
        let tagger = Tagger::standard(Vocabulary::brown(), UnambiguousConfig::default());
        let mut value: serde_json::Value = serde_json::from_slice(&tagger.serialize().unwrap()).unwrap();
        value["body"]["stages"][1]["fallback"] = serde_json::json!(0);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            Tagger::deserialize(Vocabulary::brown(), &bytes),
            Err(SeqTagError::CyclicTaggerChain { .. })
        ));
    }

    #[test]
    fn test_deserialize_rejects_other_default_label() {
        let reserved = Vocabulary::new("t", ["A", "B"]).with_default("B");
        let tagger = Tagger::perceptron(reserved.clone());
        assert_eq!(tagger.tag(&["x"]).tags(), vec!["B"]);

        let bytes = tagger.serialize().unwrap();
        assert!(matches!(
            Tagger::deserialize(Vocabulary::new("t", ["A", "B"]), &bytes),
            Err(SeqTagError::MalformedModel(_))
        ));
        let restored = Tagger::deserialize(reserved, &bytes).unwrap();
        assert_eq!(restored.tag(&["x"]).tags(), vec!["B"]);
    }

    #[test]
    fn test_deserialize_rejects_dangling_fallback() {
        let tagger = Tagger::standard(Vocabulary::brown(), UnambiguousConfig::default());
        let mut value: serde_json::Value = serde_json::from_slice(&tagger.serialize().unwrap()).unwrap();
        value["body"]["stages"][0]["fallback"] = serde_json::json!(9);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            Tagger::deserialize(Vocabulary::brown(), &bytes),
            Err(SeqTagError::MalformedModel(_))
        ));
    }

    #[test]
    fn test_evaluate() {
        let trained = Tagger::perceptron(Vocabulary::brown()).train(&mini_corpus()).unwrap();
        let accuracy = trained.evaluate(&mini_corpus());
        assert_eq!(accuracy.total, 8);
        assert_eq!(accuracy.correct, 8);
    }
}

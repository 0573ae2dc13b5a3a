//! # Averaged Perceptron
//!
//! Classificador online, *mistake-driven*, usado tanto para as tags POS quanto
//! para os rótulos de fronteira do chunker. Utiliza "Lazy Averaging" para evitar
//! custo O(N*T) na atualização dos pesos médios.
//!
//! ## Ciclo de vida
//!
//! ```text
//! new() --train()/update()--> pesos vivos --finalize()--> pesos médios (somente leitura)
//! ```
//!
//! Durante o treino a predição usa os pesos **atuais**; depois de
//! [`AveragedPerceptron::finalize`], usa os pesos **médios**. A tabela viva nunca
//! é sobrescrita pela média, então o treino pode continuar depois.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TrainConfig;
use crate::error::{Result, SeqTagError};
use crate::features::FeatureVector;
use crate::payload::{self, Alphabet, WeightTriple};
use crate::vocabulary::{LabelId, Vocabulary};

/// Peso de um par (feature, rótulo) com a contabilidade da média.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct WeightCell {
    /// Peso atual $w$.
    weight: f64,
    /// Soma acumulada $\sum w_t$ até `stamp`.
    total: f64,
    /// Último instante em que `weight` mudou.
    stamp: u64,
}

impl WeightCell {
    /// Total acumulado até `now`, supondo o peso constante desde `stamp`.
    fn total_at(&self, now: u64) -> f64 {
        self.total + now.saturating_sub(self.stamp) as f64 * self.weight
    }
}

/// Tabela de pesos vivos: (feature, rótulo) -> (peso, total, timestamp) + relógio global.
///
/// Todo par tocado por uma atualização permanece na tabela, de modo que a média
/// pode ser reconstruída a qualquer momento a partir de `total` e `stamp`.
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    cells: HashMap<String, BTreeMap<LabelId, WeightCell>>,
    clock: u64,
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Número de instâncias de treino vistas.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Número de pares (feature, rótulo) na tabela.
    pub fn len(&self) -> usize {
        self.cells.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Peso atual (não médio) de um par.
    pub fn weight(&self, feature: &str, label: LabelId) -> f64 {
        self.cell(feature, label).map_or(0.0, |c| c.weight)
    }

    /// Total acumulado de um par, fechado no relógio atual.
    pub fn running_total(&self, feature: &str, label: LabelId) -> f64 {
        self.cell(feature, label)
            .map_or(0.0, |c| c.total_at(self.clock))
    }

    /// Instante da última mudança de um par.
    pub fn last_changed(&self, feature: &str, label: LabelId) -> Option<u64> {
        self.cell(feature, label).map(|c| c.stamp)
    }

    fn cell(&self, feature: &str, label: LabelId) -> Option<&WeightCell> {
        self.cells.get(feature).and_then(|m| m.get(&label))
    }

    /// Aplica `delta` a um par com Lazy Averaging.
    fn bump(&mut self, feature: &str, label: LabelId, delta: f64, now: u64) {
        let cell = self
            .cells
            .entry(feature.to_owned())
            .or_default()
            .entry(label)
            .or_default();
        // 1. Fecha o total com o peso ANTIGO (constante desde a última mudança)
        cell.total = cell.total_at(now);
        cell.stamp = now;
        // 2. Aplica a mudança
        cell.weight += delta;
    }

    fn score_into(&self, features: &FeatureVector, scores: &mut [f64]) {
        for feature in features.iter() {
            if let Some(labels) = self.cells.get(feature) {
                for (label, cell) in labels {
                    scores[label.index()] += cell.weight;
                }
            }
        }
    }

    /// Snapshot dos pesos atuais.
    fn current(&self) -> Weights {
        self.snapshot(|cell| cell.weight)
    }

    /// Snapshot dos pesos médios: $\sum w_t / T$.
    fn averaged(&self) -> Weights {
        if self.clock == 0 {
            return self.current();
        }
        let steps = self.clock as f64;
        self.snapshot(|cell| cell.total_at(self.clock) / steps)
    }

    fn snapshot(&self, value: impl Fn(&WeightCell) -> f64) -> Weights {
        let map = self
            .cells
            .iter()
            .filter_map(|(feature, labels)| {
                let row: Vec<(LabelId, f64)> = labels
                    .iter()
                    .map(|(label, cell)| (*label, value(cell)))
                    .filter(|(_, w)| *w != 0.0)
                    .collect();
                (!row.is_empty()).then(|| (feature.clone(), row))
            })
            .collect();
        Weights { map }
    }

    fn from_weights(weights: &Weights) -> Self {
        let cells = weights
            .map
            .iter()
            .map(|(feature, row)| {
                let labels = row
                    .iter()
                    .map(|(label, w)| {
                        let cell = WeightCell {
                            weight: *w,
                            total: 0.0,
                            stamp: 0,
                        };
                        (*label, cell)
                    })
                    .collect();
                (feature.clone(), labels)
            })
            .collect();
        Self { cells, clock: 0 }
    }
}

/// Pesos somente leitura (snapshot atual ou médio).
///
/// Pesos nulos não são guardados: uma feature ausente contribui com zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weights {
    map: HashMap<String, Vec<(LabelId, f64)>>,
}

impl Weights {
    pub fn get(&self, feature: &str, label: LabelId) -> f64 {
        self.map
            .get(feature)
            .and_then(|row| row.iter().find(|(l, _)| *l == label))
            .map_or(0.0, |(_, w)| *w)
    }

    /// Número de pares (feature, rótulo) com peso não nulo.
    pub fn len(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn score_into(&self, features: &FeatureVector, scores: &mut [f64]) {
        for feature in features.iter() {
            if let Some(row) = self.map.get(feature) {
                for (label, w) in row {
                    scores[label.index()] += w;
                }
            }
        }
    }

    /// Triplas ordenadas por (feature, rótulo), para um payload estável.
    pub fn to_triples(&self, vocabulary: &Vocabulary) -> Vec<WeightTriple> {
        let mut triples: Vec<(&str, LabelId, f64)> = self
            .map
            .iter()
            .flat_map(|(f, row)| row.iter().map(move |(l, w)| (f.as_str(), *l, *w)))
            .collect();
        triples.sort_by(|a, b| a.0.cmp(b.0).then(a.1.cmp(&b.1)));
        triples
            .into_iter()
            .map(|(f, l, w)| (f.to_string(), vocabulary.label(l).to_string(), w))
            .collect()
    }

    /// Reconstrói os pesos a partir de triplas, resolvendo cada rótulo no vocabulário.
    pub fn from_triples(vocabulary: &Vocabulary, triples: &[WeightTriple]) -> Result<Self> {
        let mut rows: HashMap<String, BTreeMap<LabelId, f64>> = HashMap::new();
        for (feature, label, weight) in triples {
            let id = vocabulary.id(label)?;
            if !weight.is_finite() {
                return Err(SeqTagError::MalformedModel(format!(
                    "non-finite weight for ({feature:?}, {label:?})"
                )));
            }
            let row = rows.entry(feature.clone()).or_default();
            if row.insert(id, *weight).is_some() {
                return Err(SeqTagError::MalformedModel(format!(
                    "duplicate weight for ({feature:?}, {label:?})"
                )));
            }
        }
        let map = rows
            .into_iter()
            .map(|(f, row)| (f, row.into_iter().filter(|(_, w)| *w != 0.0).collect::<Vec<_>>()))
            .filter(|(_, row)| !row.is_empty())
            .collect();
        Ok(Weights { map })
    }
}

/// Uma sequência de treino vista pelo perceptron.
///
/// O histórico passado a [`Example::features`] contém os rótulos que o próprio
/// classificador previu para as posições anteriores (decodificação gulosa).
pub trait Example {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rótulo correto da posição `i`.
    fn gold(&self, i: usize) -> LabelId;

    /// Features da posição `i` dado o histórico de predições à esquerda.
    fn features(&self, i: usize, history: &[LabelId], vocabulary: &Vocabulary) -> FeatureVector;
}

/// Estatísticas de uma passada de treino.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    pub pass: usize,
    pub instances: usize,
    pub correct: usize,
}

impl PassStats {
    /// Acurácia das predições gulosas feitas durante a passada.
    pub fn accuracy(&self) -> f64 {
        if self.instances == 0 {
            0.0
        } else {
            self.correct as f64 / self.instances as f64
        }
    }
}

/// Resumo de um treino.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainStats {
    pub examples: usize,
    pub passes: Vec<PassStats>,
}

impl TrainStats {
    pub fn last_accuracy(&self) -> Option<f64> {
        self.passes.last().map(PassStats::accuracy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerceptronPayload {
    pub alphabet: Alphabet,
    pub weights: Vec<WeightTriple>,
}

/// Modelo Perceptron Médio (Averaged Perceptron).
///
/// O Perceptron processa um token por vez e só atualiza os pesos quando erra.
/// A versão "Averaged" usa a **média** dos pesos ao longo de todo o treino como
/// modelo final, o que reduz a oscilação e generaliza melhor.
///
/// # Lazy Averaging
/// Cada par (feature, rótulo) guarda o instante da última mudança e o total
/// acumulado até ali; o total só é atualizado quando o par muda (ou na média
/// final), mantendo custo constante por atualização.
///
/// # Desempate
/// A predição é o arg-max das pontuações. Empates são resolvidos pela ordem
/// canônica do vocabulário, e o rótulo padrão do vocabulário vence qualquer
/// empate de que participe. Um modelo sem treino prevê sempre o rótulo padrão.
#[derive(Debug, Clone)]
pub struct AveragedPerceptron {
    vocabulary: Arc<Vocabulary>,
    table: WeightTable,
    averaged: Option<Weights>,
}

impl AveragedPerceptron {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            table: WeightTable::new(),
            averaged: None,
        }
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    /// A tabela viva (pesos atuais + contabilidade da média).
    pub fn table(&self) -> &WeightTable {
        &self.table
    }

    pub fn is_finalized(&self) -> bool {
        self.averaged.is_some()
    }

    /// Pontuação de cada rótulo, indexada por [`LabelId::index`].
    pub fn scores(&self, features: &FeatureVector) -> Vec<f64> {
        let mut scores = vec![0.0; self.vocabulary.len()];
        match &self.averaged {
            Some(weights) => weights.score_into(features, &mut scores),
            None => self.table.score_into(features, &mut scores),
        }
        scores
    }

    /// Rótulo de maior pontuação (pesos médios se finalizado, atuais caso contrário).
    pub fn predict(&self, features: &FeatureVector) -> LabelId {
        argmax(&self.scores(features), self.vocabulary.default_label())
    }

    fn predict_live(&self, features: &FeatureVector) -> LabelId {
        let mut scores = vec![0.0; self.vocabulary.len()];
        self.table.score_into(features, &mut scores);
        argmax(&scores, self.vocabulary.default_label())
    }

    /// Atualiza os pesos quando o modelo erra.
    ///
    /// $w_{correto} \leftarrow w_{correto} + \phi(x)$
    /// $w_{predito} \leftarrow w_{predito} - \phi(x)$
    ///
    /// Não faz nada se `predicted == correct`. `timestamp` deve ser não
    /// decrescente entre chamadas.
    pub fn update(
        &mut self,
        features: &FeatureVector,
        predicted: LabelId,
        correct: LabelId,
        timestamp: u64,
    ) {
        if predicted == correct {
            return;
        }
        self.table.clock = self.table.clock.max(timestamp);
        for feature in features.iter() {
            self.table.bump(feature, correct, 1.0, timestamp);
            self.table.bump(feature, predicted, -1.0, timestamp);
        }
    }

    /// Registra uma instância de treino (avança o relógio global).
    pub fn tick(&mut self) {
        self.table.clock += 1;
    }

    /// Snapshot dos pesos médios; a tabela viva não é alterada.
    pub fn average(&self) -> Weights {
        self.table.averaged()
    }

    /// Fixa os pesos médios para a inferência.
    pub fn finalize(&mut self) {
        self.averaged = Some(self.average());
    }

    /// Pesos efetivos usados por [`AveragedPerceptron::predict`].
    pub fn weights(&self) -> Weights {
        match &self.averaged {
            Some(weights) => weights.clone(),
            None => self.table.current(),
        }
    }

    /// Treina o modelo (Online Learning).
    ///
    /// Para cada passada e cada sentença, etiqueta da esquerda para a direita com
    /// os pesos atuais, chamando [`AveragedPerceptron::update`] após cada token.
    /// Com `shuffle_seed`, a ordem dos exemplos é embaralhada de forma
    /// determinística entre passadas.
    ///
    /// Não calcula a média: chame [`AveragedPerceptron::finalize`] ao final.
    pub fn train<E: Example>(&mut self, examples: &[E], config: &TrainConfig) -> Result<TrainStats> {
        if examples.is_empty() {
            if config.reject_empty {
                return Err(SeqTagError::EmptyCorpus);
            }
            warn!(
                tagset = self.vocabulary.name(),
                "empty training corpus, model left unchanged"
            );
            return Ok(TrainStats::default());
        }

        info!(
            tagset = self.vocabulary.name(),
            examples = examples.len(),
            passes = config.passes,
            "training averaged perceptron"
        );
        self.averaged = None;

        let mut order: Vec<usize> = (0..examples.len()).collect();
        let mut rng = config
            .shuffle_seed
            .map(|seed| oorandom::Rand64::new(u128::from(seed)));
        let mut stats = TrainStats {
            examples: examples.len(),
            passes: Vec::with_capacity(config.passes),
        };

        for pass in 0..config.passes {
            let mut pass_stats = PassStats {
                pass,
                ..PassStats::default()
            };
            for &idx in &order {
                let example = &examples[idx];
                let mut history = Vec::with_capacity(example.len());
                for i in 0..example.len() {
                    let fv = example.features(i, &history, &self.vocabulary);
                    let guess = self.predict_live(&fv);
                    let truth = example.gold(i);
                    let now = self.table.clock;
                    self.update(&fv, guess, truth, now);
                    self.tick();

                    pass_stats.instances += 1;
                    if guess == truth {
                        pass_stats.correct += 1;
                    }
                    history.push(guess);
                }
            }
            debug!(pass, accuracy = pass_stats.accuracy(), "pass finished");
            stats.passes.push(pass_stats);

            if let Some(rng) = rng.as_mut() {
                shuffle(&mut order, rng);
            }
        }

        info!(
            weights = self.table.len(),
            accuracy = stats.last_accuracy().unwrap_or(0.0),
            "training finished"
        );
        Ok(stats)
    }

    pub fn to_payload(&self) -> PerceptronPayload {
        PerceptronPayload {
            alphabet: Alphabet::of(&self.vocabulary),
            weights: self.weights().to_triples(&self.vocabulary),
        }
    }

    /// Reconstrói um modelo finalizado a partir do payload.
    pub fn from_payload(vocabulary: Arc<Vocabulary>, payload: &PerceptronPayload) -> Result<Self> {
        payload.alphabet.check(&vocabulary)?;
        let weights = Weights::from_triples(&vocabulary, &payload.weights)?;
        Ok(Self::from_weights(vocabulary, weights))
    }

    pub(crate) fn from_weights(vocabulary: Arc<Vocabulary>, weights: Weights) -> Self {
        Self {
            vocabulary,
            table: WeightTable::from_weights(&weights),
            averaged: Some(weights),
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = self.to_payload();
        debug!(weights = payload.weights.len(), "serializing perceptron");
        payload::encode("perceptron", &payload)
    }

    pub fn deserialize(vocabulary: Arc<Vocabulary>, bytes: &[u8]) -> Result<Self> {
        let payload: PerceptronPayload = payload::decode("perceptron", bytes)?;
        debug!(weights = payload.weights.len(), "deserializing perceptron");
        Self::from_payload(vocabulary, &payload)
    }
}

/// Arg-max com desempate determinístico: `default` vence empates de que
/// participa; entre os demais, vence o menor id.
fn argmax(scores: &[f64], default: LabelId) -> LabelId {
    let mut best = default.index();
    for (i, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = i;
        }
    }
    LabelId::from_index(best)
}

/// Fisher-Yates com o gerador semeado.
fn shuffle(order: &mut [usize], rng: &mut oorandom::Rand64) {
    for i in (1..order.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        order.swap(i, j);
    }
}

//! # Engenharia de Features
//!
//! Para cada posição da sentença, extrai um conjunto de features binárias
//! (strings `chave=valor`) que o Averaged Perceptron pontua contra cada rótulo.
//!
//! ## Features de POS ([`pos_features`])
//!
//! ### Token atual
//! - Forma normalizada (lowercase, `!DIGITS`, `!YEAR`, `!HYPHEN`)
//! - Prefixo de 1 grafema, sufixos de 2 e 3 grafemas
//! - Forma ortográfica (`Xx`, `x`, `d`, ...)
//! - Capitalização, dígitos, hífen
//!
//! ### Contexto (janela de 2 tokens)
//! - Palavras anteriores/seguintes e seus sufixos
//! - Tags já decididas à esquerda (`prev_tag`, `prev2_tag`, bigrama de tags)
//!
//! ## Features de Chunk ([`chunk_features`])
//! - Tag POS atual e dos vizinhos, bigramas de POS
//! - Rótulo de fronteira anterior, combinado com o POS atual
//! - Palavra e forma ortográfica
//!
//! O feature `bias` está sempre ativo, então todo token tem ao menos uma feature
//! e o classificador é total sobre qualquer forma de token.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::sentence::TaggedToken;

/// Marcador de contexto antes do início da sentença.
pub const BOS: &str = "<s>";
/// Marcador de contexto após o fim da sentença.
pub const EOS: &str = "</s>";

/// Conjunto de features ativas de um token.
///
/// Usamos um `BTreeSet` porque cada feature vale 1.0 (presença) e a ordem de
/// iteração precisa ser estável para que o treino seja determinístico.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// As features ativas. Ex: `{"bias", "word=dog", "suffix3=dog"}`.
    pub features: BTreeSet<String>,
    /// Índice do token na sentença.
    pub token_index: usize,
}

impl FeatureVector {
    pub fn new(token_index: usize) -> Self {
        Self {
            features: BTreeSet::new(),
            token_index,
        }
    }

    /// Ativa uma feature (idempotente).
    pub fn insert(&mut self, key: impl Into<String>) {
        self.features.insert(key.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.features.contains(key)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(String::as_str)
    }
}

/// Normaliza a forma da palavra para reduzir a esparsidade.
///
/// - Números de 4 dígitos viram `!YEAR`; outros números, `!DIGITS`
/// - Palavras hifenizadas (não iniciadas por hífen) viram `!HYPHEN`
/// - O resto é convertido para minúsculas
pub fn normalize(word: &str) -> String {
    if !word.is_empty() && word.chars().all(|c| c.is_ascii_digit()) {
        if word.len() == 4 {
            "!YEAR".to_string()
        } else {
            "!DIGITS".to_string()
        }
    } else if word.contains('-') && !word.starts_with('-') {
        "!HYPHEN".to_string()
    } else {
        word.to_lowercase()
    }
}

/// Forma ortográfica compacta: `The` -> `Xx`, `dog` -> `x`, `1984` -> `d`, `U.S.` -> `X.X.`.
pub fn shape(word: &str) -> String {
    let mut out = String::new();
    let mut last = None;
    for c in word.chars() {
        let class = if c.is_uppercase() {
            'X'
        } else if c.is_lowercase() {
            'x'
        } else if c.is_numeric() {
            'd'
        } else {
            c
        };
        if last != Some(class) {
            out.push(class);
            last = Some(class);
        }
    }
    out
}

fn prefix(word: &str, n: usize) -> Option<String> {
    let graphemes: Vec<&str> = word.graphemes(true).collect();
    (graphemes.len() >= n).then(|| graphemes[..n].concat().to_lowercase())
}

fn suffix(word: &str, n: usize) -> Option<String> {
    let graphemes: Vec<&str> = word.graphemes(true).collect();
    (graphemes.len() >= n).then(|| graphemes[graphemes.len() - n..].concat().to_lowercase())
}

fn context<'a>(words: &[&'a str], i: usize, offset: isize) -> &'a str {
    let pos = i as isize + offset;
    if pos < 0 {
        BOS
    } else if pos as usize >= words.len() {
        EOS
    } else {
        words[pos as usize]
    }
}

/// Extrai as features de POS do token `i`.
///
/// `prev_tag` e `prev2_tag` são as tags já decididas à esquerda (ou [`BOS`]).
pub fn pos_features(words: &[&str], i: usize, prev_tag: &str, prev2_tag: &str) -> FeatureVector {
    let mut fv = FeatureVector::new(i);
    let word = words[i];
    let norm = normalize(word);

    fv.insert("bias");
    fv.insert(format!("word={norm}"));
    if let Some(p) = prefix(word, 1) {
        fv.insert(format!("prefix1={p}"));
    }
    for n in 2..=3 {
        if let Some(s) = suffix(word, n) {
            fv.insert(format!("suffix{n}={s}"));
        }
    }
    fv.insert(format!("shape={}", shape(word)));

    if word.chars().next().is_some_and(char::is_uppercase) {
        fv.insert("is_capitalized");
    }
    if word.chars().any(|c| c.is_ascii_digit()) {
        fv.insert("has_digit");
    }
    if word.contains('-') {
        fv.insert("has_hyphen");
    }
    if i == 0 {
        fv.insert("is_first");
    }
    if i + 1 == words.len() {
        fv.insert("is_last");
    }

    // Histórico de tags
    fv.insert(format!("prev_tag={prev_tag}"));
    fv.insert(format!("prev2_tag={prev2_tag}"));
    fv.insert(format!("tags={prev2_tag}|{prev_tag}"));
    fv.insert(format!("prev_tag_word={prev_tag}|{norm}"));

    // Janela de palavras
    let prev = context(words, i, -1);
    let next = context(words, i, 1);
    fv.insert(format!("prev_word={}", normalize(prev)));
    fv.insert(format!("prev2_word={}", normalize(context(words, i, -2))));
    fv.insert(format!("next_word={}", normalize(next)));
    fv.insert(format!("next2_word={}", normalize(context(words, i, 2))));
    if i > 0 {
        if let Some(s) = suffix(prev, 3) {
            fv.insert(format!("prev_suffix3={s}"));
        }
    }
    if i + 1 < words.len() {
        if let Some(s) = suffix(next, 3) {
            fv.insert(format!("next_suffix3={s}"));
        }
    }

    fv
}

fn tag_at(tokens: &[TaggedToken], i: usize, offset: isize) -> &str {
    let pos = i as isize + offset;
    if pos < 0 {
        BOS
    } else if pos as usize >= tokens.len() {
        EOS
    } else {
        tokens[pos as usize].tag.as_str()
    }
}

fn word_at(tokens: &[TaggedToken], i: usize, offset: isize) -> String {
    let pos = i as isize + offset;
    if pos < 0 {
        BOS.to_string()
    } else if pos as usize >= tokens.len() {
        EOS.to_string()
    } else {
        normalize(tokens[pos as usize].text())
    }
}

/// Extrai as features de fronteira de chunk do token `i`.
///
/// `prev_label` é o rótulo de fronteira decidido para o token anterior (ou [`BOS`]).
pub fn chunk_features(tokens: &[TaggedToken], i: usize, prev_label: &str) -> FeatureVector {
    let mut fv = FeatureVector::new(i);
    let word = tokens[i].text();
    let pos = tokens[i].tag.as_str();
    let prev_pos = tag_at(tokens, i, -1);
    let next_pos = tag_at(tokens, i, 1);

    fv.insert("bias");
    fv.insert(format!("pos={pos}"));
    fv.insert(format!("word={}", normalize(word)));
    fv.insert(format!("shape={}", shape(word)));
    if let Some(s) = suffix(word, 3) {
        fv.insert(format!("suffix3={s}"));
    }

    fv.insert(format!("prev_pos={prev_pos}"));
    fv.insert(format!("prev2_pos={}", tag_at(tokens, i, -2)));
    fv.insert(format!("next_pos={next_pos}"));
    fv.insert(format!("next2_pos={}", tag_at(tokens, i, 2)));
    fv.insert(format!("pos_bigram={prev_pos}|{pos}"));
    fv.insert(format!("pos_next={pos}|{next_pos}"));
    fv.insert(format!("pos_trigram={prev_pos}|{pos}|{next_pos}"));

    fv.insert(format!("prev_label={prev_label}"));
    fv.insert(format!("prev_label_pos={prev_label}|{pos}"));

    fv.insert(format!("prev_word={}", word_at(tokens, i, -1)));
    fv.insert(format!("next_word={}", word_at(tokens, i, 1)));

    fv
}

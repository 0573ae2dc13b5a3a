//! # Modelo de Dados das Sentenças
//!
//! Tipos que fluem pelo pipeline:
//!
//! ```text
//! [Token] --tagger--> TaggedSentence --chunker--> ChunkedSentence
//! ```
//!
//! Uma [`ChunkedSentence`] cobre todos os tokens da sentença de origem
//! exatamente uma vez e na ordem original: cada token pertence a um único
//! [`Chunk`] ou é um *chink* (token fora de qualquer chunk).

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Um token imutável (a forma de superfície).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(Box<str>);

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Token(text.into().into_boxed_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        Token::new(text)
    }
}

impl From<String> for Token {
    fn from(text: String) -> Self {
        Token::new(text)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Um token com a tag atribuída.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedToken {
    pub token: Token,
    pub tag: String,
}

impl TaggedToken {
    pub fn new(token: impl Into<Token>, tag: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            tag: tag.into(),
        }
    }

    pub fn text(&self) -> &str {
        self.token.as_str()
    }
}

impl fmt::Display for TaggedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token, self.tag)
    }
}

/// Sequência ordenada de tokens etiquetados.
///
/// A ordem é semântica: as features posicionais dependem dos vizinhos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaggedSentence(Vec<TaggedToken>);

impl TaggedSentence {
    pub fn new(tokens: Vec<TaggedToken>) -> Self {
        TaggedSentence(tokens)
    }

    /// Constrói a partir de pares `(palavra, tag)`.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        TaggedSentence(pairs.iter().map(|(w, t)| TaggedToken::new(*w, *t)).collect())
    }

    pub fn words(&self) -> Vec<&str> {
        self.0.iter().map(TaggedToken::text).collect()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.0.iter().map(|t| t.tag.as_str()).collect()
    }

    pub fn into_inner(self) -> Vec<TaggedToken> {
        self.0
    }
}

impl Deref for TaggedSentence {
    type Target = [TaggedToken];

    fn deref(&self) -> &[TaggedToken] {
        &self.0
    }
}

impl FromIterator<TaggedToken> for TaggedSentence {
    fn from_iter<I: IntoIterator<Item = TaggedToken>>(iter: I) -> Self {
        TaggedSentence(iter.into_iter().collect())
    }
}

impl fmt::Display for TaggedSentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

/// Um chunk rotulado: tipo (ex: `NP`) + tokens contíguos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub kind: String,
    pub tokens: Vec<TaggedToken>,
}

impl Chunk {
    pub fn new(kind: impl Into<String>, tokens: Vec<TaggedToken>) -> Self {
        Self {
            kind: kind.into(),
            tokens,
        }
    }
}

/// Elemento de uma sentença com chunks: um chunk ou um chink de um único token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChunkPiece {
    Chunk(Chunk),
    Chink(TaggedToken),
}

impl ChunkPiece {
    /// Tokens cobertos por este elemento.
    pub fn tokens(&self) -> &[TaggedToken] {
        match self {
            ChunkPiece::Chunk(chunk) => chunk.tokens.as_slice(),
            ChunkPiece::Chink(token) => std::slice::from_ref(token),
        }
    }

    /// Tipo do chunk, ou `None` para um chink.
    pub fn kind(&self) -> Option<&str> {
        match self {
            ChunkPiece::Chunk(chunk) => Some(&chunk.kind),
            ChunkPiece::Chink(_) => None,
        }
    }
}

/// Sentença segmentada em chunks e chinks, na ordem original.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkedSentence(Vec<ChunkPiece>);

impl ChunkedSentence {
    pub fn new(pieces: Vec<ChunkPiece>) -> Self {
        ChunkedSentence(pieces)
    }

    /// Todos os tokens, achatados na ordem original.
    pub fn tokens(&self) -> impl Iterator<Item = &TaggedToken> {
        self.0.iter().flat_map(|p| p.tokens().iter())
    }

    pub fn token_count(&self) -> usize {
        self.0.iter().map(|p| p.tokens().len()).sum()
    }

    /// A sentença etiquetada subjacente (descarta a estrutura de chunks).
    pub fn to_tagged(&self) -> TaggedSentence {
        self.tokens().cloned().collect()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.0.iter().filter_map(|p| match p {
            ChunkPiece::Chunk(chunk) => Some(chunk),
            ChunkPiece::Chink(_) => None,
        })
    }

    pub fn into_inner(self) -> Vec<ChunkPiece> {
        self.0
    }
}

impl Deref for ChunkedSentence {
    type Target = [ChunkPiece];

    fn deref(&self) -> &[ChunkPiece] {
        &self.0
    }
}

impl fmt::Display for ChunkedSentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, piece) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match piece {
                ChunkPiece::Chunk(chunk) => {
                    write!(f, "[{}", chunk.kind)?;
                    for token in &chunk.tokens {
                        write!(f, " {token}")?;
                    }
                    f.write_str("]")?;
                }
                ChunkPiece::Chink(token) => write!(f, "{token}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChunkedSentence {
        ChunkedSentence::new(vec![
            ChunkPiece::Chunk(Chunk::new(
                "NP",
                vec![TaggedToken::new("The", "AT"), TaggedToken::new("dog", "NN")],
            )),
            ChunkPiece::Chunk(Chunk::new("VP", vec![TaggedToken::new("jumped", "VBD")])),
            ChunkPiece::Chink(TaggedToken::new(".", ".")),
        ])
    }

    #[test]
    fn test_chunked_tokens_are_flattened_in_order() {
        let chunked = sample();
        let words: Vec<&str> = chunked.tokens().map(TaggedToken::text).collect();
        assert_eq!(words, vec!["The", "dog", "jumped", "."]);
        assert_eq!(chunked.token_count(), 4);
        assert_eq!(chunked.chunks().count(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(sample().to_string(), "[NP The/AT dog/NN] [VP jumped/VBD] ./.");
        let tagged = sample().to_tagged();
        assert_eq!(tagged.to_string(), "The/AT dog/NN jumped/VBD ./.");
    }

    #[test]
    fn test_piece_kind() {
        let chunked = sample();
        let kinds: Vec<Option<&str>> = chunked.iter().map(ChunkPiece::kind).collect();
        assert_eq!(kinds, vec![Some("NP"), Some("VP"), None]);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json[0]["type"], "chunk");
        assert_eq!(json[2]["type"], "chink");
        assert_eq!(json[2]["data"]["token"], ".");
    }
}

//! # Formato de Serialização dos Modelos
//!
//! Todo modelo é gravado como um envelope JSON versionado:
//!
//! ```json
//! {
//!   "format": "seqtag-model",
//!   "version": 1,
//!   "kind": "perceptron",
//!   "body": {
//!     "alphabet": {
//!       "tagset": "brown",
//!       "size": 3,
//!       "labels": ["AT", "NN", "UNK"],
//!       "default": "UNK"
//!     },
//!     "weights": [["bias", "NN", 0.25], ["word=the", "AT", 1.0]]
//!   }
//! }
//! ```
//!
//! O vocabulário não é embutido por nome: quem desserializa fornece a tabela
//! de rótulos, e o alfabeto gravado precisa bater com ela (mesmos rótulos, mesma
//! ordem, mesmo rótulo padrão). A desserialização é atômica: ou devolve um modelo válido, ou um erro.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SeqTagError};
use crate::vocabulary::Vocabulary;

/// Marcador de formato presente em todo payload.
pub const FORMAT_MARKER: &str = "seqtag-model";

/// Versão atual do formato.
pub const FORMAT_VERSION: u32 = 1;

/// Tripla `(feature, rótulo, peso)`.
pub type WeightTriple = (String, String, f64);

#[derive(Serialize)]
struct Envelope<'a, T> {
    format: &'a str,
    version: u32,
    kind: &'a str,
    body: &'a T,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEnvelope {
    format: String,
    version: u32,
    kind: String,
    body: serde_json::Value,
}

/// Grava `body` dentro de um envelope do tipo `kind`.
pub(crate) fn encode<T: Serialize>(kind: &str, body: &T) -> Result<Vec<u8>> {
    let envelope = Envelope {
        format: FORMAT_MARKER,
        version: FORMAT_VERSION,
        kind,
        body,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Lê um envelope, validando marcador, versão e tipo antes do corpo.
pub(crate) fn decode<T: DeserializeOwned>(kind: &str, bytes: &[u8]) -> Result<T> {
    let raw: RawEnvelope = serde_json::from_slice(bytes)?;
    if raw.format != FORMAT_MARKER {
        return Err(SeqTagError::MalformedModel(format!(
            "expected format marker {FORMAT_MARKER:?}, found {:?}",
            raw.format
        )));
    }
    if raw.version != FORMAT_VERSION {
        return Err(SeqTagError::MalformedModel(format!(
            "unsupported format version {} (expected {FORMAT_VERSION})",
            raw.version
        )));
    }
    if raw.kind != kind {
        return Err(SeqTagError::MalformedModel(format!(
            "expected a {kind:?} payload, found {:?}",
            raw.kind
        )));
    }
    Ok(serde_json::from_value(raw.body)?)
}

/// Alfabeto de rótulos gravado no payload: tamanho, ordem e rótulo padrão.
///
/// O rótulo padrão decide empates e precisa coincidir com o do vocabulário.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Alphabet {
    pub tagset: String,
    pub size: usize,
    pub labels: Vec<String>,
    pub default: String,
}

impl Alphabet {
    pub fn of(vocabulary: &Vocabulary) -> Self {
        Self {
            tagset: vocabulary.name().to_string(),
            size: vocabulary.len(),
            labels: vocabulary.labels().to_vec(),
            default: vocabulary.label(vocabulary.default_label()).to_string(),
        }
    }

    /// Valida o alfabeto contra a tabela do chamador.
    ///
    /// Rótulos desconhecidos falham com `UnknownLabel`; tamanho declarado
    /// inconsistente, ordem diferente ou outro rótulo padrão falham com
    /// `MalformedModel`.
    pub fn check(&self, vocabulary: &Vocabulary) -> Result<()> {
        for label in self.labels.iter().chain([&self.default]) {
            vocabulary.id(label)?;
        }
        if self.size != self.labels.len() {
            return Err(SeqTagError::MalformedModel(format!(
                "alphabet declares {} labels but lists {}",
                self.size,
                self.labels.len()
            )));
        }
        if self.labels.as_slice() != vocabulary.labels() {
            return Err(SeqTagError::MalformedModel(format!(
                "label alphabet does not match vocabulary {:?} ({} vs {} labels)",
                vocabulary.name(),
                self.labels.len(),
                vocabulary.len()
            )));
        }
        let expected = vocabulary.label(vocabulary.default_label());
        if self.default != expected {
            return Err(SeqTagError::MalformedModel(format!(
                "model was trained with default label {:?}, vocabulary {:?} uses {:?}",
                self.default,
                vocabulary.name(),
                expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Body {
        value: u32,
    }

    #[test]
    fn test_encode_decode() {
        let bytes = encode("test", &Body { value: 7 }).unwrap();
        let body: Body = decode("test", &bytes).unwrap();
        assert_eq!(body, Body { value: 7 });
    }

    #[test]
    fn test_wrong_marker_is_malformed() {
        let bytes = br#"{"format":"other","version":1,"kind":"test","body":{"value":1}}"#;
        let err = decode::<Body>("test", bytes).unwrap_err();
        assert!(matches!(err, SeqTagError::MalformedModel(ref m) if m.contains("format marker")));
    }

    #[test]
    fn test_wrong_version_is_malformed() {
        let bytes = br#"{"format":"seqtag-model","version":99,"kind":"test","body":{"value":1}}"#;
        let err = decode::<Body>("test", bytes).unwrap_err();
        assert!(matches!(err, SeqTagError::MalformedModel(ref m) if m.contains("version")));
    }

    #[test]
    fn test_wrong_kind_is_malformed() {
        let bytes = encode("tagger", &Body { value: 1 }).unwrap();
        assert!(matches!(
            decode::<Body>("chunker", &bytes),
            Err(SeqTagError::MalformedModel(_))
        ));
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let bytes = encode("test", &Body { value: 1 }).unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(
            decode::<Body>("test", truncated),
            Err(SeqTagError::MalformedModel(_))
        ));
    }

    #[test]
    fn test_alphabet_check() {
        let vocab = Vocabulary::new("t", ["AT", "NN"]);
        assert!(Alphabet::of(&vocab).check(&vocab).is_ok());

        let mut unknown = Alphabet::of(&vocab);
        unknown.labels.push("ZZ".into());
        unknown.size = 3;
        assert!(matches!(
            unknown.check(&vocab),
            Err(SeqTagError::UnknownLabel { .. })
        ));

        let mut wrong_size = Alphabet::of(&vocab);
        wrong_size.size = 5;
        assert!(matches!(
            wrong_size.check(&vocab),
            Err(SeqTagError::MalformedModel(_))
        ));

        let mut reordered = Alphabet::of(&vocab);
        reordered.labels.reverse();
        assert!(matches!(
            reordered.check(&vocab),
            Err(SeqTagError::MalformedModel(_))
        ));
    }

    #[test]
    fn test_alphabet_records_default_label() {
        let plain = Vocabulary::new("t", ["A", "B"]);
        let reserved = Vocabulary::new("t", ["A", "B"]).with_default("B");
        assert_eq!(Alphabet::of(&plain).default, "A");
        assert_eq!(Alphabet::of(&reserved).default, "B");

        // mesmos rótulos, mesma ordem: só o padrão difere
        assert_eq!(Alphabet::of(&reserved).labels, plain.labels());
        assert!(matches!(
            Alphabet::of(&reserved).check(&plain),
            Err(SeqTagError::MalformedModel(_))
        ));
        assert!(matches!(
            Alphabet::of(&plain).check(&reserved),
            Err(SeqTagError::MalformedModel(_))
        ));

        let value = serde_json::to_value(Alphabet::of(&reserved)).unwrap();
        assert_eq!(value["default"], "B");
    }
}

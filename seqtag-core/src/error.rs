//! # Erros do toolkit
//!
//! Todas as falhas são funções determinísticas da entrada: nenhuma é
//! transitória e nenhuma é repetida automaticamente.

use thiserror::Error;

/// Erros que podem ocorrer ao treinar, compor ou (des)serializar modelos.
#[derive(Debug, Error)]
pub enum SeqTagError {
    /// Um rótulo não existe no vocabulário informado pelo chamador.
    #[error("unknown label {label:?} for tagset {tagset:?}")]
    UnknownLabel {
        /// Nome do tagset consultado.
        tagset: String,
        /// Rótulo que não pôde ser resolvido.
        label: String,
    },

    /// O payload serializado não tem a estrutura esperada.
    #[error("malformed model payload: {0}")]
    MalformedModel(String),

    /// Ligar um fallback criaria um ciclo na cadeia de taggers.
    #[error("tagger chain would become cyclic at stage {stage}")]
    CyclicTaggerChain {
        /// Estágio que passaria a ser o próprio fallback.
        stage: usize,
    },

    /// Treino chamado sem exemplos (só quando `TrainConfig::reject_empty` está ligado).
    #[error("training corpus is empty")]
    EmptyCorpus,

    /// Referência a um estágio que não existe na cadeia.
    #[error("unknown tagger stage {0}")]
    UnknownStage(usize),

    /// Sequência de rótulos desalinhada com a sentença.
    #[error("expected {expected} labels, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// Um estágio foi montado sobre outro vocabulário.
    #[error("stage is bound to a different vocabulary than tagset {tagset:?}")]
    VocabularyMismatch {
        /// Tagset da cadeia que recusou o estágio.
        tagset: String,
    },
}

impl From<serde_json::Error> for SeqTagError {
    fn from(err: serde_json::Error) -> Self {
        SeqTagError::MalformedModel(err.to_string())
    }
}

/// Alias de `Result` para as operações do crate.
pub type Result<T> = std::result::Result<T, SeqTagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SeqTagError::UnknownLabel {
            tagset: "brown".into(),
            label: "XYZ".into(),
        };
        assert!(err.to_string().contains("XYZ"));
        assert!(err.to_string().contains("brown"));

        let err = SeqTagError::CyclicTaggerChain { stage: 2 };
        assert_eq!(err.to_string(), "tagger chain would become cyclic at stage 2");

        let err = SeqTagError::VocabularyMismatch { tagset: "small".into() };
        assert!(err.to_string().contains("\"small\""));
    }

    #[test]
    fn test_json_error_becomes_malformed_model() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: SeqTagError = json_err.into();
        assert!(matches!(err, SeqTagError::MalformedModel(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SeqTagError>();
    }
}

//! # Tipos de Erro
//!
//! Todos os módulos do crate reportam falhas através de [`Error`].
//!
//! | Variante        | Origem                                  | Efeito                                   |
//! |-----------------|-----------------------------------------|------------------------------------------|
//! | `InvalidSpan`   | intervalo malformado                    | erro de programação/dados, nunca repetido |
//! | `Alignment`     | divergência irrecuperável entre textos  | descarta a contribuição daquele motor    |
//! | `UnknownTag`    | tag fora do vocabulário do motor        | tratado como `Alignment`                 |
//! | `UnknownEngine` | saída de motor sem perfil configurado   | descarta a contribuição daquele motor    |
//!
//! Tags de fechamento que não batem com a tag aberta **não** são erros: apenas
//! geram um `tracing::warn!` (ver [`crate::extractor`]).

use thiserror::Error;

use crate::entity::EngineId;

/// Resultado padrão das operações do crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Intervalo inválido: `start >= end`, fora de `[0, len]` ou fora de uma fronteira de `char`.
    #[error("span inválido [{start}, {end}) sobre texto de {len} bytes: {reason}")]
    InvalidSpan {
        start: usize,
        end: usize,
        len: usize,
        reason: String,
    },

    /// O alinhamento encontrou dois caracteres que nenhuma regra consegue reconciliar.
    #[error(
        "alinhamento falhou (original={original_pos}, transformado={transformed_pos}): {reason}\n  original:     {original_context}\n  transformado: {transformed_context}"
    )]
    Alignment {
        original_pos: usize,
        transformed_pos: usize,
        reason: String,
        original_context: String,
        transformed_context: String,
    },

    /// Tag desconhecida, ausente da tabela de tipos e da lista de tags ignoradas.
    #[error("tag desconhecida <{tag}> na posição {position}: {context}")]
    UnknownTag {
        tag: String,
        position: usize,
        context: String,
    },

    /// Nenhum perfil configurado para o motor.
    #[error("motor sem perfil configurado: {0}")]
    UnknownEngine(EngineId),

    /// Falha reportada por uma implementação de [`crate::engine::Recognizer`].
    #[error("motor {engine} falhou: {message}")]
    Recognizer { engine: EngineId, message: String },

    /// Configuração inconsistente.
    #[error("configuração inválida: {0}")]
    Config(String),

    #[error("erro de IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("erro de JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_span(start: usize, end: usize, len: usize, reason: impl Into<String>) -> Self {
        Error::InvalidSpan {
            start,
            end,
            len,
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_positions() {
        let err = Error::UnknownTag {
            tag: "foo".into(),
            position: 3,
            context: "ab[<foo>]X".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("<foo>"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_alignment_message_shows_both_contexts() {
        let err = Error::Alignment {
            original_pos: 3,
            transformed_pos: 3,
            reason: "caracteres irreconciliáveis".into(),
            original_context: "Par[i]s".into(),
            transformed_context: "Par[u]s".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Par[i]s") && msg.contains("Par[u]s"));
    }
}

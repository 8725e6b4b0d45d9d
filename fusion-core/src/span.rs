//! # Modelo de Spans
//!
//! Um [`Span`] é um intervalo tipado e exato sobre o **texto original**: depois do
//! alinhamento, toda menção de todo motor é expressa nessas coordenadas.
//!
//! ## Invariantes
//! - `0 <= start < end <= text.len()`, ambos sobre fronteiras de `char`.
//! - `span.text == text[start..end]` depois da correção ([`correct_span`]).
//!
//! ## Sobreposição
//! Intervalos semiabertos: `[0,5)` e `[5,8)` **não** se sobrepõem.
//!
//! ```rust
//! use fusion_core::span::{build_span, overlaps};
//! use fusion_core::EntityType;
//!
//! let text = "Paris est belle";
//! let a = build_span(EntityType::Location, 0, 5, "nero".into(), text).unwrap();
//! let b = build_span(EntityType::Person, 4, 9, "tagen".into(), text).unwrap();
//! assert!(overlaps(&a, &b));
//! ```

use serde::{Deserialize, Serialize};

use crate::entity::{EngineId, EntityType};
use crate::error::{Error, Result};

/// Pontuação removida do fim de uma menção pela correção de span.
const TRAILING_PUNCTUATION: &[char] = &[',', ';', ':', '.', '!', '?', '-', '–', '—'];

/// Uma menção detectada, em coordenadas (bytes) do texto original.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Byte inicial (inclusivo)
    pub start: usize,
    /// Byte final (exclusivo)
    pub end: usize,
    /// Motor que produziu a menção
    pub engine: EngineId,
    /// Texto coberto, sempre igual a `original[start..end]`
    pub text: String,
}

impl Span {
    /// Intervalo degenerado (`start >= end`), só possível em spans vindos de JSON.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} '{}' ({},{}) {}]",
            self.entity_type, self.text, self.start, self.end, self.engine
        )
    }
}

/// Interseção de intervalos semiabertos.
pub fn overlaps(a: &Span, b: &Span) -> bool {
    a.start < b.end && b.start < a.end
}

/// `outer` cobre `inner` inteiramente.
pub fn contains(outer: &Span, inner: &Span) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

/// Constrói um span validando o intervalo contra o texto original.
///
/// Falha com [`Error::InvalidSpan`] se `start >= end`, se algum limite sair de
/// `[0, text.len()]` ou cair no meio de um caractere multibyte.
pub fn build_span(
    entity_type: EntityType,
    start: usize,
    end: usize,
    engine: EngineId,
    text: &str,
) -> Result<Span> {
    let len = text.len();
    if start >= end {
        return Err(Error::invalid_span(start, end, len, "start >= end"));
    }
    if end > len {
        return Err(Error::invalid_span(start, end, len, "limite fora do texto"));
    }
    let covered = text
        .get(start..end)
        .ok_or_else(|| Error::invalid_span(start, end, len, "limite fora de fronteira de caractere"))?;

    Ok(Span {
        entity_type,
        start,
        end,
        engine,
        text: covered.to_string(),
    })
}

/// Correção de span: remove espaços e pontuação do fim, e espaços do início.
///
/// Nunca aumenta o span. Falha com [`Error::InvalidSpan`] se não sobrar nada
/// (ex: uma menção que cobria apenas `", "`).
pub fn correct_span(span: &Span, text: &str) -> Result<Span> {
    let covered = text
        .get(span.start..span.end)
        .ok_or_else(|| Error::invalid_span(span.start, span.end, text.len(), "span não pertence ao texto"))?;

    let without_tail =
        covered.trim_end_matches(|c: char| c.is_whitespace() || TRAILING_PUNCTUATION.contains(&c));
    let trimmed = without_tail.trim_start_matches(char::is_whitespace);

    let start = span.start + (without_tail.len() - trimmed.len());
    let end = span.start + without_tail.len();
    if start >= end {
        return Err(Error::invalid_span(span.start, span.end, text.len(), "vazio após correção"));
    }

    Ok(Span {
        entity_type: span.entity_type,
        start,
        end,
        engine: span.engine.clone(),
        text: trimmed.to_string(),
    })
}

/// Coleção de spans atribuída a um produtor (um motor ou o combinador).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanSet {
    pub producer: EngineId,
    pub spans: Vec<Span>,
}

impl SpanSet {
    pub fn new(producer: EngineId) -> Self {
        Self {
            producer,
            spans: Vec::new(),
        }
    }

    pub fn push(&mut self, span: Span) {
        self.spans.push(span);
    }

    pub fn extend(&mut self, spans: impl IntoIterator<Item = Span>) {
        self.spans.extend(spans);
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span> {
        self.spans.iter()
    }

    /// Algum span do conjunto se sobrepõe a `span`? (busca linear)
    pub fn is_overlapping(&self, span: &Span) -> bool {
        self.spans.iter().any(|s| overlaps(s, span))
    }

    /// Ordena por início e, em empate, por fim.
    pub fn sort(&mut self) {
        self.spans.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    }
}

impl<'a> IntoIterator for &'a SpanSet {
    type Item = &'a Span;
    type IntoIter = std::slice::Iter<'a, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span {
            entity_type: EntityType::Person,
            start,
            end,
            engine: EngineId::from("test"),
            text: String::new(),
        }
    }

    #[test]
    fn test_overlaps_half_open() {
        assert!(overlaps(&span(0, 5), &span(3, 8)));
        assert!(overlaps(&span(3, 8), &span(0, 5)));
        assert!(!overlaps(&span(0, 5), &span(5, 8)));
        assert!(overlaps(&span(0, 10), &span(2, 3)));
    }

    #[test]
    fn test_contains() {
        assert!(contains(&span(0, 10), &span(2, 3)));
        assert!(contains(&span(0, 10), &span(0, 10)));
        assert!(!contains(&span(2, 3), &span(0, 10)));
    }

    #[test]
    fn test_build_span_bounds() {
        let text = "Paris is nice";
        let ok = build_span(EntityType::Location, 0, 5, "nero".into(), text).unwrap();
        assert_eq!(ok.text, "Paris");

        assert!(build_span(EntityType::Location, 5, 5, "nero".into(), text).is_err());
        assert!(build_span(EntityType::Location, 6, 2, "nero".into(), text).is_err());
        assert!(build_span(EntityType::Location, 0, 14, "nero".into(), text).is_err());
        assert!(build_span(EntityType::Location, 0, 13, "nero".into(), text).is_ok());
    }

    #[test]
    fn test_build_span_rejects_split_char() {
        // 'é' ocupa os bytes 0..2
        let text = "élève";
        let err = build_span(EntityType::Person, 1, 3, "nero".into(), text).unwrap_err();
        assert!(matches!(err, Error::InvalidSpan { .. }));
    }

    #[test]
    fn test_correct_span_trims_tail() {
        let text = "Victor Hugo, écrivain";
        let raw = build_span(EntityType::Person, 0, 13, "nero".into(), text).unwrap();
        assert_eq!(raw.text, "Victor Hugo, ");

        let fixed = correct_span(&raw, text).unwrap();
        assert_eq!((fixed.start, fixed.end), (0, 11));
        assert_eq!(fixed.text, "Victor Hugo");
    }

    #[test]
    fn test_correct_span_trims_leading_space_and_never_grows() {
        let text = "à  Avignon.";
        let raw = build_span(EntityType::Location, 2, text.len(), "nero".into(), text).unwrap();
        let fixed = correct_span(&raw, text).unwrap();
        assert_eq!(fixed.text, "Avignon");
        assert!(fixed.start >= raw.start && fixed.end <= raw.end);

        // idempotente
        assert_eq!(correct_span(&fixed, text).unwrap(), fixed);
    }

    #[test]
    fn test_correct_span_fails_when_nothing_left() {
        let text = "a , b";
        let raw = build_span(EntityType::Person, 1, 4, "nero".into(), text).unwrap();
        assert!(correct_span(&raw, text).is_err());
    }

    #[test]
    fn test_span_set_overlap_and_sort() {
        let mut set = SpanSet::new("nero".into());
        set.push(span(10, 15));
        set.push(span(0, 5));
        assert!(set.is_overlapping(&span(3, 8)));
        assert!(!set.is_overlapping(&span(5, 10)));

        set.sort();
        let starts: Vec<usize> = set.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 10]);
    }
}

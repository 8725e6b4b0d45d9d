//! # Contrato de Motor
//!
//! Um motor de reconhecimento é uma função opaca: recebe o texto original e
//! devolve uma [`RawOutput`]. Transporte, agendamento e timeouts ficam com quem
//! implementa [`Recognizer`]; o núcleo só converte a saída para spans no texto
//! original com [`convert`].
//!
//! | Saída                                   | Conversão                                     |
//! |-----------------------------------------|-----------------------------------------------|
//! | `Tagged(texto)`                         | [`extract_tagged`]                            |
//! | `Offsets { output: Some(texto), .. }`   | [`project_offsets`] (offsets no texto do motor) |
//! | `Offsets { output: None, .. }`          | spans construídos direto sobre o original     |

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aligner::{project_offsets, RawMention};
use crate::entity::EngineId;
use crate::error::Result;
use crate::extractor::extract_tagged;
use crate::profile::EngineProfile;
use crate::span::{build_span, correct_span, SpanSet};

/// Saída bruta de um motor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RawOutput {
    /// Cópia do texto com marcação inline
    Tagged(String),
    /// Menções com offsets. `output: None` quando os offsets já são do original.
    Offsets {
        #[serde(default)]
        output: Option<String>,
        mentions: Vec<RawMention>,
    },
}

/// Saída de um motor identificada pelo nome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOutput {
    pub engine: EngineId,
    pub output: RawOutput,
}

impl EngineOutput {
    pub fn new(engine: impl Into<EngineId>, output: RawOutput) -> Self {
        Self {
            engine: engine.into(),
            output,
        }
    }
}

/// Um motor de reconhecimento de entidades.
pub trait Recognizer: Send + Sync {
    fn id(&self) -> &EngineId;

    fn recognize(&self, text: &str) -> Result<RawOutput>;
}

/// Converte a saída de um motor em spans sobre o texto original.
///
/// Menções de tipos fora de `profile.handled_types` são descartadas.
pub fn convert(original: &str, raw: &RawOutput, profile: &EngineProfile) -> Result<SpanSet> {
    let mut set = match raw {
        RawOutput::Tagged(tagged) => extract_tagged(original, tagged, profile)?,
        RawOutput::Offsets {
            output: Some(output),
            mentions,
        } => project_offsets(original, output, mentions, profile)?,
        RawOutput::Offsets { output: None, mentions } => from_original_offsets(original, mentions, profile)?,
    };

    let before = set.len();
    set.spans.retain(|s| profile.handles(s.entity_type));
    if set.len() < before {
        debug!(
            engine = %profile.engine,
            dropped = before - set.len(),
            "menções de tipos não suportados pelo motor descartadas"
        );
    }
    Ok(set)
}

fn from_original_offsets(original: &str, mentions: &[RawMention], profile: &EngineProfile) -> Result<SpanSet> {
    let mut set = SpanSet::new(profile.engine.clone());
    for mention in mentions {
        let raw = build_span(
            mention.entity_type,
            mention.start,
            mention.end,
            profile.engine.clone(),
            original,
        )?;
        match correct_span(&raw, original) {
            Ok(span) => set.push(span),
            Err(e) => warn!(engine = %profile.engine, "menção descartada: {e}"),
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::error::Error;

    #[test]
    fn test_convert_tagged() {
        let original = "Victor Hugo est né à Besançon.";
        let raw = RawOutput::Tagged("<pers>Victor Hugo</pers> est ne a <loc>Besancon</loc>.".into());
        let set = convert(original, &raw, &EngineProfile::nero()).unwrap();
        let texts: Vec<&str> = set.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Victor Hugo", "Besançon"]);
    }

    #[test]
    fn test_convert_original_offsets() {
        let original = "Paris, 1789.";
        let raw = RawOutput::Offsets {
            output: None,
            mentions: vec![RawMention::new(EntityType::Date, 7, 12)],
        };
        let set = convert(original, &raw, &EngineProfile::dater()).unwrap();
        assert_eq!(set.spans[0].text, "1789");
        assert_eq!((set.spans[0].start, set.spans[0].end), (7, 11));
    }

    #[test]
    fn test_convert_filters_unhandled_types() {
        let raw = RawOutput::Offsets {
            output: None,
            mentions: vec![
                RawMention::new(EntityType::Location, 0, 5),
                RawMention::new(EntityType::Date, 7, 11),
            ],
        };
        let set = convert("Paris, 1789", &raw, &EngineProfile::dater()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.spans[0].entity_type, EntityType::Date);
    }

    #[test]
    fn test_convert_invalid_offsets_fail() {
        let raw = RawOutput::Offsets {
            output: None,
            mentions: vec![RawMention::new(EntityType::Date, 3, 40)],
        };
        let err = convert("Paris", &raw, &EngineProfile::dater()).unwrap_err();
        assert!(matches!(err, Error::InvalidSpan { .. }));
    }

    #[test]
    fn test_raw_output_json_shape() {
        let json = r#"{"kind":"offsets","data":{"mentions":[{"type":"DATE","start":0,"end":4}]}}"#;
        let raw: RawOutput = serde_json::from_str(json).unwrap();
        assert_eq!(
            raw,
            RawOutput::Offsets {
                output: None,
                mentions: vec![RawMention::new(EntityType::Date, 0, 4)],
            }
        );

        let tagged = serde_json::to_string(&RawOutput::Tagged("<loc>x</loc>".into())).unwrap();
        assert_eq!(tagged, r#"{"kind":"tagged","data":"<loc>x</loc>"}"#);
    }
}

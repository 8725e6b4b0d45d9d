//! # Pipeline de Fusão — Orquestrador com Eventos Observáveis
//!
//! O pipeline recebe as saídas brutas de vários motores, converte cada uma para
//! spans no texto original (em paralelo, com `rayon`) e funde tudo com o
//! [`Combiner`] na ordem de prioridade configurada.
//!
//! Cada motor é isolado: um erro de alinhamento, uma tag desconhecida ou uma
//! saída sem perfil descartam **apenas** a contribuição daquele motor, que vira
//! um [`EngineFailure`] no resultado.
//!
//! # Modos de Uso
//! - **Sync**: [`FusionPipeline::fuse`] e [`FusionPipeline::recognize_and_fuse`].
//! - **Streaming**: [`FusionPipeline::fuse_streaming`] empurra [`FusionEvent`]s
//!   por um canal `mpsc`, para o servidor WebSocket transmitir o progresso.

use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::combiner::Combiner;
use crate::config::FusionConfig;
use crate::engine::{convert, EngineOutput, Recognizer};
use crate::entity::EngineId;
use crate::error::{Error, Result};
use crate::profile::EngineProfile;
use crate::span::{Span, SpanSet};

/// Contribuição de motor descartada, com o motivo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFailure {
    pub engine: EngineId,
    pub message: String,
}

/// Resultado de uma execução do pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionOutcome {
    /// Conjunto fundido, sem sobreposições, ordenado por início
    pub spans: SpanSet,
    /// Conjuntos convertidos de cada motor, na ordem de entrada
    pub contributions: Vec<SpanSet>,
    pub failures: Vec<EngineFailure>,
    pub processing_ms: u64,
}

/// Eventos emitidos pelo pipeline durante a fusão.
///
/// Ordem: primeiro um evento por motor (`EngineConverted` ou `EngineFailed`),
/// depois uma decisão por span na ordem de prioridade, e por fim `Done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FusionEvent {
    /// Saída do motor convertida para spans no texto original.
    EngineConverted { engine: EngineId, spans: SpanSet },
    /// Contribuição do motor descartada.
    EngineFailed { engine: EngineId, message: String },
    /// Span aceito pelo combinador.
    SpanKept { span: Span },
    /// Span recusado por sobrepor `blocked_by`, já aceito antes.
    SpanDropped { span: Span, blocked_by: Span },
    /// **Conclusão**: conjunto fundido e estatísticas de tempo.
    Done {
        spans: SpanSet,
        failures: Vec<EngineFailure>,
        processing_ms: u64,
    },
}

pub struct FusionPipeline {
    profiles: HashMap<EngineId, EngineProfile>,
    combiner: Combiner,
}

impl FusionPipeline {
    /// Cria o pipeline a partir de uma configuração (validada aqui).
    pub fn new(config: FusionConfig) -> Result<Self> {
        let config = config.validated()?;
        let profiles = config
            .profiles
            .into_iter()
            .map(|p| (p.engine.clone(), p))
            .collect();
        Ok(Self {
            profiles,
            combiner: Combiner::new(config.priority),
        })
    }

    pub fn profile(&self, engine: &EngineId) -> Option<&EngineProfile> {
        self.profiles.get(engine)
    }

    /// Perfis na ordem de prioridade.
    pub fn profiles(&self) -> Vec<&EngineProfile> {
        self.combiner
            .priority
            .iter()
            .filter_map(|engine| self.profiles.get(engine))
            .collect()
    }

    pub fn combiner(&self) -> &Combiner {
        &self.combiner
    }

    /// Converte a saída de um único motor usando o perfil configurado.
    pub fn convert_one(&self, text: &str, output: &EngineOutput) -> Result<SpanSet> {
        let profile = self
            .profiles
            .get(&output.engine)
            .ok_or_else(|| Error::UnknownEngine(output.engine.clone()))?;
        convert(text, &output.output, profile)
    }

    pub fn fuse(&self, text: &str, outputs: &[EngineOutput]) -> FusionOutcome {
        self.run(text, outputs, Vec::new(), |_| {})
    }

    /// Executa a fusão enviando eventos de progresso pelo canal `tx`.
    ///
    /// Um receptor desconectado não interrompe o processamento.
    pub fn fuse_streaming(&self, text: &str, outputs: &[EngineOutput], tx: mpsc::Sender<FusionEvent>) {
        self.run(text, outputs, Vec::new(), |event| {
            let _ = tx.send(event);
        });
    }

    /// Chama todos os motores em paralelo e funde as saídas.
    pub fn recognize_and_fuse(&self, text: &str, recognizers: &[Box<dyn Recognizer>]) -> FusionOutcome {
        let (outputs, failures) = recognize_all(text, recognizers);
        self.run(text, &outputs, failures, |_| {})
    }

    fn run<F>(&self, text: &str, outputs: &[EngineOutput], mut failures: Vec<EngineFailure>, mut emit: F) -> FusionOutcome
    where
        F: FnMut(FusionEvent),
    {
        let start = Instant::now();

        for failure in &failures {
            emit(FusionEvent::EngineFailed {
                engine: failure.engine.clone(),
                message: failure.message.clone(),
            });
        }

        let converted: Vec<(EngineId, Result<SpanSet>)> = outputs
            .par_iter()
            .map(|output| (output.engine.clone(), self.convert_one(text, output)))
            .collect();

        let mut sets: HashMap<EngineId, SpanSet> = HashMap::new();
        let mut contributions = Vec::new();
        for (engine, result) in converted {
            let result = match result {
                Ok(_) if sets.contains_key(&engine) => Err(format!("saída duplicada do motor {engine}")),
                other => other.map_err(|e| e.to_string()),
            };
            match result {
                Ok(set) => {
                    emit(FusionEvent::EngineConverted {
                        engine: engine.clone(),
                        spans: set.clone(),
                    });
                    contributions.push(set.clone());
                    sets.insert(engine, set);
                }
                Err(message) => {
                    warn!(%engine, "contribuição descartada: {message}");
                    emit(FusionEvent::EngineFailed {
                        engine: engine.clone(),
                        message: message.clone(),
                    });
                    failures.push(EngineFailure { engine, message });
                }
            }
        }

        let merged = self.combiner.combine_by_priority_observed(&sets, |span, blocker| {
            let event = match blocker {
                None => FusionEvent::SpanKept { span: span.clone() },
                Some(kept) => FusionEvent::SpanDropped {
                    span: span.clone(),
                    blocked_by: kept.clone(),
                },
            };
            emit(event);
        });

        let processing_ms = start.elapsed().as_millis() as u64;
        info!(
            engines = outputs.len(),
            failures = failures.len(),
            spans = merged.len(),
            processing_ms,
            "fusão concluída"
        );

        emit(FusionEvent::Done {
            spans: merged.clone(),
            failures: failures.clone(),
            processing_ms,
        });

        FusionOutcome {
            spans: merged,
            contributions,
            failures,
            processing_ms,
        }
    }
}

/// Chama cada motor em paralelo; falhas viram [`EngineFailure`].
pub fn recognize_all(text: &str, recognizers: &[Box<dyn Recognizer>]) -> (Vec<EngineOutput>, Vec<EngineFailure>) {
    let results: Vec<(EngineId, Result<_>)> = recognizers
        .par_iter()
        .map(|r| (r.id().clone(), r.recognize(text)))
        .collect();

    let mut outputs = Vec::new();
    let mut failures = Vec::new();
    for (engine, result) in results {
        match result {
            Ok(output) => outputs.push(EngineOutput { engine, output }),
            Err(e) => {
                warn!(%engine, "motor falhou: {e}");
                failures.push(EngineFailure {
                    engine,
                    message: e.to_string(),
                });
            }
        }
    }
    (outputs, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dater::DateRecognizer;
    use crate::engine::RawOutput;
    use crate::entity::EntityType;

    const TEXT: &str = "Victor Hugo est né à Besançon le 26 février 1802.";

    fn pipeline() -> FusionPipeline {
        FusionPipeline::new(FusionConfig::default()).unwrap()
    }

    fn nero(tagged: &str) -> EngineOutput {
        EngineOutput::new("nero", RawOutput::Tagged(tagged.into()))
    }

    fn tagen() -> EngineOutput {
        EngineOutput::new(
            "tagen",
            RawOutput::Tagged(
                "<enamex><location>Victor</location></enamex> Hugo est né à Besançon le 26 février 1802.".into(),
            ),
        )
    }

    fn dater() -> EngineOutput {
        let recognizer = DateRecognizer::new().unwrap();
        EngineOutput::new("dater", recognizer.recognize(TEXT).unwrap())
    }

    const NERO_OK: &str = "<pers>Victor Hugo</pers> est ne a <loc>Besancon</loc> le <time>26 fevrier 1802</time>.";

    fn summary(set: &SpanSet) -> Vec<(EntityType, &str, &str)> {
        set.iter()
            .map(|s| (s.entity_type, s.text.as_str(), s.engine.as_str()))
            .collect()
    }

    #[test]
    fn test_fuse_by_priority() {
        let outcome = pipeline().fuse(TEXT, &[nero(NERO_OK), tagen(), dater()]);
        assert!(outcome.failures.is_empty());
        assert_eq!(
            summary(&outcome.spans),
            vec![
                (EntityType::Person, "Victor Hugo", "nero"),
                (EntityType::Location, "Besançon", "nero"),
                (EntityType::Date, "26 février 1802", "dater"),
            ]
        );
        assert_eq!(outcome.contributions.len(), 3);
        assert_eq!(outcome.spans.spans[1].start, 23);
    }

    #[test]
    fn test_failing_engine_is_isolated() {
        let broken = nero("<pers>Victor Hugo</pers> est <foo>ne</foo> a Besancon le 26 fevrier 1802.");
        let outcome = pipeline().fuse(TEXT, &[broken, tagen(), dater()]);

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].engine.as_str(), "nero");
        assert!(outcome.failures[0].message.contains("foo"));
        assert_eq!(
            summary(&outcome.spans),
            vec![
                (EntityType::Location, "Victor", "tagen"),
                (EntityType::Date, "26 février 1802", "dater"),
            ]
        );
    }

    #[test]
    fn test_unknown_engine_fails_alone() {
        let stray = EngineOutput::new("opennlp", RawOutput::Tagged(TEXT.into()));
        let outcome = pipeline().fuse(TEXT, &[stray, dater()]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].engine.as_str(), "opennlp");
        assert_eq!(outcome.spans.len(), 1);
    }

    #[test]
    fn test_duplicate_output_keeps_first() {
        let outcome = pipeline().fuse(TEXT, &[dater(), dater()]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.spans.len(), 1);
    }

    #[test]
    fn test_streaming_event_order() {
        let (tx, rx) = mpsc::channel();
        pipeline().fuse_streaming(TEXT, &[nero(NERO_OK), tagen(), dater()], tx);
        let events: Vec<FusionEvent> = rx.iter().collect();

        let engine_events = events
            .iter()
            .take_while(|e| matches!(e, FusionEvent::EngineConverted { .. } | FusionEvent::EngineFailed { .. }))
            .count();
        assert_eq!(engine_events, 3);

        let kept = events.iter().filter(|e| matches!(e, FusionEvent::SpanKept { .. })).count();
        let dropped: Vec<&Span> = events
            .iter()
            .filter_map(|e| match e {
                FusionEvent::SpanDropped { span, .. } => Some(span),
                _ => None,
            })
            .collect();
        assert_eq!(kept, 3);
        // a data do nero perde para o dater; "Victor" do tagen perde para o nero
        assert_eq!(dropped.len(), 2);

        match events.last() {
            Some(FusionEvent::Done { spans, failures, .. }) => {
                assert_eq!(spans.len(), 3);
                assert!(failures.is_empty());
            }
            other => panic!("último evento inesperado: {other:?}"),
        }
    }

    #[test]
    fn test_event_json_shape() {
        let event = FusionEvent::EngineFailed {
            engine: "nero".into(),
            message: "x".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "EngineFailed");
        assert_eq!(json["data"]["engine"], "nero");
    }

    struct Fixed {
        id: EngineId,
        output: Option<RawOutput>,
    }

    impl Recognizer for Fixed {
        fn id(&self) -> &EngineId {
            &self.id
        }

        fn recognize(&self, _text: &str) -> Result<RawOutput> {
            self.output.clone().ok_or_else(|| Error::Recognizer {
                engine: self.id.clone(),
                message: "serviço indisponível".into(),
            })
        }
    }

    #[test]
    fn test_recognize_and_fuse() {
        let recognizers: Vec<Box<dyn Recognizer>> = vec![
            Box::new(Fixed {
                id: "nero".into(),
                output: None,
            }),
            Box::new(Fixed {
                id: "tagen".into(),
                output: Some(tagen().output),
            }),
            Box::new(DateRecognizer::new().unwrap()),
        ];
        let outcome = pipeline().recognize_and_fuse(TEXT, &recognizers);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].message.contains("indisponível"));
        assert_eq!(outcome.spans.len(), 2);
    }
}

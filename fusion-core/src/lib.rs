//! # fusion-core — Alinhamento e Fusão de Motores NER
//!
//! Vários motores de reconhecimento de entidades (modelos locais, serviços web
//! externos) são executados sobre o mesmo texto. Cada um devolve suas menções de
//! um jeito: marcação inline sobre uma cópia modificada do texto, offsets sobre
//! o próprio texto de saída, ou offsets já no original. Este crate resolve dois
//! problemas:
//!
//! 1. **Alinhamento**: recuperar offsets exatos no texto original, tolerando
//!    acentos removidos, espaços alterados, numerais reescritos e marcação.
//! 2. **Fusão**: combinar os conjuntos de menções em um único conjunto sem
//!    sobreposições, seguindo uma ordem de prioridade entre motores.
//!
//! ## Arquitetura
//!
//! 1.  **Entrada**: texto original + saída bruta de cada motor ([`RawOutput`]).
//! 2.  **Perfis** ([`profile`]): cada motor é descrito por um registro de estratégia.
//! 3.  **Alinhamento** ([`aligner`], [`extractor`]): reconciliação com dois cursores.
//! 4.  **Combinação** ([`combiner`]): prioridade, sem cortes, sem sobreposição.
//! 5.  **Saída**: um [`SpanSet`] em coordenadas do original.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use fusion_core::{EngineOutput, FusionConfig, FusionPipeline, RawOutput};
//!
//! let pipeline = FusionPipeline::new(FusionConfig::default()).unwrap();
//!
//! let text = "Victor Hugo est né à Besançon.";
//! let nero = EngineOutput::new(
//!     "nero",
//!     RawOutput::Tagged("<pers>Victor Hugo</pers> est ne a <loc>Besancon</loc>.".into()),
//! );
//!
//! let outcome = pipeline.fuse(text, &[nero]);
//! for span in &outcome.spans {
//!     println!("{} [{}, {}) {}", span.text, span.start, span.end, span.entity_type);
//! }
//! assert_eq!(outcome.spans.len(), 2);
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: orquestrador com isolamento de falhas e eventos observáveis.
//! - [`aligner`]: reconciliação de textos e projeção de offsets.
//! - [`extractor`]: extração de menções a partir de marcação inline.
//! - [`combiner`]: fusão por prioridade.
//! - [`dater`]: motor interno de datas.

pub mod aligner;
pub mod combiner;
pub mod config;
pub mod dater;
pub mod engine;
pub mod entity;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod profile;
pub mod span;
pub mod text;

pub use aligner::{align, project_offsets, RawMention};
pub use combiner::{combine, Combiner};
pub use config::FusionConfig;
pub use dater::DateRecognizer;
pub use engine::{convert, EngineOutput, RawOutput, Recognizer};
pub use entity::{EngineId, EntityType};
pub use error::{Error, Result};
pub use extractor::extract_tagged;
pub use pipeline::{EngineFailure, FusionEvent, FusionOutcome, FusionPipeline};
pub use profile::EngineProfile;
pub use span::{Span, SpanSet};

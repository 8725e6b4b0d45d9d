//! # Motor de Datas
//!
//! Motor interno, baseado apenas em regras (regex), que reconhece datas em
//! francês e inglês direto sobre o texto original:
//!
//! - datas completas: `14 juillet 1789`, `1er mai 1890`, `July 14, 1789`, `4 July 1776`;
//! - mês e ano: `juillet 1789`, `March 1917`;
//! - anos isolados de quatro dígitos entre 1000 e 2099.
//!
//! As alternativas são tentadas da mais longa para a mais curta e a busca nunca
//! devolve correspondências sobrepostas. Por reportar offsets do próprio original,
//! costuma ficar no topo da ordem de prioridade.

use regex::Regex;
use tracing::debug;

use crate::aligner::RawMention;
use crate::engine::{RawOutput, Recognizer};
use crate::entity::{EngineId, EntityType};
use crate::error::{Error, Result};

/// Nome do motor de datas.
pub const DATER_ID: &str = "dater";

const MONTHS: &str = "janvier|février|fevrier|mars|avril|mai|juin|juillet|août|aout|septembre|octobre|novembre|décembre|decembre|january|february|march|april|may|june|july|august|september|october|november|december";

const YEAR: &str = r"(?:1\d{3}|20\d{2})";

pub struct DateRecognizer {
    id: EngineId,
    pattern: Regex,
}

impl DateRecognizer {
    pub fn new() -> Result<Self> {
        let day = r"(?:1er|0?[1-9]|[12]\d|3[01])(?:st|nd|rd|th)?";
        let pattern = format!(
            r"(?i)\b(?:{day}\s+(?:{MONTHS})\s+{YEAR}|(?:{MONTHS})\s+{day},?\s+{YEAR}|(?:{MONTHS})\s+{YEAR}|{YEAR})\b"
        );
        let pattern = Regex::new(&pattern).map_err(|e| Error::config(format!("padrão de datas inválido: {e}")))?;
        Ok(Self {
            id: EngineId::from(DATER_ID),
            pattern,
        })
    }

    /// Datas encontradas no texto, em ordem e sem sobreposição.
    pub fn find_dates(&self, text: &str) -> Vec<RawMention> {
        self.pattern
            .find_iter(text)
            .map(|m| RawMention::new(EntityType::Date, m.start(), m.end()))
            .collect()
    }
}

impl Recognizer for DateRecognizer {
    fn id(&self) -> &EngineId {
        &self.id
    }

    fn recognize(&self, text: &str) -> Result<RawOutput> {
        let mentions = self.find_dates(text);
        debug!(found = mentions.len(), "datas reconhecidas");
        Ok(RawOutput::Offsets { output: None, mentions })
    }
}

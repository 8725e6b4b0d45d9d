//! # Perfis de Motor
//!
//! Em vez de um conversor por motor, cada motor externo é descrito por um
//! [`EngineProfile`]: um registro de estratégia consumido pelo alinhador e pelo
//! extrator de tags compartilhados.
//!
//! | Campo              | Uso                                                          |
//! |--------------------|--------------------------------------------------------------|
//! | `tag_table`        | nome de tag → [`EntityType`]                                 |
//! | `ignore_list`      | tags aceitas mas que não geram menção (ex: `<unk>`)          |
//! | `range_tags`       | tags de intervalo (ex: `<range>1914-1918</range>`)            |
//! | `range_separators` | separadores usados para quebrar intervalos                    |
//! | `empty_tag_type`   | tipo assumido para a tag vazia `<>`                          |
//! | `diacritic_skip`   | o motor remove acentos                                       |
//! | `digit_run_skip`   | o motor reescreve numerais (ex: `14` → `quatorze`)            |
//! | `handled_types`    | tipos que o motor sabe produzir (vazio = todos)              |
//!
//! Nomes de tag são comparados sem diferenciar maiúsculas: as tabelas são
//! guardadas em minúsculas ([`EngineProfile::normalized`]).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::entity::{EngineId, EntityType};

/// Resultado da consulta de uma tag de abertura no perfil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// Tag mapeada para um tipo: gera menção ao fechar.
    Typed(EntityType),
    /// Tag conhecida, mas sem menção.
    Ignored,
    /// Tag de intervalo: pede a quebra da menção que a envolve.
    Range,
    /// Fora do vocabulário do motor.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineProfile {
    pub engine: EngineId,
    #[serde(default)]
    pub tag_table: HashMap<String, EntityType>,
    #[serde(default)]
    pub ignore_list: HashSet<String>,
    #[serde(default)]
    pub range_tags: HashSet<String>,
    #[serde(default = "default_range_separators")]
    pub range_separators: String,
    #[serde(default)]
    pub empty_tag_type: Option<EntityType>,
    #[serde(default)]
    pub diacritic_skip: bool,
    #[serde(default)]
    pub digit_run_skip: bool,
    #[serde(default)]
    pub handled_types: Vec<EntityType>,
}

fn default_range_separators() -> String {
    "-".to_string()
}

impl EngineProfile {
    /// Perfil sem marcação e sem regras opcionais: só igualdade e pulos estruturais.
    pub fn plain(engine: impl Into<EngineId>) -> Self {
        Self {
            engine: engine.into(),
            tag_table: HashMap::new(),
            ignore_list: HashSet::new(),
            range_tags: HashSet::new(),
            range_separators: default_range_separators(),
            empty_tag_type: None,
            diacritic_skip: false,
            digit_run_skip: false,
            handled_types: Vec::new(),
        }
    }

    pub fn with_tag(mut self, name: &str, entity_type: EntityType) -> Self {
        self.tag_table.insert(name.to_lowercase(), entity_type);
        self
    }

    pub fn ignoring(mut self, name: &str) -> Self {
        self.ignore_list.insert(name.to_lowercase());
        self
    }

    pub fn with_range_tag(mut self, name: &str) -> Self {
        self.range_tags.insert(name.to_lowercase());
        self
    }

    pub fn with_range_separators(mut self, separators: &str) -> Self {
        self.range_separators = separators.to_string();
        self
    }

    pub fn with_empty_tag_type(mut self, entity_type: EntityType) -> Self {
        self.empty_tag_type = Some(entity_type);
        self
    }

    pub fn with_diacritic_skip(mut self, enabled: bool) -> Self {
        self.diacritic_skip = enabled;
        self
    }

    pub fn with_digit_run_skip(mut self, enabled: bool) -> Self {
        self.digit_run_skip = enabled;
        self
    }

    pub fn handling(mut self, types: &[EntityType]) -> Self {
        self.handled_types = types.to_vec();
        self
    }

    /// Garante tabelas em minúsculas (perfis vindos de JSON podem não estar).
    pub fn normalized(mut self) -> Self {
        self.tag_table = self
            .tag_table
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        self.ignore_list = self.ignore_list.into_iter().map(|k| k.to_lowercase()).collect();
        self.range_tags = self.range_tags.into_iter().map(|k| k.to_lowercase()).collect();
        self
    }

    /// Classifica uma tag de abertura (nome já sem `<`, `>` e atributos).
    pub fn resolve_tag(&self, name: &str) -> TagKind {
        let key = name.to_lowercase();
        if let Some(t) = self.tag_table.get(&key) {
            TagKind::Typed(*t)
        } else if self.range_tags.contains(&key) {
            TagKind::Range
        } else if self.ignore_list.contains(&key) {
            TagKind::Ignored
        } else {
            TagKind::Unknown
        }
    }

    pub fn is_range_tag(&self, name: &str) -> bool {
        self.range_tags.contains(&name.to_lowercase())
    }

    pub fn handles(&self, entity_type: EntityType) -> bool {
        self.handled_types.is_empty() || self.handled_types.contains(&entity_type)
    }

    /// Motor em francês com marcação inline `<pers>…</pers>` (tags curtas, acentos
    /// removidos, numerais por extenso e tag vazia `<>` para datas).
    pub fn nero() -> Self {
        EngineProfile::plain("nero")
            .with_tag("fonc", EntityType::Function)
            .with_tag("loc", EntityType::Location)
            .with_tag("org", EntityType::Organization)
            .with_tag("pers", EntityType::Person)
            .with_tag("prod", EntityType::Production)
            .with_tag("time", EntityType::Date)
            .ignoring("amount")
            .ignoring("unk")
            .with_empty_tag_type(EntityType::Date)
            .with_diacritic_skip(true)
            .with_digit_run_skip(true)
            .handling(&[
                EntityType::Date,
                EntityType::Function,
                EntityType::Location,
                EntityType::Organization,
                EntityType::Person,
                EntityType::Production,
            ])
    }

    /// Motor com marcação aninhada estilo MUC: `<enamex><person>…</person></enamex>`,
    /// `<timex><date><range>1914-1918</range></date></timex>`.
    pub fn tagen() -> Self {
        EngineProfile::plain("tagen")
            .with_tag("date", EntityType::Date)
            .with_tag("location", EntityType::Location)
            .with_tag("organization", EntityType::Organization)
            .with_tag("person", EntityType::Person)
            .ignoring("enamex")
            .ignoring("timex")
            .ignoring("numex")
            .ignoring("time")
            .ignoring("percent")
            .ignoring("money")
            .with_range_tag("range")
            .handling(&[
                EntityType::Date,
                EntityType::Location,
                EntityType::Organization,
                EntityType::Person,
            ])
    }

    /// Motor interno de datas ([`crate::dater::DateRecognizer`]): offsets já no texto original.
    pub fn dater() -> Self {
        EngineProfile::plain(crate::dater::DATER_ID).handling(&[EntityType::Date])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_tag_case_insensitive() {
        let profile = EngineProfile::nero();
        assert_eq!(profile.resolve_tag("PERS"), TagKind::Typed(EntityType::Person));
        assert_eq!(profile.resolve_tag("unk"), TagKind::Ignored);
        assert_eq!(profile.resolve_tag("foo"), TagKind::Unknown);
    }

    #[test]
    fn test_range_tag_wins_over_ignore() {
        let profile = EngineProfile::tagen();
        assert_eq!(profile.resolve_tag("range"), TagKind::Range);
        assert!(profile.is_range_tag("RANGE"));
        assert_eq!(profile.resolve_tag("timex"), TagKind::Ignored);
    }

    #[test]
    fn test_profile_from_json_is_normalized() {
        let json = r#"{
            "engine": "custom",
            "tag_table": { "LOC": "LOCATION" },
            "ignore_list": ["Misc"]
        }"#;
        let profile: EngineProfile = serde_json::from_str(json).unwrap();
        let profile = profile.normalized();
        assert_eq!(profile.resolve_tag("loc"), TagKind::Typed(EntityType::Location));
        assert_eq!(profile.resolve_tag("misc"), TagKind::Ignored);
        assert_eq!(profile.range_separators, "-");
        assert!(!profile.diacritic_skip);
    }

    #[test]
    fn test_handles() {
        assert!(EngineProfile::plain("x").handles(EntityType::Production));
        assert!(EngineProfile::dater().handles(EntityType::Date));
        assert!(!EngineProfile::dater().handles(EntityType::Person));
    }
}

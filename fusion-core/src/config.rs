//! # Configuração
//!
//! Perfis de motor e ordem de prioridade, carregados de JSON:
//!
//! ```json
//! {
//!   "profiles": [{ "engine": "meu-motor", "tag_table": { "PER": "PERSON" } }],
//!   "priority": ["dater", "meu-motor"]
//! }
//! ```
//!
//! Sem arquivo, vale [`FusionConfig::default`]: perfis `dater`, `nero` e `tagen`,
//! com o motor de datas na frente.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dater::DATER_ID;
use crate::entity::EngineId;
use crate::error::{Error, Result};
use crate::profile::EngineProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    pub profiles: Vec<EngineProfile>,
    pub priority: Vec<EngineId>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            profiles: vec![EngineProfile::dater(), EngineProfile::nero(), EngineProfile::tagen()],
            priority: vec![DATER_ID.into(), "nero".into(), "tagen".into()],
        }
    }
}

impl FusionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FusionConfig = serde_json::from_str(json)?;
        config.validated()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        info!(path = %path.display(), profiles = config.profiles.len(), "configuração carregada");
        Ok(config)
    }

    /// Normaliza as tabelas dos perfis e rejeita configurações ambíguas.
    pub fn validated(mut self) -> Result<Self> {
        self.profiles = self.profiles.into_iter().map(EngineProfile::normalized).collect();

        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if !seen.insert(&profile.engine) {
                return Err(Error::config(format!("perfil duplicado para o motor {}", profile.engine)));
            }
            if profile.range_separators.is_empty() && !profile.range_tags.is_empty() {
                return Err(Error::config(format!(
                    "motor {} tem tags de intervalo sem separadores",
                    profile.engine
                )));
            }
        }

        if self.priority.is_empty() {
            return Err(Error::config("ordem de prioridade vazia"));
        }
        let mut ranked = HashSet::new();
        for engine in &self.priority {
            if !ranked.insert(engine) {
                return Err(Error::config(format!("motor {engine} repetido na prioridade")));
            }
            if !seen.contains(engine) {
                return Err(Error::config(format!("motor {engine} na prioridade sem perfil configurado")));
            }
        }
        Ok(self)
    }

    pub fn profile(&self, engine: &EngineId) -> Option<&EngineProfile> {
        self.profiles.iter().find(|p| &p.engine == engine)
    }
}

//! # Tipos de Entidade e Identidade dos Motores
//!
//! Vocabulário fechado de tipos usado por todos os motores depois da conversão.
//!
//! | Tipo           | Significado             | Exemplos                              |
//! |----------------|-------------------------|---------------------------------------|
//! | DATE           | Data ou período         | 14 juillet 1789, 1914-1918            |
//! | LOCATION       | Local/Geográfico        | Paris, Avignon, Loire                 |
//! | ORGANIZATION   | Organização             | ONU, Renault, Université d'Avignon    |
//! | PERSON         | Pessoa                  | Victor Hugo, Marie Curie              |
//! | FUNCTION       | Cargo/Função            | président, ministre                   |
//! | PRODUCTION     | Obra/Produto            | Les Misérables                        |
//!
//! Cada motor declara o subconjunto que sabe produzir em seu
//! [`crate::profile::EngineProfile`].

use serde::{Deserialize, Serialize};

/// Categorias de entidade reconhecidas após a conversão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Date,
    Location,
    Organization,
    Person,
    /// **Função**: cargos e títulos. Ex: "président de la République".
    Function,
    /// **Produção**: obras, produtos, leis. Ex: "Les Misérables".
    Production,
}

impl EntityType {
    /// Nome do tipo como string (igual à forma serializada)
    pub fn name(&self) -> &'static str {
        match self {
            EntityType::Date => "DATE",
            EntityType::Location => "LOCATION",
            EntityType::Organization => "ORGANIZATION",
            EntityType::Person => "PERSON",
            EntityType::Function => "FUNCTION",
            EntityType::Production => "PRODUCTION",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Identificador de um motor (ou do próprio combinador) que produziu menções.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineId(String);

impl EngineId {
    pub fn new(name: impl Into<String>) -> Self {
        EngineId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EngineId {
    fn from(s: &str) -> Self {
        EngineId::new(s)
    }
}

impl From<String> for EngineId {
    fn from(s: String) -> Self {
        EngineId(s)
    }
}

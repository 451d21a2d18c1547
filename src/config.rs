//! Per-category search configuration.
//!
//! Each category (technology, law, ...) has its own query file:
//!
//! ```json
//! {
//!   "filtros_de_busca": {
//!     "palavras_chave": ["engenheiro de software", "rust"],
//!     "modalidades": ["remoto", "híbrido"]
//!   },
//!   "configuracoes_gerais": {
//!     "plataformas_alvo": ["gupy"],
//!     "limite_vagas_por_pesquisa": 25
//!   }
//! }
//! ```
//!
//! Files ending in `.yaml` or `.yml` are read as YAML, everything else as JSON.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::{Result, ScrapeError};

/// Raw query file as written by hand.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub filtros_de_busca: SearchFilters,
    pub configuracoes_gerais: GeneralSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchFilters {
    pub palavras_chave: Vec<String>,
    pub modalidades: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralSettings {
    pub plataformas_alvo: Vec<String>,
    pub limite_vagas_por_pesquisa: u32,
}

/// The search matrix extracted from a [`SearchConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParameters {
    pub keywords: Vec<String>,
    pub work_modes: Vec<String>,
    pub platforms: Vec<String>,
    pub limit: u32,
}

impl From<SearchConfig> for SearchParameters {
    fn from(config: SearchConfig) -> Self {
        Self {
            keywords: config.filtros_de_busca.palavras_chave,
            work_modes: config.filtros_de_busca.modalidades,
            platforms: config.configuracoes_gerais.plataformas_alvo,
            limit: config.configuracoes_gerais.limite_vagas_por_pesquisa,
        }
    }
}

impl SearchParameters {
    /// Number of searches the matrix would issue if every platform resolved.
    pub fn combination_count(&self) -> usize {
        self.platforms.len() * self.keywords.len() * self.work_modes.len()
    }
}

/// Load a category's query file.
///
/// A missing file yields [`ScrapeError::ConfigMissing`] so the caller can skip
/// just that category.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_search_config(path: &Path) -> Result<SearchConfig> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScrapeError::ConfigMissing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(ScrapeError::config_invalid(path, e)),
    };

    let config = if is_yaml(path) {
        serde_yaml::from_str(&raw).map_err(|e| ScrapeError::config_invalid(path, e))?
    } else {
        serde_json::from_str(&raw).map_err(|e| ScrapeError::config_invalid(path, e))?
    };
    info!("Loaded search configuration");
    Ok(config)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// One independent scraping run: its query file, output file and sync route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub queries_path: PathBuf,
    pub destination: PathBuf,
    pub sync_route: String,
}

impl Category {
    /// Build a category using the `queries_<name>.json` / `db_<name>.json` /
    /// `/vagas-<name>` naming scheme.
    pub fn conventional(name: &str, config_dir: &Path, output_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            queries_path: config_dir.join(format!("queries_{name}.json")),
            destination: output_dir.join(format!("db_{name}.json")),
            sync_route: format!("/vagas-{name}"),
        }
    }
}

/// Category names scraped when none are given on the command line.
pub const DEFAULT_CATEGORIES: [&str; 2] = ["tecnologia", "direito"];

/// Resolve the categories to run, preserving the requested order.
pub fn categories(names: &[String], config_dir: &Path, output_dir: &Path) -> Vec<Category> {
    if names.is_empty() {
        DEFAULT_CATEGORIES
            .iter()
            .map(|name| Category::conventional(name, config_dir, output_dir))
            .collect()
    } else {
        names
            .iter()
            .map(|name| Category::conventional(&name.to_lowercase(), config_dir, output_dir))
            .collect()
    }
}

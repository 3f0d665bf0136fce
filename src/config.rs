// ============================================================================
// Configuration
// ============================================================================
// Ordre de priorité (le dernier gagne) :
// 1. Valeurs par défaut
// 2. Fichier TOML (--config, ./tradeviz.toml, ou ~/.config/tradeviz/tradeviz.toml)
// 3. Variables d'environnement (TRADEVIZ_SYMBOL, TRADEVIZ_DEFAULT_CSV)
// 4. Arguments de ligne de commande (appliqués dans main.rs)
// ============================================================================

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{MarkerMode, Timeframe};

/// Nom du fichier de configuration
pub const CONFIG_FILE_NAME: &str = "tradeviz.toml";

/// Paramètres de l'application
///
/// CONCEPT RUST : #[serde(default)]
/// - Les champs absents du fichier prennent la valeur de Default
/// - Un fichier partiel (ou vide) reste valide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ticker de l'historique de prix
    pub symbol: String,

    /// Profondeur de l'historique de prix
    pub timeframe: Timeframe,

    /// Fichier CSV chargé au démarrage
    pub default_csv: PathBuf,

    /// Fichier proposé à l'export
    pub export_path: PathBuf,

    /// Titre du graphique
    pub chart_title: String,

    /// Politique de taille des marqueurs au démarrage
    pub marker_mode: MarkerMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbol: "3350.T".to_string(),
            timeframe: Timeframe::default(),
            default_csv: PathBuf::from("data/3350 - default.csv"),
            export_path: PathBuf::from("MetaplanetTradingData.csv"),
            chart_title: "My METΔPLΔNET Trading History".to_string(),
            marker_mode: MarkerMode::default(),
        }
    }
}

impl Settings {
    /// Parse un contenu TOML
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Fichier de configuration TOML invalide")
    }

    /// Charge un fichier de configuration précis
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Charge la configuration complète (fichier puis environnement)
    ///
    /// Un chemin explicite doit exister ; sinon on cherche le fichier dans le
    /// répertoire courant puis dans le répertoire de config utilisateur, et on
    /// retombe sur les valeurs par défaut.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                Self::from_file(path)?
            }
            None => match Self::discover() {
                Some(path) => Self::from_discovered(&path),
                None => {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        settings.apply_env();
        Ok(settings)
    }

    /// Charge un fichier trouvé automatiquement
    ///
    /// Contrairement à --config, un fichier illisible n'empêche pas le
    /// démarrage : on retombe sur les valeurs par défaut.
    fn from_discovered(path: &Path) -> Self {
        info!(path = %path.display(), "Loading discovered configuration file");
        Self::from_file(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %format!("{:#}", e), "Invalid configuration file, using defaults");
            Self::default()
        })
    }

    /// Cherche tradeviz.toml (répertoire courant, puis ~/.config/tradeviz/)
    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("tradeviz").join(CONFIG_FILE_NAME))
            .filter(|path| path.is_file())
    }

    /// Applique les surcharges d'environnement
    fn apply_env(&mut self) {
        if let Some(symbol) = env_value("TRADEVIZ_SYMBOL") {
            debug!(symbol = %symbol, "Symbol overridden by environment");
            self.symbol = symbol;
        }
        if let Some(path) = env_value("TRADEVIZ_DEFAULT_CSV") {
            debug!(path = %path, "Default CSV overridden by environment");
            self.default_csv = PathBuf::from(path);
        }
    }
}

/// Variable d'environnement non vide
fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ============================================================================
// Taille des marqueurs
// ============================================================================
// Calcule la taille visuelle d'un marqueur d'achat/vente selon le volume
//
// Trois politiques :
// - Fixed        : taille constante (50)
// - Stepped      : 4 paliers (100 / 140 / 180 / 220)
// - Proportional : volume * 0.02, avec un plancher de 20
// ============================================================================

use serde::{Deserialize, Serialize};

/// Taille constante du mode Fixed
pub const FIXED_MARKER_SIZE: f64 = 50.0;

/// Facteur du mode Proportional
pub const PROPORTIONAL_FACTOR: f64 = 0.02;

/// Taille minimale du mode Proportional (petits trades toujours visibles)
pub const PROPORTIONAL_FLOOR: f64 = 20.0;

/// Paliers du mode Stepped : (seuil exclusif, taille)
const STEPS: [(f64, f64); 3] = [(1_000.0, 100.0), (2_000.0, 140.0), (10_000.0, 180.0)];

/// Taille au-delà du dernier palier
const TOP_STEP_SIZE: f64 = 220.0;

/// Politique de taille des marqueurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerMode {
    Fixed,
    #[default]
    Stepped,
    Proportional,
}

impl MarkerMode {
    /// Label pour l'affichage
    pub fn label(&self) -> &'static str {
        match self {
            MarkerMode::Fixed => "Fixed size",
            MarkerMode::Stepped => "Step size",
            MarkerMode::Proportional => "Proportional size",
        }
    }

    /// Mode suivant (cycle, touche 'm')
    pub fn next(&self) -> MarkerMode {
        match self {
            MarkerMode::Fixed => MarkerMode::Stepped,
            MarkerMode::Stepped => MarkerMode::Proportional,
            MarkerMode::Proportional => MarkerMode::Fixed, // Boucle
        }
    }
}

/// Retourne la taille du marqueur pour un volume donné
///
/// Fonction pure et totale : un volume non fini retombe sur la plus petite
/// taille du mode.
pub fn marker_size(volume: f64, mode: MarkerMode) -> f64 {
    match mode {
        MarkerMode::Fixed => FIXED_MARKER_SIZE,
        MarkerMode::Stepped => {
            if !volume.is_finite() {
                return STEPS[0].1;
            }
            STEPS
                .iter()
                .find(|&&(threshold, _)| volume < threshold)
                .map(|&(_, size)| size)
                .unwrap_or(TOP_STEP_SIZE)
        }
        MarkerMode::Proportional => {
            if !volume.is_finite() {
                return PROPORTIONAL_FLOOR;
            }
            (volume * PROPORTIONAL_FACTOR).max(PROPORTIONAL_FLOOR)
        }
    }
}

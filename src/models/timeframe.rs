// ============================================================================
// Timeframe : fenêtre de l'historique de prix
// ============================================================================
// Période récupérée depuis la source de prix pour combler les dates absentes
// du fichier par défaut (3 mois par défaut)
// ============================================================================

use serde::{Deserialize, Serialize};

/// Période de l'historique de prix
///
/// CONCEPT RUST : #[serde(rename = "...")]
/// - Permet d'écrire timeframe = "3mo" dans tradeviz.toml
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1 mois (30 jours)
    #[serde(rename = "1mo")]
    OneMonth,
    /// 3 mois
    #[default]
    #[serde(rename = "3mo")]
    ThreeMonths,
    /// 6 mois
    #[serde(rename = "6mo")]
    SixMonths,
    /// 1 an
    #[serde(rename = "1y")]
    OneYear,
    /// 2 ans (730 jours)
    #[serde(rename = "2y")]
    TwoYears,
}

impl Timeframe {
    /// Retourne le nombre de jours correspondant
    pub fn to_days(&self) -> u32 {
        match self {
            Timeframe::OneMonth => 30,
            Timeframe::ThreeMonths => 90,
            Timeframe::SixMonths => 180,
            Timeframe::OneYear => 365,
            Timeframe::TwoYears => 730,
        }
    }

    /// Retourne le label pour l'affichage
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::OneMonth => "1M",
            Timeframe::ThreeMonths => "3M",
            Timeframe::SixMonths => "6M",
            Timeframe::OneYear => "1Y",
            Timeframe::TwoYears => "2Y",
        }
    }
}

// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
// et la logique de réconciliation des tableaux
//
// CONCEPT RUST : Modules et visibilité
// - "pub mod" : déclare un sous-module publique (accessible depuis l'extérieur)
// - Sans "pub", le module serait privé au crate
// ============================================================================

pub mod chart;     // Modèle du graphique (séries + marqueurs)
pub mod marker;    // Taille des marqueurs selon le volume
pub mod numeric;   // Coercion des valeurs numériques
pub mod record;    // Une ligne du tableau
pub mod table;     // Tableau + merge / comblement / événements
pub mod timeframe; // Fenêtre de l'historique de prix

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use tradeviz::models::table::TradeTable;
// On peut faire : use tradeviz::models::TradeTable;
pub use chart::{ChartMarker, ChartModel};
pub use marker::{marker_size, MarkerMode};
pub use numeric::{normalize_numeric, parse_cell, RawValue};
pub use record::{format_date, parse_date, Field, PricePoint, TradeRecord, TradeSide};
pub use table::{Events, TradeEvent, TradeTable};
pub use timeframe::Timeframe;

// ============================================================================
// Module : api
// ============================================================================
// Source externe de l'historique de prix (Yahoo Finance)
// ============================================================================

pub mod yahoo;  // Client API Yahoo Finance

// Re-export des fonctions principales
pub use yahoo::fetch_price_history;

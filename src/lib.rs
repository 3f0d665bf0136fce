// ============================================================================
// TradeViz - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;     // API Yahoo Finance
pub mod app;     // État de l'interface
pub mod config;  // Paramètres (fichier TOML + variables d'environnement)
pub mod models;  // Structures de données + réconciliation
pub mod session; // Tableau enregistré / tampon d'édition
pub mod store;   // Import / export CSV
pub mod ui;      // Interface utilisateur

// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod chart;     // Rendu du graphique des trades
pub mod dashboard; // Rendu de l'interface principale (tableau + barres)
pub mod events;    // Gestion des événements clavier

// Re-exports pour simplifier les imports
pub use dashboard::render;
pub use events::{action_for, input_action_for, Action, Event, EventHandler};

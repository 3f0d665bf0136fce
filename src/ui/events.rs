// ============================================================================
// Gestion des événements
// ============================================================================
// Gère les événements clavier et les ticks de l'application
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Error handling avec Result
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Tick régulier (pas d'événement pendant le timeout)
    Tick,
}

/// Gestionnaire d'événements
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    /// Crée un nouveau gestionnaire d'événements (tick de 250ms)
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
        }
    }

    /// Lit le prochain événement (bloquant avec timeout)
    ///
    /// CONCEPT : Non-blocking I/O avec timeout
    /// - poll(timeout) attend au maximum tick_rate
    /// - Si pas d'événement, retourne Ok(Event::Tick)
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                // Sur certains OS, on reçoit Press ET Release
                // On ne veut gérer que Press pour éviter les doublons
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
                _ => Ok(Event::Tick),
            }
        } else {
            Ok(Event::Tick)
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Actions
// ============================================================================
// CONCEPT RUST : Pattern matching sur KeyCode
// - Une touche -> une action, indépendamment de l'écran
// - main.rs décide ensuite si l'action s'applique à l'écran courant
// ============================================================================

/// Action demandée par une touche
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
    Backspace,
    ToggleChart,
    AddRow,
    DeleteRow,
    Save,
    Revert,
    Upload,
    Export,
    CycleMarker,
    EditTitle,
    Char(char),
}

/// Action d'une touche hors mode saisie
pub fn action_for(event: &Event) -> Option<Action> {
    let Event::Key(key) = event else {
        return None;
    };

    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => Action::Quit,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Enter => Action::Enter,
        KeyCode::Esc => Action::Escape,
        KeyCode::Tab | KeyCode::Char('c') => Action::ToggleChart,
        KeyCode::Char('a') => Action::AddRow,
        KeyCode::Char('d') => Action::DeleteRow,
        KeyCode::Char('s') => Action::Save,
        KeyCode::Char('r') => Action::Revert,
        KeyCode::Char('u') => Action::Upload,
        KeyCode::Char('x') => Action::Export,
        KeyCode::Char('m') => Action::CycleMarker,
        KeyCode::Char('t') => Action::EditTitle,
        KeyCode::Char(c) => Action::Char(c),
        _ => return None,
    };
    Some(action)
}

/// Action d'une touche en mode saisie (tous les caractères sont du texte)
pub fn input_action_for(event: &Event) -> Option<Action> {
    let Event::Key(key) = event else {
        return None;
    };

    match key.code {
        KeyCode::Enter => Some(Action::Enter),
        KeyCode::Esc => Some(Action::Escape),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) => Some(Action::Char(c)),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn test_action_for_keys() {
        assert_eq!(action_for(&key(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(action_for(&key(KeyCode::Tab)), Some(Action::ToggleChart));
        assert_eq!(action_for(&key(KeyCode::Char('m'))), Some(Action::CycleMarker));
        assert_eq!(action_for(&key(KeyCode::F(5))), None);
        assert_eq!(action_for(&Event::Tick), None);
    }

    #[test]
    fn test_input_mode_treats_letters_as_text() {
        assert_eq!(input_action_for(&key(KeyCode::Char('q'))), Some(Action::Char('q')));
        assert_eq!(input_action_for(&key(KeyCode::Backspace)), Some(Action::Backspace));
        assert_eq!(input_action_for(&key(KeyCode::Up)), None);
    }
}

// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état de l'interface TUI autour d'une Session
//
// CONCEPTS RUST :
// 1. State Management : l'état UI (sélection, écran, saisie) vit ici,
//    l'état métier (tableaux, réglages du graphique) vit dans Session
// 2. Mutabilité contrôlée : &mut self pour modifier l'état
// 3. Composition : App possède sa Session
// ============================================================================

use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::{format_date, Field};
use crate::session::{Session, StatusKind};

// ============================================================================
// Enum : Screen
// ============================================================================
// CONCEPT RUST : Enums pour state machines
// - Un seul écran actif à la fois
// - Le compilateur force à gérer tous les cas (exhaustivité)
// ============================================================================

/// Écrans de l'application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Vue principale : éditeur du tableau
    Table,

    /// Vue graphique : cours + marqueurs d'achat / vente
    Chart,

    /// Mode saisie : capture du texte (date, chemin, valeur de cellule...)
    Input,
}

/// Ce que la saisie en cours va modifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPurpose {
    /// Nouvelle ligne (saisie d'une date)
    AddRow,
    /// Modification d'une cellule
    EditCell { date: NaiveDate, field: Field },
    /// Chemin d'un CSV à importer
    Upload,
    /// Chemin de l'export CSV
    Export,
    /// Titre du graphique
    ChartTitle,
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Données de la session (tableaux, réglages du graphique, statut)
    pub session: Session,

    /// Ligne sélectionnée dans le buffer
    pub selected_row: usize,

    /// Colonne sélectionnée (index dans visible_fields())
    pub selected_column: usize,

    /// Écran actuellement affiché
    pub current_screen: Screen,

    /// Écran à réafficher à la fin d'une saisie
    pub return_screen: Screen,

    /// Two-step quit pour éviter les sorties accidentelles
    pub confirm_quit: bool,

    /// Two-step delete pour éviter les suppressions accidentelles
    pub confirm_delete: bool,

    /// Buffer de saisie pour le mode Input
    pub input_buffer: String,

    /// Prompt affiché en mode Input
    pub input_prompt: String,

    /// Cible de la saisie en cours
    pub input_purpose: Option<InputPurpose>,

    /// Chemin proposé par défaut à l'export
    pub export_path: PathBuf,
}

impl App {
    /// Crée l'application autour d'une session
    pub fn new(session: Session) -> Self {
        Self {
            running: true,
            session,
            selected_row: 0,
            selected_column: 0,
            current_screen: Screen::Table,
            return_screen: Screen::Table,
            confirm_quit: false,
            confirm_delete: false,
            input_buffer: String::new(),
            input_prompt: String::new(),
            input_purpose: None,
            export_path: PathBuf::from("MetaplanetTradingData.csv"),
        }
    }

    /// Change le chemin d'export proposé (builder)
    pub fn with_export_path(mut self, path: PathBuf) -> Self {
        self.export_path = path;
        self
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ========================================================================
    // Navigation dans le tableau
    // ========================================================================

    /// Colonnes affichées : mNAV seulement si le tableau la porte
    pub fn visible_fields(&self) -> Vec<Field> {
        let with_aux = self.session.buffer().has_aux();
        Field::ALL
            .iter()
            .copied()
            .filter(|&f| f != Field::Aux || with_aux)
            .collect()
    }

    /// CONCEPT RUST : Saturating arithmetic
    /// - saturating_sub() ne descend pas en dessous de 0
    pub fn navigate_up(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    pub fn navigate_down(&mut self) {
        let max_index = self.session.buffer().len().saturating_sub(1);
        self.selected_row = (self.selected_row + 1).min(max_index);
    }

    pub fn navigate_left(&mut self) {
        self.selected_column = self.selected_column.saturating_sub(1);
    }

    pub fn navigate_right(&mut self) {
        let max_index = self.visible_fields().len().saturating_sub(1);
        self.selected_column = (self.selected_column + 1).min(max_index);
    }

    /// Date de la ligne sélectionnée
    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.session.buffer().at(self.selected_row).map(|r| r.date)
    }

    /// Colonne sélectionnée
    pub fn selected_field(&self) -> Field {
        self.visible_fields()
            .get(self.selected_column)
            .copied()
            .unwrap_or(Field::Date)
    }

    /// Ramène la sélection dans les bornes après une modification du tableau
    fn clamp_selection(&mut self) {
        let rows = self.session.buffer().len();
        self.selected_row = self.selected_row.min(rows.saturating_sub(1));
        let columns = self.visible_fields().len();
        self.selected_column = self.selected_column.min(columns.saturating_sub(1));
    }

    /// Place la sélection sur une date
    fn select_date(&mut self, date: NaiveDate) {
        if let Some(index) = self.session.buffer().index_of(date) {
            self.selected_row = index;
        }
    }

    // ========================================================================
    // Écrans
    // ========================================================================

    pub fn show_chart(&mut self) {
        self.current_screen = Screen::Chart;
    }

    pub fn show_table(&mut self) {
        self.current_screen = Screen::Table;
    }

    pub fn toggle_chart(&mut self) {
        match self.current_screen {
            Screen::Table => self.show_chart(),
            Screen::Chart => self.show_table(),
            Screen::Input => {}
        }
    }

    pub fn is_on_table(&self) -> bool {
        self.current_screen == Screen::Table
    }

    pub fn is_on_chart(&self) -> bool {
        self.current_screen == Screen::Chart
    }

    pub fn is_in_input_mode(&self) -> bool {
        self.current_screen == Screen::Input
    }

    // ========================================================================
    // Confirmations
    // ========================================================================

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    pub fn request_delete(&mut self) {
        self.confirm_delete = true;
    }

    pub fn cancel_delete(&mut self) {
        self.confirm_delete = false;
    }

    pub fn is_awaiting_delete_confirmation(&self) -> bool {
        self.confirm_delete
    }

    /// Annule toutes les confirmations en attente
    pub fn cancel_confirmations(&mut self) {
        self.cancel_quit();
        self.cancel_delete();
    }

    /// Supprime la ligne sélectionnée du buffer
    pub fn delete_selected(&mut self) {
        if let Some(date) = self.selected_date() {
            match self.session.remove_row(date) {
                Ok(_) => {
                    info!(date = %date, "Row deleted");
                    self.session
                        .set_status(StatusKind::Info, format!("Ligne {} supprimée (non enregistré)", format_date(date)));
                }
                Err(e) => self.session.set_status(StatusKind::Error, e.to_string()),
            }
        }
        self.clamp_selection();
        self.confirm_delete = false;
    }

    /// Enregistre le buffer (la normalisation peut réordonner les lignes)
    pub fn save_edits(&mut self) {
        let date = self.selected_date();
        self.session.save_edits();
        if let Some(date) = date {
            self.select_date(date);
        }
        self.clamp_selection();
    }

    /// Abandonne les modifications du buffer
    pub fn revert_edits(&mut self) {
        self.session.revert_edits();
        self.clamp_selection();
    }

    // ========================================================================
    // Input Mode Management
    // ========================================================================

    /// Entre en mode input
    ///
    /// CONCEPT : Modal input (Vim-like)
    /// - Le buffer peut être pré-rempli (valeur actuelle de la cellule)
    pub fn start_input(&mut self, purpose: InputPurpose, prompt: String, initial: String) {
        if !self.is_in_input_mode() {
            self.return_screen = self.current_screen;
        }
        self.current_screen = Screen::Input;
        self.input_prompt = prompt;
        self.input_buffer = initial;
        self.input_purpose = Some(purpose);
    }

    /// Démarre l'édition de la cellule sélectionnée
    pub fn start_cell_edit(&mut self) {
        let Some(date) = self.selected_date() else {
            return;
        };
        let field = self.selected_field();
        let current = match field {
            Field::Date => format_date(date),
            _ => self
                .session
                .buffer()
                .get(date)
                .and_then(|r| r.value(field))
                .map(|v| v.to_string())
                .unwrap_or_default(),
        };

        self.start_input(
            InputPurpose::EditCell { date, field },
            format!("{} [{}]: ", field.label(), format_date(date)),
            current,
        );
    }

    /// Annule le mode input
    pub fn cancel_input(&mut self) {
        self.current_screen = self.return_screen;
        self.input_buffer.clear();
        self.input_prompt.clear();
        self.input_purpose = None;
    }

    /// Valide la saisie et l'applique à la session
    pub fn submit_input(&mut self) {
        let value = self.input_buffer.trim().to_string();
        let purpose = self.input_purpose.take();
        self.cancel_input();

        let Some(purpose) = purpose else {
            return;
        };
        debug!(?purpose, value = %value, "Input submitted");
        self.apply_input(purpose, &value);
    }

    fn apply_input(&mut self, purpose: InputPurpose, value: &str) {
        match purpose {
            InputPurpose::AddRow => match crate::models::parse_date(value) {
                Some(date) => match self.session.add_row(date) {
                    Ok(()) => {
                        self.select_date(date);
                        self.session
                            .set_status(StatusKind::Info, format!("Ligne {} ajoutée (non enregistré)", format_date(date)));
                    }
                    Err(e) => self.session.set_status(StatusKind::Error, e.to_string()),
                },
                None => self
                    .session
                    .set_status(StatusKind::Error, format!("Date illisible : {:?}", value)),
            },

            InputPurpose::EditCell { date, field } => match self.session.set_field(date, field, value) {
                Ok(new_date) => self.select_date(new_date),
                Err(e) => self.session.set_status(StatusKind::Error, e.to_string()),
            },

            InputPurpose::Upload => {
                if value.is_empty() {
                    return;
                }
                // L'erreur est déjà dans le statut de la session
                if self.session.import_csv_path(&PathBuf::from(value)).is_ok() {
                    self.selected_row = 0;
                }
            }

            InputPurpose::Export => {
                let path = if value.is_empty() {
                    self.export_path.clone()
                } else {
                    PathBuf::from(value)
                };
                if self.session.export_csv_path(&path).is_ok() {
                    self.export_path = path;
                }
            }

            InputPurpose::ChartTitle => self.session.set_chart_title(value),
        }

        self.clamp_selection();
    }

    /// Ajoute un caractère au buffer d'input
    pub fn append_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    /// Supprime le dernier caractère du buffer
    pub fn backspace(&mut self) {
        self.input_buffer.pop();
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TradeRecord, TradeTable};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn app() -> App {
        let table = TradeTable::from_records(vec![
            TradeRecord::with_values(date(2024, 1, 1), Some(100.0), 0.0, 0.0),
            TradeRecord::with_values(date(2024, 1, 2), Some(105.0), 0.0, 500.0),
            TradeRecord::with_values(date(2024, 1, 3), Some(110.0), 200.0, 0.0),
        ]);
        App::new(Session::new(table))
    }

    fn type_text(app: &mut App, text: &str) {
        app.input_buffer.clear();
        text.chars().for_each(|c| app.append_char(c));
    }

    #[test]
    fn test_navigation() {
        let mut app = app();

        app.navigate_up();
        assert_eq!(app.selected_row, 0);

        app.navigate_down();
        app.navigate_down();
        app.navigate_down();
        assert_eq!(app.selected_row, 2);

        // Pas de colonne mNAV : 4 colonnes visibles
        assert_eq!(app.visible_fields().len(), 4);
        for _ in 0..10 {
            app.navigate_right();
        }
        assert_eq!(app.selected_field(), Field::Buy);
    }

    #[test]
    fn test_add_row_through_input() {
        let mut app = app();

        app.start_input(InputPurpose::AddRow, "Date: ".to_string(), String::new());
        assert!(app.is_in_input_mode());
        type_text(&mut app, "2024-01-10");
        app.submit_input();

        assert!(app.is_on_table());
        assert_eq!(app.selected_date(), Some(date(2024, 1, 10)));
        assert!(app.session.has_unsaved_changes());
    }

    #[test]
    fn test_cell_edit_prefills_and_applies() {
        let mut app = app();
        app.navigate_down();
        app.navigate_right();
        app.navigate_right();
        app.navigate_right();

        app.start_cell_edit();
        assert_eq!(app.input_buffer, "500");

        type_text(&mut app, "1,200");
        app.submit_input();

        let row = app.session.buffer().get(date(2024, 1, 2)).unwrap();
        assert_eq!(row.buy, Some(1200.0));
    }

    #[test]
    fn test_delete_selected_clamps_selection() {
        let mut app = app();
        app.selected_row = 2;

        app.request_delete();
        assert!(app.is_awaiting_delete_confirmation());
        app.delete_selected();

        assert!(!app.is_awaiting_delete_confirmation());
        assert_eq!(app.session.buffer().len(), 2);
        assert_eq!(app.selected_row, 1);
    }

    #[test]
    fn test_cancel_input_returns_to_previous_screen() {
        let mut app = app();
        app.show_chart();

        app.start_input(InputPurpose::ChartTitle, "Title: ".to_string(), String::new());
        app.cancel_input();

        assert!(app.is_on_chart());
        assert!(app.input_purpose.is_none());
    }

    #[test]
    fn test_revert_clamps_selection() {
        let mut app = app();
        app.start_input(InputPurpose::AddRow, "Date: ".to_string(), String::new());
        type_text(&mut app, "2024-02-01");
        app.submit_input();
        assert_eq!(app.selected_row, 3);

        app.revert_edits();
        assert!(!app.session.has_unsaved_changes());
        assert_eq!(app.selected_row, 2);
    }

    #[test]
    fn test_chart_title_input() {
        let mut app = app();
        app.start_input(InputPurpose::ChartTitle, "Title: ".to_string(), String::new());
        type_text(&mut app, "My trades");
        app.submit_input();

        assert_eq!(app.session.chart_title(), "My trades");
    }
}

// ============================================================================
// Structure : Session
// ============================================================================
// État de travail d'une session utilisateur, passé par référence à chaque
// handler (pas d'état global)
//
// Deux tableaux :
// - saved  : données "enregistrées" (graphique, export)
// - buffer : copie de travail modifiée par l'éditeur
//
// Cycle de vie :
//   CSV par défaut -> comblement avec l'historique de prix -> (upload CSV)
//   -> éditions dans le buffer -> save / revert -> graphique / export
// ============================================================================

use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    format_date, parse_cell, parse_date, ChartModel, Field, MarkerMode, PricePoint,
    TradeRecord, TradeTable,
};
use crate::store::{self, ImportError, ImportReport};

/// Niveau d'un message de statut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Message affiché à l'utilisateur (barre de statut)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Erreurs d'édition du buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("la date {0} existe déjà")]
    DuplicateDate(NaiveDate),

    #[error("date illisible : {0:?}")]
    InvalidDate(String),

    #[error("aucune ligne pour la date {0}")]
    UnknownRow(NaiveDate),
}

/// État d'une session
#[derive(Debug, Clone)]
pub struct Session {
    saved: TradeTable,
    buffer: TradeTable,
    marker_mode: MarkerMode,
    chart_title: String,
    status: Option<StatusMessage>,
}

impl Session {
    /// Crée une session à partir d'un tableau déjà réconcilié
    pub fn new(table: TradeTable) -> Self {
        let saved = table.normalized();
        Self {
            buffer: saved.clone(),
            saved,
            marker_mode: MarkerMode::default(),
            chart_title: String::new(),
            status: None,
        }
    }

    /// Initialise la session : tableau par défaut + historique de prix
    ///
    /// Un échec du fetch n'est pas fatal : on garde le tableau par défaut seul
    /// et on prévient l'utilisateur.
    pub fn bootstrap(default_table: TradeTable, fetched: anyhow::Result<Vec<PricePoint>>) -> Self {
        match fetched {
            Ok(points) => {
                let combined = default_table.fill_gaps(&points);
                info!(
                    default_rows = default_table.len(),
                    fetched = points.len(),
                    rows = combined.len(),
                    "Session initialised"
                );
                Self::new(combined)
            }
            Err(e) => {
                warn!(error = %e, "Price history unavailable, using default table only");
                let mut session = Self::new(default_table);
                session.set_status(
                    StatusKind::Warning,
                    format!("Historique de prix indisponible : {}", e),
                );
                session
            }
        }
    }

    /// Configure le graphique (builder)
    pub fn with_chart(mut self, marker_mode: MarkerMode, title: impl Into<String>) -> Self {
        self.marker_mode = marker_mode;
        self.chart_title = title.into();
        self
    }

    pub fn saved(&self) -> &TradeTable {
        &self.saved
    }

    pub fn buffer(&self) -> &TradeTable {
        &self.buffer
    }

    pub fn marker_mode(&self) -> MarkerMode {
        self.marker_mode
    }

    pub fn chart_title(&self) -> &str {
        &self.chart_title
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusMessage::new(kind, text));
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    // ========================================================================
    // Upload CSV
    // ========================================================================

    /// Importe un CSV et le fusionne dans le tableau enregistré
    ///
    /// Les valeurs présentes du fichier gagnent ; le buffer est resynchronisé.
    /// En cas d'erreur, la session n'est pas modifiée (hors message d'erreur).
    pub fn import_csv<R: Read>(&mut self, reader: R) -> Result<ImportReport, ImportError> {
        match store::read_table(reader) {
            Ok(report) => {
                self.saved = self.saved.merge(&report.table).normalized();
                self.buffer = self.saved.clone();

                let mut text = format!(
                    "CSV importé : {} lignes fusionnées ({} au total)",
                    report.table.len(),
                    self.saved.len()
                );
                if report.skipped_rows > 0 {
                    text.push_str(&format!(", {} lignes ignorées (date illisible)", report.skipped_rows));
                }
                info!(rows = report.table.len(), total = self.saved.len(), "Upload merged into saved table");
                self.set_status(StatusKind::Success, text);
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "CSV upload rejected");
                self.set_status(StatusKind::Error, format!("Erreur de lecture CSV : {}", e));
                Err(e)
            }
        }
    }

    /// Importe un fichier CSV
    pub fn import_csv_path(&mut self, path: &Path) -> Result<ImportReport, ImportError> {
        match std::fs::File::open(path) {
            Ok(file) => self.import_csv(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot open CSV upload");
                let err = ImportError::from(e);
                self.set_status(StatusKind::Error, format!("Erreur de lecture CSV : {}", err));
                Err(err)
            }
        }
    }

    // ========================================================================
    // Enregistrement du buffer
    // ========================================================================

    /// Buffer -> tableau enregistré
    pub fn save_edits(&mut self) {
        self.buffer.normalize();
        self.saved = self.buffer.clone();
        info!(rows = self.saved.len(), "Edits saved");
        self.set_status(StatusKind::Success, "Modifications enregistrées");
    }

    /// Tableau enregistré -> buffer (abandonne les modifications)
    pub fn revert_edits(&mut self) {
        self.buffer = self.saved.clone();
        info!("Edits reverted");
        self.set_status(StatusKind::Info, "Retour à la dernière version enregistrée");
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.buffer != self.saved
    }

    // ========================================================================
    // Éditions du buffer
    // ========================================================================

    /// Ajoute une ligne vide (volumes à 0)
    pub fn add_row(&mut self, date: NaiveDate) -> Result<(), EditError> {
        if self.buffer.insert(TradeRecord::with_values(date, None, 0.0, 0.0)) {
            debug!(date = %date, "Row added to buffer");
            Ok(())
        } else {
            Err(EditError::DuplicateDate(date))
        }
    }

    /// Supprime une ligne
    pub fn remove_row(&mut self, date: NaiveDate) -> Result<TradeRecord, EditError> {
        let removed = self.buffer.remove(date).ok_or(EditError::UnknownRow(date))?;
        debug!(date = %date, "Row removed from buffer");
        Ok(removed)
    }

    /// Modifie une cellule à partir du texte saisi
    ///
    /// Retourne la date de la ligne après modification (elle change si on
    /// édite la colonne date). Une valeur numérique illisible devient 0, une
    /// cellule vidée devient manquante.
    pub fn set_field(&mut self, date: NaiveDate, field: Field, text: &str) -> Result<NaiveDate, EditError> {
        if !self.buffer.contains(date) {
            return Err(EditError::UnknownRow(date));
        }

        match field {
            Field::Date => {
                let new_date = parse_date(text).ok_or_else(|| EditError::InvalidDate(text.to_string()))?;
                if !self.buffer.rekey(date, new_date) {
                    return Err(EditError::DuplicateDate(new_date));
                }
                debug!(from = %date, to = %new_date, "Row date changed");
                Ok(new_date)
            }
            _ => {
                let value = parse_cell(text);
                if let Some(record) = self.buffer.get_mut(date) {
                    record.set_value(field, value);
                }
                debug!(date = %date, field = field.label(), ?value, "Cell edited");
                Ok(date)
            }
        }
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Exporte le tableau enregistré
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        store::write_table(writer, &self.saved)
    }

    /// Exporte le tableau enregistré dans un fichier
    pub fn export_csv_path(&mut self, path: &Path) -> anyhow::Result<()> {
        match store::write_table_to_path(path, &self.saved) {
            Ok(()) => {
                self.set_status(
                    StatusKind::Success,
                    format!("{} lignes exportées vers {}", self.saved.len(), path.display()),
                );
                Ok(())
            }
            Err(e) => {
                self.set_status(StatusKind::Error, format!("Export impossible : {:#}", e));
                Err(e)
            }
        }
    }

    // ========================================================================
    // Graphique
    // ========================================================================

    /// Modèle du graphique (tableau enregistré)
    pub fn chart_model(&self) -> ChartModel {
        ChartModel::build(&self.saved, self.marker_mode, &self.chart_title)
    }

    pub fn cycle_marker_mode(&mut self) -> MarkerMode {
        self.marker_mode = self.marker_mode.next();
        self.set_status(StatusKind::Info, format!("Marqueurs : {}", self.marker_mode.label()));
        self.marker_mode
    }

    pub fn set_chart_title(&mut self, title: impl Into<String>) {
        self.chart_title = title.into();
    }

    /// Résumé pour la barre d'état (dates couvertes)
    pub fn coverage(&self) -> Option<String> {
        match (self.saved.first_date(), self.saved.last_date()) {
            (Some(first), Some(last)) => Some(format!(
                "{} → {}",
                format_date(first),
                format_date(last)
            )),
            _ => None,
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

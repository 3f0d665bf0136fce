// ============================================================================
// Import / export CSV des tableaux de trades
// ============================================================================
// Les fichiers viennent de plusieurs sources (export tableur japonais, export
// de l'outil lui-même...) : les en-têtes varient, on les mappe vers nos
// colonnes logiques.
//
//   date  : 日付 | Date | DateLabel
//   close : 終値 | End Value | EndV | Close
//   sell  : 売り | Sell
//   buy   : 買い | Buy
//   aux   : mNAV | auxIndex | aux
//
// Seule la colonne date est obligatoire.
// ============================================================================

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::numeric::parse_cell;
use crate::models::record::{format_date, parse_date, TradeRecord};
use crate::models::table::TradeTable;

const DATE_HEADERS: [&str; 3] = ["日付", "date", "datelabel"];
const CLOSE_HEADERS: [&str; 4] = ["終値", "end value", "endv", "close"];
const SELL_HEADERS: [&str; 2] = ["売り", "sell"];
const BUY_HEADERS: [&str; 2] = ["買い", "buy"];
const AUX_HEADERS: [&str; 3] = ["mnav", "auxindex", "aux"];

/// En-têtes écrits à l'export (relus par l'import)
const EXPORT_HEADERS: [&str; 4] = ["Date", "End Value", "Sell", "Buy"];
const EXPORT_AUX_HEADER: &str = "mNAV";

/// Erreurs d'import CSV
///
/// CONCEPT RUST : thiserror
/// - #[error("...")] génère l'impl Display
/// - #[from] génère la conversion automatique pour l'opérateur ?
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("impossible de lire le fichier CSV : {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV invalide : {0}")]
    Csv(#[from] csv::Error),

    #[error("colonne date introuvable (en-têtes : {0})")]
    MissingDateColumn(String),

    /// Ligne plus longue que l'en-tête (ex. "1,000" non quoté)
    #[error("ligne {line} : {found} champs pour {expected} colonnes")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// Résultat d'un import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub table: TradeTable,
    /// Lignes ignorées car leur date est illisible
    pub skipped_rows: usize,
}

/// Position des colonnes logiques dans le fichier
#[derive(Debug, Default)]
struct ColumnMap {
    date: usize,
    close: Option<usize>,
    sell: Option<usize>,
    buy: Option<usize>,
    aux: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ImportError> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();

        let find = |candidates: &[&str]| -> Option<usize> {
            normalized
                .iter()
                .position(|h| candidates.iter().any(|c| h == c))
        };

        let date = find(&DATE_HEADERS).ok_or_else(|| {
            ImportError::MissingDateColumn(headers.iter().collect::<Vec<_>>().join(", "))
        })?;

        Ok(Self {
            date,
            close: find(&CLOSE_HEADERS),
            sell: find(&SELL_HEADERS),
            buy: find(&BUY_HEADERS),
            aux: find(&AUX_HEADERS),
        })
    }
}

/// Lit un tableau depuis n'importe quelle source (fichier, buffer...)
///
/// CONCEPT RUST : Généricité sur Read
/// - Fonctionne avec File, &[u8], Cursor... sans duplication
pub fn read_table<R: Read>(reader: R) -> Result<ImportReport, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = ColumnMap::from_headers(&headers)?;
    debug!(?columns, "Mapped CSV columns");

    let cell = |row: &csv::StringRecord, index: Option<usize>| -> Option<f64> {
        index.and_then(|i| row.get(i)).and_then(parse_cell)
    };

    let mut records = Vec::new();
    let mut skipped_rows = 0usize;

    for (line, row) in csv_reader.records().enumerate() {
        let row = row?;

        // Les cellules sont lues par position : un champ en trop décale tout.
        // Une ligne plus courte garde ses cellules manquantes.
        if row.len() > headers.len() {
            let line = row.position().map(|p| p.line()).unwrap_or(line as u64 + 2);
            warn!(line, expected = headers.len(), found = row.len(), "Rejecting CSV with ragged row");
            return Err(ImportError::RaggedRow {
                line,
                expected: headers.len(),
                found: row.len(),
            });
        }

        let date = match row.get(columns.date).and_then(parse_date) {
            Some(date) => date,
            None => {
                // Ligne entièrement vide (fin de fichier tableur) : pas un rejet
                if row.iter().all(|c| c.trim().is_empty()) {
                    continue;
                }
                warn!(line = line + 2, value = ?row.get(columns.date), "Skipping row with unparseable date");
                skipped_rows += 1;
                continue;
            }
        };

        records.push(TradeRecord {
            date,
            close: cell(&row, columns.close),
            sell: cell(&row, columns.sell),
            buy: cell(&row, columns.buy),
            aux: cell(&row, columns.aux),
        });
    }

    let table = TradeTable::from_records(records);
    info!(rows = table.len(), skipped = skipped_rows, "CSV table read");

    Ok(ImportReport {
        table,
        skipped_rows,
    })
}

/// Lit un tableau depuis un fichier
pub fn read_table_from_path(path: impl AsRef<Path>) -> Result<ImportReport, ImportError> {
    let file = File::open(path.as_ref())?;
    read_table(file)
}

/// Charge le fichier par défaut de la session
///
/// Fichier absent ou illisible : tableau vide (et un warning), on démarre
/// quand même.
pub fn load_default_table(path: impl AsRef<Path>) -> TradeTable {
    let path = path.as_ref();
    match read_table_from_path(path) {
        Ok(report) => report.table.normalized(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Default CSV unavailable, starting empty");
            TradeTable::new()
        }
    }
}

/// Écrit un tableau en CSV (UTF-8, en-tête, ordre chronologique)
///
/// La colonne mNAV n'est écrite que si le tableau la porte.
pub fn write_table<W: Write>(writer: W, table: &TradeTable) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let with_aux = table.has_aux();

    let mut header: Vec<&str> = EXPORT_HEADERS.to_vec();
    if with_aux {
        header.push(EXPORT_AUX_HEADER);
    }
    csv_writer.write_record(&header)?;

    let fmt = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();

    for record in table.records() {
        let mut row = vec![
            format_date(record.date),
            fmt(record.close),
            fmt(record.sell),
            fmt(record.buy),
        ];
        if with_aux {
            row.push(fmt(record.aux));
        }
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Écrit un tableau dans un fichier
pub fn write_table_to_path(path: impl AsRef<Path>, table: &TradeTable) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Échec de la création du fichier CSV : {}", path.display()))?;
    write_table(file, table)
        .with_context(|| format!("Échec de l'écriture du CSV : {}", path.display()))?;
    info!(path = %path.display(), rows = table.len(), "CSV table written");
    Ok(())
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_read_japanese_headers_with_commas() {
        let data = "日付,終値,売り,買い,mNAV\n\
                    2024/01/02,105,0,\"1,500\",2.1\n\
                    2024/01/01,100,,,1.9\n";

        let report = read_table(data.as_bytes()).unwrap();
        let table = report.table;

        assert_eq!(table.len(), 2);
        assert_eq!(table.first_date(), Some(date(2024, 1, 1)));
        let second = table.get(date(2024, 1, 2)).unwrap();
        assert_eq!(second.buy, Some(1500.0));
        assert_eq!(second.aux, Some(2.1));
        // Cellules vides : valeurs manquantes (pas 0) avant normalisation
        assert_eq!(table.get(date(2024, 1, 1)).unwrap().buy, None);
    }

    #[test]
    fn test_read_english_headers_and_bom() {
        let data = "\u{feff}Date,End Value,Sell,Buy\n2024-03-01,250.5,100,0\n";
        let report = read_table(data.as_bytes()).unwrap();

        let row = report.table.get(date(2024, 3, 1)).unwrap();
        assert_eq!(row.close, Some(250.5));
        assert_eq!(row.sell, Some(100.0));
        assert_eq!(row.aux, None);
    }

    #[test]
    fn test_missing_date_column_is_an_error() {
        let data = "Price,Volume\n1,2\n";
        let err = read_table(data.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::MissingDateColumn(_)));
    }

    #[test]
    fn test_unparseable_dates_are_skipped() {
        let data = "Date,End Value,Sell,Buy\nnot-a-date,1,0,0\n2024-01-01,2,0,0\n,,,\n";
        let report = read_table(data.as_bytes()).unwrap();

        assert_eq!(report.table.len(), 1);
        assert_eq!(report.skipped_rows, 1);
    }

    #[test]
    fn test_malformed_numbers_become_zero() {
        let data = "Date,End Value,Sell,Buy\n2024-01-01,abc,x,\"1,000\"\n";
        let report = read_table(data.as_bytes()).unwrap();
        let row = report.table.get(date(2024, 1, 1)).unwrap();

        assert_eq!(row.close, Some(0.0));
        assert_eq!(row.sell, Some(0.0));
        assert_eq!(row.buy, Some(1000.0));
    }

    #[test]
    fn test_row_longer_than_header_is_rejected() {
        // "1,000" non quoté : un champ de trop
        let data = "Date,End Value,Sell,Buy\n2024-01-01,100,0,0\n2024-01-02,105,0,1,000\n";
        let err = read_table(data.as_bytes()).unwrap_err();

        match err {
            ImportError::RaggedRow { line, expected, found } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 4);
                assert_eq!(found, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_short_rows_keep_missing_cells() {
        let data = "Date,End Value,Sell,Buy\n2024-01-01,100\n";
        let report = read_table(data.as_bytes()).unwrap();
        let row = report.table.get(date(2024, 1, 1)).unwrap();

        assert_eq!(row.close, Some(100.0));
        assert_eq!(row.buy, None);
    }

    #[test]
    fn test_round_trip() {
        let mut with_aux = TradeRecord::with_values(date(2024, 1, 2), Some(105.25), 0.0, 1000.0);
        with_aux.aux = Some(2.75);
        let table = TradeTable::from_records(vec![
            TradeRecord::with_values(date(2024, 1, 1), Some(100.0), 12.5, 0.0),
            with_aux,
            TradeRecord::with_values(date(2024, 1, 3), None, 0.0, 0.0),
        ])
        .normalized();

        let mut buffer = Vec::new();
        write_table(&mut buffer, &table).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("Date,End Value,Sell,Buy,mNAV\n"));

        let reimported = read_table(buffer.as_slice()).unwrap().table.normalized();
        assert_eq!(reimported, table);
    }

    #[test]
    fn test_file_round_trip_and_default_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        let table = TradeTable::from_records(vec![TradeRecord::with_values(
            date(2024, 5, 1),
            Some(42.0),
            0.0,
            300.0,
        )]);

        write_table_to_path(&path, &table).unwrap();
        assert_eq!(load_default_table(&path), table);

        // Fichier absent : tableau vide, pas d'erreur
        assert!(load_default_table(dir.path().join("missing.csv")).is_empty());
    }
}

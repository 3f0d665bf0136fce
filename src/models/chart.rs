// ============================================================================
// ChartModel : données prêtes pour le rendu du graphique
// ============================================================================
// Transforme un TradeTable en séries de points (x, y) indépendantes du
// moteur de rendu :
// - ligne des cours de clôture
// - ligne de l'indice auxiliaire (mNAV) si présent
// - marqueurs d'achat / de vente avec leur taille
//
// L'axe X est en jours depuis la première date : les trous dans les dates
// (week-ends, jours fériés) restent visibles.
// ============================================================================

use chrono::NaiveDate;
use tracing::debug;

use crate::models::marker::{marker_size, MarkerMode};
use crate::models::record::{format_date, TradeSide};
use crate::models::table::TradeTable;

/// Un marqueur d'achat ou de vente
#[derive(Debug, Clone, PartialEq)]
pub struct ChartMarker {
    pub x: f64,
    pub y: f64,
    pub date: NaiveDate,
    pub volume: f64,
    pub size: f64,
}

/// Données du graphique
#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    pub title: String,
    pub marker_mode: MarkerMode,

    /// Cours de clôture (lignes au cours connu uniquement)
    pub price_line: Vec<(f64, f64)>,

    /// Indice auxiliaire, None si le tableau n'en a pas
    pub aux_line: Option<Vec<(f64, f64)>>,

    pub buys: Vec<ChartMarker>,
    pub sells: Vec<ChartMarker>,

    /// Labels de l'axe X : première, milieu, dernière date
    pub x_labels: Vec<String>,

    /// Bornes de l'axe X
    pub x_bounds: [f64; 2],

    /// Bornes de l'axe Y (cours), avec 5% de marge
    pub y_bounds: [f64; 2],

    /// Somme clôture × achat
    pub total_buy_value: f64,
}

impl ChartModel {
    /// Construit le modèle depuis un tableau
    ///
    /// Le tableau est normalisé ici (frontière "pré-rendu" du pipeline).
    pub fn build(table: &TradeTable, mode: MarkerMode, title: &str) -> Self {
        let table = table.clone().normalized();

        let origin = table.first_date();
        let x_of = |date: NaiveDate| -> f64 {
            origin
                .map(|o| (date - o).num_days() as f64)
                .unwrap_or(0.0)
        };

        let price_line: Vec<(f64, f64)> = table
            .records()
            .iter()
            .filter_map(|r| r.close.map(|close| (x_of(r.date), close)))
            .collect();

        let aux_line = table.has_aux().then(|| {
            table
                .records()
                .iter()
                .filter_map(|r| r.aux.map(|aux| (x_of(r.date), aux)))
                .collect()
        });

        let markers = |side: TradeSide| -> Vec<ChartMarker> {
            table
                .events(side)
                .filter_map(|event| {
                    // Pas de cours connu : pas de position Y
                    let y = event.close?;
                    Some(ChartMarker {
                        x: x_of(event.date),
                        y,
                        date: event.date,
                        volume: event.volume,
                        size: marker_size(event.volume, mode),
                    })
                })
                .collect()
        };
        let buys = markers(TradeSide::Buy);
        let sells = markers(TradeSide::Sell);

        let x_labels = match (table.first_date(), table.last_date()) {
            (Some(first), Some(last)) => {
                let middle = first + (last - first) / 2;
                vec![format_date(first), format_date(middle), format_date(last)]
            }
            _ => Vec::new(),
        };

        let x_max = table.last_date().map(x_of).unwrap_or(0.0);
        let x_bounds = [0.0, x_max.max(1.0)];
        let y_bounds = value_bounds(price_line.iter().map(|&(_, y)| y));

        debug!(
            points = price_line.len(),
            buys = buys.len(),
            sells = sells.len(),
            mode = mode.label(),
            "Built chart model"
        );

        Self {
            title: title.to_string(),
            marker_mode: mode,
            total_buy_value: table.total_buy_value(),
            price_line,
            aux_line,
            buys,
            sells,
            x_labels,
            x_bounds,
            y_bounds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.price_line.is_empty()
    }
}

/// Bornes [min, max] avec 5% de marge, plancher à 0
///
/// CONCEPT RUST : fold pour min/max en un seul passage
pub fn value_bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (min, max) = values.fold((f64::MAX, f64::MIN), |(min, max), v| (min.min(v), max.max(v)));

    if min > max {
        return [0.0, 1.0];
    }

    let margin = ((max - min) * 0.05).max(max.abs() * 0.01).max(f64::EPSILON);
    [(min - margin).max(0.0), max + margin]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::TradeRecord;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_build_chart_model() {
        let table = TradeTable::from_records(vec![
            TradeRecord::with_values(date(2024, 1, 1), Some(100.0), 0.0, 0.0),
            TradeRecord::with_values(date(2024, 1, 2), Some(105.0), 0.0, 1500.0),
            TradeRecord::with_values(date(2024, 1, 5), Some(110.0), 500.0, 0.0),
        ]);

        let model = ChartModel::build(&table, MarkerMode::Stepped, "History");

        assert_eq!(model.title, "History");
        assert_eq!(model.price_line, vec![(0.0, 100.0), (1.0, 105.0), (4.0, 110.0)]);
        assert!(model.aux_line.is_none());
        assert_eq!(model.buys.len(), 1);
        assert_eq!(model.buys[0].size, 140.0);
        assert_eq!(model.sells.len(), 1);
        assert_eq!(model.sells[0].x, 4.0);
        assert_eq!(model.sells[0].size, 100.0);
        assert_eq!(model.x_labels.first().map(String::as_str), Some("2024-01-01"));
        assert_eq!(model.x_bounds, [0.0, 4.0]);
        assert!(model.y_bounds[0] < 100.0 && model.y_bounds[1] > 110.0);
        assert_eq!(model.total_buy_value, 105.0 * 1500.0);
    }

    #[test]
    fn test_events_without_close_are_skipped() {
        let table = TradeTable::from_records(vec![
            TradeRecord::with_values(date(2024, 1, 1), None, 0.0, 800.0),
            TradeRecord::with_values(date(2024, 1, 2), Some(50.0), 0.0, 800.0),
        ]);

        let model = ChartModel::build(&table, MarkerMode::Fixed, "");
        assert_eq!(model.buys.len(), 1);
        assert_eq!(model.price_line.len(), 1);
    }

    #[test]
    fn test_aux_line_present_when_table_has_aux() {
        let mut record = TradeRecord::with_values(date(2024, 1, 1), Some(10.0), 0.0, 0.0);
        record.aux = Some(2.5);
        let table = TradeTable::from_records(vec![
            record,
            TradeRecord::with_values(date(2024, 1, 2), Some(11.0), 0.0, 0.0),
        ]);

        let model = ChartModel::build(&table, MarkerMode::Stepped, "");
        assert_eq!(model.aux_line, Some(vec![(0.0, 2.5), (1.0, 0.0)]));
    }

    #[test]
    fn test_empty_table() {
        let model = ChartModel::build(&TradeTable::new(), MarkerMode::Stepped, "");
        assert!(model.is_empty());
        assert!(model.x_labels.is_empty());
        assert_eq!(model.y_bounds, [0.0, 1.0]);
    }
}

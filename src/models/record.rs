// ============================================================================
// Structure : TradeRecord
// ============================================================================
// Une ligne du tableau : une date, un cours de clôture, des volumes de
// vente/achat et un indice auxiliaire optionnel (mNAV)
//
// CONCEPTS RUST :
// 1. NaiveDate : date calendaire sans timezone (chrono)
// 2. Option<f64> : une cellule peut être manquante avant normalisation
// 3. Accesseurs : sell_volume() / buy_volume() retournent 0 par défaut
// ============================================================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Format canonique des dates (export CSV, affichage)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats acceptés à l'import et à la saisie
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Côté d'un trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Colonnes éditables du tableau
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Close,
    Sell,
    Buy,
    Aux,
}

impl Field {
    /// Colonnes dans l'ordre d'affichage
    pub const ALL: [Field; 5] = [Field::Date, Field::Close, Field::Sell, Field::Buy, Field::Aux];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Date => "Date",
            Field::Close => "End Value",
            Field::Sell => "Sell",
            Field::Buy => "Buy",
            Field::Aux => "mNAV",
        }
    }
}

/// Une ligne du tableau de trades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Clé unique dans un tableau
    pub date: NaiveDate,

    /// Cours de clôture (None si inconnu)
    pub close: Option<f64>,

    /// Volume vendu (None = cellule manquante, 0 après normalisation)
    pub sell: Option<f64>,

    /// Volume acheté (None = cellule manquante, 0 après normalisation)
    pub buy: Option<f64>,

    /// Indice auxiliaire (mNAV), absent de certains fichiers
    pub aux: Option<f64>,
}

impl TradeRecord {
    /// Crée une ligne vide (toutes les valeurs manquantes)
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            close: None,
            sell: None,
            buy: None,
            aux: None,
        }
    }

    /// Crée une ligne avec un cours et des volumes
    pub fn with_values(date: NaiveDate, close: Option<f64>, sell: f64, buy: f64) -> Self {
        Self {
            date,
            close,
            sell: Some(sell),
            buy: Some(buy),
            aux: None,
        }
    }

    /// Ligne issue de l'historique de prix : volumes à zéro
    pub fn from_price(point: &PricePoint) -> Self {
        Self::with_values(point.date, Some(point.close), 0.0, 0.0)
    }

    pub fn sell_volume(&self) -> f64 {
        self.sell.unwrap_or(0.0)
    }

    pub fn buy_volume(&self) -> f64 {
        self.buy.unwrap_or(0.0)
    }

    /// Volume du côté demandé
    pub fn volume(&self, side: TradeSide) -> f64 {
        match side {
            TradeSide::Buy => self.buy_volume(),
            TradeSide::Sell => self.sell_volume(),
        }
    }

    /// Valeur numérique d'une colonne (None pour la date)
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::Date => None,
            Field::Close => self.close,
            Field::Sell => self.sell,
            Field::Buy => self.buy,
            Field::Aux => self.aux,
        }
    }

    /// Modifie une colonne numérique (la date se modifie via TradeTable)
    pub fn set_value(&mut self, field: Field, value: Option<f64>) {
        match field {
            Field::Date => {}
            Field::Close => self.close = value,
            Field::Sell => self.sell = value,
            Field::Buy => self.buy = value,
            Field::Aux => self.aux = value,
        }
    }

    /// Applique une surcharge champ par champ : la valeur présente gagne
    ///
    /// CONCEPT RUST : Option::or
    /// - Some(a).or(b) = Some(a)
    /// - None.or(b) = b
    pub fn overlay(&self, overrides: &TradeRecord) -> TradeRecord {
        TradeRecord {
            date: self.date,
            close: overrides.close.or(self.close),
            sell: overrides.sell.or(self.sell),
            buy: overrides.buy.or(self.buy),
            aux: overrides.aux.or(self.aux),
        }
    }
}

/// Un point de l'historique de prix (date, clôture)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Parse une date dans l'un des formats acceptés
///
/// Accepte aussi les dates suivies d'une heure ("2024-01-02 00:00:00"),
/// comme celles exportées par un tableur.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }

    None
}

/// Formatte une date au format canonique
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-02"), Some(date(2024, 1, 2)));
        assert_eq!(parse_date("2024/1/2"), Some(date(2024, 1, 2)));
        assert_eq!(parse_date("2024.01.02"), Some(date(2024, 1, 2)));
        assert_eq!(parse_date("2024年1月2日"), Some(date(2024, 1, 2)));
        assert_eq!(parse_date(" 2024-01-02 00:00:00 "), Some(date(2024, 1, 2)));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2024-13-45"), None);
    }

    #[test]
    fn test_overlay_prefers_present_values() {
        let base = TradeRecord {
            date: date(2024, 1, 2),
            close: Some(105.0),
            sell: Some(0.0),
            buy: Some(500.0),
            aux: Some(1.5),
        };
        let mut patch = TradeRecord::new(date(2024, 1, 2));
        patch.buy = Some(1000.0);

        let merged = base.overlay(&patch);
        assert_eq!(merged.close, Some(105.0));
        assert_eq!(merged.buy, Some(1000.0));
        assert_eq!(merged.sell, Some(0.0));
        assert_eq!(merged.aux, Some(1.5));
    }

    #[test]
    fn test_volume_defaults_to_zero() {
        let record = TradeRecord::new(date(2024, 1, 1));
        assert_eq!(record.volume(TradeSide::Buy), 0.0);
        assert_eq!(record.volume(TradeSide::Sell), 0.0);
    }
}

// ============================================================================
// Structure : TradeTable
// ============================================================================
// Tableau de trades trié par date, unique par date
//
// C'est ici que vit la logique de réconciliation :
// - merge()      : jointure externe par date, la valeur présente de la
//                  surcharge gagne (upload CSV)
// - fill_gaps()  : ajoute uniquement les dates absentes (historique de prix)
// - normalize()  : passe de coercion idempotente (post-load, post-merge,
//                  pré-rendu)
// - events()     : itérateur paresseux des achats / ventes
//
// CONCEPTS RUST :
// 1. BTreeMap : map triée par clé, parfaite pour une jointure par date
// 2. Itérateur custom : struct + impl Iterator
// 3. Lifetimes : Events<'a> emprunte le tableau sans copier les lignes
// ============================================================================

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::numeric::normalize_numeric;
use crate::models::record::{PricePoint, TradeRecord, TradeSide};

/// Tableau de trades (trié ascendant par date, sans doublon)
///
/// CONCEPT RUST : Invariant encapsulé
/// - Le Vec est privé : toute insertion passe par les méthodes
/// - On garantit ainsi l'ordre et l'unicité des dates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeTable {
    records: Vec<TradeRecord>,
}

impl TradeTable {
    /// Crée un tableau vide
    pub fn new() -> Self {
        Self::default()
    }

    /// Crée un tableau à partir de lignes quelconques
    ///
    /// Trie par date ; pour une date en double, la dernière ligne gagne.
    pub fn from_records(records: Vec<TradeRecord>) -> Self {
        let by_date: BTreeMap<NaiveDate, TradeRecord> =
            records.into_iter().map(|r| (r.date, r)).collect();

        Self {
            records: by_date.into_values().collect(),
        }
    }

    /// Crée un tableau depuis l'historique de prix (volumes à zéro)
    pub fn from_prices(points: &[PricePoint]) -> Self {
        Self::from_records(points.iter().map(TradeRecord::from_price).collect())
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position d'une date (recherche dichotomique, le Vec est trié)
    fn position(&self, date: NaiveDate) -> Result<usize, usize> {
        self.records.binary_search_by_key(&date, |r| r.date)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&TradeRecord> {
        self.position(date).ok().map(|i| &self.records[i])
    }

    pub fn get_mut(&mut self, date: NaiveDate) -> Option<&mut TradeRecord> {
        match self.position(date) {
            Ok(i) => Some(&mut self.records[i]),
            Err(_) => None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.position(date).is_ok()
    }

    /// Ligne à l'index d'affichage
    pub fn at(&self, index: usize) -> Option<&TradeRecord> {
        self.records.get(index)
    }

    /// Index d'affichage d'une date
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.position(date).ok()
    }

    /// Insère une ligne si sa date est libre
    ///
    /// Retourne false si la date existe déjà (le tableau n'est pas modifié).
    pub fn insert(&mut self, record: TradeRecord) -> bool {
        match self.position(record.date) {
            Ok(_) => false,
            Err(i) => {
                self.records.insert(i, record);
                true
            }
        }
    }

    /// Supprime la ligne d'une date
    pub fn remove(&mut self, date: NaiveDate) -> Option<TradeRecord> {
        self.position(date).ok().map(|i| self.records.remove(i))
    }

    /// Change la date d'une ligne (re-clé)
    ///
    /// Retourne false si la date source n'existe pas ou si la date cible est
    /// déjà occupée.
    pub fn rekey(&mut self, from: NaiveDate, to: NaiveDate) -> bool {
        if from == to {
            return self.contains(from);
        }
        if self.contains(to) {
            return false;
        }
        match self.remove(from) {
            Some(mut record) => {
                record.date = to;
                self.insert(record)
            }
            None => false,
        }
    }

    /// Vrai si au moins une ligne porte l'indice auxiliaire (mNAV)
    pub fn has_aux(&self) -> bool {
        self.records.iter().any(|r| r.aux.is_some())
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    // ========================================================================
    // Normalisation
    // ========================================================================

    /// Passe de coercion : volumes manquants -> 0, valeurs non finies -> 0
    ///
    /// Idempotente, appelée aux frontières du pipeline (après chargement,
    /// après merge, avant rendu).
    pub fn normalize(&mut self) {
        let has_aux = self.has_aux();

        for record in &mut self.records {
            record.sell = Some(normalize_numeric(record.sell));
            record.buy = Some(normalize_numeric(record.buy));
            record.close = record.close.filter(|v| v.is_finite());
            if has_aux {
                record.aux = Some(normalize_numeric(record.aux));
            }
        }
    }

    /// Variante par valeur de normalize()
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    // ========================================================================
    // Réconciliation
    // ========================================================================

    /// Merge "surcharge" : jointure externe par date
    ///
    /// Pour chaque colonne, la valeur présente de `overrides` gagne, sinon on
    /// garde celle de `self`. Si l'un des deux tableaux est vide, retourne une
    /// copie de l'autre, inchangée.
    pub fn merge(&self, overrides: &TradeTable) -> TradeTable {
        if overrides.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return overrides.clone();
        }

        let mut by_date: BTreeMap<NaiveDate, TradeRecord> =
            self.records.iter().map(|r| (r.date, r.clone())).collect();

        let mut overridden = 0usize;
        for patch in &overrides.records {
            by_date
                .entry(patch.date)
                .and_modify(|existing| {
                    *existing = existing.overlay(patch);
                    overridden += 1;
                })
                .or_insert_with(|| patch.clone());
        }

        let merged = TradeTable {
            records: by_date.into_values().collect(),
        };
        debug!(
            base = self.len(),
            overrides = overrides.len(),
            overridden,
            result = merged.len(),
            "Merged override table"
        );

        merged.normalized()
    }

    /// Merge "comblement" : ajoute seulement les dates absentes
    ///
    /// Les lignes existantes ne sont jamais modifiées ; les lignes ajoutées
    /// portent le cours récupéré et des volumes à zéro.
    pub fn fill_gaps(&self, fetched: &[PricePoint]) -> TradeTable {
        if fetched.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return TradeTable::from_prices(fetched);
        }

        let mut result = self.clone();
        let mut added = 0usize;
        for point in fetched {
            if result.insert(TradeRecord::from_price(point)) {
                added += 1;
            }
        }

        debug!(base = self.len(), fetched = fetched.len(), added, "Filled date gaps");
        result
    }

    // ========================================================================
    // Événements et agrégats
    // ========================================================================

    /// Itérateur paresseux des trades d'un côté (volume non nul)
    ///
    /// CONCEPT RUST : Iterator + Clone
    /// - L'itérateur est Clone : on peut le "rembobiner" en le clonant
    /// - Rien n'est calculé avant l'appel à next()
    pub fn events(&self, side: TradeSide) -> Events<'_> {
        Events {
            inner: self.records.iter(),
            side,
        }
    }

    /// Somme de clôture × volume acheté (cours inconnu compté à 0)
    pub fn total_buy_value(&self) -> f64 {
        self.records
            .iter()
            .map(|r| r.close.unwrap_or(0.0) * r.buy_volume())
            .sum()
    }
}

/// Un trade extrait du tableau (annotation du graphique)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeEvent {
    pub date: NaiveDate,
    pub close: Option<f64>,
    pub volume: f64,
    pub side: TradeSide,
}

/// Itérateur retourné par TradeTable::events()
#[derive(Debug, Clone)]
pub struct Events<'a> {
    inner: std::slice::Iter<'a, TradeRecord>,
    side: TradeSide,
}

impl<'a> Iterator for Events<'a> {
    type Item = TradeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let side = self.side;
        self.inner.by_ref().find_map(|record| {
            let volume = record.volume(side);
            (volume != 0.0).then_some(TradeEvent {
                date: record.date,
                close: record.close,
                volume,
                side,
            })
        })
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> TradeTable {
        TradeTable::from_records(vec![
            TradeRecord::with_values(date(2024, 1, 2), Some(105.0), 0.0, 500.0),
            TradeRecord::with_values(date(2024, 1, 1), Some(100.0), 0.0, 0.0),
        ])
    }

    #[test]
    fn test_from_records_sorts_and_dedups() {
        let table = TradeTable::from_records(vec![
            TradeRecord::with_values(date(2024, 1, 3), Some(1.0), 0.0, 0.0),
            TradeRecord::with_values(date(2024, 1, 1), Some(2.0), 0.0, 0.0),
            TradeRecord::with_values(date(2024, 1, 3), Some(3.0), 0.0, 0.0),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.first_date(), Some(date(2024, 1, 1)));
        assert_eq!(table.get(date(2024, 1, 3)).unwrap().close, Some(3.0));
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let table = sample();
        let empty = TradeTable::new();

        assert_eq!(table.merge(&empty), table);
        assert_eq!(empty.merge(&table), table);
    }

    #[test]
    fn test_merge_override_wins() {
        let base = sample();
        let mut patch = TradeRecord::new(date(2024, 1, 2));
        patch.buy = Some(1000.0);
        let overrides = TradeTable::from_records(vec![patch]);

        let merged = base.merge(&overrides);
        let row = merged.get(date(2024, 1, 2)).unwrap();
        assert_eq!(row.buy, Some(1000.0));
        // Cellule manquante dans la surcharge : on garde la base
        assert_eq!(row.close, Some(105.0));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_adds_new_dates_and_zero_fills() {
        let base = sample();
        let mut patch = TradeRecord::new(date(2023, 12, 29));
        patch.close = Some(90.0);
        let merged = base.merge(&TradeTable::from_records(vec![patch]));

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.first_date(), Some(date(2023, 12, 29)));
        let row = merged.get(date(2023, 12, 29)).unwrap();
        assert_eq!(row.sell, Some(0.0));
        assert_eq!(row.buy, Some(0.0));
    }

    #[test]
    fn test_fill_gaps_only_adds_missing_dates() {
        let base = sample();
        let fetched = vec![
            PricePoint::new(date(2024, 1, 2), 999.0),
            PricePoint::new(date(2024, 1, 3), 110.0),
        ];

        let filled = base.fill_gaps(&fetched);
        assert_eq!(filled.len(), 3);
        // Ligne existante intacte
        assert_eq!(filled.get(date(2024, 1, 2)), base.get(date(2024, 1, 2)));
        let added = filled.get(date(2024, 1, 3)).unwrap();
        assert_eq!(added.close, Some(110.0));
        assert_eq!(added.buy_volume(), 0.0);
        assert_eq!(added.sell_volume(), 0.0);
    }

    #[test]
    fn test_fill_gaps_with_empty_inputs() {
        let base = sample();
        assert_eq!(base.fill_gaps(&[]), base);

        let fetched = vec![PricePoint::new(date(2024, 2, 1), 1.0)];
        let filled = TradeTable::new().fill_gaps(&fetched);
        assert_eq!(filled.len(), 1);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut table = TradeTable::from_records(vec![
            TradeRecord {
                date: date(2024, 1, 1),
                close: Some(f64::NAN),
                sell: None,
                buy: Some(f64::INFINITY),
                aux: Some(1.2),
            },
            TradeRecord::new(date(2024, 1, 2)),
        ]);

        table.normalize();
        let once = table.clone();
        table.normalize();

        assert_eq!(table, once);
        let first = table.get(date(2024, 1, 1)).unwrap();
        assert_eq!(first.close, None);
        assert_eq!(first.buy, Some(0.0));
        assert_eq!(first.sell, Some(0.0));
        // La colonne mNAV existe : les cellules manquantes passent à 0
        assert_eq!(table.get(date(2024, 1, 2)).unwrap().aux, Some(0.0));
    }

    #[test]
    fn test_events_are_lazy_and_restartable() {
        let table = TradeTable::from_records(vec![
            TradeRecord::with_values(date(2024, 1, 1), Some(100.0), 300.0, 0.0),
            TradeRecord::with_values(date(2024, 1, 2), Some(105.0), 0.0, 500.0),
            TradeRecord::with_values(date(2024, 1, 3), Some(110.0), 0.0, 700.0),
        ]);

        let buys = table.events(TradeSide::Buy);
        let first_pass: Vec<_> = buys.clone().collect();
        let second_pass: Vec<_> = buys.collect();

        assert_eq!(first_pass, second_pass);
        assert_eq!(first_pass.len(), 2);
        assert_eq!(first_pass[0].date, date(2024, 1, 2));
        assert_eq!(first_pass[1].volume, 700.0);

        let sells: Vec<_> = table.events(TradeSide::Sell).collect();
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].close, Some(100.0));
    }

    #[test]
    fn test_insert_remove_rekey() {
        let mut table = sample();

        assert!(!table.insert(TradeRecord::new(date(2024, 1, 1))));
        assert!(table.insert(TradeRecord::new(date(2024, 1, 5))));
        assert_eq!(table.last_date(), Some(date(2024, 1, 5)));

        assert!(!table.rekey(date(2024, 1, 5), date(2024, 1, 2)));
        assert!(table.rekey(date(2024, 1, 5), date(2023, 12, 31)));
        assert_eq!(table.first_date(), Some(date(2023, 12, 31)));

        assert!(table.remove(date(2023, 12, 31)).is_some());
        assert!(table.remove(date(2023, 12, 31)).is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_total_buy_value() {
        let table = sample();
        assert_eq!(table.total_buy_value(), 105.0 * 500.0);
    }
}

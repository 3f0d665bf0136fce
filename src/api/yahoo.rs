// ============================================================================
// API Client : Yahoo Finance
// ============================================================================
// Récupère l'historique des cours de clôture journaliers d'un ticker
// (ex: "3350.T") pour combler les dates absentes du tableau par défaut
//
// CONCEPTS RUST :
// 1. async/await : programmation asynchrone (non-bloquante)
// 2. Result<T, E> : gestion d'erreurs avec contexte
// 3. Serde : désérialisation JSON automatique
// ============================================================================

use anyhow::{Context, Result};
use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::models::{PricePoint, Timeframe};

// ============================================================================
// Structures pour parser la réponse JSON de Yahoo Finance
// ============================================================================
// On ne garde que ce dont on a besoin : timestamps, clôtures et le décalage
// horaire de la place de cotation (gmtoffset) pour obtenir la bonne date
// ============================================================================

/// Réponse complète de l'API Yahoo Finance
#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

/// Métadonnées du ticker
#[derive(Debug, Deserialize)]
struct Meta {
    symbol: String,
    /// Décalage en secondes de la place de cotation (32400 pour Tokyo)
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

// ============================================================================
// Fonctions publiques de l'API
// ============================================================================

/// Récupère les clôtures journalières d'un ticker depuis Yahoo Finance
///
/// # Arguments
/// * `symbol` - Symbole du ticker (ex: "3350.T", "AAPL")
/// * `timeframe` - Profondeur de l'historique
///
/// # Retourne
/// * `Result<Vec<PricePoint>>` - Points triés par date, ou erreur
///
/// CONCEPT RUST : #[instrument]
/// - Macro tracing qui ajoute automatiquement un span
/// - Tous les logs à l'intérieur auront le contexte symbol + timeframe
#[instrument(fields(timeframe = %timeframe.label()), skip(timeframe))]
pub async fn fetch_price_history(symbol: &str, timeframe: Timeframe) -> Result<Vec<PricePoint>> {
    let url = build_yahoo_url(symbol, timeframe);
    debug!(url = %url, "Built Yahoo Finance API URL");

    // Ajout d'un User-Agent pour éviter le blocage par Yahoo
    let client = reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .context("Échec de la création du client HTTP")?;

    debug!("Sending HTTP request to Yahoo Finance");
    let response = client
        .get(&url)
        .send()
        .await
        .context("Échec de la requête HTTP vers Yahoo Finance")?;

    let status = response.status();
    debug!(status = %status, "Received HTTP response");

    if !status.is_success() {
        error!(status = %status, "Yahoo Finance returned error status");
        anyhow::bail!("Yahoo Finance a retourné une erreur : HTTP {}", status);
    }

    let yahoo_response: YahooResponse = response
        .json()
        .await
        .context("Échec du parsing JSON de la réponse Yahoo")?;

    let points = parse_yahoo_response(yahoo_response, symbol)?;

    info!(points = points.len(), "Successfully fetched price history");
    Ok(points)
}

/// Construit l'URL de l'API Yahoo Finance (intervalle journalier)
fn build_yahoo_url(symbol: &str, timeframe: Timeframe) -> String {
    let now = chrono::Utc::now().timestamp();
    let days_ago = timeframe.to_days() as i64;
    let period1 = now - (days_ago * 24 * 60 * 60);

    format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?interval=1d&period1={}&period2={}",
        symbol, period1, now
    )
}

/// Convertit la réponse Yahoo en points (date, clôture)
///
/// Les clôtures manquantes (null) sont ignorées. La date est calculée dans le
/// fuseau de la place de cotation : une séance de Tokyo horodatée 00:00 UTC
/// reste bien sur le bon jour.
fn parse_yahoo_response(yahoo_response: YahooResponse, symbol: &str) -> Result<Vec<PricePoint>> {
    if let Some(err) = yahoo_response.chart.error {
        if !err.is_null() {
            anyhow::bail!("Yahoo Finance a retourné une erreur pour {} : {}", symbol, err);
        }
    }

    let result = yahoo_response
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .context("Aucune donnée retournée par Yahoo Finance")?;

    let offset = result.meta.gmtoffset.unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .and_then(|q| q.close)
        .unwrap_or_default();

    debug!(symbol = %result.meta.symbol, timestamp_count = timestamps.len(), "Received timestamps from Yahoo");

    let mut points = Vec::with_capacity(timestamps.len());
    let mut skipped_count = 0;

    // CONCEPT RUST : Iterators et zip
    for (&timestamp, close) in timestamps.iter().zip(closes.iter()) {
        let close = match close {
            Some(v) if v.is_finite() => *v,
            _ => {
                skipped_count += 1;
                continue;
            }
        };

        let local = DateTime::from_timestamp(timestamp + offset, 0).context("Timestamp invalide")?;
        points.push(PricePoint::new(local.date_naive(), close));
    }

    if skipped_count > 0 {
        warn!(skipped = skipped_count, total = timestamps.len(), "Skipped days with missing close");
    }

    // Dernière valeur gagne si Yahoo renvoie deux fois le même jour
    points.sort_by_key(|p| p.date);
    points.dedup_by(|later, earlier| {
        if later.date == earlier.date {
            earlier.close = later.close;
            true
        } else {
            false
        }
    });

    Ok(points)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "3350.T", "gmtoffset": 32400 },
                "timestamp": [1704153600, 1704240000, 1704326400],
                "indicators": { "quote": [{ "close": [100.5, null, 110.0] }] }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_build_yahoo_url() {
        let url = build_yahoo_url("3350.T", Timeframe::ThreeMonths);
        assert!(url.contains("3350.T"));
        assert!(url.contains("interval=1d"));
        assert!(url.contains("yahoo.com"));
    }

    #[test]
    fn test_parse_response_uses_exchange_dates() {
        let response: YahooResponse = serde_json::from_str(SAMPLE).unwrap();
        let points = parse_yahoo_response(response, "3350.T").unwrap();

        // 1704153600 = 2024-01-02 00:00 UTC = 2024-01-02 09:00 JST
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(points[0].close, 100.5);
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn test_parse_response_error_payload() {
        let json = r#"{"chart": {"result": null, "error": {"code": "Not Found"}}}"#;
        let response: YahooResponse = serde_json::from_str(json).unwrap();
        assert!(parse_yahoo_response(response, "NOPE").is_err());
    }

    // Test avec un vrai appel API (peut échouer si pas de connexion)
    #[tokio::test]
    async fn test_fetch_price_history() {
        match fetch_price_history("3350.T", Timeframe::OneMonth).await {
            Ok(points) => {
                assert!(points.windows(2).all(|w| w[0].date < w[1].date));
                println!("✓ Récupéré {} clôtures pour 3350.T", points.len());
            }
            Err(e) => {
                println!("⚠ Test skippé (pas de connexion?) : {}", e);
            }
        }
    }
}

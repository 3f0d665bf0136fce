// ============================================================================
// Coercion numérique
// ============================================================================
// Convertit les valeurs brutes (cellules CSV, saisies utilisateur) en f64
//
// Règle unique : tout ce qui n'est pas un nombre fini devient 0.
// - "1,234" -> 1234.0 (séparateur de milliers retiré)
// - "" / None / "abc" / "NaN" -> 0.0
//
// CONCEPT RUST : From / Into
// - RawValue accepte f64, &str, String et Option<T> via des impl From
// - normalize_numeric(x) fonctionne donc avec n'importe lequel de ces types
// ============================================================================

/// Valeur brute avant coercion
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Cellule absente ou vide (null)
    Missing,
    /// Déjà un nombre
    Number(f64),
    /// Texte (éventuellement avec des virgules de milliers)
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => RawValue::Missing,
        }
    }
}

/// Convertit une valeur brute en f64, 0 en cas d'échec
///
/// Idempotente : normalize_numeric(normalize_numeric(x)) == normalize_numeric(x)
pub fn normalize_numeric(raw: impl Into<RawValue>) -> f64 {
    match raw.into() {
        RawValue::Missing => 0.0,
        RawValue::Number(v) => finite_or_zero(v),
        RawValue::Text(text) => {
            let cleaned: String = text.trim().chars().filter(|&c| c != ',').collect();
            cleaned.parse::<f64>().map(finite_or_zero).unwrap_or(0.0)
        }
    }
}

/// Parse une cellule CSV ou une saisie
///
/// - Cellule vide -> None (valeur manquante, ne surcharge rien lors d'un merge)
/// - Sinon -> Some(normalize_numeric(texte)), donc "abc" -> Some(0.0)
pub fn parse_cell(cell: &str) -> Option<f64> {
    if cell.trim().is_empty() {
        None
    } else {
        Some(normalize_numeric(cell))
    }
}

// "NaN" et "inf" sont acceptés par f64::from_str
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_thousands_separators() {
        assert_eq!(normalize_numeric("1,234"), 1234.0);
        assert_eq!(normalize_numeric(" 12,345.5 "), 12345.5);
        assert_eq!(normalize_numeric("1,000,000"), 1_000_000.0);
    }

    #[test]
    fn test_invalid_values_become_zero() {
        assert_eq!(normalize_numeric(""), 0.0);
        assert_eq!(normalize_numeric("abc"), 0.0);
        assert_eq!(normalize_numeric("NaN"), 0.0);
        assert_eq!(normalize_numeric("inf"), 0.0);
        assert_eq!(normalize_numeric(f64::NAN), 0.0);
        assert_eq!(normalize_numeric(None::<f64>), 0.0);
        assert_eq!(normalize_numeric(RawValue::Missing), 0.0);
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(normalize_numeric(42.5), 42.5);
        assert_eq!(normalize_numeric(Some("-3.25")), -3.25);
    }

    #[test]
    fn test_idempotent() {
        let inputs: Vec<RawValue> = vec![
            "1,234".into(),
            "".into(),
            "garbage".into(),
            f64::INFINITY.into(),
            0.02.into(),
            RawValue::Missing,
        ];

        for input in inputs {
            let once = normalize_numeric(input.clone());
            assert_eq!(normalize_numeric(once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_parse_cell_distinguishes_missing() {
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("   "), None);
        assert_eq!(parse_cell("1,500"), Some(1500.0));
        assert_eq!(parse_cell("n/a"), Some(0.0));
    }
}

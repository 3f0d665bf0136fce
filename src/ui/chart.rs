// ============================================================================
// Chart - Rendu du graphique des trades
// ============================================================================
// Affiche le cours de clôture, l'indice mNAV (si présent) et les trades :
// - achats : marqueurs verts
// - ventes : marqueurs rouges
// La taille du marqueur (ChartModel) choisit le glyphe : plus le volume est
// gros, plus le glyphe est plein.
//
// CONCEPTS RATATUI :
// 1. Chart widget : graphique ligne + nuage de points
// 2. Dataset : série de données à afficher
// 3. Axis : configuration des axes X et Y
// ============================================================================

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;
use crate::models::chart::{value_bounds, ChartMarker};

/// Couleur de la ligne des cours (orange)
const PRICE_COLOR: Color = Color::Rgb(255, 165, 0);
const AUX_COLOR: Color = Color::Magenta;
const BUY_COLOR: Color = Color::LightGreen;
const SELL_COLOR: Color = Color::Red;

/// Glyphes du plus petit au plus gros
const GLYPH_TIERS: [Marker; 4] = [Marker::Braille, Marker::Dot, Marker::HalfBlock, Marker::Block];

/// Palier de glyphe pour une taille de marqueur
pub fn glyph_tier(size: f64) -> usize {
    if size < 100.0 {
        0
    } else if size < 140.0 {
        1
    } else if size < 180.0 {
        2
    } else {
        3
    }
}

/// Dessine le graphique du tableau enregistré
pub fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let model = app.session.chart_model();

    if model.is_empty() {
        render_no_data(frame, area, "Pas de cours à afficher");
        return;
    }

    // Séries rangées par palier de glyphe
    // CONCEPT RUST : les Dataset empruntent les Vec, qui doivent vivre
    // jusqu'au render_widget
    let buy_tiers = split_by_tier(&model.buys);
    let sell_tiers = split_by_tier(&model.sells);
    let aux_points = model.aux_line.as_ref().map(|aux| rescale(aux, model.y_bounds));

    let mut datasets = vec![Dataset::default()
        .name("End Value")
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(PRICE_COLOR))
        .data(&model.price_line)];

    if let (Some(points), Some(aux)) = (&aux_points, &model.aux_line) {
        let [lo, hi] = raw_bounds(aux);
        datasets.push(
            Dataset::default()
                .name(format!("mNAV ({:.2} – {:.2})", lo, hi))
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(AUX_COLOR))
                .data(points),
        );
    }

    push_scatter(&mut datasets, &buy_tiers, "Buy", BUY_COLOR);
    push_scatter(&mut datasets, &sell_tiers, "Sell", SELL_COLOR);

    let x_axis = Axis::default()
        .title("Date")
        .style(Style::default().fg(Color::Gray))
        .bounds(model.x_bounds)
        .labels(model.x_labels.iter().map(|l| Span::raw(l.clone())).collect());

    let [y_min, y_max] = model.y_bounds;
    let y_axis = Axis::default()
        .title("Value")
        .style(Style::default().fg(Color::Gray))
        .bounds(model.y_bounds)
        .labels(vec![
            Span::raw(format!("{:.0}", y_min)),
            Span::raw(format!("{:.0}", (y_min + y_max) / 2.0)),
            Span::raw(format!("{:.0}", y_max)),
        ]);

    let title = if model.title.is_empty() {
        format!(" 📈 Trades · {} ", model.marker_mode.label())
    } else {
        format!(" 📈 {} · {} ", model.title, model.marker_mode.label())
    };

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
        )
        .x_axis(x_axis)
        .y_axis(y_axis);

    frame.render_widget(chart, area);
}

/// Regroupe les marqueurs par palier de glyphe
fn split_by_tier(markers: &[ChartMarker]) -> [Vec<(f64, f64)>; 4] {
    let mut tiers: [Vec<(f64, f64)>; 4] = Default::default();
    for marker in markers {
        tiers[glyph_tier(marker.size)].push((marker.x, marker.y));
    }
    tiers
}

/// Ajoute un Dataset nuage de points par palier non vide
///
/// Seul le premier porte un nom (une seule entrée de légende par côté).
fn push_scatter<'a>(
    datasets: &mut Vec<Dataset<'a>>,
    tiers: &'a [Vec<(f64, f64)>; 4],
    name: &'static str,
    color: Color,
) {
    let mut named = false;
    for (tier, points) in tiers.iter().enumerate() {
        if points.is_empty() {
            continue;
        }
        let mut dataset = Dataset::default()
            .marker(GLYPH_TIERS[tier])
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(color))
            .data(points);
        if !named {
            dataset = dataset.name(name);
            named = true;
        }
        datasets.push(dataset);
    }
}

/// Projette la série mNAV sur l'échelle des cours (axe secondaire simulé)
fn rescale(points: &[(f64, f64)], target: [f64; 2]) -> Vec<(f64, f64)> {
    let [lo, hi] = raw_bounds(points);
    let span = hi - lo;
    points
        .iter()
        .map(|&(x, y)| {
            let ratio = if span > 0.0 { (y - lo) / span } else { 0.5 };
            (x, target[0] + ratio * (target[1] - target[0]))
        })
        .collect()
}

/// Min / max réels d'une série
fn raw_bounds(points: &[(f64, f64)]) -> [f64; 2] {
    if points.is_empty() {
        return value_bounds(std::iter::empty());
    }
    points
        .iter()
        .fold([f64::MAX, f64::MIN], |[lo, hi], &(_, y)| [lo.min(y), hi.max(y)])
}

/// Affiche un message quand il n'y a pas de données à afficher
fn render_no_data(frame: &mut Frame, area: Rect, message: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" ⚠ Graphique ");

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            "[Tab] Retour au tableau",
            Style::default().fg(Color::Gray),
        )),
    ];

    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{marker_size, MarkerMode};

    #[test]
    fn test_glyph_tier_follows_stepped_sizes() {
        let tiers: Vec<usize> = [500.0, 1500.0, 5000.0, 20000.0]
            .iter()
            .map(|&v| glyph_tier(marker_size(v, MarkerMode::Stepped)))
            .collect();
        assert_eq!(tiers, vec![1, 2, 3, 3]);
        assert_eq!(glyph_tier(marker_size(1e6, MarkerMode::Fixed)), 0);
    }

    #[test]
    fn test_rescale_maps_onto_target_range() {
        let points = vec![(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)];
        let scaled = rescale(&points, [100.0, 200.0]);
        assert_eq!(scaled, vec![(0.0, 100.0), (1.0, 200.0), (2.0, 150.0)]);

        // Série constante : milieu de l'échelle
        let flat = rescale(&[(0.0, 5.0)], [0.0, 10.0]);
        assert_eq!(flat, vec![(0.0, 5.0)]);
    }

    #[test]
    fn test_split_by_tier() {
        let marker = |size: f64| ChartMarker {
            x: 0.0,
            y: 1.0,
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            volume: 0.0,
            size,
        };
        let tiers = split_by_tier(&[marker(50.0), marker(100.0), marker(220.0), marker(180.0)]);
        let counts: Vec<usize> = tiers.iter().map(Vec::len).collect();
        assert_eq!(counts, vec![1, 1, 0, 2]);
    }
}

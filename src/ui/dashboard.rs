// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine l'éditeur de tableau, la barre de statut et le footer, et route
// vers le graphique selon l'écran actif
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Table + TableState : tableau avec ligne sélectionnée
// 3. Layout : découpage de l'espace en zones
// 4. Style : couleurs et attributs de texte
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::{App, Screen};
use crate::models::{format_date, Field, TradeRecord};
use crate::session::StatusKind;
use crate::ui::chart;

/// Dessine l'interface complète
///
/// CONCEPT RUST : Routing avec match sur enum
/// - En mode Input, on redessine l'écran d'origine sous la ligne de saisie
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size(), app.is_in_input_mode());

    render_header(frame, app, chunks[0]);

    let content = match app.current_screen {
        Screen::Input => app.return_screen,
        screen => screen,
    };
    match content {
        Screen::Chart => chart::render_chart(frame, app, chunks[1]),
        _ => render_table(frame, app, chunks[1]),
    }

    render_status(frame, app, chunks[2]);

    if app.is_in_input_mode() {
        render_input_footer(frame, app, chunks[3]);
    } else {
        render_footer(frame, app, chunks[3]);
    }
}

/// Crée le layout principal (header, content, statut, footer)
fn create_layout(area: Rect, input_mode: bool) -> Vec<Rect> {
    let footer_height = if input_mode { 4 } else { 3 };

    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),             // Header
            Constraint::Min(0),                // Content : tout le reste
            Constraint::Length(1),             // Statut
            Constraint::Length(footer_height), // Footer
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Header : Titre + résumé de la session
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" tradeviz ")
        .title_alignment(Alignment::Center);

    let session = &app.session;
    let mut spans = vec![
        Span::styled(
            format!("{} lignes", session.saved().len()),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(session.coverage().unwrap_or_else(|| "aucune donnée".to_string())),
        Span::raw("  "),
        Span::styled(
            format!("EndV × Buy : {}", format_thousands(session.saved().total_buy_value())),
            Style::default().fg(Color::Yellow),
        ),
    ];

    if session.has_unsaved_changes() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "● non enregistré",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tableau (buffer d'édition)
// ============================================================================

/// Dessine le buffer d'édition
///
/// CONCEPT RATATUI : Table + TableState
/// - TableState porte la ligne sélectionnée et gère le scroll
/// - render_stateful_widget() fait défiler pour garder la sélection visible
fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" 📋 Trades (buffer d'édition) ");

    let buffer = app.session.buffer();
    if buffer.is_empty() {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Tableau vide : [a] ajouter une ligne, [u] importer un CSV",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let fields = app.visible_fields();
    let selected_field = app.selected_field();

    let header = Row::new(fields.iter().map(|f| {
        let style = if *f == selected_field {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        };
        Cell::from(f.label()).style(style)
    }));

    let rows: Vec<Row> = buffer
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let cells = fields.iter().map(|&field| {
                let mut cell = Cell::from(cell_text(record, field));
                if index == app.selected_row && field == selected_field {
                    cell = cell.style(Style::default().add_modifier(Modifier::REVERSED));
                }
                cell
            });
            Row::new(cells).style(row_style(record))
        })
        .collect();

    let widths: Vec<Constraint> = fields
        .iter()
        .map(|f| match f {
            Field::Date => Constraint::Length(12),
            _ => Constraint::Min(10),
        })
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");

    let mut state = TableState::default().with_selected(Some(app.selected_row));
    frame.render_stateful_widget(table, area, &mut state);
}

/// Texte d'une cellule
fn cell_text(record: &TradeRecord, field: Field) -> String {
    match field {
        Field::Date => format_date(record.date),
        Field::Sell | Field::Buy => record
            .value(field)
            .map(format_thousands)
            .unwrap_or_default(),
        _ => record.value(field).map(|v| v.to_string()).unwrap_or_default(),
    }
}

/// Ligne verte si achat, rouge si vente
fn row_style(record: &TradeRecord) -> Style {
    if record.buy_volume() != 0.0 {
        Style::default().fg(Color::Green)
    } else if record.sell_volume() != 0.0 {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    }
}

/// Formatte un nombre avec séparateurs de milliers ("12,345.5")
pub fn format_thousands(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let sign = if rounded < 0.0 { "-" } else { "" };
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

// ============================================================================
// Barre de statut
// ============================================================================

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.session.status() {
        Some(status) => {
            let (icon, color) = match status.kind {
                StatusKind::Info => ("ℹ", Color::Cyan),
                StatusKind::Success => ("✅", Color::Green),
                StatusKind::Warning => ("⚠", Color::Yellow),
                StatusKind::Error => ("✖", Color::Red),
            };
            Line::from(Span::styled(
                format!(" {} {}", icon, status.text),
                Style::default().fg(color),
            ))
        }
        None => Line::from(Span::styled(
            format!(" Marqueurs : {}", app.session.marker_mode().label()),
            Style::default().fg(Color::Gray),
        )),
    };

    frame.render_widget(Paragraph::new(line), area);
}

// ============================================================================
// Footer : Instructions
// ============================================================================

fn key_span(key: &str, color: Color) -> Span<'_> {
    Span::styled(key, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

/// Dessine le footer avec les raccourcis clavier
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let warning = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let blinking = Style::default()
        .fg(Color::Red)
        .add_modifier(Modifier::BOLD)
        .add_modifier(Modifier::SLOW_BLINK);

    let shortcuts = if app.is_awaiting_delete_confirmation() {
        let date = app
            .selected_date()
            .map(format_date)
            .unwrap_or_else(|| "?".to_string());

        Line::from(vec![
            Span::styled("⚠  Appuyez sur ", warning),
            Span::styled("[d]", blinking),
            Span::styled(
                format!(" à nouveau pour supprimer {} ou autre touche pour annuler ⚠", date),
                warning,
            ),
        ])
    } else if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled("⚠  Appuyez sur ", warning),
            Span::styled("[q]", blinking),
            Span::styled(
                " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠",
                warning,
            ),
        ])
    } else if app.is_on_chart() {
        Line::from(vec![
            key_span("[q]", Color::Yellow),
            Span::raw(" Quit  "),
            key_span("[Tab/c/ESC]", Color::Yellow),
            Span::raw(" Table  "),
            key_span("[m]", Color::Yellow),
            Span::raw(" Marker mode  "),
            key_span("[t]", Color::Yellow),
            Span::raw(" Title  "),
            key_span("[x]", Color::Yellow),
            Span::raw(" Export"),
        ])
    } else {
        Line::from(vec![
            key_span("[q]", Color::Yellow),
            Span::raw(" Quit  "),
            key_span("[↑↓←→]", Color::Yellow),
            Span::raw(" Move  "),
            key_span("[Enter]", Color::Yellow),
            Span::raw(" Edit  "),
            key_span("[a]", Color::Green),
            Span::raw(" Add  "),
            key_span("[d]", Color::Red),
            Span::raw(" Delete  "),
            key_span("[s]", Color::Green),
            Span::raw(" Save  "),
            key_span("[r]", Color::Red),
            Span::raw(" Revert  "),
            key_span("[u]", Color::Yellow),
            Span::raw(" Upload  "),
            key_span("[x]", Color::Yellow),
            Span::raw(" Export  "),
            key_span("[Tab]", Color::Yellow),
            Span::raw(" Chart"),
        ])
    };

    let paragraph = Paragraph::new(vec![shortcuts])
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

/// Dessine le footer en mode input avec la ligne de saisie
fn render_input_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green)); // Vert pour indiquer mode input

    let input_line = Line::from(vec![
        Span::styled(
            app.input_prompt.as_str(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.input_buffer.as_str(), Style::default().fg(Color::White)),
        Span::styled(
            "█", // Curseur
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ),
    ]);

    let help_line = Line::from(vec![
        key_span("[Enter]", Color::Green),
        Span::raw(" Confirm  "),
        key_span("[ESC]", Color::Red),
        Span::raw(" Cancel"),
    ]);

    let paragraph = Paragraph::new(vec![input_line, help_line])
        .block(block)
        .alignment(Alignment::Left);

    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1500.0), "1,500");
        assert_eq!(format_thousands(1234567.25), "1,234,567.25");
        assert_eq!(format_thousands(-52500.0), "-52,500");
    }
}

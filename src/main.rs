// ============================================================================
// TradeViz - Visualisation d'un historique de trades
// ============================================================================
// Programme TUI : tableau de trades éditable + graphique des achats/ventes
// sur l'historique de cours (Yahoo Finance)
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle infinie qui gère événements et rendering
// 3. Async dans sync : tokio::runtime::Runtime pour l'appel API de démarrage
// 4. clap derive : options de ligne de commande déclaratives
// ============================================================================

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info};

use tradeviz::api::fetch_price_history;
use tradeviz::app::{App, InputPurpose};
use tradeviz::config::Settings;
use tradeviz::models::{format_date, PricePoint};
use tradeviz::session::Session;
use tradeviz::store::load_default_table;
use tradeviz::ui::{action_for, input_action_for, render, Action, Event, EventHandler};

// ============================================================================
// Ligne de commande
// ============================================================================

/// Visualise et édite un historique de trades sur le cours d'une action
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Fichier de configuration TOML (sinon ./tradeviz.toml ou ~/.config/tradeviz/)
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV chargé au démarrage
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Ticker Yahoo Finance de l'historique de prix
    #[arg(long)]
    symbol: Option<String>,

    /// Ne télécharge pas l'historique de prix
    #[arg(long, default_value_t = false)]
    offline: bool,
}

// ============================================================================
// Logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : on log vers un
// fichier avec rotation quotidienne
// ============================================================================

/// Initialise le système de logging vers ./logs/tradeviz.log
///
/// # Utilisation
/// ```bash
/// tail -f logs/tradeviz.log.*
/// RUST_LOG=tradeviz=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = PathBuf::from("./logs");
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "tradeviz.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true)
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour tradeviz, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradeviz=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!(?cli, "TradeViz starting up");

    // Fichier + environnement, puis les flags CLI ont le dernier mot
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(csv) = cli.csv {
        settings.default_csv = csv;
    }
    if let Some(symbol) = cli.symbol {
        settings.symbol = symbol;
    }
    debug!(?settings, "Settings resolved");

    let default_table = load_default_table(&settings.default_csv);

    println!("📊 Chargement de l'historique {}...", settings.symbol);
    let fetched = if cli.offline {
        info!("Offline mode, skipping price history");
        Err(anyhow::anyhow!("mode hors ligne"))
    } else {
        load_price_history(&settings)
    };

    let session = Session::bootstrap(default_table, fetched)
        .with_chart(settings.marker_mode, settings.chart_title.clone());
    let mut app = App::new(session).with_export_path(settings.export_path.clone());

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;
    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

/// Télécharge l'historique de prix (runtime tokio ponctuel)
///
/// CONCEPT RUST : Exécuter du code async dans du code sync
/// - .block_on() : exécute une future de manière bloquante
fn load_price_history(settings: &Settings) -> Result<Vec<PricePoint>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(fetch_price_history(&settings.symbol, settings.timeframe))
}

// ============================================================================
// Event loop
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    while app.is_running() {
        // 1. RENDER
        terminal.draw(|frame| render(frame, app))?;

        // 2. INPUT
        match events.next() {
            Ok(event) => handle_event(app, event),
            Err(e) => debug!(error = %e, "Failed to read terminal event"),
        }
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================
// CONCEPT : Event Handler Pattern
// - Mode saisie d'abord (toutes les lettres sont du texte)
// - Puis confirmations en attente (two-step quit / delete)
// - Puis actions selon l'écran courant
// ============================================================================

fn handle_event(app: &mut App, event: Event) {
    if app.is_in_input_mode() {
        match input_action_for(&event) {
            Some(Action::Enter) => app.submit_input(),
            Some(Action::Escape) => app.cancel_input(),
            Some(Action::Backspace) => app.backspace(),
            Some(Action::Char(c)) => app.append_char(c),
            _ => {}
        }
        return;
    }

    let Some(action) = action_for(&event) else {
        return;
    };

    // Le statut de l'action précédente s'efface à la touche suivante
    app.session.clear_status();

    // Deuxième appui : confirme ; toute autre touche annule
    if app.is_awaiting_quit_confirmation() {
        if action == Action::Quit {
            app.quit();
        } else {
            app.cancel_confirmations();
        }
        return;
    }
    if app.is_awaiting_delete_confirmation() {
        if action == Action::DeleteRow {
            app.delete_selected();
        } else {
            app.cancel_confirmations();
        }
        return;
    }

    // Actions communes aux deux écrans
    match action {
        Action::Quit => {
            app.request_quit();
            return;
        }
        Action::CycleMarker => {
            let mode = app.session.cycle_marker_mode();
            debug!(?mode, "Marker mode changed");
            return;
        }
        Action::EditTitle => {
            let current = app.session.chart_title().to_string();
            app.start_input(InputPurpose::ChartTitle, "Titre du graphique : ".to_string(), current);
            return;
        }
        Action::Export => {
            let initial = app.export_path.display().to_string();
            app.start_input(InputPurpose::Export, "Exporter vers : ".to_string(), initial);
            return;
        }
        _ => {}
    }

    if app.is_on_chart() {
        match action {
            Action::ToggleChart => app.toggle_chart(),
            Action::Escape => app.show_table(),
            _ => {}
        }
        return;
    }

    match action {
        Action::Up => app.navigate_up(),
        Action::Down => app.navigate_down(),
        Action::Left => app.navigate_left(),
        Action::Right => app.navigate_right(),
        Action::Enter => app.start_cell_edit(),
        Action::AddRow => {
            let today = format_date(chrono::Local::now().date_naive());
            app.start_input(InputPurpose::AddRow, "Nouvelle date (YYYY-MM-DD) : ".to_string(), today);
        }
        Action::DeleteRow => {
            if app.selected_date().is_some() {
                app.request_delete();
            }
        }
        Action::Save => app.save_edits(),
        Action::Revert => app.revert_edits(),
        Action::Upload => {
            app.start_input(InputPurpose::Upload, "CSV à importer : ".to_string(), String::new());
        }
        Action::ToggleChart => app.toggle_chart(),
        _ => {}
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================
// IMPORTANT : Toujours restaurer le terminal avant de quitter !
// ============================================================================

/// Configure le terminal en mode TUI (raw mode + alternate screen)
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use tradeviz::models::{TradeRecord, TradeTable};

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::empty()))
    }

    fn sample_app() -> App {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let table = TradeTable::from_records(vec![TradeRecord::with_values(date, Some(1000.0), 0.0, 10.0)]);
        App::new(Session::new(table))
    }

    #[test]
    fn test_quit_needs_two_presses() {
        let mut app = sample_app();
        handle_event(&mut app, key('q'));
        assert!(app.is_running());
        handle_event(&mut app, key('q'));
        assert!(!app.is_running());
    }

    #[test]
    fn test_other_key_cancels_delete() {
        let mut app = sample_app();
        handle_event(&mut app, key('d'));
        assert!(app.is_awaiting_delete_confirmation());
        handle_event(&mut app, key('j'));
        assert!(!app.is_awaiting_delete_confirmation());
        assert_eq!(app.session.buffer().len(), 1);

        handle_event(&mut app, key('d'));
        handle_event(&mut app, key('d'));
        assert!(app.session.buffer().is_empty());
    }

    #[test]
    fn test_status_clears_on_next_key() {
        let mut app = sample_app();
        handle_event(&mut app, key('m'));
        assert!(app.session.status().is_some());

        handle_event(&mut app, key('j'));
        assert!(app.session.status().is_none());

        // Un tick ne touche pas au statut
        handle_event(&mut app, key('s'));
        handle_event(&mut app, Event::Tick);
        assert!(app.session.status().is_some());
    }

    #[test]
    fn test_letters_are_text_in_input_mode() {
        let mut app = sample_app();
        handle_event(&mut app, key('t'));
        assert!(app.is_in_input_mode());
        handle_event(&mut app, key('q'));
        assert!(app.is_running());
        assert!(app.input_buffer.ends_with('q'));
    }
}

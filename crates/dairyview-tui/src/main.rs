//! dairyview - a terminal dashboard for dairy operations.
//!
//! Shows tank levels, today's pickup routes and monthly volumes for the
//! signed-in dairy, refreshing each view in the background while it is open.

mod app;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dairyview_core::Config;

use app::{App, AppState, Services};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name prefix; the appender adds the date
const LOG_FILE_PREFIX: &str = "dairyview.log";

const USAGE: &str = "\
Usage: dairyview [--demo] [--logout] [--dump <kind> [YYYY-MM]]

  --demo            Use generated data (sign in with demo / demo)
  --logout          Clear the saved session and exit
  --dump <kind>     Print one snapshot as JSON and exit
                    kind: dashboard | tanks | routes | volumes | freshness";

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct Cli {
    demo: bool,
    logout: bool,
    dump: Option<(String, Option<String>)>,
    help: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut args = args.into_iter().peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--demo" => cli.demo = true,
            "--logout" => cli.logout = true,
            "-h" | "--help" => cli.help = true,
            "--dump" => {
                let kind = args.next().context("--dump needs a kind")?;
                let month = args.next_if(|a| !a.starts_with("--"));
                cli.dump = Some((kind, month));
            }
            other => anyhow::bail!("Unknown argument {:?}\n\n{}", other, USAGE),
        }
    }
    Ok(cli)
}

/// Initialize the tracing subscriber. The terminal belongs to the UI, so logs
/// go to a daily file in the cache directory.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let dir = config.cache_dir().ok()?;
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = parse_args(std::env::args().skip(1))?;
    if cli.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    let _log_guard = init_tracing(&config);
    info!(api = %config.api_base_url, demo = cli.demo || config.demo_mode, "dairyview starting");

    let services = Services::connect(&config, cli.demo)?;

    if cli.logout {
        services.sessions.logout();
        println!("Signed out.");
        return Ok(());
    }
    if let Some((kind, month)) = cli.dump {
        return dump(&services, &kind, month.as_deref()).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, services);
    if app.is_authenticated() {
        app.mount_current_tab();
    } else {
        app.start_login();
    }

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("dairyview shutting down");
    Ok(())
}

/// Print one snapshot for the restored session as pretty JSON
async fn dump(services: &Services, kind: &str, month: Option<&str>) -> Result<()> {
    let session = services
        .sessions
        .valid_session()
        .context("No saved session. Run dairyview and sign in first.")?;
    let tenant = session.tenant_id.as_str();
    let gateway = &services.gateway;

    let json = match kind {
        "dashboard" => serde_json::to_string_pretty(&gateway.dashboard(tenant).await?)?,
        "tanks" => serde_json::to_string_pretty(&gateway.tanks(tenant).await?)?,
        "routes" => serde_json::to_string_pretty(&gateway.routes(tenant).await?)?,
        "volumes" => serde_json::to_string_pretty(&gateway.volumes(tenant, month).await?)?,
        "freshness" => serde_json::to_string_pretty(&gateway.data_freshness(tenant).await?)?,
        other => anyhow::bail!("Unknown dump kind {:?}\n\n{}", other, USAGE),
    };
    println!("{}", json);
    Ok(())
}

async fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Session changes and finished fetches
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

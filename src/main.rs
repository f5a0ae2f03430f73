use std::fs::{self, File};
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod app;
mod chat;
mod config;
mod conversation;
mod handler;
mod store;
mod transcript;
mod tui;
mod ui;

use app::App;
use config::Config;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config::new());
    init_logging(&config);

    let mut app = App::new(&config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, events: &mut EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event)?;
        }

        app.poll_reply().await;
    }
    Ok(())
}

/// Logs go to a file under the data directory; the terminal belongs to the
/// TUI. Logging is best-effort: any setup failure leaves it disabled.
fn init_logging(config: &Config) {
    let Some(dir) = dirs::data_dir().map(|d| d.join("loanchat")) else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = File::create(dir.join("loanchat.log")) else {
        return;
    };

    let filter = config.log_filter.clone().unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

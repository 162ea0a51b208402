//! stepform - terminal submission form
//!
//! Walks the user through a four step submission, keeps a draft on disk
//! while they type, and sends the finished form to the configured backend.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

use stepform::application::{App, FormSession, UploadQueue};
use stepform::config::{self, Config, DEFAULT_CONFIG_FILE};
use stepform::domain::{AttachmentStore, SubmissionSink};
use stepform::infrastructure::{FileDraftStore, HttpBackend, InMemoryBackend};
use stepform::presentation::{render_ui, InputHandler};
use stepform::telemetry;

#[derive(Debug, Parser)]
#[command(name = "stepform", version, about = "Multi-step submission form in the terminal")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Keep submissions and uploads in memory instead of calling the backend
    #[arg(long)]
    offline: bool,

    /// Where the draft is kept
    #[arg(long)]
    draft: Option<PathBuf>,

    /// Where logs are written
    #[arg(long)]
    log_file: Option<PathBuf>,
}

type Backends = (Arc<dyn AttachmentStore>, Arc<dyn SubmissionSink>);

fn build_backends(config: &Config) -> Result<Backends, reqwest::Error> {
    if config.backend.offline {
        info!("running offline with the in-memory backend");
        let backend = Arc::new(InMemoryBackend::new());
        let store: Arc<dyn AttachmentStore> = backend.clone();
        let sink: Arc<dyn SubmissionSink> = backend;
        return Ok((store, sink));
    }
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    info!(url = %config.backend.url, "using HTTP backend");
    let store: Arc<dyn AttachmentStore> = backend.clone();
    let sink: Arc<dyn SubmissionSink> = backend;
    Ok((store, sink))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (mut config, config_error) = match config::load(&cli.config) {
        Ok(config) => (config, None),
        Err(err) => {
            let mut config = Config::default();
            config::apply_env_overrides(&mut config);
            (config, Some(err))
        }
    };
    if cli.offline {
        config.backend.offline = true;
    }
    if let Some(draft) = cli.draft {
        config.draft.path = draft;
    }
    if let Some(log_file) = cli.log_file {
        config.logging.file = log_file;
    }

    telemetry::init(&config.logging)?;
    if let Some(err) = config_error {
        warn!(error = %err, "falling back to default configuration");
    }

    let (store, sink) = build_backends(&config)?;
    let drafts = FileDraftStore::new(config.draft.path.clone());
    let session = FormSession::restore(Box::new(drafts), config.draft.autosave_delay());
    let uploads = UploadQueue::new(store, config.uploads.limits());
    let mut app = App::new(session, uploads, sink);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

/// Main event loop. Waits for input no longer than the autosave deadline so
/// drafts are written on time, and applies finished uploads between events.
fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.tick(Instant::now());
        app.poll_uploads();
        terminal.draw(|f| render_ui(f, app))?;

        if !event::poll(app.poll_timeout(Instant::now()))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press
                && InputHandler::handle_key_event(app, key.code, key.modifiers)
            {
                if let Err(err) = app.session.save_draft() {
                    warn!(error = %err, "could not save draft on exit");
                }
                info!("quit requested");
                return Ok(());
            }
        }
    }
}

use std::fs::File;
use std::io::stdout;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{LevelFilter, error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, WriteLogger};

use hojear::app::{App, AppOptions, run_app_with_event_source, run_fatal_error_screen};
use hojear::bookmarks::{self, BookmarkStore};
use hojear::event_source::KeyboardEventSource;
use hojear::panic_handler::initialize_panic_handler;
use hojear::settings;
use hojear::theme::{self, ThemeId};

#[derive(Parser, Debug)]
#[command(name = "hojear", version, about = "A terminal PDF reader")]
struct Cli {
    /// PDF file to open
    file: PathBuf,

    /// Page to open at (1-indexed)
    #[arg(long, short = 'p', default_value_t = 1)]
    page: usize,

    /// Bookmarks file to use instead of the default location
    #[arg(long)]
    bookmarks: Option<PathBuf>,

    /// Log file to use instead of the default location
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log verbosity: off, error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Keep bookmarks and settings in memory only
    #[arg(long)]
    ephemeral: bool,
}

fn default_log_file() -> PathBuf {
    dirs::state_dir().or_else(dirs::cache_dir).map_or_else(
        || PathBuf::from("hojear.log"),
        |dir| dir.join("hojear").join("hojear.log"),
    )
}

fn init_logging(cli: &Cli) -> Result<()> {
    if cli.log_level == LevelFilter::Off {
        return Ok(());
    }

    let path = cli.log_file.clone().unwrap_or_else(default_log_file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file =
        File::create(&path).with_context(|| format!("creating log file {}", path.display()))?;
    WriteLogger::init(cli.log_level, Config::default(), file)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;
    info!("Starting hojear {}", env!("CARGO_PKG_VERSION"));

    if cli.ephemeral {
        settings::set_ephemeral(true);
    }
    settings::load_settings();
    if let Some(theme_id) = ThemeId::from_name(&settings::get_theme_name()) {
        theme::set_theme(theme_id);
    }

    initialize_panic_handler();

    // A canonical path keys bookmarks stably no matter how the file was
    // named on the command line
    let doc_path = cli
        .file
        .canonicalize()
        .unwrap_or_else(|_| cli.file.clone());

    let bookmarks = if cli.ephemeral {
        BookmarkStore::ephemeral()
    } else {
        let path = cli.bookmarks.clone().or_else(bookmarks::default_bookmarks_path);
        if let Some(parent) = path.as_deref().and_then(Path::parent) {
            std::fs::create_dir_all(parent).ok();
        }
        BookmarkStore::load_or_ephemeral(path.as_deref())
    };

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let options = AppOptions {
        initial_page: cli.page.saturating_sub(1),
        watch: true,
        offer_install: true,
    };
    let mut event_source = KeyboardEventSource;

    let res = match App::new(doc_path.clone(), bookmarks, &options) {
        Ok(mut app) => {
            let res = run_app_with_event_source(&mut terminal, &mut app, &mut event_source);
            app.doc.shutdown();
            res
        }
        Err(open_err) => {
            error!("Could not open {}: {open_err:#}", doc_path.display());
            run_fatal_error_screen(
                &mut terminal,
                &doc_path,
                &format!("{open_err:#}"),
                &mut event_source,
            )
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    info!("Shutting down hojear");
    Ok(())
}

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use app::App;
use trailhead::{
    client::HttpFetcher, config::Config, identity::Identity, logging, session::Session,
    store::FileStore,
};

mod app;

/// A small terminal web browser.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Address to open instead of the home page
    url: Option<String>,
    /// Profile whose home page, bookmarks and history are used
    #[arg(long)]
    user: Option<String>,
    /// Config file, defaults to ~/.config/trailhead/config.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Printed before the terminal is taken over, so it is still there on exit.
    if let Err(err) = logging::init() {
        eprintln!("trailhead: logging disabled: {err}");
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    let identity = Identity::from_name(cli.user.as_deref())?;
    let profile = identity.profile_path(&config.data_dir()?);
    tracing::info!("Using profile {}", profile.display());

    let (session, open_error) = match Session::open(FileStore::new(&profile, &config.home_page)) {
        Ok(session) => (session, None),
        Err(err) => {
            tracing::error!("Starting with an empty session: {err}");
            let store = FileStore::new(&profile, &config.home_page);
            (Session::new(store, config.home_page.clone()), Some(err))
        }
    };
    let fetcher = HttpFetcher::new(&config.fetch_options())?;
    let runtime = tokio::runtime::Runtime::new()?;

    let mut app = App::new(session, fetcher, runtime.handle().clone(), identity);
    if let Some(err) = open_error {
        app.warn(format!("Profile not loaded: {err}"));
    }
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal, cli.url);
    ratatui::restore();
    result
}

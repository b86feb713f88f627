//! flightwall: terminal client for the live flight wall.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flightwall_client::console::{self, ConsoleCommand};
use flightwall_client::present::{self, ChartSize, ChartWriter};
use flightwall_client::runner::unix_now;
use flightwall_client::{Driver, HttpApi, PreferenceStore, TelemetryApi, UiEvent};
use flightwall_core::config::{self, Config};
use flightwall_core::controls::{ControlInput, SurfaceKind, TimedControls};
use flightwall_core::history::{Channel, TrackedHistory};
use flightwall_core::prefs::PrefKey;
use flightwall_core::raster::PixmapCanvas;
use flightwall_core::surface::{render_history, DetailSurface, MapSurface, Response, Surface, TickerSurface};
use flightwall_core::types::{FlightwallError, Icao24, Result};

/// How often the preference file is re-read for writes from other processes.
const PREFS_RELOAD: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "flightwall", version, about = "Live flight wall client")]
struct Cli {
    /// Config file (default ~/.flightwall/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Telemetry API base URL, overrides the config file
    #[arg(long, global = true, env = "FLIGHTWALL_API")]
    api: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live table of every aircraft in range
    Map {
        /// Fetch one snapshot, print it and exit
        #[arg(long)]
        once: bool,
    },

    /// Rotating single-aircraft ticker
    Ticker,

    /// Follow one aircraft
    Detail {
        icao: Icao24,

        /// Write a PNG chart per channel into this directory on every update
        #[arg(long)]
        charts: Option<PathBuf>,
    },

    /// Render one history chart to PNG and exit
    Chart {
        icao: Icao24,

        /// altitude, speed, heading or vertical_rate
        #[arg(long, default_value = "altitude", value_parser = parse_channel)]
        channel: Channel,

        /// Output file (default <icao>-<channel>.png)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// History window in minutes (default from config)
        #[arg(long)]
        minutes: Option<u32>,
    },

    /// All surfaces with keyboard controls on stdin
    Wall {
        /// Aircraft for the detail surface
        #[arg(long)]
        detail: Option<Icao24>,

        /// Surface shown first
        #[arg(long, default_value = "map")]
        start: SurfaceKind,
    },

    /// Read or write shared display preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Show or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Print the effective value of one preference
    Get { key: String },
    /// Validate and store one preference
    Set { key: String, value: String },
    /// Drop a stored preference so every surface falls back to its default
    Reset { key: String },
    /// Show every preference
    List,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_channel(raw: &str) -> std::result::Result<Channel, String> {
    Channel::ALL
        .into_iter()
        .find(|c| c.name() == raw.trim())
        .ok_or_else(|| format!("unknown channel: {raw}"))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flightwall=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone();

    let result = match load(config_path.as_deref(), cli.api) {
        Err(e) => Err(e),
        Ok(config) => match cli.command {
            Commands::Map { once } => cmd_map(config, once).await,
            Commands::Ticker => cmd_ticker(config).await,
            Commands::Detail { icao, charts } => cmd_detail(config, icao, charts).await,
            Commands::Chart {
                icao,
                channel,
                out,
                minutes,
            } => cmd_chart(config, icao, channel, out, minutes).await,
            Commands::Wall { detail, start } => cmd_wall(config, detail, start).await,
            Commands::Prefs { action } => cmd_prefs(&config, action),
            Commands::Config { action } => cmd_config(&config, config_path.as_deref(), action),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load(path: Option<&Path>, api: Option<String>) -> Result<Config> {
    let mut config = match path {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };
    if let Some(url) = api {
        config.api.base_url = url;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

struct Session {
    config: Config,
    api: Arc<dyn TelemetryApi>,
    store: PreferenceStore,
}

impl Session {
    fn open(config: Config) -> Result<Self> {
        let api = HttpApi::new(&config.api.base_url, config.api.timeout())?;
        let store = PreferenceStore::open(config.preferences_path())?;
        tracing::info!(api = %api.base_url(), "session opened");
        Ok(Session {
            config,
            api: Arc::new(api),
            store,
        })
    }

    fn map_surface(&self) -> MapSurface {
        MapSurface::new(
            self.store.preferences(),
            self.config.observer.position(),
            self.config.polling.map(),
            self.config.display.history_capacity,
            self.config.display.history_minutes,
        )
    }

    fn ticker_surface(&self) -> TickerSurface {
        TickerSurface::new(
            self.store.preferences(),
            self.config.polling.ticker(),
            self.config.rotation.period(),
            self.config.rotation.progress_tick(),
            self.config.display.ticker_max_distance_km,
        )
    }

    fn detail_surface(&self, icao24: Icao24) -> DetailSurface {
        DetailSurface::new(
            icao24,
            self.store.preferences(),
            self.config.polling.detail(),
            self.config.display.history_capacity,
            self.config.display.history_minutes,
        )
    }

    fn driver<S: Surface + Send + 'static>(&self, surface: S) -> Driver<S> {
        Driver::new(surface, Arc::clone(&self.api), self.store.subscribe())
    }
}

async fn send(tx: &mpsc::Sender<UiEvent>, event: UiEvent) {
    if tx.send(event).await.is_err() {
        tracing::warn!("surface driver is gone");
    }
}

// ---------------------------------------------------------------------------
// Printers
// ---------------------------------------------------------------------------

fn map_printer() -> impl FnMut(&MapSurface) + Send + 'static {
    let mut last = String::new();
    move |map| {
        if !map.is_visible() {
            return;
        }
        let text = format!("{}\n{}", present::map_table(map), present::map_status(map));
        if text != last {
            println!("{text}\n");
            last = text;
        }
    }
}

fn ticker_printer() -> impl FnMut(&TickerSurface) + Send + 'static {
    let mut last = String::new();
    move |ticker| {
        if !ticker.is_visible() {
            return;
        }
        let line = present::ticker_line(&ticker.view());
        if line != last {
            print!("\r{line}\x1b[K");
            let _ = std::io::stdout().flush();
            last = line;
        }
    }
}

fn detail_printer(charts: Option<PathBuf>, size: ChartSize) -> impl FnMut(&DetailSurface) + Send + 'static {
    let mut last = String::new();
    let mut charts = charts.map(|dir| ChartWriter::new(dir, size));
    move |detail| {
        if !detail.is_visible() {
            return;
        }
        let text = present::detail_table(detail).to_string();
        if text != last {
            println!("{text}\n");
            last = text;
        }
        let Some(writer) = charts.as_mut() else {
            return;
        };
        match writer.refresh(detail) {
            Ok(Some(paths)) => tracing::debug!(count = paths.len(), "charts written"),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to write charts"),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Run one driver in the foreground until Ctrl-C.
async fn run_single<S, F>(session: Session, surface: S, printer: F) -> Result<()>
where
    S: Surface + Send + 'static,
    F: FnMut(&S) + Send + 'static,
{
    let watcher = session.store.watch(PREFS_RELOAD);
    let (tx, handle) = session.driver(surface).spawn(printer);
    send(&tx, UiEvent::Visible(true)).await;

    tokio::signal::ctrl_c().await?;
    println!();
    send(&tx, UiEvent::Shutdown).await;
    watcher.abort();
    handle
        .await
        .map_err(|e| FlightwallError::Transport(e.to_string()))?;
    Ok(())
}

async fn cmd_map(config: Config, once: bool) -> Result<()> {
    let session = Session::open(config)?;
    let mut map = session.map_surface();
    if !once {
        return run_single(session, map, map_printer()).await;
    }

    let snapshot = session.api.snapshot().await?;
    map.on_response(Response::Snapshot(snapshot), unix_now());
    println!("{}", present::map_table(&map));
    println!("{}", present::map_status(&map));
    Ok(())
}

async fn cmd_ticker(config: Config) -> Result<()> {
    let session = Session::open(config)?;
    let ticker = session.ticker_surface();
    run_single(session, ticker, ticker_printer()).await
}

async fn cmd_detail(config: Config, icao24: Icao24, charts: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config)?;
    let size = ChartSize::from(&session.config.display);
    let detail = session.detail_surface(icao24);
    run_single(session, detail, detail_printer(charts, size)).await
}

async fn cmd_chart(
    config: Config,
    icao24: Icao24,
    channel: Channel,
    out: Option<PathBuf>,
    minutes: Option<u32>,
) -> Result<()> {
    let session = Session::open(config)?;
    let display = &session.config.display;
    let minutes = minutes.unwrap_or(display.history_minutes);

    let response = session.api.history(icao24, minutes).await?;
    let mut history = TrackedHistory::new(display.history_capacity);
    let Some(tag) = history.select(Some(icao24)) else {
        return Err(FlightwallError::Render("no history selection".into()));
    };
    history.load(tag, &response.samples());

    let mut canvas = PixmapCanvas::new(display.chart_width, display.chart_height, display.pixel_ratio)?;
    let prefs = session.store.preferences();
    let Some(frame) = render_history(&mut canvas, history.buffer(), channel, &prefs) else {
        return Err(FlightwallError::Render(format!(
            "not enough {} samples for {icao24} in the last {minutes} min",
            channel.name()
        )));
    };

    let out = out.unwrap_or_else(|| PathBuf::from(format!("{icao24}-{}.png", channel.name())));
    canvas.save_png(&out)?;
    let ticks: Vec<_> = frame.ticks.iter().map(|t| t.label.as_str()).collect();
    println!(
        "{} ({} points, axis {}) -> {}",
        channel.title(),
        frame.points.len(),
        ticks.join(" / "),
        out.display()
    );
    Ok(())
}

async fn cmd_wall(config: Config, detail: Option<Icao24>, start: SurfaceKind) -> Result<()> {
    let session = Session::open(config)?;
    let size = ChartSize::from(&session.config.display);
    let mut controls = TimedControls::new(start, session.config.display.settings_idle());

    let mut drivers: Vec<(SurfaceKind, mpsc::Sender<UiEvent>)> = Vec::new();

    let (map_tx, map_task) = session.driver(session.map_surface()).spawn(map_printer());
    drivers.push((SurfaceKind::Map, map_tx.clone()));

    let (tx, ticker_task) = session.driver(session.ticker_surface()).spawn(ticker_printer());
    drivers.push((SurfaceKind::Ticker, tx));

    let detail_task = detail.map(|icao24| {
        let (tx, task) = session
            .driver(session.detail_surface(icao24))
            .spawn(detail_printer(None, size));
        drivers.push((SurfaceKind::Detail, tx));
        task
    });

    let watcher = session.store.watch(PREFS_RELOAD);
    show(&drivers, controls.controls().surface()).await;
    println!("{}", console::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let origin = Instant::now();

    loop {
        let deadline = controls.next_deadline().map(|d| origin + d);
        let wake = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = wake => {
                if controls.advance_to(origin.elapsed()) {
                    println!("settings closed");
                }
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin closed");
                        break;
                    }
                };
                let command = match console::parse_line(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("{e}");
                        continue;
                    }
                };
                let input = match command {
                    ConsoleCommand::Quit => break,
                    ConsoleCommand::Select(id) => {
                        send(&map_tx, UiEvent::Select(id)).await;
                        continue;
                    }
                    ConsoleCommand::SetPreference { key, value } => {
                        let front = driver_for(&drivers, controls.controls().surface()).unwrap_or(&map_tx);
                        send(front, UiEvent::SetPreference { key, value }).await;
                        ControlInput::SettingsActivity
                    }
                    ConsoleCommand::Control(input) => input,
                };

                let now = origin.elapsed();
                if controls.advance_to(now) {
                    println!("settings closed");
                }
                let outcome = controls.handle(input, now);
                if let Some((_, to)) = outcome.switched {
                    show(&drivers, to).await;
                }
                let state = controls.controls();
                if input == ControlInput::ToggleFullscreen {
                    println!("full screen {}", if state.is_fullscreen() { "on" } else { "off" });
                }
                if input == ControlInput::ToggleSettings {
                    println!("settings {}", if state.settings().is_open() { "open" } else { "closed" });
                }
            }
        }
    }

    for (_, tx) in &drivers {
        send(tx, UiEvent::Shutdown).await;
    }
    watcher.abort();
    join(map_task).await;
    join(ticker_task).await;
    if let Some(task) = detail_task {
        join(task).await;
    }
    Ok(())
}

fn driver_for(drivers: &[(SurfaceKind, mpsc::Sender<UiEvent>)], kind: SurfaceKind) -> Option<&mpsc::Sender<UiEvent>> {
    drivers.iter().find(|(k, _)| *k == kind).map(|(_, tx)| tx)
}

/// Make `front` the only visible surface.
async fn show(drivers: &[(SurfaceKind, mpsc::Sender<UiEvent>)], front: SurfaceKind) {
    for (kind, tx) in drivers {
        send(tx, UiEvent::Visible(*kind == front)).await;
    }
    if driver_for(drivers, front).is_none() {
        println!("no {front} surface running (start with --detail <icao>)");
    }
}

/// Wait for a driver to finish, logging a panic instead of propagating it.
async fn join<S>(task: JoinHandle<S>) {
    if let Err(e) = task.await {
        tracing::warn!(error = %e, "surface driver failed");
    }
}

fn cmd_prefs(config: &Config, action: PrefsAction) -> Result<()> {
    let store = PreferenceStore::open(config.preferences_path())?;
    let lookup = |name: &str| {
        console::pref_key(name).ok_or_else(|| FlightwallError::UnknownPreference(name.to_string()))
    };

    match action {
        PrefsAction::Get { key } => {
            let key = lookup(&key)?;
            println!("{}", store.preferences().encode(key));
        }
        PrefsAction::Set { key, value } => {
            let key = lookup(&key)?;
            let mut prefs = store.preferences();
            prefs.apply(key, &value)?;
            store.set(key.storage_key(), &prefs.encode(key))?;
            println!("{} = {}", key.storage_key(), prefs.encode(key));
        }
        PrefsAction::Reset { key } => {
            let key = lookup(&key)?;
            store.remove(key.storage_key())?;
            println!("{} = {} (default)", key.storage_key(), store.preferences().encode(key));
        }
        PrefsAction::List => {
            let prefs = store.preferences();
            let mut table = Table::new();
            table.set_header(vec!["Key", "Stored", "Effective"]);
            for key in PrefKey::ALL {
                table.add_row(vec![
                    Cell::new(key.storage_key()),
                    Cell::new(store.get(key.storage_key()).unwrap_or("-".into())),
                    Cell::new(prefs.encode(key)),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn cmd_config(config: &Config, path: Option<&Path>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => print!("{}", config::serialize_config(config)?),
        ConfigAction::Init { force } => {
            let path = path.map(Path::to_path_buf).unwrap_or_else(config::config_file);
            if path.exists() && !force {
                return Err(FlightwallError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            config::save_config_to(&Config::default(), &path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use xbdc_core::device::{Connector, OfflineConnector, SimulatedConnector};
use xbdc_core::Dispatcher;
use xbdc_protocol::arguments::parse_u32;
use xbdc_protocol::request::LoadSymbolsArgs;
use xbdc_protocol::Request;
use xbdc_utils::{info, init_logging, LogConfig, LogLevel};

mod console;
mod repl;

use console::{Console, OutputMode};
use repl::Repl;

/// Interactive and scriptable console for remotely debugging Xbox development kits.
#[derive(Parser, Debug)]
#[command(name = "xbdc")]
#[command(version)]
#[command(about = "Interactive and scriptable console for remotely debugging Xbox development kits", long_about = None)]
struct Cli
{
    /// Read one JSON command per line and answer with one JSON object per line
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Start with console notifications muted
    #[arg(long, default_value_t = false)]
    mute: bool,
    /// Talk to the built-in simulated console instead of the network
    #[arg(long, default_value_t = false)]
    simulate: bool,
    /// Debug information to load at start-up
    #[arg(long, value_name = "PATH")]
    symbols: Option<PathBuf>,
    /// Load base for --symbols (hex format: 0x10000 or decimal)
    #[arg(long, value_name = "ADDRESS", value_parser = parse_address, requires = "symbols")]
    image_base: Option<u32>,
    /// Log level; overrides RUST_LOG
    #[arg(long)]
    log_level: Option<LogLevel>,
    /// Read commands from a file instead of standard input
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,
    /// Bare `json` / `mute` words, same as the flags
    #[arg(value_parser = ["json", "mute"], hide = true)]
    modes: Vec<String>,
}

impl Cli
{
    fn json_mode(&self) -> bool
    {
        self.json || self.modes.iter().any(|mode| mode == "json")
    }

    fn muted(&self) -> bool
    {
        self.mute || self.modes.iter().any(|mode| mode == "mute")
    }
}

fn parse_address(value: &str) -> Result<u32, String>
{
    parse_u32(value).ok_or_else(|| format!("'{value}' is not a 32-bit address"))
}

fn main()
{
    let cli = Cli::parse();

    let config = LogConfig::from_env().with_level(cli.log_level);
    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> io::Result<()>
{
    let connector: Box<dyn Connector> = if cli.simulate {
        info!("using the simulated console");
        Box::new(SimulatedConnector::demo())
    } else {
        Box::new(OfflineConnector)
    };
    let dispatcher = Dispatcher::new(connector);
    if cli.muted() {
        dispatcher.notifications().set_muted(true);
    }

    let mode = if cli.json_mode() { OutputMode::Json } else { OutputMode::Text };
    let input: Box<dyn BufRead> = match &cli.script {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };
    let console = Console::new(io::stdout().lock(), mode);
    let mut repl = Repl::new(dispatcher, input, console);

    if let Some(pdb_path) = &cli.symbols {
        let request = Request::LoadSymbols(LoadSymbolsArgs {
            pdb_path: pdb_path.clone(),
            image_base: cli.image_base,
        });
        let response = repl.dispatcher_mut().dispatch(request);
        repl.print(&response)?;
    }

    repl.run()?;
    io::stdout().flush()
}

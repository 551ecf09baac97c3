use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use pandorcli::{Res, cli, config, error, logging, warning};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Verbose logging to stderr
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and store the listener credentials
    Auth(AuthOptions),

    /// List your stations
    Stations(StationsOptions),

    /// Show subscription information
    Info(InfoOptions),

    /// List stations and playlists of your collection
    Collection,

    /// Play a station
    Play(PlayOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// The `authToken` of the login response
    #[clap(long)]
    token: Option<String>,
    /// The `listenerId` of the login response
    #[clap(long)]
    listener_id: Option<String>,
    /// The `webClientVersion` of the login response
    #[clap(long)]
    client_version: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct StationsOptions {
    /// Only stations whose name contains this text
    #[clap(long)]
    search: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct InfoOptions {
    /// Also list recently played sources
    #[clap(long)]
    recent: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayOptions {
    /// Station name (or part of it); defaults to your first station
    #[clap(long)]
    station: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

async fn run(command: Command) -> Res<()> {
    match command {
        Command::Auth(opt) => {
            cli::auth(cli::AuthArgs {
                token: opt.token,
                listener_id: opt.listener_id,
                client_version: opt.client_version,
            })
            .await
        }
        Command::Stations(opt) => cli::stations(opt.search).await,
        Command::Info(opt) => cli::info(opt.recent).await,
        Command::Collection => cli::collection().await,
        Command::Play(opt) => cli::play(opt.station).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }
    if let Err(e) = logging::init_logging(cli.verbose) {
        error!("Cannot initialize logging. Err: {}", e);
    }

    match run(cli.command).await {
        Ok(()) => {}
        Err(e) if e.is_graceful() => {
            warning!("{}", e);
            std::process::exit(0);
        }
        Err(e) => error!("{}", e),
    }
}

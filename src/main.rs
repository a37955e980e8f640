use std::sync::Arc;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use sptcli::{
    cli,
    config::{self, Settings},
    error,
    management::FileCredentialStore,
    spotify::{
        auth::Authorizer,
        personalization::{PageParams, TimeRange},
    },
};

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
  name = "spt",
  bin_name = "spt",
  author = env!("CARGO_PKG_AUTHORS"),
  about = env!("CARGO_PKG_DESCRIPTION"),
  styles = styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authenticate against the Spotify Web API using OAuth
    Login(LoginOptions),

    /// Remove the stored credentials
    Logout,

    /// Show login state and granted scopes
    Status,

    /// Get the current user's profile
    Profile(OutputOptions),

    /// Get the current user's top artists or tracks
    #[clap(alias = "personalize")]
    Personalise(PersonaliseOptions),

    /// Get the current user's saved tracks and albums
    Library(LibraryOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct LoginOptions {
    /// Scope to request; can be repeated. Defaults to profile and library read access
    #[clap(long = "scope", action = clap::ArgAction::Append)]
    pub scopes: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct OutputOptions {
    /// Print the full response body as JSON
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PageOptions {
    /// The maximum number of objects to return (1-50)
    #[clap(long, short = 'l', default_value_t = 20)]
    pub limit: u32,

    /// Index of the first object to return
    #[clap(long, short = 'o', default_value_t = 0)]
    pub offset: u32,

    /// Print the full response body as JSON
    #[clap(long)]
    pub json: bool,
}

impl PageOptions {
    fn page(&self) -> PageParams {
        PageParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct PersonaliseOptions {
    #[command(subcommand)]
    pub command: PersonaliseSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PersonaliseSubcommand {
    /// Top artists, e.g. `spt personalise top-artists --time-range short-term`
    TopArtists(TopItemsOptions),
    /// Top tracks
    TopTracks(TopItemsOptions),
}

#[derive(Parser, Debug, Clone)]
pub struct TopItemsOptions {
    /// Time range: long term (several years), medium term (6 months) or short term (4 weeks)
    #[clap(long, value_enum, default_value_t = TimeRange::MediumTerm)]
    pub time_range: TimeRange,

    #[clap(flatten)]
    pub page: PageOptions,
}

#[derive(Parser, Debug, Clone)]
pub struct LibraryOptions {
    #[command(subcommand)]
    pub command: LibrarySubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum LibrarySubcommand {
    /// Saved tracks
    SavedTracks(PageOptions),
    /// Saved albums
    SavedAlbums(PageOptions),
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    // RUST_LOG=sptcli=debug for diagnostics
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("{}", e),
    };

    let store = Arc::new(FileCredentialStore::new(settings.credentials_path.clone()));
    let authorizer = Arc::new(Authorizer::new(settings, store));

    match cli.command {
        Command::Login(opt) => cli::login(authorizer, opt.scopes).await,
        Command::Logout => cli::logout(authorizer).await,
        Command::Status => cli::status(authorizer).await,
        Command::Profile(opt) => cli::profile(authorizer, opt.json).await,
        Command::Personalise(opt) => match opt.command {
            PersonaliseSubcommand::TopArtists(o) => {
                cli::top_artists(authorizer, o.time_range, o.page.page(), o.page.json).await
            }
            PersonaliseSubcommand::TopTracks(o) => {
                cli::top_tracks(authorizer, o.time_range, o.page.page(), o.page.json).await
            }
        },
        Command::Library(opt) => match opt.command {
            LibrarySubcommand::SavedTracks(o) => {
                cli::saved_tracks(authorizer, o.page(), o.json).await
            }
            LibrarySubcommand::SavedAlbums(o) => {
                cli::saved_albums(authorizer, o.page(), o.json).await
            }
        },
        Command::Completions(_) => {}
    }
}

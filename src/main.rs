use anyhow::Result;
use clap::Parser;
use log::warn;
use reqpipe::commands::{self, OptionOverrides, RequestSpec};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// reqpipe - HTTP requests through a retrying pipeline
///
/// Sends a request through the configured stages (e.g. `retry`) and prints
/// the response status followed by the body.
///
/// Examples:
///   reqpipe --plugins retry request PUT https://host/db --user admin
///   reqpipe --config client.json request GET https://host/db/_index
#[derive(Parser, Debug)]
#[command(author, version = env!("REQPIPE_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with client options (also via REQPIPE_CONFIG)
    #[arg(
        long = "config",
        short = 'c',
        env = "REQPIPE_CONFIG",
        value_name = "PATH",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// Comma separated stages to install, e.g. "retry,headers"
    #[arg(long, value_name = "LIST", global = true)]
    pub plugins: Option<String>,

    /// Maximum physical attempts per request
    #[arg(long, value_name = "N", global = true)]
    pub max_attempts: Option<u32>,

    /// Delay before the first retry in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub base_delay_ms: Option<u64>,

    /// Upper bound for a single retry delay in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub max_delay_ms: Option<u64>,

    /// Per-attempt transport timeout in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send a request and print the response
    Request(RequestArgs),

    /// Print the effective client options as JSON
    Config,
}

#[derive(clap::Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS)
    #[arg(value_name = "METHOD")]
    pub method: String,

    /// Absolute http(s) URL
    #[arg(value_name = "URL")]
    pub url: String,

    /// Extra header, repeatable
    #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    /// Basic auth username (also via REQPIPE_USERNAME)
    #[arg(long, short = 'u', env = "REQPIPE_USERNAME")]
    pub user: Option<String>,

    /// Basic auth password (also via REQPIPE_PASSWORD)
    #[arg(long, env = "REQPIPE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// JSON request body
    #[arg(long, short = 'd', value_name = "JSON")]
    pub data: Option<String>,
}

impl Cli {
    fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            plugins: self.plugins.clone(),
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            timeout_ms: self.timeout_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let options = commands::resolve_options(cli.config.as_deref(), &cli.overrides())?;
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Request(args) => {
            let spec = RequestSpec {
                method: args.method,
                url: args.url,
                headers: args.headers,
                username: args.user,
                password: args.password,
                data: args.data,
            };

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling request...");
                    on_interrupt.cancel();
                }
            });

            commands::request(&options, &spec, &cancel, &mut stdout).await?
        }
        Commands::Config => commands::show_config(&options, &mut stdout)?,
    }
    Ok(())
}

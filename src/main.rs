// Resource Bridge CLI - serves the legacy annotation and correlation routes
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use resource_bridge::{init_logging_with_level, start_server, with_trace_id, AppState, BridgeConfig};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Legacy annotations and correlations REST API on top of a generic Resource API",
    long_about = None,
    after_help = "EXAMPLES:
  resource-bridge serve --port 8080
  resource-bridge serve --config bridge.toml
  resource-bridge check-config --config bridge.toml"
)]
struct Cli {
    /// Enable verbose logging (DEBUG level). Default is INFO for this crate.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP REST API server backed by the in-memory Resource API
    Serve {
        /// Port to listen on (overrides the configuration file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load and validate the configuration, then print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ignore error if already initialized
    let _ = init_logging_with_level(cli.verbose, cli.quiet);

    with_trace_id("resource-bridge-cli", async move {
        let mut config = BridgeConfig::load(cli.config.as_deref())?;

        match cli.command {
            Commands::Serve { port } => {
                if let Some(port) = port {
                    config.server.port = port;
                }

                if !cli.quiet {
                    println!("Starting resource-bridge on {}", config.bind_address());
                    println!("API endpoints:");
                    println!("   GET|POST              /api/annotations");
                    println!("   GET|PUT|PATCH|DELETE  /api/annotations/:id");
                    println!("   GET                   /api/annotations/tags");
                    println!("   GET                   /api/datasources/correlations");
                    println!("   GET|POST              /api/datasources/uid/:uid/correlations");
                    println!("   GET|PATCH|DELETE      /api/datasources/uid/:uid/correlations/:cid");
                    println!("   GET                   /apis/:group/:version/namespaces/:ns/:resource");
                    println!("   GET                   /health");
                    println!();
                }

                let (state, _store) = AppState::in_memory(config);
                start_server(state).await?;
            }

            Commands::CheckConfig => {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }

        Ok(())
    })
    .await
}

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedwell::app::AppContext;
use feedwell::cli::{commands, Cli, Commands};
use feedwell::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Parse { path } => {
            commands::parse_file(path)?;
            return Ok(());
        }
        Commands::Key { url } => {
            commands::show_key(url);
            return Ok(());
        }
        _ => {}
    }

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = if cli.memory {
        AppContext::in_memory(config)?
    } else {
        AppContext::new(config)?
    };

    match cli.command {
        Commands::Fetch {
            urls,
            no_cache,
            refresh,
            client,
        } => {
            commands::fetch_feeds(&ctx, urls, &client, !no_cache, refresh).await?;
        }
        Commands::Limit { client } => {
            commands::show_limit(&ctx, &client).await?;
        }
        Commands::Parse { .. } | Commands::Key { .. } => {}
    }

    Ok(())
}

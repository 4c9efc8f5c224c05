use std::path::PathBuf;

use clap::Parser;
use ferry::config::ServerConfig;
use ferry::server::Server;

/// Serve files from the working directory, one worker per connection.
#[derive(Debug, Parser)]
#[command(name = "ferry-server", version)]
struct Cli {
    /// Port to listen on
    port: String,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = parse_args();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    if let Err(e) = serve(cli).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn serve(cli: Cli) -> anyhow::Result<()> {
    let cfg = ServerConfig::load(Some(cli.port.as_str()), cli.config.as_deref())?;
    let server = Server::bind(cfg).await?;

    tokio::select! {
        res = server.run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn parse_args() -> Cli {
    Cli::try_parse().unwrap_or_else(|e| {
        let code = if e.use_stderr() { 1 } else { 0 };
        let _ = e.print();
        std::process::exit(code);
    })
}

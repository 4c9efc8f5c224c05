use std::path::PathBuf;

use clap::Parser;
use ferry::client::{Client, Target};
use ferry::config::{ByteOrder, ClientConfig, DelimiterScan, Framing};

/// Fetch one file over HTTP/1.1.
#[derive(Debug, Parser)]
#[command(name = "ferry-client", version)]
struct Cli {
    /// http://hostname[:port]/path/to/file
    url: String,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Response framing the server uses
    #[arg(long, value_enum)]
    framing: Option<Framing>,

    /// Byte order of the length prefix
    #[arg(long, value_enum)]
    byte_order: Option<ByteOrder>,

    /// How the header/body delimiter is searched for
    #[arg(long, value_enum)]
    delimiter_scan: Option<DelimiterScan>,

    /// Output file for length-prefixed downloads
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        let code = if e.use_stderr() { 1 } else { 0 };
        let _ = e.print();
        std::process::exit(code);
    });

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let mut cfg = match ClientConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    };
    if let Some(framing) = cli.framing {
        cfg.framing = framing;
    }
    if let Some(order) = cli.byte_order {
        cfg.byte_order = order;
    }
    if let Some(scan) = cli.delimiter_scan {
        cfg.delimiter_scan = scan;
    }
    if let Some(output) = cli.output {
        cfg.output = output;
    }

    let result = match Target::parse(&cli.url) {
        Ok(target) => Client::new(cfg).run(&target).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

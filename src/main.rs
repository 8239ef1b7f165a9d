use clap::Parser;
use signature_cleanup::{cleanup::InkColor, config::Config, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "signature-cleanup-server")]
#[command(about = "Signature and stamp cleanup server: transparent ink masks from photos and scans")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "SIGNATURE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "SIGNATURE_PORT", default_value = "9393")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 20MB)
    #[arg(long, env = "SIGNATURE_MAX_FILE_SIZE", default_value = "20971520")]
    pub max_file_size: usize,

    /// Ink color used when a request does not name one
    #[arg(long, env = "SIGNATURE_DEFAULT_INK_COLOR", value_enum, default_value = "black")]
    pub default_ink_color: InkColor,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            default_ink_color: args.default_ink_color,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from(args);

    tracing::info!(
        "Starting signature-cleanup-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(
        "Binding to {}:{} (default ink: {})",
        config.host,
        config.port,
        config.default_ink_color.as_str()
    );

    server::run(config).await
}

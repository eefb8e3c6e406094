use clap::{Parser, Subcommand};
use stateboard_cli::{commands, ConnectionArgs};
use stateboard_config::{DEFAULT_BIND_ADDR, DEFAULT_REFRESH_INTERVAL_SECS};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(flatten)]
    conn: ConnectionArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the local history in sync and serve the JSON API
    Serve {
        #[arg(long, env = "STATEBOARD_BIND", default_value = DEFAULT_BIND_ADDR)]
        bind: String,
        /// Seconds to wait between sync cycles
        #[arg(long, env = "STATEBOARD_INTERVAL", default_value_t = DEFAULT_REFRESH_INTERVAL_SECS)]
        interval: u64,
    },
    /// Run a single sync cycle
    Sync,
    /// List tracked keys in the bucket
    Keys,
    /// List remote versions of a state
    History {
        key: String,
    },
    /// Print stored content of a state
    Show {
        key: String,
        #[arg(long)]
        version: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("default subscriber");

    match cli.command {
        Commands::Serve { bind, interval } => commands::cmd_serve(cli.conn, bind, interval).await?,
        Commands::Sync => {
            let report = commands::cmd_sync(cli.conn).await?;
            if !report.is_clean() {
                std::process::exit(2);
            }
        }
        Commands::Keys => {
            commands::cmd_keys(cli.conn).await?;
        }
        Commands::History { key } => {
            commands::cmd_history(cli.conn, key).await?;
        }
        Commands::Show { key, version } => commands::cmd_show(cli.conn, key, version).await?,
    }

    Ok(())
}

//! Binary entrypoint for the Habitforge CLI.
//!
//! Commands:
//! - `start` - run the engine service and the quest-expiry sweep
//! - `init` - create a starter `config.toml`
//! - `status` - print store statistics
//! - `sweep` - run one expiry sweep pass and exit
//! - `add-skin` - append a skin to the shop catalog
//! - `grant-coin` - credit coin to a user by username
//!
//! See the library crate docs for module-level details: `habitforge::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use habitforge::config::Config;
use habitforge::engine::{
    add_skin, fail_expired_quests, grant_coin_by_username, HabitStore, SkinDraft,
};
use habitforge::server::{spawn_sweeper, Service};

/// Implicit identity for operations run from the local console. The CLI is
/// trusted, so it carries its own admin roster.
const LOCAL_OPERATOR: &str = "local-operator";

#[derive(Parser)]
#[command(name = "habitforge")]
#[command(about = "Progression and economy service for a gamified habit tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the engine service
    Start,
    /// Initialize a new configuration file
    Init,
    /// Show store statistics
    Status,
    /// Run one quest-expiry sweep pass and exit
    Sweep,
    /// Add a skin to the shop catalog
    AddSkin {
        /// Display name
        #[arg(long)]
        name: String,
        /// One-line description
        #[arg(long)]
        description: String,
        /// Image path or URL served by the frontend
        #[arg(long)]
        image: String,
        /// Price in coin
        #[arg(long)]
        price: u64,
    },
    /// Credit coin to a user by username
    GrantCoin {
        /// Target username
        #[arg(long)]
        username: String,
        /// Amount of coin to credit
        #[arg(long)]
        amount: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes it)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    if !matches!(cli.command, Commands::Init) {
        init_logging(&pre_config, cli.verbose);
    }

    match cli.command {
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Created configuration file: {}", cli.config);
            println!("Edit it to set the data directory and admin principals, then run 'habitforge start'.");
        }
        Commands::Start => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            info!(
                "Starting {} v{}",
                config.service.name,
                env!("CARGO_PKG_VERSION")
            );
            let store = HabitStore::open(&config.storage.data_dir)?;
            let (handle, service_join) = Service::spawn(store, config.service_config());
            let sweeper = spawn_sweeper(handle.clone(), config.sweep);

            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received");
            drop(handle);
            service_join.await?;
            if let Some(sweeper) = sweeper {
                sweeper.await?;
            }
        }
        Commands::Status => {
            let config = require_config(pre_config, &cli.config)?;
            let store = HabitStore::open(&config.storage.data_dir)?;
            println!("Service:  {}", config.service.name);
            println!("Data dir: {}", config.storage.data_dir);
            println!("Users:    {}", store.user_count()?);
            println!("Skins:    {}", store.skin_count()?);
            println!("Admins:   {}", config.service.admin_principals.len());
        }
        Commands::Sweep => {
            let config = require_config(pre_config, &cli.config)?;
            let store = HabitStore::open(&config.storage.data_dir)?;
            let swept = fail_expired_quests(&store)?;
            println!("Failed {} overdue quest(s)", swept);
        }
        Commands::AddSkin {
            name,
            description,
            image,
            price,
        } => {
            let config = require_config(pre_config, &cli.config)?;
            let store = HabitStore::open(&config.storage.data_dir)?;
            let draft = SkinDraft {
                name,
                description,
                image_url: image,
                price,
            };
            let id = add_skin(&store, &local_roster(), LOCAL_OPERATOR, draft)?;
            println!("Added catalog skin {}", id);
        }
        Commands::GrantCoin { username, amount } => {
            let config = require_config(pre_config, &cli.config)?;
            let store = HabitStore::open(&config.storage.data_dir)?;
            grant_coin_by_username(&store, &local_roster(), LOCAL_OPERATOR, &username, amount)?;
            println!("Granted {} coin to '{}'", amount, username);
        }
    }

    Ok(())
}

fn local_roster() -> Vec<String> {
    vec![LOCAL_OPERATOR.to_string()]
}

fn require_config(pre_config: Option<Config>, path: &str) -> Result<Config> {
    pre_config.ok_or_else(|| {
        anyhow::anyhow!(
            "Configuration file {} not found; run 'habitforge init' first",
            path
        )
    })
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured base level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .map(|cfg| cfg.logging.file.clone())
        .filter(|path| !path.is_empty());
    if let Some(path) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));

            // If stdout is a terminal, mirror log lines to the console too.
            // Under a service manager stdout is redirected, so this is false.
            let is_tty = atty::is(atty::Stream::Stdout);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        } else {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}

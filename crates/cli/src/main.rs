//! CLI for the Warden fingerprint access controller.
//!
//! `run` drives the control loop: remote mirror -> water monitor -> access
//! decision. `names` maintains the identity name store offline.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use warden_control::journal::Journal;
use warden_control::{Collaborators, Controller};
use warden_core::config::BusTransportKind;
use warden_core::{Config, IdentityId};
use warden_provider::{
    BusTransport, ConsoleSensor, DigitalInput, DigitalOutput, FirebaseStore, LogTransport,
    NameStore, NullOutput, SysfsInput, SysfsOutput, SystemClock, UdpTransport,
};

/// Shown by `names` for an id with no stored name.
const UNNAMED: &str = "Unnamed";

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Fingerprint access controller")]
struct Cli {
    /// TOML configuration file. Built-in defaults apply when omitted.
    #[arg(short, long, global = true, env = "WARDEN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the access control loop until Ctrl-C.
    Run {
        #[arg(long, env = "WARDEN_DATABASE_URL")]
        database_url: Option<String>,

        #[arg(long, env = "WARDEN_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[arg(long, env = "WARDEN_USER_EMAIL")]
        user_email: Option<String>,

        #[arg(long, env = "WARDEN_USER_PASSWORD", hide_env_values = true)]
        user_password: Option<String>,
    },
    /// Manage display names of enrolled fingerprints.
    Names {
        /// Name store file. Defaults to `identity.path` from the config.
        #[arg(long)]
        store: Option<PathBuf>,

        #[command(subcommand)]
        action: NamesAction,
    },
}

#[derive(Subcommand, Debug)]
enum NamesAction {
    /// List stored names in id order.
    List,
    /// Store or replace the name of a fingerprint id.
    Set { id: u16, name: String },
    /// Forget the name of a fingerprint id.
    Remove { id: u16 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Run {
            database_url,
            api_key,
            user_email,
            user_password,
        } => {
            // Environment and flags win over the file.
            let remote = &mut config.remote;
            if let Some(url) = database_url {
                remote.url = url;
            }
            remote.api_key = api_key.or(remote.api_key.take());
            remote.user_email = user_email.or(remote.user_email.take());
            remote.user_password = user_password.or(remote.user_password.take());

            config.validate()?;
            run(config).await?;
        }
        Commands::Names { store, action } => {
            let path = store.unwrap_or_else(|| config.identity.path.clone());
            names(&path, config.identity.capacity, action)?;
        }
    }

    Ok(())
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = FirebaseStore::connect(&config.remote)?;

    let transport: Box<dyn BusTransport> = match config.bus.transport {
        BusTransportKind::Udp => {
            let peer = config.bus.peer.as_deref().unwrap_or_default();
            Box::new(UdpTransport::connect(&config.bus.bind, peer).await?)
        }
        BusTransportKind::Log => {
            tracing::info!("actuator bus in log-only mode");
            Box::new(LogTransport)
        }
    };

    let identities = NameStore::open(&config.identity.path)?;
    tracing::info!(
        path = %config.identity.path.display(),
        names = identities.len(),
        "identity store opened"
    );

    let gpio = &config.gpio;
    let buzzer: Box<dyn DigitalOutput> = match &gpio.buzzer_output {
        Some(path) => Box::new(SysfsOutput::new(path, gpio.buzzer_active_low)),
        None => Box::new(NullOutput),
    };
    let water = gpio
        .water_input
        .as_ref()
        .map(|path| Box::new(SysfsInput::new(path, gpio.water_active_low)) as Box<dyn DigitalInput>);
    if water.is_none() {
        tracing::info!("no water input configured, water monitor disabled");
    }

    let journal = match &config.journal.path {
        Some(path) => Journal::open(path)?,
        None => Journal::disabled(),
    };

    let mut controller = Controller::new(
        &config,
        Collaborators {
            store: Box::new(store),
            transport,
            sensor: Box::new(ConsoleSensor::stdin()),
            identities: Box::new(identities),
            clock: Box::new(SystemClock),
            buzzer,
            water,
            journal,
        },
    );

    controller
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

fn names(path: &Path, capacity: u16, action: NamesAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = NameStore::open(path)?;

    match action {
        NamesAction::List => {
            let entries = store.entries();
            if entries.is_empty() {
                println!("No names stored in {}", path.display());
            }
            for (id, name) in entries {
                println!("ID: {id:>3} | Name: {name}");
            }
        }
        NamesAction::Set { id, name } => {
            let id = IdentityId::new(id, capacity)?;
            let previous = current_name(&store, id);
            store.set(id, &name)?;
            store.save()?;
            println!("{}: {previous} -> {}", id.store_key(), name.trim());
        }
        NamesAction::Remove { id } => {
            let id = IdentityId::new(id, capacity)?;
            let previous = current_name(&store, id);
            if store.remove(id) {
                store.save()?;
                println!("{}: removed ({previous})", id.store_key());
            } else {
                println!("{}: {UNNAMED}, nothing to remove", id.store_key());
            }
        }
    }
    Ok(())
}

fn current_name(store: &NameStore, id: IdentityId) -> String {
    use warden_provider::IdentityStore;
    store.name(id).unwrap_or_else(|| UNNAMED.to_string())
}

//! Operate the fleet data core from the command line.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use clap::{Parser, Subcommand};
use fleet_backend::FleetSettings;
use fleet_backend::domain::{EntityKind, Error, RandomCodeSource, RefIdPolicyError};
use fleet_backend::inbound::{CliHandler, CliPolicies, CliRequest};
use fleet_backend::outbound::JsonFileDocumentStore;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use serde_json::Value;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `fleetctl` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fleetctl",
    about = "Create dashboard records and maintain their reference codes",
    version
)]
struct CliArgs {
    /// Directory holding the collection files. Falls back to `FLEET_DATA_DIR`.
    #[arg(long = "data-dir", value_name = "path", global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Create one record from a JSON form payload.
    Create {
        /// Record kind (client, driver, product, coupon, transfer, notification).
        #[arg(long, value_name = "kind")]
        kind: EntityKind,
        /// Path to a JSON object holding the form values.
        #[arg(long, value_name = "path")]
        payload: PathBuf,
    },
    /// Assign reference codes to records lacking one.
    Backfill {
        /// Record kind.
        #[arg(long, value_name = "kind")]
        kind: EntityKind,
        /// Report the codes that would be assigned without writing them.
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Print the schema learned from a collection.
    Schema {
        /// Record kind.
        #[arg(long, value_name = "kind")]
        kind: EntityKind,
    },
}

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .try_init()
    {
        warn!("tracing initialization failed: {error}");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = FleetSettings::load_from_iter([OsString::from("fleetctl")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    let policies = resolve_policies(&settings)?;
    let data_dir = args.data_dir.clone().unwrap_or_else(|| settings.data_dir());

    let store = JsonFileDocumentStore::open(&data_dir, Arc::new(DefaultClock)).map_err(|error| {
        io::Error::other(format!(
            "open data directory '{}': {error}",
            data_dir.display()
        ))
    })?;
    let handler = CliHandler::new(Arc::new(store), Arc::new(RandomCodeSource), policies);

    let request = build_request(args.command)?;
    let answer = handler.handle(request).await.map_err(render_domain_error)?;

    let rendered = serde_json::to_string_pretty(&answer)
        .map_err(|error| io::Error::other(format!("encode output: {error}")))?;
    println!("{rendered}");
    Ok(())
}

fn render_domain_error(error: Error) -> io::Error {
    match serde_json::to_string(&error) {
        Ok(envelope) => io::Error::other(envelope),
        Err(_) => io::Error::other(error),
    }
}

fn resolve_policies(settings: &FleetSettings) -> io::Result<CliPolicies> {
    let invalid =
        |error: RefIdPolicyError| io::Error::new(io::ErrorKind::InvalidInput, error.to_string());
    Ok(CliPolicies {
        create: settings.interactive_policy().map_err(invalid)?,
        backfill: settings.backfill_policy().map_err(invalid)?,
    })
}

fn build_request(command: Command) -> io::Result<CliRequest> {
    Ok(match command {
        Command::Create { kind, payload } => CliRequest::Create {
            kind,
            payload: read_payload(&payload)?,
        },
        Command::Backfill { kind, dry_run } => CliRequest::Backfill { kind, dry_run },
        Command::Schema { kind } => CliRequest::DescribeSchema { kind },
    })
}

fn read_payload(path: &Path) -> io::Result<Value> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "payload path must be a file")
    })?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
        io::Error::other(format!(
            "open payload directory '{}': {error}",
            parent.display()
        ))
    })?;
    let raw = directory.read_to_string(Path::new(file_name)).map_err(|error| {
        io::Error::other(format!("read payload '{}': {error}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("parse payload '{}': {error}", path.display()),
        )
    })
}

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use camlistore_gce::client::AuthorizedClient;
use camlistore_gce::gcp::gce::{GceClient, InstanceDescriptor};
use camlistore_gce::gcp::gcs::GcsClient;
use camlistore_gce::gcp::{CredentialBroker, TokenCache, load_client_credentials};
use camlistore_gce::provision::config::{
    DEFAULT_CLIENT_ID_FILE, DEFAULT_CLIENT_SECRET_FILE, DEFAULT_INSTANCE_NAME,
    DEFAULT_MACHINE_TYPE, DEFAULT_ZONE, GETTING_STARTED,
};
use camlistore_gce::provision::report::{SUMMARY_HEADERS, summary_row};
use camlistore_gce::{ProvisionConfig, ProvisionError, Provisioner};
use clap::{ArgAction, Parser};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::common::write_table;

#[derive(Parser, Debug)]
#[command(
    name = "camlistore-gce",
    about = "Create a Camlistore server on Google Compute Engine",
    disable_help_flag = true
)]
struct Cli {
    /// Name of Project
    #[arg(long)]
    project: Option<String>,

    /// GCE zone
    #[arg(long, default_value = DEFAULT_ZONE)]
    zone: String,

    /// e.g. n1-standard-1, f1-micro, g1-small
    #[arg(long = "machinetype", default_value = DEFAULT_MACHINE_TYPE)]
    machine_type: String,

    /// Name of VM instance.
    #[arg(long = "instance_name", default_value = DEFAULT_INSTANCE_NAME)]
    instance_name: String,

    /// ssh public key file to authorize. Can modify later in Google's web UI anyway.
    #[arg(long = "ssh_public_key")]
    ssh_public_key: Option<PathBuf>,

    /// File holding the OAuth2 client id
    #[arg(long = "client_id_file", default_value = DEFAULT_CLIENT_ID_FILE)]
    client_id_file: PathBuf,

    /// File holding the OAuth2 client secret
    #[arg(long = "client_secret_file", default_value = DEFAULT_CLIENT_SECRET_FILE)]
    client_secret_file: PathBuf,

    /// print a few hints to help with getting started.
    #[arg(long, action = ArgAction::SetTrue)]
    help: bool,
}

impl Cli {
    /// `None` when no project was given.
    fn into_config(self) -> Option<ProvisionConfig> {
        let project = self.project.filter(|p| !p.is_empty())?;
        Some(ProvisionConfig {
            project,
            zone: self.zone,
            machine_type: self.machine_type,
            instance_name: self.instance_name,
            ssh_public_key: self.ssh_public_key,
            client_id_file: self.client_id_file,
            client_secret_file: self.client_secret_file,
        })
    }
}

fn print_help() {
    for hint in GETTING_STARTED {
        println!("{hint}");
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(env_filter)
        .try_init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    if cli.help {
        print_help();
        return;
    }
    // A missing project is not treated as a usage error: print the hints and exit 0.
    let Some(config) = cli.into_config() else {
        tracing::warn!("Missing --project flag.");
        print_help();
        return;
    };

    let Err(error) = run(config).await else {
        return;
    };
    match error.downcast_ref::<ProvisionError>() {
        Some(e) => tracing::error!(
            kind = %e.kind(),
            code = e.error_code(),
            "{error:#}"
        ),
        None => tracing::error!("{error:#}"),
    }
    process::exit(1);
}

async fn run(config: ProvisionConfig) -> Result<()> {
    let credentials = load_client_credentials(&config.client_id_file, &config.client_secret_file)?;
    let broker = CredentialBroker::new(credentials, TokenCache::for_project(&config.project))?;
    let token = broker.authenticate(&mut io::stdin().lock()).await?;

    let client = AuthorizedClient::new(&token).map_err(ProvisionError::HttpClient)?;
    let storage = GcsClient::new(client.clone());
    let compute = GceClient::new(client);

    tracing::info!(
        project = %config.project,
        zone = %config.zone,
        machine_type = %config.machine_type,
        instance = %config.instance_name,
        "provisioning Camlistore server"
    );
    let instance = Provisioner::new(&config, &storage, &compute).run().await?;

    print_report(&instance).context("Failed to print instance report")
}

fn print_report(instance: &InstanceDescriptor) -> Result<()> {
    let mut out = io::stdout().lock();
    write_table(&mut out, &SUMMARY_HEADERS, &[summary_row(instance)])?;
    writeln!(out)?;
    writeln!(out, "Instance: {}", serde_json::to_string_pretty(instance)?)?;
    Ok(())
}

mod common;

// src/main.rs
mod config;
mod kubeconfig;
mod sync;
mod utils;
mod version;

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use config::Settings;
use kubeconfig::KubeConfig;
use sync::{Reconciler, SshTransport, SyncOptions, SyncOutcome};
use utils::logging::{Logger, StderrLogger};

#[derive(Parser)]
#[command(
    name = "kctxsync",
    version,
    about = "Sync certificate and key data from a remote Kubernetes cluster's kubeconfig to your local kubeconfig"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the contexts in the local kubeconfig
    List {
        /// Path to the kubeconfig file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Sync a local kubeconfig context with its remote server
    Sync {
        /// Context to sync; may be omitted when the kubeconfig has exactly one
        context: Option<String>,
        /// Path to the kubeconfig file
        #[arg(short, long)]
        config: Option<String>,
        /// Username for the SSH connection (default: root)
        #[arg(short, long)]
        user: Option<String>,
        /// SSH host to contact instead of the host from the cluster server URL
        #[arg(short = 's', long)]
        ssh: Option<String>,
        /// Sync every context in the kubeconfig
        #[arg(short, long)]
        all: bool,
    },
    /// Print the version information of kctxsync
    Version,
}

fn main() {
    let cli = Cli::parse();

    if let Err(error) = run(cli) {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
}

fn run(cli: Cli) -> io::Result<()> {
    match cli.command {
        Commands::List { config } => run_list(config),
        Commands::Sync {
            context,
            config,
            user,
            ssh,
            all,
        } => run_sync(context, config, user, ssh, all, cli.debug),
        Commands::Version => {
            println!("{}", version::version_line());
            Ok(())
        }
    }
}

fn run_list(config_flag: Option<String>) -> io::Result<()> {
    let settings = Settings::load()?;
    let path = resolve_kubeconfig_path(config_flag, &settings)?;
    let local = kubeconfig::load(&path)?;

    println!("List of available Kubernetes contexts (sorted alphabetically):");
    for name in local.context_names() {
        println!("- {}", name);
    }
    Ok(())
}

fn run_sync(
    context: Option<String>,
    config_flag: Option<String>,
    user_flag: Option<String>,
    ssh_host: Option<String>,
    all: bool,
    debug: bool,
) -> io::Result<()> {
    let settings = Settings::load()?;
    settings.validate()?;

    let path = resolve_kubeconfig_path(config_flag, &settings)?;
    let mut local = kubeconfig::load(&path)?;

    let options = SyncOptions {
        config_path: path,
        remote_user: user_flag.unwrap_or_else(|| settings.remote_user.clone()),
        host_override: ssh_host,
        sync_all: all,
    };
    let transport = SshTransport::new(settings.ssh_key_path.clone(), settings.connect_timeout_secs);
    let logger: Box<dyn Logger> = Box::new(StderrLogger::new(debug));
    let mut reconciler = Reconciler::new(transport, options.clone(), logger);

    if options.sync_all {
        let outcomes = reconciler.sync_all(&mut local);
        let mut failures = 0;
        for (name, result) in &outcomes {
            match result {
                Ok(SyncOutcome::Updated) => println!("{}: updated", name),
                Ok(SyncOutcome::UpToDate) => println!("{}: already up-to-date", name),
                Err(error) => {
                    eprintln!("{}: {}", name, error);
                    failures += 1;
                }
            }
        }
        if failures > 0 {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} of {} contexts failed to sync", failures, outcomes.len()),
            ));
        }
        return Ok(());
    }

    let context_name = match context {
        Some(name) => name,
        None => select_only_context(&local)?,
    };

    println!("Syncing context: {}", context_name);
    match reconciler.sync_context(&context_name, &mut local)? {
        SyncOutcome::Updated => println!("Local kubeconfig updated successfully."),
        SyncOutcome::UpToDate => println!("Local kubeconfig is already up-to-date."),
    }
    Ok(())
}

// Flag beats settings file beats ~/.kube/config.
fn resolve_kubeconfig_path(flag: Option<String>, settings: &Settings) -> io::Result<PathBuf> {
    if let Some(path) = flag.or_else(|| settings.kubeconfig_path.clone()) {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }
    dirs::home_dir()
        .map(|home| home.join(".kube").join("config"))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "could not determine the home directory",
            )
        })
}

fn select_only_context(local: &KubeConfig) -> io::Result<String> {
    let names = local.context_names();
    match names.as_slice() {
        [only] => {
            println!(
                "No context provided, using the only available context: {}",
                only
            );
            Ok(only.clone())
        }
        [] => Err(io::Error::new(
            io::ErrorKind::NotFound,
            "the kubeconfig contains no contexts",
        )),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no context provided and the kubeconfig contains several; name one or pass --all",
        )),
    }
}

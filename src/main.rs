//! Termkeep CLI - inspect and edit saved sessions, trusted host keys and the
//! random seed of a remote terminal client.

use clap::Parser;
use std::process;
use termkeep::cli::{Cli, Commands, HostkeyCommands, SeedCommands, SessionCommands};
use termkeep::commands::{self, Output};
use termkeep::config::{EnvDefaults, ResourceOverlay};
use termkeep::hostkeys::{HostKeyStore, Verdict};
use termkeep::paths::StoreLayout;
use termkeep::seed::SeedFile;
use termkeep::settings::SettingsStore;
use tracing_subscriber::EnvFilter;

/// Environment variable controlling log verbosity (tracing filter syntax).
const LOG_ENV: &str = "TERMKEEP_LOG";

/// Exit status when a host key does not match the stored one.
const EXIT_MISMATCH: i32 = 3;
/// Exit status when no host key is stored for the host.
const EXIT_NO_RECORD: i32 = 4;

fn main() {
    init_logging();

    let cli = Cli::parse();
    let human = cli.human_readable;

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            if let termkeep::Error::TrustStoreWrite { path, .. } = &e {
                tracing::error!(path = %path.display(), "host key store is not writable");
            }
            if human {
                eprintln!("Error: {}", e);
            } else {
                eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
            }
            process::exit(1);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build the fallback layer: resource file first, then `--resource` flags.
fn build_overlay(cli: &Cli) -> Result<ResourceOverlay, termkeep::Error> {
    let mut overlay = ResourceOverlay::new(EnvDefaults);
    if let Some(path) = &cli.resource_file {
        overlay.provide_file(path)?;
    }
    for resource in &cli.resources {
        if let Err(e) = overlay.provide(resource) {
            tracing::warn!("{}", e);
        }
    }
    Ok(overlay)
}

/// Run the selected command and return the process exit status.
fn run(cli: Cli) -> Result<i32, termkeep::Error> {
    let human = cli.human_readable;
    let layout = StoreLayout::resolve(cli.root.clone())?;
    tracing::debug!(root = %layout.root().display(), "using store root");

    match &cli.command {
        Commands::Session { command } => {
            let store = SettingsStore::new(layout.clone());
            match command {
                SessionCommands::List => output(&commands::session_list(&store)?, human),
                SessionCommands::Show { name } => {
                    output(&commands::session_show(&store, name.as_deref())?, human)
                }
                SessionCommands::Get { name, key } => {
                    let overlay = build_overlay(&cli)?;
                    output(
                        &commands::session_get(&store, &overlay, Some(name.as_str()), key)?,
                        human,
                    )
                }
                SessionCommands::Set { name, assignments } => output(
                    &commands::session_set(&store, Some(name.as_str()), assignments)?,
                    human,
                ),
                SessionCommands::Delete { name } => {
                    output(&commands::session_delete(&store, Some(name.as_str()))?, human)
                }
                SessionCommands::Encode { name } => {
                    output(&commands::session_encode(name.as_deref()), human)
                }
                SessionCommands::Decode { token } => {
                    output(&commands::session_decode(token), human)
                }
            }
        }
        Commands::Hostkey { command } => {
            let store = HostKeyStore::new(&layout);
            match command {
                HostkeyCommands::Verify {
                    hostname,
                    port,
                    keytype,
                    key,
                } => {
                    let check = commands::hostkey_verify(&store, hostname, *port, keytype, key)?;
                    output(&check, human);
                    return Ok(match check.verdict {
                        Verdict::Match => 0,
                        Verdict::Mismatch => EXIT_MISMATCH,
                        Verdict::NoRecord => EXIT_NO_RECORD,
                    });
                }
                HostkeyCommands::Store {
                    hostname,
                    port,
                    keytype,
                    key,
                } => output(
                    &commands::hostkey_save(&store, hostname, *port, keytype, key, false)?,
                    human,
                ),
                HostkeyCommands::Replace {
                    hostname,
                    port,
                    keytype,
                    key,
                } => output(
                    &commands::hostkey_save(&store, hostname, *port, keytype, key, true)?,
                    human,
                ),
                HostkeyCommands::List => output(&commands::hostkey_list(&store)?, human),
            }
        }
        Commands::Seed { command } => {
            let seed = SeedFile::new(&layout);
            match command {
                SeedCommands::Show => output(&commands::seed_show(&seed), human),
                SeedCommands::Write { data } => {
                    output(&commands::seed_write(&seed, data)?, human)
                }
            }
        }
    }

    Ok(0)
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

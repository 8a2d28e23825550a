use std::process::ExitCode;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;
use wallet_core::config_models::cli_args::Args;
use wallet_core::config_models::cli_args::Command;
use wallet_core::config_models::cli_args::NetworkCommand;
use wallet_core::config_models::data_directory::DataDirectory;
use wallet_core::config_models::session_config::SessionConfig;
use wallet_core::secret_store::HostEnvironment;
use wallet_core::session::EnvPrompt;
use wallet_core::session::PasswordPrompt;
use wallet_core::session::PasswordStrength;
use wallet_core::session::SessionManager;
use wallet_core::session::TerminalPrompt;
use wallet_core::session::PASSWORD_ENV_VAR;
use wallet_core::wallet::AddressMetadata;
use wallet_core::wallet::Wallet;
use wallet_core::WalletError;

pub fn main() -> ExitCode {
    let args = Args::parse();

    // Configure logger to use ISO-8601, of which rfc3339 is a subset.
    // Accepted `RUST_LOG` values are `trace`, `debug`, `info`, `warn`,
    // and `error`. Logs go to stderr, command output to stdout.
    let info_env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_env_filter(info_env_filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Unable to set global default subscriber");
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            let code = e
                .downcast_ref::<WalletError>()
                .map_or(1, WalletError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn password_prompt(non_interactive: bool) -> Result<Box<dyn PasswordPrompt>> {
    if let Some(prompt) = EnvPrompt::from_env(PASSWORD_ENV_VAR) {
        return Ok(Box::new(prompt));
    }
    if non_interactive {
        bail!("--non-interactive requires the master password in {PASSWORD_ENV_VAR}");
    }
    Ok(Box::new(TerminalPrompt))
}

fn run(args: Args) -> Result<()> {
    let data_dir = DataDirectory::get(args.data_dir.clone())?;
    let mut config = SessionConfig::default();
    if args.no_keychain {
        config.host = HostEnvironment::headless();
    }

    let session = SessionManager::open(data_dir, config, password_prompt(args.non_interactive)?)?;
    let mut wallet = Wallet::new(session);

    match args.command {
        Command::Setup { timeout, force } => {
            if wallet.session().is_configured() && !force {
                bail!("master password is already set up; pass --force to replace it");
            }
            let strength = wallet.session().setup_with_prompt(timeout)?;
            println!("Master password set (strength: {strength}).");
            if strength <= PasswordStrength::Weak {
                println!("Consider a longer password mixing letters, digits and symbols.");
            }
            let timeout = wallet.session().timeout_minutes().unwrap_or(timeout);
            println!("Session timeout: {timeout} minutes.");
        }
        Command::Generate { label, network } => {
            let metadata = wallet.generate_address(label.as_deref(), network.as_deref())?;
            print_address(&metadata, false);
        }
        Command::ImportMnemonic {
            phrase,
            label,
            network,
        } => {
            let phrase = match phrase {
                Some(phrase) => zeroize::Zeroizing::new(phrase),
                None if args.non_interactive => {
                    bail!("pass the phrase as an argument with --non-interactive")
                }
                None => TerminalPrompt.prompt_password("Backup phrase: ")?,
            };
            let metadata = wallet.import_mnemonic(&phrase, label.as_deref(), network.as_deref())?;
            print_address(&metadata, false);
        }
        Command::ImportKey {
            private_key,
            label,
            network,
        } => {
            let metadata =
                wallet.import_private_key(&private_key, label.as_deref(), network.as_deref())?;
            print_address(&metadata, false);
        }
        Command::ExportMnemonic { address } => {
            let phrase = wallet.export_mnemonic(&address)?;
            println!("{phrase}");
        }
        Command::Validate { address } => {
            if wallet.validate_address(&address) {
                println!("valid");
            } else {
                println!("invalid");
                return Err(WalletError::Validation(format!("invalid address '{address}'")).into());
            }
        }
        Command::List => {
            let active = wallet.active_address()?.map(|a| a.address);
            let addresses = wallet.addresses()?;
            if addresses.is_empty() {
                println!("No addresses. Run `wallet-cli generate` to create one.");
            }
            for metadata in addresses {
                let is_active = active.as_ref() == Some(&metadata.address);
                print_address(&metadata, is_active);
            }
        }
        Command::Remove { address } => {
            wallet.remove_address(&address)?;
            println!("Removed {address}");
        }
        Command::UseAddress { address } => {
            wallet.set_active_address(&address)?;
            println!("Active address: {address}");
        }
        Command::Network(command) => run_network_command(&mut wallet, command)?,
        Command::Audit { last } => {
            let entries = wallet.session().audit_entries();
            let skip = last.map_or(0, |n| entries.len().saturating_sub(n));
            for entry in entries.iter().skip(skip) {
                println!(
                    "{}  {:<16} {:<8} {}  {}@{}",
                    entry.timestamp.to_rfc3339(),
                    entry.action,
                    if entry.success { "ok" } else { "FAILED" },
                    entry.target,
                    entry.user,
                    entry.host
                );
            }
        }
    }
    Ok(())
}

fn run_network_command(wallet: &mut Wallet, command: NetworkCommand) -> Result<()> {
    match command {
        NetworkCommand::Add { name, url, prefix } => {
            wallet.add_network(&name, &url, &prefix)?;
            if wallet.active_network()?.is_none() {
                wallet.set_active_network(&name)?;
            }
            println!("Added network {name}");
        }
        NetworkCommand::List => {
            let active = wallet.active_network()?.map(|n| n.name);
            for network in wallet.networks()? {
                let marker = if active.as_deref() == Some(network.name.as_str()) {
                    "*"
                } else {
                    " "
                };
                let last_tested = network
                    .last_tested
                    .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
                println!(
                    "{marker} {:<16} {:<6} {}  tested: {} ({}/{} ok)",
                    network.name,
                    network.prefix,
                    network.url,
                    last_tested,
                    network.stats.successes,
                    network.stats.tests
                );
            }
        }
        NetworkCommand::Use { name } => {
            wallet
                .set_active_network(&name)
                .with_context(|| format!("cannot select network {name}"))?;
            println!("Active network: {name}");
        }
        NetworkCommand::Remove { name } => {
            wallet.remove_network(&name)?;
            println!("Removed network {name}");
        }
    }
    Ok(())
}

fn print_address(metadata: &AddressMetadata, is_active: bool) {
    let marker = if is_active { "*" } else { " " };
    println!(
        "{marker} {}  {}  [{}, {}]",
        metadata.address, metadata.name, metadata.network, metadata.origin
    );
}

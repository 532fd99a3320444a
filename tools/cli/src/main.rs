//! VaultGate CLI - Command line administration of the vault lock.
//!
//! This tool manages the vault PIN, the auto-lock preference and the
//! biometric flag in a credential store, and can check PINs with the same
//! attempt counting the app uses.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use vaultgate_common::{Error, PreconditionError};
use vaultgate_crypto::KdfParams;
use vaultgate_storage::{create_default_registry, select_store, SecretStore, DEFAULT_PREFERENCE};
use vaultgate_vault::{
    AutoLockPolicy, GateConfig, LockState, NoBiometrics, UnlockOutcome, VaultGate,
};

#[derive(Parser)]
#[command(name = "vaultgate")]
#[command(about = "VaultGate - Vault PIN and auto-lock administration")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Credential file (default: <data dir>/vaultgate/credentials.json).
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Credential backend.
    #[arg(short, long, global = true, value_enum, default_value_t = Backend::File)]
    backend: Backend,

    /// Gate configuration file (JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// KDF strength for new PINs: "interactive", "moderate", or "sensitive".
    #[arg(short, long, global = true)]
    kdf: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// JSON file at --store.
    File,
    /// OS keyring (needs the `keyring` feature).
    Keyring,
    /// Keyring if usable, else the file.
    Auto,
}

#[derive(Subcommand)]
enum Commands {
    /// Show lock state and settings.
    Status,

    /// Create the vault PIN.
    SetPin {
        /// PIN (prompted if omitted).
        #[arg(long)]
        pin: Option<String>,
    },

    /// Change the vault PIN.
    ChangePin {
        /// Current PIN (prompted if omitted).
        #[arg(long)]
        current: Option<String>,

        /// New PIN (prompted if omitted).
        #[arg(long)]
        new: Option<String>,
    },

    /// Remove the vault PIN and disable biometric unlock.
    RemovePin {
        /// Skip the confirmation question.
        #[arg(short, long)]
        yes: bool,
    },

    /// Check PINs against the stored one, counting failed attempts.
    ///
    /// With no --pin arguments, PINs are read one per line from stdin until
    /// one is accepted or input ends.
    Verify {
        /// Candidate PINs, tried in order.
        #[arg(long = "pin")]
        pins: Vec<String>,
    },

    /// Show or set the auto-lock policy.
    Policy {
        /// One of: immediate (0), 1, 5, 15, 30, never.
        value: Option<String>,
    },

    /// Turn biometric unlock on or off.
    Biometric {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &cli.config {
        Some(path) => GateConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => GateConfig::default(),
    };
    if let Some(preset) = &cli.kdf {
        config.kdf = KdfParams::from_preset(preset)?;
    }
    let store = open_store(cli.backend, cli.store.as_deref()).await?;
    let gate = VaultGate::mount(store.clone(), Arc::new(NoBiometrics), config)
        .await
        .context("Failed to read vault credentials")?;

    match cli.command {
        Commands::Status => cmd_status(&gate, store.as_ref()).await,
        Commands::SetPin { pin } => cmd_set_pin(&gate, pin).await,
        Commands::ChangePin { current, new } => cmd_change_pin(&gate, current, new).await,
        Commands::RemovePin { yes } => cmd_remove_pin(&gate, yes).await,
        Commands::Verify { pins } => cmd_verify(&gate, pins).await,
        Commands::Policy { value } => cmd_policy(&gate, value.as_deref()).await,
        Commands::Biometric { state } => cmd_biometric(&gate, state == Toggle::On).await,
    }
}

fn default_store_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("Could not determine a data directory, pass --store")?;
    Ok(base.join("vaultgate").join("credentials.json"))
}

/// Resolve the credential backend.
async fn open_store(backend: Backend, path: Option<&Path>) -> Result<Arc<dyn SecretStore>> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_store_path()?,
    };
    let registry = create_default_registry()?;
    let store_config = serde_json::json!({
        "path": path.to_string_lossy(),
    });

    let preference: &[&str] = match backend {
        Backend::File => &["file"],
        Backend::Keyring => &["keyring"],
        Backend::Auto => DEFAULT_PREFERENCE,
    };
    let store = select_store(&registry, preference, &store_config)
        .await
        .context("No usable credential store")?;
    info!("Credential store: {}", store.name());
    Ok(store)
}

/// Prompt for a PIN without echo.
fn prompt_pin(prompt: &str) -> Result<Zeroizing<String>> {
    let pin = rpassword::prompt_password(prompt).context("Failed to read PIN")?;
    Ok(Zeroizing::new(pin))
}

fn pin_or_prompt(given: Option<String>, prompt: &str) -> Result<Zeroizing<String>> {
    match given {
        Some(pin) => Ok(Zeroizing::new(pin)),
        None => prompt_pin(prompt),
    }
}

/// Show lock state and settings.
async fn cmd_status(gate: &VaultGate, store: &dyn SecretStore) -> Result<()> {
    let settings = gate.settings().await?;
    let state = match gate.state().await {
        LockState::Uninitialized => "no PIN set",
        LockState::Locked { .. } => "locked",
        _ => "unlocked",
    };

    println!("Vault: {}", state);
    println!(
        "  Store: {}{}",
        store.name(),
        if store.is_secure() { " (secure)" } else { "" }
    );
    println!("  PIN: {}", if settings.has_pin { "set" } else { "not set" });
    println!(
        "  Biometric: {}",
        match (settings.biometric_available, settings.biometric_enabled) {
            (false, _) => "not available",
            (true, true) => "enabled",
            (true, false) => "disabled",
        }
    );
    println!("  Auto-lock: {}", settings.auto_lock_policy);

    Ok(())
}

/// Create the vault PIN.
async fn cmd_set_pin(gate: &VaultGate, pin: Option<String>) -> Result<()> {
    let (pin, confirm) = match pin {
        Some(pin) => {
            let pin = Zeroizing::new(pin);
            (pin.clone(), pin)
        }
        None => (prompt_pin("New PIN: ")?, prompt_pin("Confirm PIN: ")?),
    };

    match gate.setup_pin(&pin, &confirm).await {
        Ok(()) => {
            println!("Vault PIN has been set");
            Ok(())
        }
        Err(Error::Precondition(
            PreconditionError::InvalidState(_) | PreconditionError::PinAlreadySet,
        )) => {
            bail!("A PIN is already set, use change-pin")
        }
        Err(e) => Err(e).context("Failed to set PIN"),
    }
}

/// Change the vault PIN.
async fn cmd_change_pin(
    gate: &VaultGate,
    current: Option<String>,
    new: Option<String>,
) -> Result<()> {
    if gate.state().await == LockState::Uninitialized {
        bail!("No PIN set, use set-pin");
    }

    let current = pin_or_prompt(current, "Current PIN: ")?;
    match gate.verify_pin(&current).await? {
        UnlockOutcome::Unlocked => {}
        _ => bail!("Current PIN is incorrect"),
    }

    let (new, confirm) = match new {
        Some(pin) => {
            let pin = Zeroizing::new(pin);
            (pin.clone(), pin)
        }
        None => (prompt_pin("New PIN: ")?, prompt_pin("Confirm new PIN: ")?),
    };

    gate.change_pin(&current, &new, &confirm)
        .await
        .context("Failed to change PIN")?;
    println!("Vault PIN has been changed");
    Ok(())
}

/// Remove the vault PIN.
async fn cmd_remove_pin(gate: &VaultGate, yes: bool) -> Result<()> {
    if !gate.settings().await?.has_pin {
        println!("No PIN set");
        return Ok(());
    }

    if !yes {
        print!("Remove the vault PIN? This will disable vault security. [y/N] ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Cancelled");
            return Ok(());
        }
    }

    gate.remove_pin().await.context("Failed to remove PIN")?;
    println!("Vault PIN has been removed");
    Ok(())
}

/// Verify PINs, printing each outcome.
async fn cmd_verify(gate: &VaultGate, pins: Vec<String>) -> Result<()> {
    if gate.state().await == LockState::Uninitialized {
        bail!("No PIN set");
    }

    let candidates: Box<dyn Iterator<Item = Result<Zeroizing<String>>>> = if pins.is_empty() {
        Box::new(
            std::io::stdin()
                .lock()
                .lines()
                .map(|line| line.map(Zeroizing::new).context("Failed to read stdin")),
        )
    } else {
        Box::new(pins.into_iter().map(|p| Ok(Zeroizing::new(p))))
    };

    for candidate in candidates {
        let candidate = candidate?;
        match gate.verify_pin(candidate.trim()).await {
            Ok(UnlockOutcome::Unlocked) => {
                println!("PIN accepted");
                return Ok(());
            }
            Ok(UnlockOutcome::Rejected { attempts_remaining }) => {
                println!("Incorrect PIN, {} attempts remaining", attempts_remaining);
            }
            Ok(UnlockOutcome::LockedOut { message, .. }) => println!("{}", message),
            Ok(UnlockOutcome::BiometricDeclined(_)) => {}
            Err(e @ Error::LockedOut { .. }) => println!("{}", e),
            Err(Error::Validation(e)) => println!("{}", e),
            Err(e) => return Err(e).context("Failed to verify PIN"),
        }
    }

    bail!("No PIN accepted")
}

/// Show or set the auto-lock policy.
async fn cmd_policy(gate: &VaultGate, value: Option<&str>) -> Result<()> {
    match value {
        None => {
            let current = gate.settings().await?.auto_lock_policy;
            println!("Auto-lock: {}", current);
            println!("Options:");
            for option in AutoLockPolicy::options() {
                let marker = if option == current { "*" } else { " " };
                println!("  {} {:<6} {}", marker, option.to_store_value(), option);
            }
        }
        Some(value) => {
            let policy: AutoLockPolicy = value.parse()?;
            gate.set_auto_lock_policy(policy)
                .await
                .context("Failed to save auto-lock policy")?;
            println!("Auto-lock: {}", policy);
        }
    }
    Ok(())
}

/// Turn biometric unlock on or off.
async fn cmd_biometric(gate: &VaultGate, enabled: bool) -> Result<()> {
    match gate.set_biometric_enabled(enabled).await {
        Ok(()) => {
            println!(
                "Biometric unlock {}",
                if enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
        Err(e) => bail!("{} ({})", e, e.reason_code()),
    }
}

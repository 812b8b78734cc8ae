//! Campus Guard CLI - operator access to the security helpers
//!
//! Useful for provisioning (generating keys, hashing an admin password) and
//! for checking values by hand (decrypting a stored blob, testing sanitizer
//! output). Logs go to stderr so command output can be piped.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use guard_core::{
    csrf, Cipher, ClientInfo, ConfigManager, EncryptionKey, EventDetails, SecretString,
    SecurityLog, DEFAULT_TOKEN_BYTES,
};

/// Campus Guard - password, token, encryption and audit helpers
#[derive(Parser, Debug)]
#[command(name = "campus-guard")]
#[command(version)]
#[command(about = "Campus Guard - security helpers for the learning platform")]
struct Args {
    /// Directory holding guard.json (defaults to the platform config dir)
    #[arg(long, env = "GUARD_CONFIG_DIR", global = true)]
    config_dir: Option<PathBuf>,

    /// Hex encryption key, overriding the config file
    #[arg(long, env = "GUARD_ENCRYPTION_KEY", hide_env_values = true, global = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hash a password (prompts when --password is omitted)
    Hash {
        #[arg(long)]
        password: Option<String>,
    },
    /// Check a password against a stored hash
    Verify {
        #[arg(long)]
        hash: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Check a password against the strength policy
    Strength {
        #[arg(long)]
        password: Option<String>,
    },
    /// Print a random hex token
    Token {
        #[arg(long, default_value_t = DEFAULT_TOKEN_BYTES)]
        bytes: usize,
    },
    /// Print a CSRF token for a fresh session
    Csrf,
    /// Generate an encryption key
    GenKey {
        #[arg(long, default_value = "aes-256-gcm")]
        cipher: Cipher,
        /// Store the key in guard.json instead of printing it
        #[arg(long)]
        save: bool,
    },
    /// Encrypt text with the configured key
    Encrypt { plaintext: String },
    /// Decrypt a blob with the configured key
    Decrypt { blob: String },
    /// Print the sanitized form of the input
    Sanitize { input: String },
    /// Validate an email address
    Email { address: String },
    /// Append a record to the security log
    LogEvent {
        event: String,
        #[arg(long)]
        actor: Option<String>,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        user_agent: Option<String>,
        /// Detail entries as key=value (value parsed as JSON when possible)
        #[arg(long = "detail", value_parser = parse_detail)]
        details: Vec<(String, serde_json::Value)>,
    },
}

fn parse_detail(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn read_password(provided: Option<String>) -> anyhow::Result<SecretString> {
    match provided {
        Some(password) => Ok(SecretString::new(password)),
        None => rpassword::prompt_password("Password: ")
            .map(SecretString::new)
            .context("Failed to read password"),
    }
}

fn load_config(args: &Args) -> anyhow::Result<ConfigManager> {
    let dir = match &args.config_dir {
        Some(dir) => dir.clone(),
        None => ConfigManager::default_dir()?,
    };
    ConfigManager::new(&dir).with_context(|| format!("Failed to load config from {:?}", dir))
}

fn load_key(args: &Args) -> anyhow::Result<EncryptionKey> {
    let config = load_config(args)?;
    let settings = &config.get().encryption;
    match &args.key {
        Some(hex_key) => Ok(EncryptionKey::from_hex(settings.cipher, hex_key)?),
        None => Ok(settings.key()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match &args.command {
        Command::Hash { password } => {
            let password = read_password(password.clone())?;
            println!("{}", guard_core::hash_password(password.expose())?);
        }
        Command::Verify { hash, password } => {
            let password = read_password(password.clone())?;
            if !guard_core::verify_password(password.expose(), hash) {
                println!("mismatch");
                return Ok(ExitCode::FAILURE);
            }
            println!("ok");
        }
        Command::Strength { password } => {
            let password = read_password(password.clone())?;
            if !guard_core::is_password_strong(password.expose()) {
                println!("weak: needs 8+ characters with upper, lower and a digit");
                return Ok(ExitCode::FAILURE);
            }
            println!("strong");
        }
        Command::Token { bytes } => {
            println!("{}", guard_core::generate_token(*bytes)?);
        }
        Command::Csrf => {
            let session = guard_core::MemorySession::new();
            println!("{}", csrf::csrf_token(&session)?);
        }
        Command::GenKey { cipher, save } => {
            if *save {
                let mut config = load_config(&args)?;
                config.rotate_key(*cipher).await?;
                info!("Stored new {} key in {:?}", cipher, config.path());
            } else {
                let key = EncryptionKey::generate(*cipher)?;
                println!("{}", key.to_hex().expose());
            }
        }
        Command::Encrypt { plaintext } => {
            let key = load_key(&args)?;
            println!("{}", guard_core::encrypt_string(plaintext, &key)?);
        }
        Command::Decrypt { blob } => {
            let key = load_key(&args)?;
            let plaintext = guard_core::decrypt(blob, &key)?;
            println!("{}", String::from_utf8_lossy(&plaintext));
        }
        Command::Sanitize { input } => {
            println!("{}", guard_core::sanitize(input));
        }
        Command::Email { address } => {
            if !guard_core::is_valid_email(address) {
                println!("invalid");
                return Ok(ExitCode::FAILURE);
            }
            println!("valid");
        }
        Command::LogEvent {
            event,
            actor,
            ip,
            user_agent,
            details,
        } => {
            let config = load_config(&args)?;
            let log = SecurityLog::new(&config.get().security_log);
            let client = ClientInfo {
                ip: ip.clone(),
                user_agent: user_agent.clone(),
            };
            let details: EventDetails = details.iter().cloned().collect();
            log.try_log_event(event, actor.as_deref(), &client, details)
                .map_err(|e| anyhow!("Failed to write {:?}: {}", log.path(), e))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

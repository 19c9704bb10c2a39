//! cryptext: encrypted text messages over any text channel
//!
//! Commands:
//!   encrypt [TEXT]          - seal text (stdin if omitted) for a stored key or a password
//!   decrypt [INPUT]         - open a sealed message with any stored key or a password
//!   keygen --name NAME      - create a shared key and print it for the other party
//!   key import --name NAME  - store a key received from someone else
//!   key list                - list stored keys
//!   key revoke NAME         - mark a key revoked and print a revocation notice
//!   key delete NAME         - remove a key from the store
//!   config show             - display current configuration

mod sealer;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::SecretString;
use std::io::Read;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use cryptext_core::config::{CryptextConfig, EncodingSetting, PasswordModeSetting};
use cryptext_core::store::{resolve_key_material, JsonKeyStore, KeyEntry, KeyStore, SecretSealer};
use cryptext_crypto::checksum::{attach_checksum, verify_checksum};
use cryptext_crypto::{
    base61, derive_keyset, generate_secret, open_text, open_with_password, seal_revocation,
    seal_text, seal_with_password, KdfParams, Keyset, Message, OpenError, PasswordMode,
    PasswordParams, SealOptions, TextEncoding, SECRET_SIZE,
};

use crate::sealer::PassphraseSealer;

/// Symbols per space-separated group when printing a key for transcription.
const KEY_GROUP_WIDTH: usize = 5;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "cryptext",
    version,
    about = "Encrypt text messages for any text channel",
    long_about = "cryptext: seal short text messages with shared keys or passwords, \
                  and open them again from a link or pasted text"
)]
struct Cli {
    /// Path to cryptext.toml (default: ~/.config/cryptext/config.toml)
    #[arg(long, short = 'c', env = "CRYPTEXT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "CRYPTEXT_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seal a message
    ///
    /// Uses the named key, or the only active key if there is exactly one.
    /// With --password the message is sealed under a password instead
    /// (read from CRYPTEXT_PASSWORD or prompted).
    Encrypt {
        /// Message text (default: read stdin)
        text: Option<String>,
        /// Stored key to seal for
        #[arg(long, short = 'k')]
        key: Option<String>,
        /// Seal under a password instead of a stored key
        #[arg(long, short = 'p')]
        password: bool,
        /// Output Base61 instead of base64url
        #[arg(long)]
        base61: bool,
        /// Print the bare token without the link prefix
        #[arg(long)]
        no_url: bool,
    },

    /// Open a message
    ///
    /// Accepts a link, a bare token, or text with a link somewhere inside.
    Decrypt {
        /// Sealed message (default: read stdin)
        input: Option<String>,
        /// Open with a password instead of the stored keys
        #[arg(long, short = 'p')]
        password: bool,
    },

    /// Generate a new shared key
    Keygen {
        /// Local name for the key
        #[arg(long, short = 'n')]
        name: String,
        /// Seal the key material under a store passphrase
        #[arg(long)]
        protect: bool,
    },

    /// Key store management
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Import a key printed by `cryptext keygen`
    Import {
        /// Local name for the key
        #[arg(long, short = 'n')]
        name: String,
        /// Key text (default: read stdin); spaces and line breaks are ignored
        secret: Option<String>,
        /// Seal the key material under a store passphrase
        #[arg(long)]
        protect: bool,
    },

    /// List stored keys
    List,

    /// Revoke a key and print a sealed revocation notice for the other party
    Revoke {
        /// Key name or id
        key: String,
    },

    /// Delete a key from the store
    Delete {
        /// Key name or id
        key: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = CryptextConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(level, &format);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "cryptext starting"
    );

    match cli.command {
        Commands::Encrypt { text, key, password, base61, no_url } => {
            cmd_encrypt(&config, text, key.as_deref(), password, base61, no_url)
        }
        Commands::Decrypt { input, password } => cmd_decrypt(&config, input, password),
        Commands::Keygen { name, protect } => cmd_keygen(&config, &name, protect),
        Commands::Key { action: KeyAction::Import { name, secret, protect } } => {
            cmd_key_import(&config, &name, secret, protect)
        }
        Commands::Key { action: KeyAction::List } => cmd_key_list(&config),
        Commands::Key { action: KeyAction::Revoke { key } } => cmd_key_revoke(&config, &key),
        Commands::Key { action: KeyAction::Delete { key } } => cmd_key_delete(&config, &key),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries sealed output; logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn default_config_path() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(".config").join("cryptext").join("config.toml")
}

// ── Config → library parameters ───────────────────────────────────────────────

fn seal_options(config: &CryptextConfig, base61: bool, no_url: bool) -> SealOptions {
    let encoding = match (base61, config.transport.encoding) {
        (true, _) | (false, EncodingSetting::Base61) => TextEncoding::Base61,
        (false, EncodingSetting::Base64url) => TextEncoding::Base64Url,
    };
    SealOptions {
        encoding,
        wrap_url: config.transport.wrap_url && !no_url,
        url_prefix: config.transport.url_prefix.clone(),
        compression_level: config.transport.compression_level,
    }
}

fn kdf_params(config: &CryptextConfig) -> KdfParams {
    KdfParams {
        iterations: config.kdf.iterations,
    }
}

fn password_params(config: &CryptextConfig) -> PasswordParams {
    PasswordParams {
        mode: match config.kdf.password_mode {
            PasswordModeSetting::Cascade => PasswordMode::Cascade,
            PasswordModeSetting::Single => PasswordMode::Single,
        },
        kdf: kdf_params(config),
    }
}

// ── Input helpers ─────────────────────────────────────────────────────────────

/// The argument if given, otherwise all of stdin.
fn arg_or_stdin(arg: Option<String>) -> Result<Zeroizing<String>> {
    match arg {
        Some(text) => Ok(Zeroizing::new(text)),
        None => {
            let mut buf = Zeroizing::new(String::new());
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

/// Message password from CRYPTEXT_PASSWORD, or prompted.
fn message_password(confirm: bool) -> Result<SecretString> {
    if let Ok(pw) = std::env::var("CRYPTEXT_PASSWORD") {
        return Ok(SecretString::from(pw));
    }
    prompt_secret("Message password: ", confirm)
}

/// Store passphrase from CRYPTEXT_STORE_PASSPHRASE, or prompted.
fn store_passphrase(confirm: bool) -> Result<SecretString> {
    if let Ok(pw) = std::env::var("CRYPTEXT_STORE_PASSPHRASE") {
        return Ok(SecretString::from(pw));
    }
    prompt_secret("Key store passphrase: ", confirm)
}

fn prompt_secret(prompt: &str, confirm: bool) -> Result<SecretString> {
    let first = Zeroizing::new(rpassword::prompt_password(prompt).context("reading password")?);
    if first.is_empty() {
        bail!("empty password");
    }
    if confirm {
        let second =
            Zeroizing::new(rpassword::prompt_password("Repeat: ").context("reading password")?);
        if *first != *second {
            bail!("passwords do not match");
        }
    }
    Ok(SecretString::from(first.to_string()))
}

fn open_store(config: &CryptextConfig) -> Result<JsonKeyStore> {
    let path = config.store.resolved_path();
    JsonKeyStore::open(&path).with_context(|| format!("opening key store: {}", path.display()))
}

/// Store passphrase sealer, derived once, when any of `entries` is sealed.
fn sealer_for<'a>(
    config: &CryptextConfig,
    entries: impl IntoIterator<Item = &'a KeyEntry>,
) -> Result<Option<PassphraseSealer>> {
    if !entries.into_iter().any(|e| e.wrapped) {
        return Ok(None);
    }
    let passphrase = store_passphrase(false)?;
    Ok(Some(PassphraseSealer::new(&passphrase, &kdf_params(config))))
}

/// Keyset for a stored entry. Sealed material needs `sealer`.
fn entry_keyset(entry: &KeyEntry, sealer: Option<&PassphraseSealer>) -> Result<Keyset> {
    let secret = resolve_key_material(entry, sealer.map(|s| s as &dyn SecretSealer))
        .with_context(|| format!("unsealing key '{}'", entry.name))?;
    derive_keyset(&secret).with_context(|| format!("deriving keyset for '{}'", entry.name))
}

/// Keysets for every entry that resolves. Entries that cannot be unsealed
/// are skipped so the remaining keys are still tried.
fn candidate_keysets(
    entries: &[KeyEntry],
    sealer: Option<&PassphraseSealer>,
) -> Vec<(String, Keyset)> {
    entries
        .iter()
        .filter_map(|entry| match entry_keyset(entry, sealer) {
            Ok(keys) => Some((entry.name.clone(), keys)),
            Err(e) => {
                tracing::warn!(key = %entry.name, "skipping key: {e:#}");
                None
            }
        })
        .collect()
}

/// Store a new entry for `secret`, sealing it first when `protect` is set.
fn store_secret(
    config: &CryptextConfig,
    store: &mut JsonKeyStore,
    name: &str,
    secret: &[u8],
    protect: bool,
) -> Result<String> {
    let mut entry = KeyEntry::new(name, Vec::new(), protect);
    entry.material = if protect {
        let sealer = PassphraseSealer::new(&store_passphrase(true)?, &kdf_params(config));
        sealer.seal(&entry.id, secret).context("sealing key material")?
    } else {
        secret.to_vec()
    };
    let id = store.add(entry).context("saving key")?;
    tracing::debug!(key = name, %id, sealed = protect, "stored key");
    Ok(id)
}

// ── `cryptext encrypt` ────────────────────────────────────────────────────────

fn cmd_encrypt(
    config: &CryptextConfig,
    text: Option<String>,
    key: Option<&str>,
    password: bool,
    base61: bool,
    no_url: bool,
) -> Result<()> {
    let text = arg_or_stdin(text)?;
    let opts = seal_options(config, base61, no_url);

    let sealed = if password {
        let pw = message_password(true)?;
        seal_with_password(&text, &pw, &password_params(config), &opts)
            .context("sealing message")?
    } else {
        let store = open_store(config)?;
        let entry = match key {
            Some(key) => store.lookup(key)?,
            None => {
                let mut active = store.list().iter().filter(|e| !e.revoked);
                match (active.next(), active.next()) {
                    (Some(entry), None) => entry,
                    (None, _) => bail!("no active keys; create one with `cryptext keygen`"),
                    (Some(_), Some(_)) => bail!("several keys stored; choose one with --key"),
                }
            }
        };
        if entry.revoked {
            bail!("key '{}' is revoked", entry.name);
        }
        let sealer = sealer_for(config, [entry])?;
        let keys = entry_keyset(entry, sealer.as_ref())?;
        tracing::debug!(key = %entry.name, "sealing for stored key");
        seal_text(&text, &keys, &opts).context("sealing message")?
    };

    println!("{sealed}");
    Ok(())
}

// ── `cryptext decrypt` ────────────────────────────────────────────────────────

fn cmd_decrypt(config: &CryptextConfig, input: Option<String>, password: bool) -> Result<()> {
    let input = arg_or_stdin(input)?;
    let prefix = &config.transport.url_prefix;

    let opened = if password {
        let pw = message_password(false)?;
        open_with_password(&input, &pw, &password_params(config), prefix)
    } else {
        let mut store = open_store(config)?;
        if store.list().is_empty() {
            bail!("no keys stored; import one with `cryptext key import`");
        }

        // Revoked keys stay candidates so older messages still open.
        let sealer = sealer_for(config, store.list())?;
        let candidates = candidate_keysets(store.list(), sealer.as_ref());
        if candidates.is_empty() {
            bail!("none of the stored keys could be unsealed; check the store passphrase");
        }
        let opened = open_text(
            &input,
            candidates.iter().map(|(name, keys)| (name.as_str(), keys)),
            prefix,
        );

        if let Ok(o) = &opened {
            if o.message == Message::KeyRevoked {
                mark_revoked(&mut store, &o.key_id)?;
            }
        }
        opened
    };

    match opened {
        Ok(o) => {
            println!("{}", o.display_text());
            Ok(())
        }
        Err(OpenError::Failed) => bail!("could not decrypt the message with any available key"),
        Err(e) => Err(e).context("opening message"),
    }
}

fn mark_revoked(store: &mut JsonKeyStore, name: &str) -> Result<()> {
    let mut entry = store.lookup(name)?.clone();
    if !entry.revoked {
        entry.revoked = true;
        store.update(entry).context("marking key revoked")?;
        tracing::info!(key = name, "key revoked by its owner");
    }
    Ok(())
}

// ── `cryptext keygen` / `cryptext key …` ──────────────────────────────────────

fn cmd_keygen(config: &CryptextConfig, name: &str, protect: bool) -> Result<()> {
    let mut store = open_store(config)?;
    let secret = generate_secret(SECRET_SIZE);
    let framed = attach_checksum(&secret).context("computing key checksum")?;
    store_secret(config, &mut store, name, &secret, protect)?;

    println!("Key '{name}' created. Share this with the other party over a trusted channel:");
    println!();
    println!("{}", base61::group(&base61::encode(&framed), KEY_GROUP_WIDTH));
    Ok(())
}

fn cmd_key_import(
    config: &CryptextConfig,
    name: &str,
    secret: Option<String>,
    protect: bool,
) -> Result<()> {
    let text = arg_or_stdin(secret)?;
    let framed = Zeroizing::new(base61::decode(&text).context("key text is not valid Base61")?);
    let Some(secret) = verify_checksum(&framed) else {
        bail!("key checksum mismatch; check the key text for typos");
    };
    if secret.is_empty() {
        bail!("key text holds no key material");
    }

    let mut store = open_store(config)?;
    store_secret(config, &mut store, name, &secret, protect)?;
    println!("Key '{name}' imported.");
    Ok(())
}

fn cmd_key_list(config: &CryptextConfig) -> Result<()> {
    let store = open_store(config)?;
    if store.list().is_empty() {
        println!("No keys in {}", store.path().display());
        return Ok(());
    }
    for entry in store.list() {
        let mut flags = Vec::new();
        if entry.revoked {
            flags.push("revoked");
        }
        if entry.wrapped {
            flags.push("sealed");
        }
        println!("{:<24} {}  {}", entry.name, entry.id, flags.join(","));
    }
    Ok(())
}

fn cmd_key_revoke(config: &CryptextConfig, key: &str) -> Result<()> {
    let mut store = open_store(config)?;
    let entry = store.lookup(key)?.clone();
    let sealer = sealer_for(config, [&entry])?;
    let keys = entry_keyset(&entry, sealer.as_ref())?;
    let notice =
        seal_revocation(&keys, &seal_options(config, false, false)).context("sealing notice")?;
    mark_revoked(&mut store, &entry.name)?;

    println!("Key '{}' revoked. Send this notice to the other party:", entry.name);
    println!();
    println!("{notice}");
    Ok(())
}

fn cmd_key_delete(config: &CryptextConfig, key: &str) -> Result<()> {
    let mut store = open_store(config)?;
    let id = store.lookup(key)?.id.clone();
    store.delete(&id).context("deleting key")?;
    println!("Key '{key}' deleted.");
    Ok(())
}

// ── `cryptext config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &CryptextConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

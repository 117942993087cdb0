//! hseal: layered authenticated encryption from the command line
//!
//! Commands:
//!   seal / open / verify          - signed single-shot envelopes
//!   stream encrypt|decrypt        - chunked streams with an HMAC trailer
//!   cookie encrypt|decrypt VALUE  - compact cookie values
//!   frame encrypt|decrypt|digest  - framed AES-CTR + ChaCha20-Poly1305 streams
//!   keygen                        - print a fresh base64 key
//!   config show                   - display the active configuration
//!
//! Keys are read from the environment variables named in the `[keys]` table.

mod config;
mod keys;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use config::{HsealConfig, LogFormat};
use hseal_crypto::{
    decrypt_cookie, decrypt_data, decrypt_stream, encode_key, encrypt_cookie, encrypt_data,
    encrypt_stream, generate_key, verify_ciphertext, FramedCodec, SealedData,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "hseal",
    version,
    about = "Layered AES-256-GCM + ChaCha20-Poly1305 encryption",
    long_about = "hseal: seal values, streams, cookies and framed streams under two independent AEAD layers"
)]
struct Cli {
    /// Path to hseal.toml configuration file
    #[arg(long, short = 'c', env = "HSEAL_CONFIG", default_value = "hseal.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [log] level
    #[arg(long, env = "HSEAL_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides [log] format
    #[arg(long, env = "HSEAL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt and sign a value; writes the envelope and signature on two lines
    Seal {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Verify and decrypt an envelope written by `seal`
    Open {
        /// File holding the envelope line followed by the signature line
        #[arg(long)]
        envelope_file: PathBuf,
        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Check an envelope's signature without decrypting (exit status 1 on mismatch)
    Verify {
        #[arg(long)]
        envelope_file: PathBuf,
    },

    /// Chunked streaming codec
    Stream {
        #[command(subcommand)]
        action: StreamAction,
    },

    /// Cookie codec
    Cookie {
        #[command(subcommand)]
        action: CookieAction,
    },

    /// Framed hybrid stream codec
    Frame {
        #[command(subcommand)]
        action: FrameAction,
    },

    /// Print a fresh random 32-byte key in standard base64
    Keygen,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct IoArgs {
    /// Input file (default: stdin)
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,
    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum StreamAction {
    Encrypt {
        #[command(flatten)]
        io: IoArgs,
    },
    Decrypt {
        #[command(flatten)]
        io: IoArgs,
    },
}

#[derive(Subcommand, Debug)]
enum CookieAction {
    /// Encrypt a cookie value
    Encrypt { value: String },
    /// Decrypt an encoded cookie
    Decrypt { value: String },
}

#[derive(Subcommand, Debug)]
enum FrameAction {
    Encrypt {
        #[command(flatten)]
        io: IoArgs,
    },
    Decrypt {
        #[command(flatten)]
        io: IoArgs,
        /// Hex HMAC-SHA256 digest the input must match before any frame is opened
        #[arg(long)]
        expect_digest: Option<String>,
    },
    /// Print the hex HMAC-SHA256 digest of a framed stream
    Digest {
        /// Input file (default: stdin)
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
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
    let loaded = config::load_config(&cli.config)?;

    let log_defaults = loaded.as_ref().map(|c| c.log.clone()).unwrap_or_default();
    init_logging(
        cli.log.as_deref().unwrap_or(&log_defaults.level),
        cli.log_format.unwrap_or(log_defaults.format),
    );

    let config = match loaded {
        Some(config) => config,
        None => {
            tracing::warn!(
                "config file not found: {}  (using defaults)",
                cli.config.display()
            );
            HsealConfig::default()
        }
    };
    debug!(config = %cli.config.display(), "hseal starting");

    match cli.command {
        Commands::Seal { io } => cmd_seal(&config, &io),
        Commands::Open { envelope_file, output } => {
            cmd_open(&config, &envelope_file, output.as_deref())
        }
        Commands::Verify { envelope_file } => cmd_verify(&config, &envelope_file),
        Commands::Stream { action: StreamAction::Encrypt { io } } => cmd_stream(&config, &io, true),
        Commands::Stream { action: StreamAction::Decrypt { io } } => {
            cmd_stream(&config, &io, false)
        }
        Commands::Cookie { action: CookieAction::Encrypt { value } } => {
            cmd_cookie_encrypt(&config, &value)
        }
        Commands::Cookie { action: CookieAction::Decrypt { value } } => {
            cmd_cookie_decrypt(&config, &value)
        }
        Commands::Frame { action: FrameAction::Encrypt { io } } => cmd_frame_encrypt(&config, &io),
        Commands::Frame { action: FrameAction::Decrypt { io, expect_digest } } => {
            cmd_frame_decrypt(&config, &io, expect_digest.as_deref())
        }
        Commands::Frame { action: FrameAction::Digest { input } } => {
            cmd_frame_digest(&config, input.as_deref())
        }
        Commands::Keygen => {
            println!("{}", encode_key(&generate_key()));
            Ok(())
        }
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries ciphertext and plaintext; logs go to stderr.
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

// ── I/O helpers ───────────────────────────────────────────────────────────────

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(p) => {
            let file =
                File::open(p).with_context(|| format!("opening input: {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin().lock()))),
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file =
                File::create(p).with_context(|| format!("creating output: {}", p.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

/// Envelope files hold the envelope on the first line and the signature on the second.
fn read_envelope_file(path: &Path) -> Result<SealedData> {
    let file = File::open(path).with_context(|| format!("opening envelope: {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut next_line = |what: &str| -> Result<String> {
        match lines.next() {
            Some(line) => Ok(line
                .with_context(|| format!("reading envelope: {}", path.display()))?
                .trim()
                .to_string()),
            None => bail!("{}: missing {what} line", path.display()),
        }
    };
    let envelope = next_line("envelope")?;
    let signature = next_line("signature")?;
    Ok(SealedData { envelope, signature })
}

// ── `hseal seal` / `open` / `verify` ──────────────────────────────────────────

fn cmd_seal(config: &HsealConfig, io: &IoArgs) -> Result<()> {
    let secret = keys::secret_from_env(&config.keys.secret_env)?;
    let sign_key = keys::secret_from_env(&config.keys.sign_key_env)?;

    let mut plaintext = Vec::new();
    open_input(io.input.as_deref())?
        .read_to_end(&mut plaintext)
        .context("reading plaintext")?;

    let sealed =
        encrypt_data(&plaintext, &secret, &sign_key, &config.codec).context("sealing value")?;

    let mut out = open_output(io.output.as_deref())?;
    writeln!(out, "{}", sealed.envelope)?;
    writeln!(out, "{}", sealed.signature)?;
    out.flush()?;

    info!(bytes = plaintext.len(), "sealed");
    Ok(())
}

fn cmd_open(config: &HsealConfig, envelope_file: &Path, output: Option<&Path>) -> Result<()> {
    let secret = keys::secret_from_env(&config.keys.secret_env)?;
    let sign_key = keys::secret_from_env(&config.keys.sign_key_env)?;
    let sealed = read_envelope_file(envelope_file)?;

    let plaintext = decrypt_data(
        &sealed.envelope,
        &sealed.signature,
        &secret,
        &sign_key,
        &config.codec,
    )
    .with_context(|| format!("opening envelope: {}", envelope_file.display()))?;

    let mut out = open_output(output)?;
    out.write_all(&plaintext)?;
    out.flush()?;
    Ok(())
}

fn cmd_verify(config: &HsealConfig, envelope_file: &Path) -> Result<()> {
    let sign_key = keys::secret_from_env(&config.keys.sign_key_env)?;
    let sealed = read_envelope_file(envelope_file)?;

    if verify_ciphertext(
        &sealed.envelope,
        &sealed.signature,
        &sign_key,
        config.codec.text_encoding,
    ) {
        println!("signature OK");
        Ok(())
    } else {
        eprintln!("signature mismatch: {}", envelope_file.display());
        std::process::exit(1);
    }
}

// ── `hseal stream` ────────────────────────────────────────────────────────────

fn cmd_stream(config: &HsealConfig, io: &IoArgs, encrypt: bool) -> Result<()> {
    let secret = keys::secret_from_env(&config.keys.secret_env)?;
    let sign_key = keys::secret_from_env(&config.keys.sign_key_env)?;
    let input = open_input(io.input.as_deref())?;
    let output = open_output(io.output.as_deref())?;

    let summary = if encrypt {
        encrypt_stream(input, output, &secret, &sign_key, &config.codec)
            .context("encrypting stream")?
    } else {
        decrypt_stream(input, output, &secret, &sign_key, &config.codec)
            .context("decrypting stream")?
    };

    info!(
        chunks = summary.chunks,
        plaintext_bytes = summary.plaintext_bytes,
        ciphertext_bytes = summary.ciphertext_bytes,
        "stream {}",
        if encrypt { "encrypted" } else { "decrypted" }
    );
    Ok(())
}

// ── `hseal cookie` ────────────────────────────────────────────────────────────

fn cmd_cookie_encrypt(config: &HsealConfig, value: &str) -> Result<()> {
    let key = keys::text_from_env(&config.keys.cookie_key_env)?;
    let text = encrypt_cookie(value.as_bytes(), &key, config.codec.cookie_encoding)
        .context("encrypting cookie")?;
    println!("{text}");
    Ok(())
}

fn cmd_cookie_decrypt(config: &HsealConfig, value: &str) -> Result<()> {
    let key = keys::text_from_env(&config.keys.cookie_key_env)?;
    let plaintext = decrypt_cookie(value.trim(), &key, config.codec.cookie_encoding)
        .context("decrypting cookie")?;

    let mut out = io::stdout().lock();
    out.write_all(&plaintext)?;
    writeln!(out)?;
    Ok(())
}

// ── `hseal frame` ─────────────────────────────────────────────────────────────

fn build_codec(config: &HsealConfig, with_hmac: bool) -> Result<FramedCodec> {
    let block_key = keys::key_from_env(&config.keys.block_key_env)?;
    let stream_key = keys::key_from_env(&config.keys.stream_key_env)?;
    let mut codec = FramedCodec::with_options(&block_key, &stream_key, &config.codec)
        .context("building framed codec")?;
    if with_hmac {
        codec.enable_hmac(&keys::secret_from_env(&config.keys.hmac_key_env)?);
    }
    Ok(codec)
}

fn cmd_frame_encrypt(config: &HsealConfig, io: &IoArgs) -> Result<()> {
    let codec = build_codec(config, false)?;
    let summary = codec
        .encrypt(open_input(io.input.as_deref())?, open_output(io.output.as_deref())?)
        .context("encrypting framed stream")?;
    info!(frames = summary.chunks, bytes = summary.plaintext_bytes, "framed stream encrypted");
    Ok(())
}

fn cmd_frame_decrypt(
    config: &HsealConfig,
    io: &IoArgs,
    expect_digest: Option<&str>,
) -> Result<()> {
    let codec = build_codec(config, expect_digest.is_some())?;

    if let Some(expected) = expect_digest {
        // The digest pass consumes the input, so it has to be re-readable.
        let Some(path) = io.input.as_deref() else {
            bail!("--expect-digest requires --input <FILE>");
        };
        let expected = hex::decode(expected.trim()).context("--expect-digest is not valid hex")?;
        let matches = codec
            .verify_digest(open_input(Some(path))?, &expected)
            .context("computing digest")?;
        if !matches {
            bail!("digest mismatch: {} (nothing decrypted)", path.display());
        }
        debug!("digest verified");
    }

    let summary = codec
        .decrypt(open_input(io.input.as_deref())?, open_output(io.output.as_deref())?)
        .context("decrypting framed stream")?;
    info!(frames = summary.chunks, bytes = summary.plaintext_bytes, "framed stream decrypted");
    Ok(())
}

fn cmd_frame_digest(config: &HsealConfig, input: Option<&Path>) -> Result<()> {
    let codec = build_codec(config, true)?;
    let digest = codec.digest(open_input(input)?).context("computing digest")?;
    println!("{}", hex::encode(digest));
    Ok(())
}

// ── `hseal config show` ───────────────────────────────────────────────────────

fn cmd_config_show(config: &HsealConfig, path: &Path) -> Result<()> {
    println!("# config: {}", path.display());
    print!(
        "{}",
        toml::to_string_pretty(config).context("serializing config")?
    );
    Ok(())
}

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bh_store::Session;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bh", about = "BlackHole cipher engine CLI")]
struct Cli {
    /// Directory for artifacts and feedback memory
    #[arg(long, global = true, default_value = ".")]
    data_dir: PathBuf,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a message into a .bhex artifact
    Encrypt {
        /// Message text
        #[arg(long, conflicts_with = "file")]
        message: Option<String>,

        /// Read the message from a file instead
        #[arg(long)]
        file: Option<PathBuf>,

        /// Password (prompted with confirmation when omitted)
        #[arg(long)]
        key: Option<String>,
    },

    /// Decrypt a .bhex artifact and print the message
    Decrypt {
        /// Artifact file path
        file: PathBuf,

        /// Password (prompted when omitted)
        #[arg(long)]
        key: Option<String>,
    },

    /// Verify an artifact and print its diagnostic package
    Inspect {
        /// Artifact file path
        file: PathBuf,

        /// Password (prompted when omitted)
        #[arg(long)]
        key: Option<String>,

        /// Dump the full package as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Encrypt { message, file, key } => {
            cmd_encrypt(&cli, message.as_deref(), file.as_deref(), key.as_deref())
        }
        Commands::Decrypt { file, key } => cmd_decrypt(&cli, file, key.as_deref()),
        Commands::Inspect { file, key, json } => cmd_inspect(&cli, file, key.as_deref(), *json),
    }
}

fn read_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Resolve the password, prompting (with confirmation on encrypt) when
/// it was not given on the command line.
fn resolve_key(key: Option<&str>, confirm: bool) -> Result<String> {
    if let Some(key) = key {
        if key.is_empty() {
            bail!("password must not be empty");
        }
        return Ok(key.to_string());
    }
    let first = read_line("password: ")?;
    if first.is_empty() {
        bail!("password must not be empty");
    }
    if confirm {
        let second = read_line("confirm password: ")?;
        if first != second {
            bail!("passwords do not match");
        }
    }
    Ok(first)
}

fn cmd_encrypt(
    cli: &Cli,
    message: Option<&str>,
    file: Option<&std::path::Path>,
    key: Option<&str>,
) -> Result<()> {
    let message = match (message, file) {
        (Some(m), _) => m.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => read_line("message: ")?,
    };
    if message.trim().is_empty() {
        bail!("nothing to encrypt");
    }
    let key = resolve_key(key, true)?;

    let mut session = Session::open(&cli.data_dir);
    let (path, outcome) = session
        .produce_artifact(&message, &key)
        .context("encryption failed")?;
    let d = &outcome.diagnostics;

    println!("artifact:   {}", path.display());
    println!("oracle:     {} :: {}", d.oracle_state, d.oracle_response);
    println!(
        "drift:      {:.2} [{}]  entropy={}",
        d.drift_score, d.drift_bar, d.entropy
    );
    println!(
        "rotor bias: {}  parasite bias={} (runs influenced: {})",
        d.rotor_total_bias, d.parasite_drift_bias, d.parasite_influence_count
    );
    println!(
        "profile:    {} ({} vowels, {} digits, {} symbols)",
        d.key_profile.branch_path.join(" > "),
        d.key_profile.vowel_count,
        d.key_profile.digit_count,
        d.key_profile.symbol_count
    );
    if d.fusion_considered {
        println!("fusion:     considered ({})", d.fusion_reason);
    }
    println!("shift log:  {} entries", d.shift_log_len);

    if cli.verbose {
        eprintln!("--- subconscious ({} fragments) ---", d.subconscious.len());
        for tag in &d.subconscious {
            eprintln!("  {tag}");
        }
        if d.blur_triggered {
            eprintln!("--- boundary blur fired, sample bias {:?} ---", d.sample_bias);
        }
    }

    Ok(())
}

fn cmd_decrypt(cli: &Cli, file: &std::path::Path, key: Option<&str>) -> Result<()> {
    let key = resolve_key(key, false)?;
    let session = Session::open(&cli.data_dir);
    let message = session
        .consume_artifact(file, &key)
        .with_context(|| format!("failed to decrypt {}", file.display()))?;
    println!("{message}");
    Ok(())
}

fn cmd_inspect(cli: &Cli, file: &std::path::Path, key: Option<&str>, json: bool) -> Result<()> {
    let key = resolve_key(key, false)?;
    let session = Session::open(&cli.data_dir);
    let package = session
        .inspect_artifact(file, &key)
        .with_context(|| format!("failed to open {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&package)?);
        return Ok(());
    }

    println!("created:    {}", package.created_at);
    println!("key hash:   {}", package.key_hash);
    println!(
        "profile:    {} ({} vowels, {} digits, {} symbols)",
        package.key_profile.branch_path.join(" > "),
        package.key_profile.vowel_count,
        package.key_profile.digit_count,
        package.key_profile.symbol_count
    );
    println!(
        "cipher:     {} chars, {} symbol substitutions",
        package.cipher.chars().count(),
        package.shared_symbols.len()
    );
    let min = package.shift_log.iter().min().copied().unwrap_or(0);
    let max = package.shift_log.iter().max().copied().unwrap_or(0);
    println!(
        "shift log:  {} entries, range {min}..={max}",
        package.shift_log.len()
    );
    println!("fragments:  {}", package.subconscious.len());
    if cli.verbose {
        for tag in &package.subconscious {
            eprintln!("  {tag}");
        }
    }
    Ok(())
}

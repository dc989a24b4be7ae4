//! forge-txgen: writes the genesis action stream for a fresh testnet.

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use forge_keys::SignatureMode;
use forge_txgen::{build_actions, compute_proportions, compute_stats, load_snapshot, GenConfig};
use forge_types::Timestamp;
use forge_utils::{format_duration, format_timestamp, ActionTally};

#[derive(Parser)]
#[command(name = "forge-txgen", about = "Testnet genesis action generator")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "FORGE_LOG_FORMAT")]
    log_format: LogFormat,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Inputs shared by every subcommand. Flags override the configuration file.
#[derive(clap::Args)]
struct Inputs {
    /// Path to the JSON or TOML configuration file.
    #[arg(long, env = "FORGE_TXGEN_CONFIG")]
    config: PathBuf,

    /// Snapshot file, replacing `snapshot_file` from the configuration.
    #[arg(long, env = "FORGE_TXGEN_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Backfill file, replacing `backfill_file` from the configuration.
    #[arg(long, env = "FORGE_TXGEN_BACKFILL")]
    backfill: Option<PathBuf>,

    /// Secret for procedural key derivation.
    #[arg(long, env = "FORGE_KEY_SECRET", hide_env_values = true)]
    key_secret: Option<String>,
}

impl Inputs {
    fn load(self) -> anyhow::Result<GenConfig> {
        let mut config = GenConfig::from_file(&self.config)
            .with_context(|| format!("failed to load config {}", self.config.display()))?;
        tracing::info!("Loaded config from {}", self.config.display());
        if let Some(snapshot) = self.snapshot {
            config.snapshot_file = Some(snapshot);
        }
        if let Some(backfill) = self.backfill {
            config.backfill_file = Some(backfill);
        }
        if let Some(secret) = self.key_secret {
            config.key_secret = secret;
        }
        Ok(config)
    }
}

#[derive(clap::Subcommand)]
enum Command {
    /// Write the action stream as JSON Lines.
    Generate {
        #[command(flatten)]
        inputs: Inputs,

        /// Output file (defaults to stdout).
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Emit seed placeholders delimited by this character instead of
        /// private keys.
        #[arg(long)]
        escape: Option<char>,
    },
    /// Summarize the snapshot, the proportions and the stream layout.
    Stats {
        #[command(flatten)]
        inputs: Inputs,

        /// Print the summary as one JSON object.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.log_format {
        LogFormat::Text => forge_utils::init_tracing(),
        LogFormat::Json => forge_utils::init_json_tracing(),
    }

    match cli.command {
        Command::Generate {
            inputs,
            output,
            escape,
        } => {
            let config = inputs.load()?;
            let mode = escape.map_or(SignatureMode::Resolved, SignatureMode::Escaped);
            generate(&config, mode, output)
        }
        Command::Stats { inputs, json } => stats(&inputs.load()?, json),
    }
}

fn generate(config: &GenConfig, mode: SignatureMode, output: Option<PathBuf>) -> anyhow::Result<()> {
    let stream = build_actions(config)?.with_signature_mode(mode);
    tracing::info!(
        actions = stream.action_count(),
        miss_blocks = stream.miss_blocks(),
        "generating action stream"
    );

    let mut out: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let mut tally = ActionTally::new();
    for action in stream {
        let action = action?;
        serde_json::to_writer(&mut out, &action)?;
        out.write_all(b"\n")?;
        tally.record(&action);
    }
    out.flush()?;

    tracing::info!(
        actions = tally.non_metadata(),
        transactions = tally.command("submit_transaction"),
        blocks = tally.blocks_waited,
        "action stream complete"
    );
    Ok(())
}

fn stats(config: &GenConfig, json: bool) -> anyhow::Result<()> {
    let snapshot_path = config
        .snapshot_file
        .as_ref()
        .context("snapshot_file is required")?;
    let snapshot = load_snapshot(snapshot_path)?;
    let account_stats = compute_stats(&snapshot, config)?;
    let proportions = compute_proportions(&account_stats, config)?;

    let stream = build_actions(config)?;
    let miss_blocks = stream.miss_blocks();
    let mut tally = ActionTally::new();
    for action in stream.with_signature_mode(SignatureMode::Escaped('$')) {
        tally.record(&action?);
    }

    if json {
        let summary = serde_json::json!({
            "snapshot": {
                "semver": snapshot.metadata.semver,
                "origin_api": snapshot.metadata.origin_api,
                "accounts": account_stats.account_names.len(),
                "total_vests": account_stats.total_vests.to_string(),
                "total_steem": account_stats.total_steem.to_string(),
            },
            "proportions": {
                "min_vesting_per_account": proportions.min_vesting_per_account.to_string(),
                "vest_conversion_factor": proportions.vest_conversion_factor.to_string(),
                "steem_conversion_factor": proportions.steem_conversion_factor.to_string(),
            },
            "miss_blocks": miss_blocks,
            "actions": tally,
        });
        println!("{summary}");
        return Ok(());
    }

    let genesis = Timestamp::new(config.genesis_timestamp);
    println!(
        "snapshot {} from {}",
        snapshot.metadata.semver, snapshot.metadata.origin_api
    );
    println!("  accounts        {}", account_stats.account_names.len());
    println!("  total vests     {}", account_stats.total_vests);
    println!("  total steem     {}", account_stats.total_steem);
    println!("proportions");
    println!("  min vesting     {}", proportions.min_vesting_per_account);
    println!("  vest factor     {}", proportions.vest_conversion_factor);
    println!("  steem factor    {}", proportions.steem_conversion_factor);
    println!("stream");
    println!("  genesis         {}", format_timestamp(genesis));
    println!(
        "  miss blocks     {} ({})",
        miss_blocks,
        format_duration(miss_blocks.saturating_mul(config.steem_block_interval))
    );
    println!("  actions         {}", tally.non_metadata());
    println!("  blocks waited   {}", tally.blocks_waited);
    for (command, count) in &tally.commands {
        println!("  {command:<22}{count}");
    }
    for (operation, count) in &tally.operations {
        println!("  {operation:<34}{count}");
    }
    Ok(())
}

mod logging;
mod script;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::{json, Value};
use staking_engine::{
    channel, CreatePoolParams, EngineConfig, FeePolicy, FixedPointAmount, StakingEngine,
    StakingEvent, TokenId, TracingSink, UserId,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::script::{Replay, Scenario};

fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  stakectl  v{ver}  ·  staking-pool accounting engine");
    println!("  {}", "─".repeat(62));
    println!("  Amounts   18-decimal fixed point, e.g. 1000 or 0.1");
    println!("  Time      caller-supplied unix seconds; replays are deterministic");
    println!();
}

// ─── CLI definition ──────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "stakectl",
    version,
    about   = "Replay staking scenarios and preview rewards and fees",
    long_about = None,
)]
struct Cli {
    /// Engine configuration (JSON). Overrides the scenario's own `config`.
    #[arg(long, global = true, value_name = "PATH", env = "STAKECTL_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn", env = "STAKECTL_LOG")]
    log_level: String,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON scenario against a fresh engine
    ///
    /// Each step prints its receipt followed by the events it committed.
    /// The final pool analytics and position snapshots are printed at the end.
    #[command(
        after_help = "\
EXAMPLES:
  stakectl replay --script packages/cli/scenarios/basic.json --keep-going
  stakectl replay --script run.json --keep-going --json

NOTES:
  Steps: create_pool, fund, set_active, stake, withdraw, claim,
  toggle_compounding, advance, at, user_info, analytics."
    )]
    Replay {
        /// Scenario file
        #[arg(long, value_name = "FILE")]
        script: PathBuf,

        /// Report failing steps and continue instead of stopping
        #[arg(long, default_value_t = false)]
        keep_going: bool,
    },

    /// Project the reward for a new stake
    ///
    /// Assumes the rest of the pool's stake stays unchanged for the duration.
    Estimate {
        /// Pool reward rate per second
        #[arg(long, value_name = "AMOUNT")]
        rate: FixedPointAmount,

        /// Stake already in the pool
        #[arg(long, value_name = "AMOUNT", default_value = "0")]
        total_staked: FixedPointAmount,

        /// Stake to add
        #[arg(long, value_name = "AMOUNT")]
        amount: FixedPointAmount,

        /// Holding period in seconds
        #[arg(long, value_name = "SECONDS")]
        duration: u64,
    },

    /// Preview the early-withdrawal fee
    Fee {
        #[arg(long, value_name = "AMOUNT")]
        amount: FixedPointAmount,

        /// Fee in basis points; defaults to the configured fee
        #[arg(long, value_name = "BPS")]
        bps: Option<u16>,

        /// Withdrawal timestamp
        #[arg(long, value_name = "UNIX")]
        now: u64,

        /// Position's lock end
        #[arg(long, value_name = "UNIX")]
        lock_end: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.json)?;

    let config = match &cli.config {
        Some(path) => Some(load_config(path).await?),
        None => None,
    };

    match cli.command {
        Commands::Replay { script, keep_going } => {
            cmd_replay(&script, config, keep_going, cli.json).await?;
        }
        Commands::Estimate { rate, total_staked, amount, duration } => {
            cmd_estimate(config.unwrap_or_default(), rate, total_staked, amount, duration, cli.json)?;
        }
        Commands::Fee { amount, bps, now, lock_end } => {
            let bps = bps.unwrap_or(config.unwrap_or_default().early_withdraw_fee_bps);
            cmd_fee(amount, bps, now, lock_end, cli.json)?;
        }
    }

    Ok(())
}

async fn load_config(path: &Path) -> Result<EngineConfig> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read config '{}'", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config '{}'", path.display()))?;
    config.validate()?;
    Ok(config)
}

// ─── replay ──────────────────────────────────────────────────────────────────

async fn cmd_replay(
    path: &Path,
    config: Option<EngineConfig>,
    keep_going: bool,
    json_out: bool,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read scenario '{}'", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid scenario '{}'", path.display()))?;

    let config = config.or(scenario.config.clone()).unwrap_or_default();
    info!(script = %path.display(), steps = scenario.steps.len(), "replaying scenario");
    let engine = StakingEngine::new(config).context("Invalid engine configuration")?;
    let (sink, mut events) = channel();
    engine.subscribe(Arc::new(sink));
    engine.subscribe(Arc::new(TracingSink));

    let mut replay = Replay::new(&engine);
    let mut failures = 0usize;

    if !json_out {
        println!("─── Replay ───────────────────────────────────────────────────────");
        println!("  Scenario         {}", path.display());
        println!("  Steps            {}", scenario.steps.len());
        println!();
    }

    for (index, step) in scenario.steps.iter().enumerate() {
        let result = replay.apply(step);
        let emitted = drain(&mut events);
        let now = replay.now();

        match result {
            Ok(receipt) => {
                info!(step = index, op = step.name(), now, events = emitted.len(), "step applied");
                if json_out {
                    println!("{}", json!({
                        "step":    index,
                        "op":      step.name(),
                        "now":     now,
                        "ok":      true,
                        "receipt": receipt,
                        "events":  emitted,
                    }));
                } else {
                    println!("  [{index:>3}] t={now:<10} {:<20} ok  {receipt}", step.name());
                    for event in &emitted {
                        println!("        event  {}", describe(event));
                    }
                }
            }
            Err(err) => {
                failures += 1;
                if json_out {
                    println!("{}", json!({
                        "step":  index,
                        "op":    step.name(),
                        "now":   now,
                        "ok":    false,
                        "error": err.to_string(),
                    }));
                } else {
                    println!("  [{index:>3}] t={now:<10} {:<20} ERR {err}", step.name());
                }
                if !keep_going {
                    bail!("step {index} ({}) failed: {err}", step.name());
                }
                warn!(step = index, op = step.name(), now, error = %err, "step failed, continuing");
            }
        }
    }

    let summary = replay.summary().context("Cannot read final state")?;
    if json_out {
        println!("{}", json!({ "summary": summary, "failures": failures }));
    } else {
        print_summary(&summary, failures);
    }
    Ok(())
}

fn drain(events: &mut UnboundedReceiver<StakingEvent>) -> Vec<StakingEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn describe(event: &StakingEvent) -> String {
    match event {
        StakingEvent::PoolCreated { pool_id, staking_token, reward_token, reward_rate_per_second, .. } => {
            format!("PoolCreated          pool {pool_id}  {staking_token}→{reward_token}  {reward_rate_per_second}/s")
        }
        StakingEvent::RewardPoolFunded { pool_id, amount, balance } => {
            format!("RewardPoolFunded     pool {pool_id}  +{amount}  balance {balance}")
        }
        StakingEvent::PoolStatusChanged { pool_id, is_active } => {
            format!("PoolStatusChanged    pool {pool_id}  active={is_active}")
        }
        StakingEvent::Staked { pool_id, user, amount, lock_end_time, .. } => {
            format!("Staked               pool {pool_id}  {user}  {amount}  locked until {lock_end_time}")
        }
        StakingEvent::Withdrawn { pool_id, user, amount, fee, .. } => {
            format!("Withdrawn            pool {pool_id}  {user}  {amount}  fee {fee}")
        }
        StakingEvent::RewardPaid { pool_id, user, reward, .. } => {
            format!("RewardPaid           pool {pool_id}  {user}  {reward}")
        }
        StakingEvent::RewardCompounded { pool_id, user, reward, .. } => {
            format!("RewardCompounded     pool {pool_id}  {user}  {reward}")
        }
        StakingEvent::CompoundingEnabled { pool_id, user } => {
            format!("CompoundingEnabled   pool {pool_id}  {user}")
        }
        StakingEvent::CompoundingDisabled { pool_id, user } => {
            format!("CompoundingDisabled  pool {pool_id}  {user}")
        }
    }
}

fn print_summary(summary: &Value, failures: usize) {
    let field = |v: &Value, key: &str| match v.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    println!();
    println!("─── Final State ──────────────────────────────────────────────────");
    println!("  Clock            {}", field(summary, "now"));
    println!("  Failed steps     {failures}");
    if let Some(pools) = summary.get("pools").and_then(Value::as_array) {
        for pool in pools {
            let analytics = &pool["analytics"];
            println!();
            println!("  Pool {}", field(analytics, "poolId"));
            println!("    Active           {}", field(analytics, "isActive"));
            println!("    Total staked     {}", field(analytics, "totalStaked"));
            println!("    Stakers          {}", field(analytics, "stakers"));
            println!("    Reward pool      {}", field(analytics, "rewardPoolBalance"));
            println!("    Collected fees   {}", field(pool, "collectedFees"));
            println!("    APR %            {}", field(analytics, "aprPercent"));
            println!("    Funded seconds   {}", field(analytics, "fundedSeconds"));
        }
    }
    if let Some(positions) = summary.get("positions").and_then(Value::as_array) {
        if !positions.is_empty() {
            println!();
            println!("  Positions");
        }
        for p in positions {
            println!(
                "    pool {:<4} {:<16} staked {:<20} rewards {:<20} locked {} compounding {}",
                field(p, "poolId"),
                field(p, "user"),
                field(p, "stakedAmount"),
                field(p, "rewards"),
                field(p, "isLocked"),
                field(p, "isCompounding"),
            );
        }
    }
}

// ─── estimate ────────────────────────────────────────────────────────────────

fn cmd_estimate(
    config: EngineConfig,
    rate: FixedPointAmount,
    total_staked: FixedPointAmount,
    amount: FixedPointAmount,
    duration: u64,
    json_out: bool,
) -> Result<()> {
    // A scratch pool holding `total_staked` gives the same projection as a live one.
    let engine = StakingEngine::new(config.with_minimum_stake(FixedPointAmount::ZERO))?;
    let pool = engine.create_pool(
        CreatePoolParams {
            staking_token:          TokenId::from("STAKE"),
            reward_token:           TokenId::from("REWARD"),
            reward_rate_per_second: rate,
            lock_duration_seconds:  1,
            minimum_stake:          None,
        },
        0,
    )?;
    if !total_staked.is_zero() {
        engine.stake(pool, &UserId::from("existing"), total_staked, 0)?;
    }
    let estimate = engine.estimate_rewards(pool, amount, duration, 0)?;

    if json_out {
        println!("{}", json!({
            "rate":        rate,
            "totalStaked": total_staked,
            "amount":      amount,
            "duration":    duration,
            "estimate":    estimate,
        }));
    } else {
        println!("─── Reward Estimate ──────────────────────────────────────────────");
        println!("  Rate             {rate} / s");
        println!("  Pool stake       {total_staked}");
        println!("  New stake        {amount}");
        println!("  Duration         {duration} s");
        println!("  Estimated reward {estimate}");
    }
    Ok(())
}

// ─── fee ─────────────────────────────────────────────────────────────────────

fn cmd_fee(amount: FixedPointAmount, bps: u16, now: u64, lock_end: u64, json_out: bool) -> Result<()> {
    let policy = FeePolicy::new(bps)?;
    let fee = policy.compute_fee(amount, now, lock_end)?;
    let net = amount.checked_sub(fee)?;
    let locked = now < lock_end;

    if json_out {
        println!("{}", json!({
            "amount": amount,
            "bps":    bps,
            "locked": locked,
            "fee":    fee,
            "net":    net,
        }));
    } else {
        println!("─── Early-Withdrawal Fee ─────────────────────────────────────────");
        println!("  Amount           {amount}");
        println!("  Locked           {}", if locked { "yes" } else { "no" });
        println!("  Fee rate         {bps} bps  ({:.2}%)", bps as f64 / 100.0);
        println!("  Fee              {fee}");
        println!("  You receive      {net}");
    }
    Ok(())
}

//! rtable CLI
//!
//! Command-line interface for the rtable routing table.

mod render;

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rtable_core::types::{parse_gateway, parse_oif};
use rtable_core::{RouteError, RouteKey, TableConfig};
use rtable_store::RouteTable;
use rtable_timer::TokioTimer;

use render::render_table;

const SAMPLE_ROUTES: u8 = 5;

/// rtable - routing table with TTL-driven eviction
#[derive(Parser)]
#[command(name = "rtable")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    table: TableArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the table configuration (defaults come from the environment).
#[derive(Args)]
struct TableArgs {
    /// Route time-to-live in seconds
    #[arg(long, global = true, env = "RTABLE_TTL_SECS")]
    ttl: Option<u64>,

    /// Maximum number of live routes
    #[arg(long, global = true, env = "RTABLE_MAX_ENTRIES")]
    max_entries: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu: add, delete, update, refresh and dump routes
    Shell {
        /// Start with the five sample routes
        #[arg(long)]
        seed: bool,
    },

    /// Insert the sample routes and watch them expire
    Demo {
        /// Number of sample routes to insert
        #[arg(short = 'n', long, default_value_t = SAMPLE_ROUTES, value_parser = clap::value_parser!(u8).range(1..=254))]
        seed_count: u8,

        /// Stop watching after this many seconds (default: until drained)
        #[arg(short, long)]
        watch: Option<u64>,

        /// Print dumps as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    let config = load_config(&cli.table)?;
    let timer = Arc::new(TokioTimer::current().context("Failed to start timer service")?);
    let table = Arc::new(
        RouteTable::with_config(config, timer).context("Invalid table configuration")?,
    );

    match cli.command {
        Commands::Shell { seed } => cmd_shell(table, seed).await,
        Commands::Demo {
            seed_count,
            watch,
            json,
        } => cmd_demo(&table, seed_count, watch, json).await,
    }
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        "rtable=debug,info"
    } else {
        "rtable=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn load_config(args: &TableArgs) -> Result<TableConfig> {
    let mut config = TableConfig::from_env().context("Failed to read configuration")?;
    if let Some(ttl) = args.ttl {
        config = config.with_ttl_seconds(ttl);
    }
    if let Some(max) = args.max_entries {
        config = config.with_max_entries(max);
    }
    config.validate()?;
    Ok(config)
}

/// The sample routes: 122.1.1.N/32 via 10.1.1.N dev eth(N-1).
fn seed_routes(table: &RouteTable, count: u8) -> Result<()> {
    for n in 1..=count {
        let key = RouteKey::new(Ipv4Addr::new(122, 1, 1, n), 32)?;
        table
            .insert(key, Some(Ipv4Addr::new(10, 1, 1, n)), Some(format!("eth{}", n - 1)))
            .with_context(|| format!("Failed to seed {key}"))?;
    }
    Ok(())
}

/// Run the interactive menu
async fn cmd_shell(table: Arc<RouteTable>, seed: bool) -> Result<()> {
    if seed {
        seed_routes(&table, SAMPLE_ROUTES)?;
    }
    println!(
        "{} routes expire after {}s\n",
        "🧭 rtable shell:".cyan().bold(),
        table.config().default_ttl_seconds
    );

    // Prompts block; timers keep running on the runtime's workers.
    tokio::task::spawn_blocking(move || run_shell(&table))
        .await
        .context("Shell thread panicked")?
}

#[derive(Clone, Copy)]
enum MenuItem {
    Add,
    Delete,
    Update,
    Refresh,
    Dump,
    Quit,
}

impl MenuItem {
    const ALL: [MenuItem; 6] = [
        MenuItem::Add,
        MenuItem::Delete,
        MenuItem::Update,
        MenuItem::Refresh,
        MenuItem::Dump,
        MenuItem::Quit,
    ];

    fn label(self) -> &'static str {
        match self {
            MenuItem::Add => "Add route",
            MenuItem::Delete => "Delete route",
            MenuItem::Update => "Update route",
            MenuItem::Refresh => "Refresh route",
            MenuItem::Dump => "Dump table",
            MenuItem::Quit => "Quit",
        }
    }
}

fn run_shell(table: &RouteTable) -> Result<()> {
    let theme = ColorfulTheme::default();
    let labels: Vec<_> = MenuItem::ALL.iter().map(|m| m.label()).collect();

    loop {
        let choice = Select::with_theme(&theme)
            .with_prompt("Choose an action")
            .items(&labels)
            .default(0)
            .interact()?;

        let outcome = match MenuItem::ALL[choice] {
            MenuItem::Add => prompt_add(&theme, table),
            MenuItem::Delete => prompt_key(&theme).and_then(|key| {
                table.delete(&key)?;
                Ok(format!("Deleted {key}"))
            }),
            MenuItem::Update => prompt_update(&theme, table),
            MenuItem::Refresh => prompt_key(&theme).and_then(|key| {
                table.refresh(&key)?;
                Ok(format!("Refreshed {key}"))
            }),
            MenuItem::Dump => {
                println!("{}", render_table(&table.enumerate()));
                continue;
            }
            MenuItem::Quit => break,
        };

        match outcome {
            Ok(message) => println!("{} {}\n", "✅".green(), message),
            Err(e) => println!("{} {}\n", "Error:".red().bold(), e),
        }
    }

    let cleared = table.clear();
    info!(cleared, "Shell exited");
    Ok(())
}

fn prompt_key(theme: &ColorfulTheme) -> Result<RouteKey> {
    let destination: String = Input::with_theme(theme)
        .with_prompt("Destination")
        .interact_text()?;
    let mask: u8 = Input::with_theme(theme)
        .with_prompt("Mask")
        .default(32)
        .interact_text()?;
    Ok(RouteKey::parse(&destination, mask)?)
}

fn prompt_value(theme: &ColorfulTheme) -> Result<(Option<Ipv4Addr>, Option<String>)> {
    let oif: String = Input::with_theme(theme)
        .with_prompt("Outgoing interface")
        .allow_empty(true)
        .interact_text()?;
    let gateway: String = Input::with_theme(theme)
        .with_prompt("Gateway IP")
        .allow_empty(true)
        .interact_text()?;
    Ok((parse_gateway(&gateway)?, parse_oif(&oif)?))
}

fn prompt_add(theme: &ColorfulTheme, table: &RouteTable) -> Result<String> {
    let key = prompt_key(theme)?;
    let (gateway, oif) = prompt_value(theme)?;
    match table.insert(key, gateway, oif) {
        Ok(_) => Ok(format!("Added {key}")),
        Err(RouteError::DuplicateKey(key)) => {
            Err(anyhow::anyhow!("{key} already exists; delete or update it instead"))
        }
        Err(e) => Err(e.into()),
    }
}

fn prompt_update(theme: &ColorfulTheme, table: &RouteTable) -> Result<String> {
    let key = prompt_key(theme)?;
    if !table.contains(&key) {
        return Err(RouteError::NotFound(key).into());
    }
    let (gateway, oif) = prompt_value(theme)?;
    table.update(&key, gateway, oif)?;
    Ok(format!("Updated {key}"))
}

/// Insert the sample routes and dump until they expire
async fn cmd_demo(table: &RouteTable, count: u8, watch: Option<u64>, json: bool) -> Result<()> {
    println!("{}", "🧭 Seeding sample routes...".cyan().bold());
    seed_routes(table, count)?;

    let total = table.len() as u64;
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} expired ({elapsed})")?
            .progress_chars("#>-"),
    );

    let deadline = watch.map(Duration::from_secs);
    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        ticker.tick().await;
        let routes = table.enumerate();

        if json {
            pb.println(serde_json::to_string_pretty(&routes)?);
        } else {
            pb.println(render_table(&routes));
        }
        pb.set_position(total.saturating_sub(routes.len() as u64));

        if routes.is_empty() {
            pb.finish_and_clear();
            println!("{}", "✅ All routes expired.".green());
            break;
        }
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            pb.finish_and_clear();
            println!("{} {} route(s) still live", "⏹  Stopped watching:".yellow(), routes.len());
            break;
        }
    }

    let stats = table.stats();
    println!("\n{}", "📈 Stats:".green().bold());
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

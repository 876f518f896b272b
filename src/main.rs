use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use farmstore::level::{self, MAX_LEVEL};
use farmstore::{
    FarmClient, FarmConfig, FarmSnapshot, FarmState, FarmStore, Filter, HttpApi, Player,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "farmstore")]
#[command(about = "FarmStore CLI - Inspect levels and farm snapshots")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the config file (default: $FARMSTORE_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the level reached with a given XP total
    Level {
        /// Total experience
        xp: u64,
    },

    /// Print the XP curve for a range of levels
    Curve {
        #[arg(long, default_value_t = 1)]
        from: u32,

        #[arg(long, default_value_t = 20)]
        to: u32,
    },

    /// Summarize a snapshot saved as JSON
    Inspect {
        /// Snapshot file
        path: PathBuf,
    },

    /// Fetch the player's snapshot from the server and summarize it
    Sync,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Level { xp } => {
            let player = Player::from_totals(xp, 0, 0, false, false);
            print_level(&player);
        }
        Commands::Curve { from, to } => {
            if from == 0 || from > to || to > MAX_LEVEL {
                return Err(eyre!("Level range must satisfy 1 <= from <= to <= {}", MAX_LEVEL));
            }
            print_curve(from, to);
        }
        Commands::Inspect { path } => {
            let config = FarmConfig::load(cli.config.as_deref())?;
            let snapshot = FarmSnapshot::read_file(&path)?;

            let mut store = FarmStore::from_config(&config);
            store.apply_snapshot(snapshot);
            print_summary(store.state());
        }
        Commands::Sync => {
            let config = FarmConfig::load(cli.config.as_deref())?;
            let api = HttpApi::new(&config)?;
            let client = FarmClient::new(FarmStore::from_config(&config), api);

            println!("Syncing from {}...", config.base_url());
            client.sync().await?;
            client.read(print_summary);
        }
    }

    Ok(())
}

fn print_level(player: &Player) {
    println!(
        "{} {}",
        "Level".bold(),
        player.current_level.to_string().green().bold()
    );
    println!("  Total XP:      {}", player.current_xp);
    println!(
        "  This level:    {}/{} ({:.0}%)",
        player.current_level_xp,
        player.xp_to_next_level,
        player.progress() * 100.0
    );
    println!(
        "  To next level: {}",
        level::xp_remaining(player.current_level, player.current_xp)
    );
}

fn print_curve(from: u32, to: u32) {
    println!("{:>6}  {:>12}  {:>10}", "Level".bold(), "Total XP".bold(), "Span".bold());
    for lvl in from..=to {
        println!(
            "{:>6}  {:>12}  {:>10}",
            lvl,
            level::experience_for_level(lvl),
            level::total_xp_for_next_level(lvl)
        );
    }
}

fn print_summary(state: &FarmState) {
    let player = &state.player;
    print_level(player);
    println!("  Coins:         {}", player.coins.to_string().yellow());
    println!("  Streak:        {}", player.streak);
    if player.is_drought {
        println!("  {}", "Drought: plants are not growing".red());
    }

    let filter = Filter::new();
    println!();
    println!(
        "{} {} open / {} total",
        "Tasks".bold(),
        filter.tasks(&state.tasks).count(),
        state.tasks.len()
    );
    println!(
        "{} {} open / {} total",
        "Habits".bold(),
        filter.habits(&state.habits).count(),
        state.habits.len()
    );
    println!("{} {}", "Tags".bold(), state.tags.len());

    let unlocked = state.field.iter().filter(|bed| !bed.is_lock).count();
    let ready = state
        .field
        .iter()
        .filter_map(|bed| bed.plant.as_ref())
        .filter(|plant| plant.is_grown())
        .count();
    println!(
        "{} {} beds ({} unlocked), {} ready to harvest",
        "Field".bold(),
        state.field.len(),
        unlocked,
        ready.to_string().green()
    );

    let seeds: u32 = state.inventory_seeds.iter().map(|stack| stack.quantity).sum();
    println!("{} {} seeds, {} shop listings", "Inventory".bold(), seeds, state.shop_items.len());
}

use std::io;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use uttt_bot::arena::Game;
use uttt_bot::config::{SearchConfig, DEFAULT_JITTER, DEFAULT_MAX_DEPTH, DEFAULT_MAX_MOVE_TIME_MS};
use uttt_bot::player::{RandomPlayer, SearchPlayer};
use uttt_bot::protocol::Bot;
use uttt_bot::PlayerMarker;

#[derive(Parser, Debug)]
#[command(name = "uttt-bot", about = "Ultimate tic-tac-toe engine")]
struct Cli {
    #[command(flatten)]
    search: SearchArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Plies searched below the one-ply ordering pass
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, global = true)]
    depth: u32,

    /// Upper bound for a single move in milliseconds
    #[arg(long, default_value_t = DEFAULT_MAX_MOVE_TIME_MS, global = true)]
    max_move_time_ms: u64,

    /// Scale of the tie-breaking noise, 0 for exact evaluation
    #[arg(long, default_value_t = DEFAULT_JITTER, global = true)]
    jitter: f64,

    /// Seed for reproducible play
    #[arg(long, global = true)]
    seed: Option<u64>,
}

impl From<SearchArgs> for SearchConfig {
    fn from(args: SearchArgs) -> Self {
        SearchConfig {
            max_depth: args.depth,
            max_move_time_ms: args.max_move_time_ms,
            jitter: args.jitter,
            seed: args.seed,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Speak the line protocol on stdin/stdout (default)
    Bot,
    /// Play the engine against a random player
    Selfplay {
        #[arg(long, default_value_t = 10)]
        games: u32,
    },
}

fn main() -> uttt_bot::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = SearchConfig::from(cli.search);
    config.validate()?;

    match cli.command.unwrap_or(Command::Bot) {
        Command::Bot => {
            info!(?config, "starting bot");
            Bot::new(config)?.run(io::stdin().lock(), io::stdout().lock())
        }
        Command::Selfplay { games } => selfplay(&config, games),
    }
}

fn selfplay(config: &SearchConfig, games: u32) -> uttt_bot::Result<()> {
    let mut wins1 = 0;
    let mut wins2 = 0;
    let mut draws = 0;

    for game_index in 0..games {
        let mut player_config = config.clone();
        player_config.seed = config.seed.map(|seed| seed.wrapping_add(u64::from(game_index)));
        let rng = match player_config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed.wrapping_mul(31)),
            None => ChaCha20Rng::from_entropy(),
        };

        let mut game = Game::new(
            Box::new(SearchPlayer::new(&player_config)?),
            Box::new(RandomPlayer::new(rng)),
        );
        match game.play()? {
            Some(PlayerMarker::X) => wins1 += 1,
            Some(PlayerMarker::O) => wins2 += 1,
            None => draws += 1,
        }
        info!(game = game_index + 1, "\n{}", game.board());
    }

    println!(
        "Search: {} | Random {} | Draws {}",
        wins1.to_string().as_str().red(),
        wins2.to_string().as_str().green(),
        draws.to_string().as_str().yellow()
    );
    Ok(())
}

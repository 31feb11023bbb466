//! Line protocol adapter.
//!
//! The game host sends one command per line on stdin:
//!
//! ```text
//! settings your_botid 1
//! update game field 0,0,1,...      (81 values)
//! update game macroboard -1,0,...  (9 values, -1 = playable)
//! action move 10000                (time bank in ms)
//! ```
//!
//! and expects `place_move <x> <y>` in global coordinates after every
//! `action`. Nothing else may be written to stdout.

use std::io::{BufRead, Write};
use std::str::FromStr;

use tracing::{debug, error, info, warn};

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::game::{PlayerMarker, BOARD_SIZE_SQUARED, META_SIZE};
use crate::meta_board::MetaBoard;
use crate::search::Searcher;

/// Values that stay fixed for a whole game.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub timebank: u64,
    pub time_per_move: u64,
    pub player_names: Vec<String>,
    pub bot_name: String,
    pub bot_id: Option<PlayerMarker>,
}

/// Values the host refreshes every turn.
#[derive(Debug, Clone)]
pub struct GameUpdate {
    pub round: u32,
    pub move_number: u32,
    pub field: Vec<i64>,
    pub macroboard: Vec<i64>,
}

impl Default for GameUpdate {
    fn default() -> Self {
        GameUpdate {
            round: 0,
            move_number: 0,
            field: vec![0; META_SIZE],
            macroboard: vec![0; BOARD_SIZE_SQUARED],
        }
    }
}

pub struct Bot {
    config: SearchConfig,
    searcher: Searcher,
    settings: Settings,
    update: GameUpdate,
}

impl Bot {
    pub fn new(config: SearchConfig) -> Result<Self> {
        Ok(Bot {
            searcher: Searcher::from_config(&config)?,
            config,
            settings: Settings::default(),
            update: GameUpdate::default(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn update(&self) -> &GameUpdate {
        &self.update
    }

    /// Reads commands until `input` is exhausted. A bad line is logged and
    /// skipped; only I/O failures end the loop.
    pub fn run<I: BufRead, O: Write>(&mut self, input: I, mut output: O) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            match self.handle_line(&line) {
                Ok(Some(reply)) => {
                    writeln!(output, "{}", reply)?;
                    output.flush()?;
                }
                Ok(None) => {}
                Err(err) => error!(%err, line = line.as_str(), "failed to handle command"),
            }
        }
        Ok(())
    }

    /// Handles one command, returning the reply line if there is one.
    pub fn handle_line(&mut self, line: &str) -> Result<Option<String>> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] => Ok(None),
            ["action", rest @ ..] => {
                let time_bank = rest.get(1).ok_or(Error::MissingArgument {
                    command: "action",
                    argument: "time bank",
                })?;
                let (x, y) = self.choose_move(parse(time_bank, "time bank")?)?;
                Ok(Some(format!("place_move {} {}", x, y)))
            }
            ["update", player, key, value, ..] => {
                self.apply_update(player, key, value)?;
                Ok(None)
            }
            ["settings", key, value, ..] => {
                self.apply_setting(key, value)?;
                Ok(None)
            }
            ["update", ..] => Err(Error::MissingArgument {
                command: "update",
                argument: "player, type or value",
            }),
            ["settings", ..] => Err(Error::MissingArgument {
                command: "settings",
                argument: "type or value",
            }),
            [command, ..] => {
                warn!(command, "unknown command");
                Ok(None)
            }
        }
    }

    /// Searches the current position and returns the move as global (x, y).
    pub fn choose_move(&mut self, time_bank_ms: u64) -> Result<(usize, usize)> {
        let player = self
            .settings
            .bot_id
            .ok_or(Error::MissingSetting("your_botid"))?;
        let mut board = MetaBoard::from_protocol(&self.update.field, &self.update.macroboard)?;
        debug!("position:\n{}", board);

        let budget = self.config.move_budget(time_bank_ms);
        let outcome = self
            .searcher
            .best_move(&mut board, player, self.config.max_depth, budget)?;
        let (x, y) = outcome.mv.to_global();
        info!(
            round = self.update.round,
            x,
            y,
            score = outcome.score,
            nodes = outcome.nodes,
            "placing move"
        );
        Ok((x, y))
    }

    fn apply_update(&mut self, player: &str, key: &str, value: &str) -> Result<()> {
        if player != "game" && player != self.settings.bot_name {
            return Ok(());
        }
        match key {
            "round" => self.update.round = parse(value, "round")?,
            "move" => self.update.move_number = parse(value, "move")?,
            "field" => self.update.field = parse_list(value, "field")?,
            "macroboard" => self.update.macroboard = parse_list(value, "macroboard")?,
            _ => warn!(key, "unknown update"),
        }
        Ok(())
    }

    fn apply_setting(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "timebank" => self.settings.timebank = parse(value, "timebank")?,
            "time_per_move" => self.settings.time_per_move = parse(value, "time_per_move")?,
            "player_names" => {
                self.settings.player_names = value.split(',').map(str::to_owned).collect();
            }
            "your_bot" => self.settings.bot_name = value.to_owned(),
            "your_botid" => {
                let id: i64 = parse(value, "your_botid")?;
                let marker = u8::try_from(id)
                    .ok()
                    .and_then(PlayerMarker::from_code)
                    .ok_or(Error::InvalidBotId(id))?;
                self.settings.bot_id = Some(marker);
            }
            _ => warn!(key, "unknown setting"),
        }
        Ok(())
    }
}

fn parse<T>(input: &str, expected: &'static str) -> Result<T>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    input.trim().parse().map_err(|source| Error::ParseInt {
        input: input.to_owned(),
        expected,
        source,
    })
}

fn parse_list(input: &str, expected: &'static str) -> Result<Vec<i64>> {
    input.split(',').map(|item| parse(item, expected)).collect()
}

//! Board engine: one ball-sort puzzle instance.
//!
//! DESIGN
//! ======
//! A board is a row of columns, each a stack of colored balls (top = last).
//! Level `n` uses a grid of `min(n + 3, 10)`: that many balls per color, that
//! many slots per column, `grid - 1` colors and one spare empty column.
//!
//! The engine is pure and synchronous. Callers own locking and decide when a
//! completed level is scored; `complete_level` is idempotent per level so a
//! retried call can never double-count.
//!
//! INVARIANTS
//! ==========
//! - Ball count is `(grid - 1) * stack_height` for the lifetime of a level.
//! - A rejected move leaves the board exactly as it was.
//! - A completed board accepts no further moves.

use std::time::Instant;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Largest grid (column height and column count) any level uses.
pub const MAX_GRID_SIZE: usize = 10;

/// Completing this level wraps the game back to level 1.
pub const FINAL_LEVEL: u32 = 10;

const GRID_OFFSET: u32 = 3;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Pink,
    Cyan,
    Brown,
}

impl Color {
    /// Palette in generation order. Level `n` uses the first `grid - 1`.
    pub const ALL: [Color; MAX_GRID_SIZE - 1] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Purple,
        Color::Orange,
        Color::Pink,
        Color::Cyan,
        Color::Brown,
    ];
}

/// Which destinations a ball may be dropped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveRule {
    /// Any column with free capacity.
    #[default]
    Any,
    /// Only an empty column or one whose top ball has the same color.
    MatchTop,
}

pub type Column = Vec<Color>;

/// Serialized `gameState` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub level: u32,
    pub moves: u32,
    pub columns: Vec<Column>,
    pub selected_column: Option<usize>,
    pub elapsed_time: u64,
    pub is_complete: bool,
    pub stack_height: usize,
    pub total_score: u64,
}

/// Serialized `levelComplete` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelComplete {
    pub level: u32,
    pub moves: u32,
    /// Whole seconds spent on the level.
    pub time: u64,
    pub level_score: u64,
    /// Cumulative score including this level, before any wrap-around reset.
    pub total_score: u64,
    pub game_reset: bool,
}

/// Grid size for a level: column height, column count, and `colors + 1`.
#[must_use]
pub fn grid_size(level: u32) -> usize {
    let size = usize::try_from(level.max(1).saturating_add(GRID_OFFSET)).unwrap_or(MAX_GRID_SIZE);
    size.min(MAX_GRID_SIZE)
}

/// Score for one completed level. Fewer moves and less time score higher.
///
/// Elapsed time is floored at one second. A zero move count scores nothing.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn score(level: u32, moves: u32, elapsed_secs: u64) -> u64 {
    if moves == 0 {
        return 0;
    }
    let grid = f64::from(level.saturating_add(GRID_OFFSET));
    let total_tokens = (grid - 1.0) * grid;
    let elapsed = elapsed_secs.max(1) as f64;
    let raw = total_tokens * 10_000.0 / (f64::from(moves) * 0.25 * elapsed);
    raw.round() as u64
}

// =============================================================================
// BOARD
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    level: u32,
    columns: Vec<Column>,
    stack_height: usize,
    moves: u32,
    selected_column: Option<usize>,
    started_at: Instant,
    /// Set when the level completes; freezes the reported elapsed time.
    completed_at: Option<Instant>,
    is_complete: bool,
    /// Whether `complete_level` already credited this level.
    scored: bool,
    total_score: u64,
    rule: MoveRule,
}

impl Board {
    /// Fresh board at `level` with a random layout.
    #[must_use]
    pub fn new(level: u32, rule: MoveRule) -> Self {
        let mut board = Self::empty(level, rule);
        board.generate(level);
        board
    }

    /// Board with an explicit layout.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn from_columns(level: u32, columns: Vec<Column>, rule: MoveRule) -> Self {
        let mut board = Self::empty(level, rule);
        board.columns = columns;
        board.check_complete();
        board
    }

    fn empty(level: u32, rule: MoveRule) -> Self {
        let level = level.max(1);
        Self {
            level,
            columns: Vec::new(),
            stack_height: grid_size(level),
            moves: 0,
            selected_column: None,
            started_at: Instant::now(),
            completed_at: None,
            is_complete: false,
            scored: false,
            total_score: 0,
            rule,
        }
    }

    // -------------------------------------------------------------------------
    // Generation
    // -------------------------------------------------------------------------

    /// Replace the layout with a random level. `total_score` is untouched.
    pub fn generate(&mut self, level: u32) {
        self.generate_with(level, &mut rand::rng());
    }

    /// Same as [`Board::generate`] with a caller-supplied RNG.
    pub fn generate_with<R: Rng + ?Sized>(&mut self, level: u32, rng: &mut R) {
        let level = level.max(1);
        let grid = grid_size(level);
        let num_colors = grid - 1;

        let mut balls: Vec<Color> = Color::ALL
            .iter()
            .take(num_colors)
            .flat_map(|&color| std::iter::repeat_n(color, grid))
            .collect();
        balls.shuffle(rng);

        let mut columns: Vec<Column> = balls.chunks(grid).map(<[Color]>::to_vec).collect();
        columns.push(Vec::with_capacity(grid));

        self.level = level;
        self.stack_height = grid;
        self.columns = columns;
        self.moves = 0;
        self.selected_column = None;
        self.started_at = Instant::now();
        self.completed_at = None;
        self.is_complete = false;
        self.scored = false;
    }

    // -------------------------------------------------------------------------
    // Moves
    // -------------------------------------------------------------------------

    /// Whether the top ball of `from` may be dropped on `to`. Never mutates.
    #[must_use]
    pub fn can_move(&self, from: usize, to: usize) -> bool {
        if self.is_complete || from == to {
            return false;
        }
        let (Some(source), Some(dest)) = (self.columns.get(from), self.columns.get(to)) else {
            return false;
        };
        let Some(&ball) = source.last() else {
            return false;
        };
        if dest.len() >= self.stack_height {
            return false;
        }
        match self.rule {
            MoveRule::Any => true,
            MoveRule::MatchTop => dest.last().is_none_or(|&top| top == ball),
        }
    }

    /// Move the top ball of `from` onto `to`. Returns `false` and leaves the
    /// board untouched when the move is illegal.
    pub fn try_move(&mut self, from: usize, to: usize) -> bool {
        self.try_move_at(from, to, Instant::now())
    }

    pub(crate) fn try_move_at(&mut self, from: usize, to: usize, now: Instant) -> bool {
        if !self.can_move(from, to) {
            return false;
        }
        let Some(ball) = self.columns[from].pop() else {
            return false;
        };
        self.columns[to].push(ball);
        self.moves += 1;
        self.check_complete_at(now);
        true
    }

    // -------------------------------------------------------------------------
    // Completion
    // -------------------------------------------------------------------------

    /// Recompute and cache completion.
    ///
    /// Complete iff every non-empty column is full of one color and at least
    /// one column is empty.
    pub fn check_complete(&mut self) -> bool {
        self.check_complete_at(Instant::now())
    }

    fn check_complete_at(&mut self, now: Instant) -> bool {
        let height = self.stack_height;
        let settled = self.columns.iter().all(|column| is_settled(column, height));
        let has_empty = self.columns.iter().any(Vec::is_empty);

        self.is_complete = settled && has_empty;
        if self.is_complete {
            self.completed_at.get_or_insert(now);
        } else {
            self.completed_at = None;
        }
        self.is_complete
    }

    /// Credit a completed level. Returns `None` unless the board is complete
    /// and not yet credited.
    ///
    /// Completing [`FINAL_LEVEL`] wraps to a fresh level 1 with a zero total.
    pub fn complete_level(&mut self) -> Option<LevelComplete> {
        self.complete_level_at(Instant::now())
    }

    pub(crate) fn complete_level_at(&mut self, now: Instant) -> Option<LevelComplete> {
        if !self.is_complete || self.scored {
            return None;
        }
        self.scored = true;

        let time = self.elapsed_secs_at(now);
        let level_score = score(self.level, self.moves, time);
        self.total_score = self.total_score.saturating_add(level_score);

        let summary = LevelComplete {
            level: self.level,
            moves: self.moves,
            time,
            level_score,
            total_score: self.total_score,
            game_reset: self.level >= FINAL_LEVEL,
        };

        if summary.game_reset {
            self.total_score = 0;
            self.generate(1);
        }
        Some(summary)
    }

    // -------------------------------------------------------------------------
    // Level control
    // -------------------------------------------------------------------------

    /// Advance to the next level. Only a completed board advances.
    pub fn next_level(&mut self) -> bool {
        if !self.is_complete {
            return false;
        }
        self.generate(self.level.saturating_add(1));
        true
    }

    /// Back to level 1 with a zero total.
    pub fn restart(&mut self) {
        self.total_score = 0;
        self.generate(1);
    }

    /// Set the UI selection hint. Out-of-range indices are rejected.
    pub fn select_column(&mut self, column: Option<usize>) -> bool {
        match column {
            Some(index) if index >= self.columns.len() => false,
            _ => {
                self.selected_column = column;
                true
            }
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn stack_height(&self) -> usize {
        self.stack_height
    }

    #[must_use]
    pub fn moves(&self) -> u32 {
        self.moves
    }

    #[must_use]
    pub fn selected_column(&self) -> Option<usize> {
        self.selected_column
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    #[must_use]
    pub fn total_score(&self) -> u64 {
        self.total_score
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn ball_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Whole seconds since the level started, frozen once complete.
    #[must_use]
    pub fn elapsed_secs_at(&self, now: Instant) -> u64 {
        self.completed_at
            .unwrap_or(now)
            .saturating_duration_since(self.started_at)
            .as_secs()
    }

    #[must_use]
    pub fn view(&self) -> GameStateView {
        self.view_at(Instant::now())
    }

    #[must_use]
    pub fn view_at(&self, now: Instant) -> GameStateView {
        GameStateView {
            level: self.level,
            moves: self.moves,
            columns: self.columns.clone(),
            selected_column: self.selected_column,
            elapsed_time: self.elapsed_secs_at(now),
            is_complete: self.is_complete,
            stack_height: self.stack_height,
            total_score: self.total_score,
        }
    }
}

fn is_settled(column: &[Color], height: usize) -> bool {
    let Some(&first) = column.first() else {
        return true;
    };
    column.len() == height && column.iter().all(|&c| c == first)
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;

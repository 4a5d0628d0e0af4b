use crate::environment::Environment;
use crate::error::{Result, SearchError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Bonus for clearing every tile from the board.
pub const CLEAR_BONUS: i64 = 1000;
/// Penalty for getting stuck with tiles left on the board.
pub const STUCK_PENALTY: i64 = 1000;

/// A tile coordinate: column from the left, row from the bottom.
pub type Position = (usize, usize);

/// The tile-elimination puzzle SameGame.
///
/// The board is stored column by column, bottom tile first, with `0` marking an empty cell.
/// Removing a connected group of `k >= 2` same-colored tiles scores `(k - 2)²`. Tiles then
/// fall down and empty columns are closed from the right. The game ends when no group of
/// two or more remains, with a bonus for an empty board and a penalty otherwise.
///
/// An action names a group by its first tile in column-major scan order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SameGame {
    columns: Vec<Vec<u8>>,
    width: usize,
    height: usize,
    total_reward: i64,
}

impl SameGame {
    /// Creates a `width` × `height` board filled with `colors` colors drawn from `seed`.
    pub fn new(width: usize, height: usize, colors: u8, seed: u64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SearchError::InvalidConfig(format!(
                "board must not be empty, got {}x{}",
                width, height
            )));
        }
        if colors == 0 {
            return Err(SearchError::InvalidConfig(
                "board needs at least one color".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let columns: Vec<Vec<u8>> = (0..width)
            .map(|_| (0..height).map(|_| rng.random_range(1..=colors)).collect())
            .collect();

        Ok(Self {
            columns,
            width,
            height,
            total_reward: 0,
        })
    }

    /// Builds a board from explicit columns, bottom tile first.
    ///
    /// Short columns are padded with empty cells, and floating tiles fall down.
    pub fn from_columns(columns: Vec<Vec<u8>>) -> Result<Self> {
        let width = columns.len();
        let height = columns.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(SearchError::InvalidConfig(
                "board must not be empty".to_string(),
            ));
        }

        let mut game = Self {
            columns,
            width,
            height,
            total_reward: 0,
        };
        game.collapse();
        Ok(game)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the color at a position, 0 for empty or out of range.
    pub fn tile(&self, (x, y): Position) -> u8 {
        self.columns
            .get(x)
            .and_then(|column| column.get(y))
            .copied()
            .unwrap_or(0)
    }

    pub fn remaining_tiles(&self) -> usize {
        self.columns
            .iter()
            .flatten()
            .filter(|tile| **tile != 0)
            .count()
    }

    pub fn is_board_empty(&self) -> bool {
        self.remaining_tiles() == 0
    }

    /// Collects the connected group of same-colored tiles containing `start`.
    fn group(&self, start: Position, covered: &mut [bool]) -> Vec<Position> {
        let color = self.tile(start);
        let mut group = Vec::new();
        let mut stack = vec![start];
        covered[self.index(start)] = true;

        while let Some((x, y)) = stack.pop() {
            group.push((x, y));

            let mut neighbours = Vec::with_capacity(4);
            if x > 0 {
                neighbours.push((x - 1, y));
            }
            if x + 1 < self.width {
                neighbours.push((x + 1, y));
            }
            if y > 0 {
                neighbours.push((x, y - 1));
            }
            if y + 1 < self.height {
                neighbours.push((x, y + 1));
            }

            for neighbour in neighbours {
                let index = self.index(neighbour);
                if !covered[index] && self.tile(neighbour) == color {
                    covered[index] = true;
                    stack.push(neighbour);
                }
            }
        }

        group
    }

    /// Returns every removable group, keyed by its first tile in scan order.
    fn groups(&self) -> Vec<(Position, Vec<Position>)> {
        let mut covered = vec![false; self.width * self.height];
        let mut groups = Vec::new();

        for x in 0..self.width {
            for y in 0..self.height {
                let position = (x, y);
                if self.tile(position) == 0 || covered[self.index(position)] {
                    continue;
                }
                let group = self.group(position, &mut covered);
                if group.len() > 1 {
                    groups.push((position, group));
                }
            }
        }

        groups
    }

    fn index(&self, (x, y): Position) -> usize {
        x * self.height + y
    }

    /// Applies gravity, then shifts non-empty columns to the left.
    fn collapse(&mut self) {
        let height = self.height;
        for column in &mut self.columns {
            column.retain(|tile| *tile != 0);
            column.resize(height, 0);
        }

        self.columns.retain(|column| column[0] != 0);
        self.columns.resize(self.width, vec![0; height]);
    }

    fn color_counts(&self) -> Vec<usize> {
        let mut counts = Vec::new();
        for tile in self.columns.iter().flatten().filter(|tile| **tile != 0) {
            let color = *tile as usize;
            if counts.len() <= color {
                counts.resize(color + 1, 0);
            }
            counts[color] += 1;
        }
        counts
    }
}

impl Environment for SameGame {
    type Action = Position;

    fn legal_actions(&self) -> Vec<Self::Action> {
        self.groups()
            .into_iter()
            .map(|(position, _)| position)
            .collect()
    }

    fn step(&mut self, action: &Self::Action) -> Result<()> {
        let group = self
            .groups()
            .into_iter()
            .find(|(position, _)| position == action)
            .map(|(_, group)| group)
            .ok_or_else(|| SearchError::InvalidAction(format!("{:?}", action)))?;

        for (x, y) in &group {
            self.columns[*x][*y] = 0;
        }

        let removed = group.len() as i64;
        let mut reward = (removed - 2) * (removed - 2);
        self.collapse();

        if self.is_terminal() {
            if self.is_board_empty() {
                reward += CLEAR_BONUS;
            } else {
                reward -= STUCK_PENALTY;
            }
        }

        self.total_reward += reward;
        Ok(())
    }

    fn cumulative_reward(&self) -> f64 {
        self.total_reward as f64
    }

    fn is_terminal(&self) -> bool {
        for x in 0..self.width {
            for y in 0..self.height {
                let tile = self.tile((x, y));
                if tile == 0 {
                    break;
                }
                if self.tile((x, y + 1)) == tile || self.tile((x + 1, y)) == tile {
                    return false;
                }
            }
        }
        true
    }

    /// Hashes the board only, not the score. With transposition avoidance on, two removal
    /// orders reaching the same board count as one state, and the tree keeps whichever
    /// order it found first even if the other scored more.
    fn fingerprint(&self) -> Option<u64> {
        let mut hasher = DefaultHasher::new();
        self.columns.hash(&mut hasher);
        Some(hasher.finish())
    }

    fn action_category(&self, action: &Self::Action) -> Option<u32> {
        match self.tile(*action) {
            0 => None,
            color => Some(u32::from(color)),
        }
    }

    /// The most common color on the board, lowest color first on ties.
    fn dominant_category(&self) -> Option<u32> {
        let counts = self.color_counts();
        let mut dominant = None;
        let mut best = 0;
        for (color, count) in counts.iter().enumerate() {
            if *count > best {
                best = *count;
                dominant = Some(color as u32);
            }
        }
        dominant
    }
}

impl fmt::Display for SameGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                match self.tile((x, y)) {
                    0 => write!(f, ". ")?,
                    color => write!(f, "{} ", color)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

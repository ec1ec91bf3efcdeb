use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{config::GameConfig, error::GameError, models::Difficulty};

/// Density applied to custom boards that do not name one
pub const DEFAULT_CUSTOM_DENSITY: f64 = 0.15;

/// Absolute tolerance when matching a custom density against a preset
pub const DENSITY_TOLERANCE: f64 = 0.001;

/// Static board configuration of a named difficulty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardSpec {
    pub rows: i32,
    pub columns: i32,
    pub mine_density: f64,
}

impl BoardSpec {
    pub const fn new(rows: i32, columns: i32, mine_density: f64) -> Self {
        Self {
            rows,
            columns,
            mine_density,
        }
    }

    fn matches(&self, rows: i32, columns: i32, mine_density: f64) -> bool {
        self.rows == rows
            && self.columns == columns
            && (self.mine_density - mine_density).abs() < DENSITY_TOLERANCE
    }
}

/// Shape of a validated creation request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameRequest {
    /// Nothing specified: use the configured default difficulty
    Default,
    ByDifficulty(Difficulty),
    ByDimensions {
        rows: Option<i32>,
        columns: Option<i32>,
        mine_density: Option<f64>,
    },
}

/// Concrete board parameters a game is generated from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBoard {
    pub rows: i32,
    pub columns: i32,
    pub mine_density: f64,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone)]
pub struct DifficultyResolver {
    presets: HashMap<Difficulty, BoardSpec>,
    default_difficulty: String,
}

impl DifficultyResolver {
    pub fn new(config: &GameConfig) -> Self {
        // Custom is never a registered preset, whatever the configuration says
        let presets = config
            .difficulties
            .iter()
            .filter(|(difficulty, _)| **difficulty != Difficulty::Custom)
            .map(|(difficulty, spec)| (*difficulty, *spec))
            .collect();

        Self {
            presets,
            default_difficulty: config.default_difficulty.clone(),
        }
    }

    pub fn preset(&self, difficulty: Difficulty) -> Option<BoardSpec> {
        self.presets.get(&difficulty).copied()
    }

    pub fn resolve(&self, request: &GameRequest) -> Result<ResolvedBoard, GameError> {
        match *request {
            GameRequest::Default
            | GameRequest::ByDimensions {
                rows: None,
                columns: None,
                ..
            } => {
                let difficulty = self.default_difficulty.parse::<Difficulty>().map_err(|_| {
                    GameError::Configuration(format!(
                        "default difficulty '{}' is not registered",
                        self.default_difficulty
                    ))
                })?;
                self.resolve_named(difficulty)
            }
            GameRequest::ByDifficulty(difficulty) => self.resolve_named(difficulty),
            GameRequest::ByDimensions {
                rows,
                columns,
                mine_density,
            } => {
                // A single supplied side makes the board square
                let rows = rows.or(columns).unwrap_or_default();
                let columns = columns.unwrap_or(rows);
                let mine_density = mine_density.unwrap_or(DEFAULT_CUSTOM_DENSITY);

                Ok(ResolvedBoard {
                    rows,
                    columns,
                    mine_density,
                    difficulty: self.detect(rows, columns, mine_density),
                })
            }
        }
    }

    /// Reverse lookup: the named difficulty whose preset matches exactly, else Custom
    pub fn detect(&self, rows: i32, columns: i32, mine_density: f64) -> Difficulty {
        Difficulty::NAMED
            .into_iter()
            .find(|difficulty| {
                self.presets
                    .get(difficulty)
                    .is_some_and(|spec| spec.matches(rows, columns, mine_density))
            })
            .unwrap_or(Difficulty::Custom)
    }

    fn resolve_named(&self, difficulty: Difficulty) -> Result<ResolvedBoard, GameError> {
        let spec = self.preset(difficulty).ok_or_else(|| {
            GameError::Configuration(format!(
                "difficulty '{}' has no board configuration",
                difficulty
            ))
        })?;

        Ok(ResolvedBoard {
            rows: spec.rows,
            columns: spec.columns,
            mine_density: spec.mine_density,
            difficulty,
        })
    }
}

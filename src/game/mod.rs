// Board generation, difficulty resolution and the game creation flow

pub mod board;
pub mod difficulty;
pub mod service;

pub use board::{BoardCell, BoardGenerator};
pub use difficulty::{BoardSpec, DifficultyResolver, GameRequest};
pub use service::{GameService, PostCommitWarning};

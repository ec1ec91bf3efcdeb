pub mod game;
pub mod log;
pub mod user;

pub use game::{
    Cell, CellStatus, Difficulty, Game, GameListQuery, GameStatus, GameWithCells, GamesPage,
    NewGame,
};
pub use log::{LogAction, RequestLog};
pub use user::User;

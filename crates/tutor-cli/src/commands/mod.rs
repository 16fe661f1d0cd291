pub mod config;
pub mod evaluate;
pub mod generate;
pub mod inspect;
pub mod rank;
pub mod util;

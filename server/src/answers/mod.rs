pub mod matcher;
pub mod routes;

pub use matcher::{AnswerStore, MatchResult};

pub mod paths;
pub mod ranker;

pub mod providers;
pub mod recommendations;
pub mod similarity;
pub mod watchlist;

pub use recommendations::{RecommendationEngine, ScoringWeights};
pub use watchlist::WatchlistService;

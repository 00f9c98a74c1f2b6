pub mod auth;
pub mod challenges;
pub mod completions;
pub mod convert;
pub mod error;
pub mod flags;
pub mod leaderboard;
pub mod middleware;
pub mod rate_limit;
pub mod users;

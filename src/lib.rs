//! Commit history navigation, diffs and line comments for a git repository
//! browser.
//!
//! The HTTP surface lives in [`routes`]; the components behind it only talk
//! to the repository, accounts, comments and notifications through the
//! traits in [`git`] and [`store`].

pub mod comments;
pub mod config;
pub mod diff;
pub mod error;
pub mod git;
pub mod history;
pub mod models;
pub mod routes;
pub mod store;

#[cfg(test)]
mod test_support;

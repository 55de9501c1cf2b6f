//! SeaORM entities for the review bookkeeping schema

pub mod pr_reviewer;
pub mod pull_request;
pub mod team;
pub mod user;

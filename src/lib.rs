//! Brawl Tracker - ingestion of card-battler game logs and match files.

pub mod action;
pub mod aggregator;
pub mod binary;
pub mod config;
pub mod display;
pub mod ingest;
pub mod parser;
pub mod watcher;

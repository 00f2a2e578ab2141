pub mod config;
pub mod logging;

pub mod batch;
pub mod control;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod input;
pub mod job;
pub mod naming;
pub mod resolver;
pub mod runner;
pub mod sequencer;
pub mod sink;

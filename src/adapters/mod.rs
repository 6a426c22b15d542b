//! Adapters module - user-facing front ends for the agent.
//!
//! - **CLI** - one-shot prompt or interactive REPL

pub mod cli;

//! CLI module for blockanim - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for inspecting and editing
//! stored animations and for running a map locally.

pub mod commands;

pub use commands::Cli;

//! ember-run
//!
//! Command-line host for the Ember script engine. Each subcommand handler
//! in [`runner`] returns a [`output::Report`] or a [`error::RunError`];
//! `main` renders either in the selected [`output::OutputFormat`].

pub mod cli;
pub mod error;
pub mod output;
pub mod runner;

//! # spa-server
//!
//! Serves a single-page application and its JSON action API.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `spa-server server` | Start the server |
//! | `spa-server version` | Print version, build time and compiler version |
//!
//! Configuration is read from `application.yaml` (or `--config <file>`),
//! `.env`, environment variables, and command-line flags, in increasing
//! priority.

pub mod app;
pub mod cli;

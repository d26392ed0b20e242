//! # Stamm
//!
//! Command-line front end for `stamm-core`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  apps/stamm (THE BINARY)                │
//! │                                                         │
//! │  ┌───────────┐   ┌────────────┐   ┌─────────────────┐   │
//! │  │    CLI    │   │   Config   │   │    Geocoder     │   │
//! │  │  (clap)   │   │   (toml)   │   │ (reqwest+gov.)  │   │
//! │  └─────┬─────┘   └─────┬──────┘   └────────┬────────┘   │
//! │        └───────────────┼───────────────────┘            │
//! │                        ▼                                │
//! │                ┌───────────────┐                        │
//! │                │  stamm-core   │                        │
//! │                └───────────────┘                        │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod config;
pub mod geocoder;

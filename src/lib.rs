// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Library root.
//!
//! # Crate Architecture
//!
//! ```text
//!                        main.rs
//!                           |
//!                +----------+----------+
//!                v                     v
//!             cli (clap)          cmd (handlers)
//!                |             clone / exec / config
//!                +----------+----------+
//!                           v
//!              ,---------------------------,
//!              |          config           |
//!              |   TOML, layered settings  |
//!              '--+-----------+--------+---'
//!                 |           |        |
//!                 v           v        v
//!             manifest      batch     repo
//!           multigit JSON  engine   discovery
//!                             |
//!                   session / graph / task
//!                             |
//!   +-----------------------------------------+
//!   |  core    process runner, crash markers  |
//!   +-----------------------------------------+
//!   |  foundation     error, logging          |
//!   +-----------------------------------------+
//! ```

pub mod batch;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod repo;

// mgit-rs: Multi-repository Git batch tool
//
// SPDX-FileCopyrightText: 2026 The mgit-rs authors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration introspection commands.

use crate::config::Config;

/// Prints every option with its effective value.
pub fn run_options_command(config: &Config) {
    for line in config.format_options() {
        println!("{line}");
    }
}

/// Prints the configuration files that were loaded, in order.
pub fn run_configs_command(files: &[String]) {
    if files.is_empty() {
        println!("no config files loaded");
    } else {
        for file in files {
            println!("{file}");
        }
    }
}

// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::{Parser, Subcommand};
use rollout::commands::compare::CompareCommand;
use rollout::commands::fetch::FetchCommand;
use rollout::commands::inspect::InspectCommand;
use rollout::commands::select::{SelectCommand, SelectOptions};
use rollout::commands::status::StatusCommand;
use rollout::config::{RolloutConfig, rollout_home};
use rollout::error::{Result, format_error_chain, get_exit_code};
use rollout::logging;
use rollout::models::UpdateStyle;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollout")]
#[command(author, version, about = "Update rollout coordinator tools", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the entries and downloadable resources of an update document
    #[command(visible_alias = "i")]
    Inspect {
        /// Update document to read
        file: PathBuf,

        /// Treat the file as zlib-compressed
        #[arg(long)]
        inflate: bool,
    },

    /// Pick the update a client would be offered
    #[command(visible_alias = "s")]
    Select {
        /// Update document to read
        file: PathBuf,

        /// Version of the client (e.g., "4.12.3")
        #[arg(long, value_name = "VERSION")]
        client_version: String,

        /// Preferred language (defaults to the configured one)
        #[arg(long)]
        lang: Option<String>,

        /// Select as a pro client
        #[arg(long)]
        pro: bool,

        /// Highest update style to accept (beta, minor, major, critical, force)
        #[arg(long)]
        style: Option<UpdateStyle>,

        /// Runtime version of the client
        #[arg(long, value_name = "VERSION")]
        runtime: Option<String>,

        /// Treat the file as zlib-compressed
        #[arg(long)]
        inflate: bool,
    },

    /// Compare two versions
    Compare {
        /// First version
        left: String,
        /// Second version
        right: String,
    },

    /// Request an update document from a failover server
    Fetch {
        /// URL to request (defaults to the configured timeout URL)
        url: Option<String>,

        /// Version of the client reported to the server
        #[arg(long, value_name = "VERSION", default_value = "0.0.0")]
        client_version: String,

        /// Store the document as the cached update document
        #[arg(long)]
        save: bool,
    },

    /// Show persisted update state
    Status,
}

fn setup_logger(cli: &Cli) {
    logging::setup_logger(cli.verbose);
}

fn main() {
    let cli = Cli::parse();

    // Initialize logger based on CLI flags and environment
    setup_logger(&cli);

    // Load configuration once at startup
    let loaded = rollout_home().and_then(|home| {
        let config = RolloutConfig::load(&home)?;
        Ok((home, config))
    });
    let (home, config) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", format_error_chain(&e));
            std::process::exit(get_exit_code(&e));
        }
    };

    let result: Result<()> = (|| match cli.command {
        Commands::Inspect { file, inflate } => {
            let command = InspectCommand::new(&config)?;
            command.execute(&file, inflate)
        }
        Commands::Select {
            file,
            client_version,
            lang,
            pro,
            style,
            runtime,
            inflate,
        } => {
            let command = SelectCommand::new(&config)?;
            let options = SelectOptions {
                language: lang,
                pro,
                style,
                runtime,
            };
            command.execute(&file, inflate, &client_version, &options)
        }
        Commands::Compare { left, right } => {
            let command = CompareCommand::new()?;
            command.execute(&left, &right)
        }
        Commands::Fetch {
            url,
            client_version,
            save,
        } => {
            let command = FetchCommand::new(&config, &home)?;
            command.execute(url.as_deref(), &client_version, save)
        }
        Commands::Status => {
            let command = StatusCommand::new(&config, &home)?;
            command.execute()
        }
    })();

    if let Err(e) = result {
        eprintln!("{}", format_error_chain(&e));
        std::process::exit(get_exit_code(&e));
    }
}

// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{arg, command, value_parser, Command};

pub fn build_cli() -> Command {
    command!()
        .about("Community-token treasury reconciliation against the public ledger")
        .subcommand(Command::new("init").about("Initialize the local database"))
        .subcommand(
            Command::new("wallet")
                .about("Manage watched wallets")
                .subcommand(
                    Command::new("add")
                        .about("Register a wallet for reconciliation")
                        .arg(arg!(--address <ADDRESS> "Ledger account address").required(true))
                        .arg(arg!(--name <NAME> "Display name").required(true))
                        .arg(arg!(--color <COLOR> "Display color").required(false))
                        .arg(arg!(--description <TEXT>).required(false)),
                )
                .subcommand(
                    Command::new("list")
                        .about("List watched wallets")
                        .arg(arg!(--all "Include deactivated wallets")),
                )
                .subcommand(
                    Command::new("deactivate")
                        .about("Stop refreshing a wallet (history is kept)")
                        .arg(arg!(--address <ADDRESS>).required(true)),
                ),
        )
        .subcommand(
            Command::new("refresh")
                .about("Run a reconciliation pass against the ledger")
                .arg(arg!(--address <ADDRESS> "Refresh a single wallet").required(false))
                .arg(arg!(--caller <ID> "Caller identity for rate limiting").required(false))
                .arg(arg!(--json "Print the result as JSON")),
        )
        .subcommand(
            Command::new("report")
                .about("Read reconciled state (no ledger calls)")
                .subcommand(
                    Command::new("summary")
                        .about("Per-wallet snapshots plus combined totals")
                        .arg(arg!(--json))
                        .arg(arg!(--jsonl)),
                )
                .subcommand(
                    Command::new("transactions")
                        .about("Persisted ledger transaction history")
                        .arg(arg!(--address <ADDRESS>).required(false))
                        .arg(
                            arg!(--limit <N> "Max rows")
                                .required(false)
                                .value_parser(value_parser!(usize)),
                        )
                        .arg(arg!(--json))
                        .arg(arg!(--jsonl)),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Export persisted data")
                .subcommand(
                    Command::new("transactions")
                        .arg(arg!(--format <FMT> "csv or json").required(true))
                        .arg(arg!(--out <FILE>).required(true)),
                ),
        )
        .subcommand(Command::new("doctor").about("Audit stored snapshots against invariants"))
}

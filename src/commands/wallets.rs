// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store;
use crate::utils::{is_ledger_address, pretty_table};
use anyhow::{bail, Result};
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let address = sub.get_one::<String>("address").unwrap().trim().to_string();
            if !is_ledger_address(&address) {
                bail!("'{}' is not a valid ledger account address", address);
            }
            let name = sub.get_one::<String>("name").unwrap().trim().to_string();
            let color = sub
                .get_one::<String>("color")
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            let description = sub
                .get_one::<String>("description")
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            conn.execute(
                "INSERT INTO watched_wallets(address, display_name, color, description)
                 VALUES (?1, ?2, ?3, ?4)",
                params![address, name, color, description],
            )?;
            println!("Watching '{}' ({})", name, address);
        }
        Some(("list", sub)) => {
            let wallets = store::list_wallets(conn, !sub.get_flag("all"))?;
            let rows = wallets
                .into_iter()
                .map(|w| {
                    vec![
                        w.display_name,
                        w.address,
                        if w.active { "yes".into() } else { "no".into() },
                        w.description,
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["Name", "Address", "Active", "Description"], rows)
            );
        }
        Some(("deactivate", sub)) => {
            let address = sub.get_one::<String>("address").unwrap().trim();
            let n = conn.execute(
                "UPDATE watched_wallets SET active=0 WHERE address=?1",
                params![address],
            )?;
            if n == 0 {
                bail!("wallet '{}' is not registered", address);
            }
            println!("Deactivated '{}'", address);
        }
        _ => {}
    }
    Ok(())
}

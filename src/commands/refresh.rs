// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allowlist::AssetAllowlist;
use crate::gateway::HttpGateway;
use crate::orchestrator::{self, DEFAULT_REFRESH_PER_MINUTE};
use crate::ratelimit::RateLimiter;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let address = m.get_one::<String>("address").map(|s| s.trim().to_string());
    let caller = m
        .get_one::<String>("caller")
        .map(|s| s.as_str())
        .unwrap_or("cli");
    let json = m.get_flag("json");

    let gateway = HttpGateway::new()?;
    let allowlist = AssetAllowlist::default();
    let mut limiter = RateLimiter::per_minute(DEFAULT_REFRESH_PER_MINUTE);

    let result = orchestrator::refresh(
        conn,
        &gateway,
        &allowlist,
        &mut limiter,
        caller,
        address.as_deref(),
    )?;

    if !maybe_print_json(json, false, &result)? {
        let rows = result
            .wallets
            .iter()
            .map(|w| {
                vec![
                    w.address.clone(),
                    if w.success { "ok".into() } else { "failed".into() },
                    w.transactions_processed.to_string(),
                    w.new_rows.to_string(),
                    w.candidate_sales.to_string(),
                    w.error.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Wallet", "Status", "Processed", "New", "Candidates", "Error"],
                rows
            )
        );
        println!("{}", result.summary);
    }
    Ok(())
}

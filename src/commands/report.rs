// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store;
use crate::utils::{fmt_amount, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("summary", sub)) => summary(conn, sub)?,
        Some(("transactions", sub)) => transactions(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn summary(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let report = store::read_combined(conn)?;

    if maybe_print_json(json_flag, jsonl_flag, &report)? {
        return Ok(());
    }

    let mut rows: Vec<Vec<String>> = report
        .snapshots
        .iter()
        .map(|s| {
            vec![
                s.wallet_address.clone(),
                fmt_amount(&s.total_token_sold),
                fmt_amount(&s.total_counter_received),
                fmt_amount(&s.average_sell_price),
                fmt_amount(&s.estimated_profit),
                fmt_amount(&s.action_fund),
                fmt_amount(&s.impact_fund),
                fmt_amount(&s.total_liquidity),
                s.transaction_count.to_string(),
            ]
        })
        .collect();
    let t = &report.totals;
    rows.push(vec![
        "TOTAL".into(),
        fmt_amount(&t.total_token_sold),
        fmt_amount(&t.total_counter_received),
        fmt_amount(&t.average_sell_price),
        fmt_amount(&t.estimated_profit),
        fmt_amount(&t.action_fund),
        fmt_amount(&t.impact_fund),
        fmt_amount(&t.total_liquidity),
        t.transaction_count.to_string(),
    ]);

    println!(
        "{}",
        pretty_table(
            &[
                "Wallet", "Sold", "Received", "Avg Price", "Profit", "Action", "Impact",
                "Liquidity", "Txs",
            ],
            rows
        )
    );
    match report.last_refreshed {
        Some(t) => println!("Last refreshed {}", t.to_rfc3339()),
        None => println!("Never refreshed; run `tokenclip refresh`"),
    }
    Ok(())
}

fn transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let address = sub.get_one::<String>("address").map(|s| s.as_str());
    let limit: usize = *sub.get_one::<usize>("limit").unwrap_or(&50);

    let txs = store::list_transactions(conn, address, limit)?;
    if maybe_print_json(json_flag, jsonl_flag, &txs)? {
        return Ok(());
    }

    let rows = txs
        .into_iter()
        .map(|t| {
            vec![
                t.transaction_at
                    .map(|x| x.to_rfc3339())
                    .unwrap_or_default(),
                t.wallet_address,
                t.transaction_type.as_str().to_string(),
                fmt_amount(&t.token_amount),
                fmt_amount(&t.counter_amount),
                fmt_amount(&t.price),
                t.counterparty.unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Date", "Wallet", "Type", "Token", "Counter", "Price", "Counterparty"],
            rows
        )
    );
    Ok(())
}

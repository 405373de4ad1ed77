// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut stmt = conn.prepare(
        "SELECT t.id, t.wallet_address, w.display_name, t.transaction_at, t.transaction_type,
                t.token_amount, t.counter_amount, t.price, t.counterparty
         FROM ledger_transactions t
         LEFT JOIN watched_wallets w ON t.wallet_address=w.address
         ORDER BY t.transaction_at DESC, t.id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, String>(7)?,
            r.get::<_, Option<String>>(8)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id",
                "wallet",
                "wallet_name",
                "date",
                "type",
                "token_amount",
                "counter_amount",
                "price",
                "counterparty",
            ])?;
            for row in rows {
                let (id, addr, name, date, typ, token, counter, price, cp) = row?;
                wtr.write_record([
                    id,
                    addr,
                    name.unwrap_or_default(),
                    date.unwrap_or_default(),
                    typ,
                    token,
                    counter,
                    price,
                    cp.unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (id, addr, name, date, typ, token, counter, price, cp) = row?;
                items.push(json!({
                    "id": id, "wallet": addr, "wallet_name": name, "date": date,
                    "type": typ, "token_amount": token, "counter_amount": counter,
                    "price": price, "counterparty": cp
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => anyhow::bail!("Unknown format: {} (use csv|json)", fmt),
    }
    println!("Exported ledger transactions to {}", out);
    Ok(())
}

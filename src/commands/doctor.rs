// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::reconcile::fund_allocation_fraction;
use crate::store;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;

// Stored decimals are exact, but historical rows may predate a policy
// change; tolerate rounding at the 7th place.
fn epsilon() -> Decimal {
    Decimal::new(1, 7)
}

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    for snap in store::read_snapshots(conn)? {
        let w = &snap.wallet_address;

        let negatives = [
            ("total_token_sold", snap.total_token_sold),
            ("total_counter_received", snap.total_counter_received),
            ("average_sell_price", snap.average_sell_price),
            ("estimated_profit", snap.estimated_profit),
            ("action_fund", snap.action_fund),
            ("impact_fund", snap.impact_fund),
            ("total_liquidity", snap.total_liquidity),
        ];
        for (field, value) in negatives {
            if value < Decimal::ZERO {
                rows.push(vec!["negative_total".into(), format!("{} {}", w, field)]);
            }
        }
        if snap.transaction_count < 0 {
            rows.push(vec!["negative_total".into(), format!("{} transaction_count", w)]);
        }

        let expected_avg = if snap.total_token_sold.is_zero() {
            Decimal::ZERO
        } else {
            snap.total_counter_received / snap.total_token_sold
        };
        if (snap.average_sell_price - expected_avg).abs() > epsilon() {
            rows.push(vec!["avg_price_mismatch".into(), w.clone()]);
        }

        let committed = snap.estimated_profit * fund_allocation_fraction() * Decimal::from(2);
        if (snap.action_fund + snap.impact_fund - committed).abs() > epsilon() {
            rows.push(vec!["allocation_mismatch".into(), w.clone()]);
        }

        if snap.estimated_profit != snap.total_counter_received {
            rows.push(vec!["profit_mismatch".into(), w.clone()]);
        }
    }

    // Transactions pointing at wallets we no longer know about
    let mut stmt = conn.prepare(
        "SELECT DISTINCT wallet_address FROM ledger_transactions
         EXCEPT SELECT address FROM watched_wallets",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let addr: String = r.get(0)?;
        rows.push(vec!["orphaned_transactions".into(), addr]);
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

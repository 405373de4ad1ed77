// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{AccountSnapshot, LedgerTransaction, TransactionType, WatchedWallet};
use crate::reconcile::{combine, CombinedTotals};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Wallets tracked out of the box. Seeding is idempotent: an address that is
/// already registered is left exactly as the operator configured it.
const DEFAULT_WALLETS: [(&str, &str, &str, &str); 2] = [
    (
        "GHGJRSNVNQ7QDF3RCAVIQK43AHEJCXJ3ICTXCWNPGW2JPKL2BLV2PRKG",
        "Treasury",
        "#2563eb",
        "Primary treasury wallet",
    ),
    (
        "GK5AQLGTMJXKAU7BHXTPDPFF7EII6KQ3NMTZX44HPOEVBOOAEDOECVEP",
        "Community reserve",
        "#16a34a",
        "Reserve wallet for community funds",
    ),
];

pub fn seed_default_wallets(conn: &Connection) -> Result<()> {
    for (address, name, color, description) in DEFAULT_WALLETS {
        conn.execute(
            "INSERT OR IGNORE INTO watched_wallets(address, display_name, color, description)
             VALUES (?1, ?2, ?3, ?4)",
            params![address, name, color, description],
        )?;
    }
    Ok(())
}

pub fn get_wallet(conn: &Connection, address: &str) -> Result<Option<WatchedWallet>> {
    let mut stmt = conn.prepare(
        "SELECT address, display_name, color, description, active
         FROM watched_wallets WHERE address=?1",
    )?;
    let mut rows = stmt.query(params![address])?;
    match rows.next()? {
        Some(r) => Ok(Some(WatchedWallet {
            address: r.get(0)?,
            display_name: r.get(1)?,
            color: r.get(2)?,
            description: r.get(3)?,
            active: r.get::<_, i64>(4)? != 0,
        })),
        None => Ok(None),
    }
}

pub fn list_wallets(conn: &Connection, active_only: bool) -> Result<Vec<WatchedWallet>> {
    let sql = if active_only {
        "SELECT address, display_name, color, description, active
         FROM watched_wallets WHERE active=1 ORDER BY display_name"
    } else {
        "SELECT address, display_name, color, description, active
         FROM watched_wallets ORDER BY display_name"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |r| {
        Ok(WatchedWallet {
            address: r.get(0)?,
            display_name: r.get(1)?,
            color: r.get(2)?,
            description: r.get(3)?,
            active: r.get::<_, i64>(4)? != 0,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Replace-semantics write keyed by wallet address.
pub fn upsert_snapshot(conn: &Connection, snap: &AccountSnapshot) -> Result<()> {
    let balances = serde_json::to_string(&snap.balances)?;
    conn.execute(
        "INSERT INTO account_snapshots(
            wallet_address, balances, total_token_sold, total_counter_received,
            average_sell_price, estimated_profit, action_fund, impact_fund,
            total_liquidity, transaction_count, last_transaction_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
         ON CONFLICT(wallet_address) DO UPDATE SET
            balances=excluded.balances,
            total_token_sold=excluded.total_token_sold,
            total_counter_received=excluded.total_counter_received,
            average_sell_price=excluded.average_sell_price,
            estimated_profit=excluded.estimated_profit,
            action_fund=excluded.action_fund,
            impact_fund=excluded.impact_fund,
            total_liquidity=excluded.total_liquidity,
            transaction_count=excluded.transaction_count,
            last_transaction_at=excluded.last_transaction_at,
            updated_at=excluded.updated_at",
        params![
            snap.wallet_address,
            balances,
            snap.total_token_sold.to_string(),
            snap.total_counter_received.to_string(),
            snap.average_sell_price.to_string(),
            snap.estimated_profit.to_string(),
            snap.action_fund.to_string(),
            snap.impact_fund.to_string(),
            snap.total_liquidity.to_string(),
            snap.transaction_count,
            snap.last_transaction_at.map(|t| t.to_rfc3339()),
            snap.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Insert-if-absent keyed by the upstream record id; re-ingesting a record
/// that is already present is a no-op. Returns how many rows were new.
pub fn append_transactions(conn: &mut Connection, txs: &[LedgerTransaction]) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut inserted = 0usize;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT OR IGNORE INTO ledger_transactions(
                id, wallet_address, transaction_at, transaction_type, token_amount,
                counter_amount, price, issuer, counterparty, pool_shares)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        )?;
        for t in txs {
            inserted += stmt.execute(params![
                t.id,
                t.wallet_address,
                t.transaction_at.map(|x| x.to_rfc3339()),
                t.transaction_type.as_str(),
                t.token_amount.to_string(),
                t.counter_amount.to_string(),
                t.price.to_string(),
                t.issuer,
                t.counterparty,
                t.pool_shares.map(|s| s.to_string()),
            ])?;
        }
    }
    tx.commit()?;
    Ok(inserted)
}

fn parse_stored_decimal(s: &str, what: &str, wallet: &str) -> Result<Decimal> {
    Decimal::from_str_exact(s).with_context(|| format!("Invalid stored {} '{}' for {}", what, s, wallet))
}

fn parse_stored_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| anyhow!("Invalid stored timestamp '{}': {}", s, e))
}

pub fn read_snapshot(conn: &Connection, address: &str) -> Result<Option<AccountSnapshot>> {
    let mut out = read_snapshots_where(conn, Some(address))?;
    Ok(out.pop())
}

pub fn read_snapshots(conn: &Connection) -> Result<Vec<AccountSnapshot>> {
    read_snapshots_where(conn, None)
}

fn read_snapshots_where(conn: &Connection, address: Option<&str>) -> Result<Vec<AccountSnapshot>> {
    let sql = "SELECT wallet_address, balances, total_token_sold, total_counter_received,
                      average_sell_price, estimated_profit, action_fund, impact_fund,
                      total_liquidity, transaction_count, last_transaction_at, updated_at
               FROM account_snapshots";
    let mut rows_raw: Vec<(
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        i64,
        Option<String>,
        String,
    )> = Vec::new();
    let map_row = |r: &rusqlite::Row<'_>| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, String>(7)?,
            r.get::<_, String>(8)?,
            r.get::<_, i64>(9)?,
            r.get::<_, Option<String>>(10)?,
            r.get::<_, String>(11)?,
        ))
    };
    if let Some(addr) = address {
        let mut stmt = conn.prepare(&format!("{} WHERE wallet_address=?1", sql))?;
        let rows = stmt.query_map(params![addr], map_row)?;
        for row in rows {
            rows_raw.push(row?);
        }
    } else {
        let mut stmt = conn.prepare(&format!("{} ORDER BY wallet_address", sql))?;
        let rows = stmt.query_map([], map_row)?;
        for row in rows {
            rows_raw.push(row?);
        }
    }

    let mut out = Vec::with_capacity(rows_raw.len());
    for (
        wallet,
        balances_s,
        sold_s,
        received_s,
        avg_s,
        profit_s,
        action_s,
        impact_s,
        liq_s,
        count,
        last_s,
        updated_s,
    ) in rows_raw
    {
        let balances: HashMap<String, Decimal> = serde_json::from_str(&balances_s)
            .with_context(|| format!("Invalid stored balances for {}", wallet))?;
        out.push(AccountSnapshot {
            total_token_sold: parse_stored_decimal(&sold_s, "total sold", &wallet)?,
            total_counter_received: parse_stored_decimal(&received_s, "total received", &wallet)?,
            average_sell_price: parse_stored_decimal(&avg_s, "average price", &wallet)?,
            estimated_profit: parse_stored_decimal(&profit_s, "profit", &wallet)?,
            action_fund: parse_stored_decimal(&action_s, "action fund", &wallet)?,
            impact_fund: parse_stored_decimal(&impact_s, "impact fund", &wallet)?,
            total_liquidity: parse_stored_decimal(&liq_s, "liquidity", &wallet)?,
            transaction_count: count,
            last_transaction_at: last_s.as_deref().map(parse_stored_time).transpose()?,
            updated_at: parse_stored_time(&updated_s)?,
            balances,
            wallet_address: wallet,
        });
    }
    Ok(out)
}

pub fn list_transactions(
    conn: &Connection,
    address: Option<&str>,
    limit: usize,
) -> Result<Vec<LedgerTransaction>> {
    let sql = "SELECT id, wallet_address, transaction_at, transaction_type, token_amount,
                      counter_amount, price, issuer, counterparty, pool_shares
               FROM ledger_transactions";
    let mut raw: Vec<(
        String,
        String,
        Option<String>,
        String,
        String,
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
    )> = Vec::new();
    let map_row = |r: &rusqlite::Row<'_>| {
        Ok((
            r.get(0)?,
            r.get(1)?,
            r.get(2)?,
            r.get(3)?,
            r.get(4)?,
            r.get(5)?,
            r.get(6)?,
            r.get(7)?,
            r.get(8)?,
            r.get(9)?,
        ))
    };
    if let Some(addr) = address {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE wallet_address=?1 ORDER BY transaction_at DESC LIMIT ?2",
            sql
        ))?;
        let rows = stmt.query_map(params![addr, limit as i64], map_row)?;
        for row in rows {
            raw.push(row?);
        }
    } else {
        let mut stmt = conn.prepare(&format!("{} ORDER BY transaction_at DESC LIMIT ?1", sql))?;
        let rows = stmt.query_map(params![limit as i64], map_row)?;
        for row in rows {
            raw.push(row?);
        }
    }

    let mut out = Vec::with_capacity(raw.len());
    for (id, wallet, at_s, type_s, token_s, counter_s, price_s, issuer, counterparty, shares_s) in
        raw
    {
        let transaction_type = TransactionType::parse(&type_s)
            .ok_or_else(|| anyhow!("Invalid stored transaction type '{}'", type_s))?;
        out.push(LedgerTransaction {
            transaction_at: at_s.as_deref().map(parse_stored_time).transpose()?,
            transaction_type,
            token_amount: parse_stored_decimal(&token_s, "token amount", &wallet)?,
            counter_amount: parse_stored_decimal(&counter_s, "counter amount", &wallet)?,
            price: parse_stored_decimal(&price_s, "price", &wallet)?,
            pool_shares: shares_s
                .as_deref()
                .map(|s| parse_stored_decimal(s, "pool shares", &wallet))
                .transpose()?,
            id,
            wallet_address: wallet,
            issuer,
            counterparty,
        });
    }
    Ok(out)
}

pub fn transaction_count(conn: &Connection) -> Result<i64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM ledger_transactions", [], |r| r.get(0))?;
    Ok(n)
}

/// What the UI consumes on every page load. Pure read: never touches the
/// ledger, so upstream unavailability cannot break it.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedReport {
    pub snapshots: Vec<AccountSnapshot>,
    pub totals: CombinedTotals,
    pub last_refreshed: Option<DateTime<Utc>>,
}

pub fn read_combined(conn: &Connection) -> Result<CombinedReport> {
    let snapshots = read_snapshots(conn)?;
    let totals = combine(&snapshots);
    let last_refreshed = snapshots.iter().map(|s| s.updated_at).max();
    Ok(CombinedReport {
        snapshots,
        totals,
        last_refreshed,
    })
}

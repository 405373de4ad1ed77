// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("org.tokenclip", "Tokenclip", "tokenclip"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("tokenclip.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS watched_wallets(
        address TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        color TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- One row per wallet, replaced wholesale on every refresh.
    CREATE TABLE IF NOT EXISTS account_snapshots(
        wallet_address TEXT PRIMARY KEY,
        balances TEXT NOT NULL DEFAULT '{}',
        total_token_sold TEXT NOT NULL DEFAULT '0',
        total_counter_received TEXT NOT NULL DEFAULT '0',
        average_sell_price TEXT NOT NULL DEFAULT '0',
        estimated_profit TEXT NOT NULL DEFAULT '0',
        action_fund TEXT NOT NULL DEFAULT '0',
        impact_fund TEXT NOT NULL DEFAULT '0',
        total_liquidity TEXT NOT NULL DEFAULT '0',
        transaction_count INTEGER NOT NULL DEFAULT 0,
        last_transaction_at TEXT,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(wallet_address) REFERENCES watched_wallets(address) ON DELETE CASCADE
    );

    -- Append-only; primary key is the upstream record id, so re-ingestion
    -- of the same record is a no-op.
    CREATE TABLE IF NOT EXISTS ledger_transactions(
        id TEXT PRIMARY KEY,
        wallet_address TEXT NOT NULL,
        transaction_at TEXT,
        transaction_type TEXT NOT NULL CHECK(transaction_type IN ('trade','payment','liquidity')),
        token_amount TEXT NOT NULL DEFAULT '0',
        counter_amount TEXT NOT NULL DEFAULT '0',
        price TEXT NOT NULL DEFAULT '0',
        issuer TEXT,
        counterparty TEXT,
        pool_shares TEXT,
        FOREIGN KEY(wallet_address) REFERENCES watched_wallets(address) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_ledger_transactions_wallet
        ON ledger_transactions(wallet_address, transaction_at);
    "#,
    )?;
    Ok(())
}

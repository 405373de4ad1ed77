// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allowlist::AssetAllowlist;
use crate::classify::{classify_batch, RawRecord};
use crate::gateway::LedgerSource;
use crate::models::{ClassifiedEvent, EventKind, LedgerTransaction};
use crate::ratelimit::RateLimiter;
use crate::reconcile::aggregate;
use crate::store;
use crate::utils::parse_amount_clamped;
use anyhow::{bail, Result};
use chrono::Utc;
use log::{info, warn};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Records requested per feed per wallet per pass.
pub const FETCH_PAGE_LIMIT: u32 = 200;

/// Only the most recent classified events are persisted each pass, bounding
/// write volume; the snapshot itself is recomputed from the full page.
pub const PERSISTED_EVENTS_PER_PASS: usize = 20;

/// Default per-caller refresh budget.
pub const DEFAULT_REFRESH_PER_MINUTE: u32 = 6;

#[derive(Debug, Clone, Serialize)]
pub struct WalletRefresh {
    pub address: String,
    pub success: bool,
    /// Countable events (sales, purchases, liquidity) seen this pass.
    pub transactions_processed: usize,
    /// Rows actually new to the persisted ledger.
    pub new_rows: usize,
    /// Advisory payment-based sale signals awaiting manual correlation.
    pub candidate_sales: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

impl WalletRefresh {
    fn failed(address: &str, err: impl std::fmt::Display) -> Self {
        Self {
            address: address.to_string(),
            success: false,
            transactions_processed: 0,
            new_rows: 0,
            candidate_sales: 0,
            skipped: 0,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    pub wallets: Vec<WalletRefresh>,
    pub summary: String,
}

/// One reconciliation pass. With no target address, every active watched
/// wallet is refreshed in turn; one wallet's failure is recorded in its own
/// slot and never aborts the others.
pub fn refresh(
    conn: &mut Connection,
    source: &dyn LedgerSource,
    allowlist: &AssetAllowlist,
    limiter: &mut RateLimiter,
    caller: &str,
    address: Option<&str>,
) -> Result<RefreshResult> {
    // Budget check comes first: an over-budget caller does no ledger or DB
    // work at all.
    limiter.check(caller)?;

    let targets: Vec<String> = match address {
        Some(addr) => {
            if store::get_wallet(conn, addr)?.is_none() {
                bail!("wallet '{}' is not registered; add it first", addr);
            }
            vec![addr.to_string()]
        }
        None => store::list_wallets(conn, true)?
            .into_iter()
            .map(|w| w.address)
            .collect(),
    };

    let mut wallets = Vec::with_capacity(targets.len());
    for addr in &targets {
        let outcome = match refresh_wallet(conn, source, allowlist, addr) {
            Ok(o) => o,
            Err(e) => {
                warn!("refresh failed for {}: {:#}", addr, e);
                WalletRefresh::failed(addr, e)
            }
        };
        wallets.push(outcome);
    }

    let ok = wallets.iter().filter(|w| w.success).count();
    let new_rows: usize = wallets.iter().map(|w| w.new_rows).sum();
    let summary = format!(
        "Refreshed {}/{} wallets, {} new ledger transactions",
        ok,
        wallets.len(),
        new_rows
    );
    info!("{}", summary);
    Ok(RefreshResult { wallets, summary })
}

fn refresh_wallet(
    conn: &mut Connection,
    source: &dyn LedgerSource,
    allowlist: &AssetAllowlist,
    address: &str,
) -> Result<WalletRefresh> {
    let now = Utc::now();

    let account = source.account(address)?;
    let (balances, events) = match account {
        None => {
            // No on-chain presence yet: a valid, empty account. Nothing to
            // fetch; the snapshot zeroes out.
            (HashMap::new(), Vec::new())
        }
        Some(acct) => {
            let balances: HashMap<String, Decimal> = acct
                .balances
                .iter()
                .map(|b| (b.asset_key(), parse_amount_clamped(&b.balance)))
                .collect();

            let mut records: Vec<RawRecord> = Vec::new();
            records.extend(
                source
                    .trades(address, FETCH_PAGE_LIMIT)?
                    .into_iter()
                    .map(RawRecord::Trade),
            );
            records.extend(
                source
                    .payments(address, FETCH_PAGE_LIMIT)?
                    .into_iter()
                    .map(RawRecord::Payment),
            );
            records.extend(
                source
                    .operations(address, FETCH_PAGE_LIMIT)?
                    .into_iter()
                    .map(RawRecord::Operation),
            );
            records.extend(
                source
                    .effects(address, FETCH_PAGE_LIMIT)?
                    .into_iter()
                    .map(RawRecord::Effect),
            );

            (balances, classify_batch(&records, address, allowlist))
        }
    };

    let snapshot = aggregate(address, balances, &events, now);
    store::upsert_snapshot(conn, &snapshot)?;
    let new_rows = store::append_transactions(conn, &persistable(&events))?;

    Ok(WalletRefresh {
        address: address.to_string(),
        success: true,
        transactions_processed: events.iter().filter(|e| e.is_countable()).count(),
        new_rows,
        candidate_sales: events
            .iter()
            .filter(|e| e.kind == EventKind::CandidateSale)
            .count(),
        skipped: events
            .iter()
            .filter(|e| e.kind == EventKind::Irrelevant)
            .count(),
        error: None,
    })
}

/// Most recent persistable events, in upstream recency order.
fn persistable(events: &[ClassifiedEvent]) -> Vec<LedgerTransaction> {
    let mut rows: Vec<(&ClassifiedEvent, LedgerTransaction)> = events
        .iter()
        .filter_map(|ev| to_ledger_transaction(ev).map(|tx| (ev, tx)))
        .collect();
    rows.sort_by(|(a, _), (b, _)| b.recorded_at.cmp(&a.recorded_at));
    rows.truncate(PERSISTED_EVENTS_PER_PASS);
    rows.into_iter().map(|(_, tx)| tx).collect()
}

fn to_ledger_transaction(ev: &ClassifiedEvent) -> Option<LedgerTransaction> {
    let transaction_type = ev.transaction_type()?;
    Some(LedgerTransaction {
        id: ev.record_id.clone(),
        wallet_address: ev.wallet_address.clone(),
        transaction_at: ev.recorded_at,
        transaction_type,
        token_amount: ev.token_amount,
        counter_amount: ev.counter_amount,
        price: ev.price(),
        issuer: ev.issuer.clone(),
        counterparty: ev.counterparty.clone(),
        pool_shares: ev.pool_shares,
    })
}

/// Read-side view: snapshots plus combined totals, straight from the store.
pub fn combined_report(conn: &Connection) -> Result<store::CombinedReport> {
    store::read_combined(conn)
}

// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tokenclip::allowlist::{AssetAllowlist, TOKEN_ISSUERS};
use tokenclip::db;
use tokenclip::gateway::{
    AccountRecord, BalanceLine, EffectRecord, GatewayError, LedgerSource, OperationRecord,
    PaymentRecord, TradeRecord,
};
use tokenclip::orchestrator;
use tokenclip::ratelimit::RateLimiter;
use tokenclip::store;

const WALLET_A: &str = "GR7NI6P62MGG3W325DGDZVGPMM4I3LR5PE4GDAFPK276NZDKYAYQ5S37";
const WALLET_B: &str = "GJMSNDDUDD6KDFLEEPZHPCF2UQNUPQZIT5UEA5GENQIWEPXSK4TATGIQ";
const OTHER: &str = "GHGJRSNVNQ7QDF3RCAVIQK43AHEJCXJ3ICTXCWNPGW2JPKL2BLV2PRKG";

#[derive(Default)]
struct FixtureAccount {
    account: Option<AccountRecord>,
    trades: Vec<TradeRecord>,
    payments: Vec<PaymentRecord>,
    operations: Vec<OperationRecord>,
    effects: Vec<EffectRecord>,
    fail: bool,
}

/// In-memory stand-in for the upstream ledger. Addresses missing from the
/// map behave like unfunded accounts (404 on lookup).
#[derive(Default)]
struct FixtureGateway {
    accounts: HashMap<String, FixtureAccount>,
}

impl FixtureGateway {
    fn entry(&self, address: &str) -> Option<&FixtureAccount> {
        self.accounts.get(address)
    }

    fn check_fail(&self, address: &str) -> Result<(), GatewayError> {
        if self.entry(address).map(|a| a.fail).unwrap_or(false) {
            return Err(GatewayError::UpstreamError { status: 500 });
        }
        Ok(())
    }
}

impl LedgerSource for FixtureGateway {
    fn account(&self, address: &str) -> Result<Option<AccountRecord>, GatewayError> {
        self.check_fail(address)?;
        Ok(self.entry(address).and_then(|a| a.account.clone()))
    }

    fn trades(&self, address: &str, _limit: u32) -> Result<Vec<TradeRecord>, GatewayError> {
        self.check_fail(address)?;
        Ok(self.entry(address).map(|a| a.trades.clone()).unwrap_or_default())
    }

    fn payments(&self, address: &str, _limit: u32) -> Result<Vec<PaymentRecord>, GatewayError> {
        self.check_fail(address)?;
        Ok(self.entry(address).map(|a| a.payments.clone()).unwrap_or_default())
    }

    fn operations(&self, address: &str, _limit: u32) -> Result<Vec<OperationRecord>, GatewayError> {
        self.check_fail(address)?;
        Ok(self
            .entry(address)
            .map(|a| a.operations.clone())
            .unwrap_or_default())
    }

    fn effects(&self, address: &str, _limit: u32) -> Result<Vec<EffectRecord>, GatewayError> {
        self.check_fail(address)?;
        Ok(self.entry(address).map(|a| a.effects.clone()).unwrap_or_default())
    }
}

fn funded_account(address: &str) -> AccountRecord {
    AccountRecord {
        id: address.to_string(),
        balances: vec![
            BalanceLine {
                balance: "250".into(),
                asset_type: "native".into(),
                asset_code: None,
                asset_issuer: None,
            },
            BalanceLine {
                balance: "1000".into(),
                asset_type: "credit_alphanum4".into(),
                asset_code: Some("CMTY".into()),
                asset_issuer: Some(TOKEN_ISSUERS[0].into()),
            },
        ],
    }
}

fn sale_trade(id: &str, wallet: &str, issuer: &str) -> TradeRecord {
    TradeRecord {
        id: id.to_string(),
        ledger_close_time: "2025-06-01T12:00:00Z".into(),
        base_account: Some(wallet.to_string()),
        counter_account: Some(OTHER.to_string()),
        base_asset_type: Some("credit_alphanum4".into()),
        base_asset_code: Some("CMTY".into()),
        base_asset_issuer: Some(issuer.to_string()),
        base_amount: "100".into(),
        counter_asset_type: Some("native".into()),
        counter_asset_code: None,
        counter_asset_issuer: None,
        counter_amount: "5".into(),
        base_is_seller: true,
    }
}

fn outgoing_payment(id: &str, wallet: &str) -> PaymentRecord {
    PaymentRecord {
        id: id.to_string(),
        kind: Some("payment".into()),
        created_at: "2025-06-02T09:00:00Z".into(),
        transaction_hash: Some("deadbeef".into()),
        from: Some(wallet.to_string()),
        to: Some(OTHER.to_string()),
        asset_type: Some("credit_alphanum4".into()),
        asset_code: Some("CMTY".into()),
        asset_issuer: Some(TOKEN_ISSUERS[0].into()),
        amount: Some("40".into()),
    }
}

fn setup(wallets: &[&str]) -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    for addr in wallets {
        conn.execute(
            "INSERT INTO watched_wallets(address, display_name) VALUES (?1, ?2)",
            [*addr, "Test wallet"],
        )
        .unwrap();
    }
    conn
}

fn run_refresh(
    conn: &mut Connection,
    gw: &FixtureGateway,
    address: Option<&str>,
) -> orchestrator::RefreshResult {
    let allowlist = AssetAllowlist::default();
    let mut limiter = RateLimiter::per_minute(100);
    orchestrator::refresh(conn, gw, &allowlist, &mut limiter, "test", address).unwrap()
}

#[test]
fn confirmed_sale_produces_expected_snapshot() {
    // Scenario A: watched account sells 100 CMTY for 5 native.
    let mut conn = setup(&[WALLET_A]);
    let mut gw = FixtureGateway::default();
    gw.accounts.insert(
        WALLET_A.into(),
        FixtureAccount {
            account: Some(funded_account(WALLET_A)),
            trades: vec![sale_trade("trade-1", WALLET_A, TOKEN_ISSUERS[0])],
            ..Default::default()
        },
    );

    let result = run_refresh(&mut conn, &gw, Some(WALLET_A));
    assert_eq!(result.wallets.len(), 1);
    assert!(result.wallets[0].success);
    assert_eq!(result.wallets[0].transactions_processed, 1);
    assert_eq!(result.wallets[0].new_rows, 1);

    let snap = store::read_snapshot(&conn, WALLET_A).unwrap().unwrap();
    assert_eq!(snap.total_token_sold, Decimal::from(100));
    assert_eq!(snap.total_counter_received, Decimal::from(5));
    assert_eq!(snap.average_sell_price, Decimal::new(5, 2));
    assert_eq!(snap.estimated_profit, Decimal::from(5));
    assert_eq!(snap.action_fund, Decimal::new(5, 1));
    assert_eq!(snap.impact_fund, Decimal::new(5, 1));
    assert_eq!(snap.balances.get("native"), Some(&Decimal::from(250)));
}

#[test]
fn counterfeit_issuer_leaves_snapshot_empty() {
    // Scenario B: same trade, issuer not in the allowlist.
    let mut conn = setup(&[WALLET_A]);
    let mut gw = FixtureGateway::default();
    gw.accounts.insert(
        WALLET_A.into(),
        FixtureAccount {
            account: Some(funded_account(WALLET_A)),
            trades: vec![sale_trade("trade-1", WALLET_A, OTHER)],
            ..Default::default()
        },
    );

    let result = run_refresh(&mut conn, &gw, Some(WALLET_A));
    assert!(result.wallets[0].success);
    assert_eq!(result.wallets[0].transactions_processed, 0);
    assert_eq!(result.wallets[0].skipped, 1);

    let snap = store::read_snapshot(&conn, WALLET_A).unwrap().unwrap();
    assert_eq!(snap.total_token_sold, Decimal::ZERO);
    assert_eq!(snap.estimated_profit, Decimal::ZERO);
    assert_eq!(store::transaction_count(&conn).unwrap(), 0);
}

#[test]
fn unfunded_account_is_success_with_zeroes() {
    // Scenario C: account lookup 404s; still a successful, empty refresh.
    let mut conn = setup(&[WALLET_A]);
    let gw = FixtureGateway::default();

    let result = run_refresh(&mut conn, &gw, Some(WALLET_A));
    assert!(result.wallets[0].success);
    assert!(result.wallets[0].error.is_none());

    let snap = store::read_snapshot(&conn, WALLET_A).unwrap().unwrap();
    assert!(snap.balances.is_empty());
    assert_eq!(snap.total_token_sold, Decimal::ZERO);
    assert_eq!(snap.transaction_count, 0);
}

#[test]
fn repeated_refresh_is_idempotent() {
    // Scenario D: identical upstream state twice over.
    let mut conn = setup(&[WALLET_A]);
    let mut gw = FixtureGateway::default();
    gw.accounts.insert(
        WALLET_A.into(),
        FixtureAccount {
            account: Some(funded_account(WALLET_A)),
            trades: vec![sale_trade("trade-1", WALLET_A, TOKEN_ISSUERS[0])],
            payments: vec![outgoing_payment("pay-1", WALLET_A)],
            ..Default::default()
        },
    );

    run_refresh(&mut conn, &gw, Some(WALLET_A));
    let first = store::read_snapshot(&conn, WALLET_A).unwrap().unwrap();
    let rows_after_first = store::transaction_count(&conn).unwrap();

    let result = run_refresh(&mut conn, &gw, Some(WALLET_A));
    assert_eq!(result.wallets[0].new_rows, 0);
    let second = store::read_snapshot(&conn, WALLET_A).unwrap().unwrap();
    assert_eq!(store::transaction_count(&conn).unwrap(), rows_after_first);

    // Identical except for the refresh clock.
    let mut normalized = second.clone();
    normalized.updated_at = first.updated_at;
    assert_eq!(normalized, first);
}

#[test]
fn one_bad_wallet_does_not_block_the_rest() {
    let mut conn = setup(&[WALLET_A, WALLET_B]);
    let mut gw = FixtureGateway::default();
    gw.accounts.insert(
        WALLET_A.into(),
        FixtureAccount {
            account: Some(funded_account(WALLET_A)),
            trades: vec![sale_trade("trade-1", WALLET_A, TOKEN_ISSUERS[0])],
            ..Default::default()
        },
    );
    gw.accounts.insert(
        WALLET_B.into(),
        FixtureAccount {
            fail: true,
            ..Default::default()
        },
    );

    let result = run_refresh(&mut conn, &gw, None);
    assert_eq!(result.wallets.len(), 2);
    let by_addr: HashMap<_, _> = result
        .wallets
        .iter()
        .map(|w| (w.address.as_str(), w))
        .collect();
    assert!(by_addr[WALLET_A].success);
    assert!(!by_addr[WALLET_B].success);
    assert!(by_addr[WALLET_B]
        .error
        .as_deref()
        .unwrap()
        .contains("status 500"));

    // The healthy wallet's snapshot landed regardless.
    assert!(store::read_snapshot(&conn, WALLET_A).unwrap().is_some());
}

#[test]
fn candidate_sales_stay_out_of_confirmed_totals() {
    let mut conn = setup(&[WALLET_A]);
    let mut gw = FixtureGateway::default();
    gw.accounts.insert(
        WALLET_A.into(),
        FixtureAccount {
            account: Some(funded_account(WALLET_A)),
            payments: vec![outgoing_payment("pay-1", WALLET_A)],
            ..Default::default()
        },
    );

    let result = run_refresh(&mut conn, &gw, Some(WALLET_A));
    assert_eq!(result.wallets[0].candidate_sales, 1);
    assert_eq!(result.wallets[0].transactions_processed, 0);

    let snap = store::read_snapshot(&conn, WALLET_A).unwrap().unwrap();
    assert_eq!(snap.total_token_sold, Decimal::ZERO);
    assert_eq!(snap.estimated_profit, Decimal::ZERO);
    // ...but the advisory signal is persisted for manual correlation.
    let txs = store::list_transactions(&conn, Some(WALLET_A), 10).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].transaction_type.as_str(), "payment");
    assert_eq!(txs[0].token_amount, Decimal::from(40));
}

#[test]
fn rate_limit_fails_fast_without_side_effects() {
    let mut conn = setup(&[WALLET_A]);
    let mut gw = FixtureGateway::default();
    gw.accounts.insert(
        WALLET_A.into(),
        FixtureAccount {
            account: Some(funded_account(WALLET_A)),
            trades: vec![sale_trade("trade-1", WALLET_A, TOKEN_ISSUERS[0])],
            ..Default::default()
        },
    );

    let allowlist = AssetAllowlist::default();
    let mut limiter = RateLimiter::new(1, Duration::from_secs(60));
    orchestrator::refresh(&mut conn, &gw, &allowlist, &mut limiter, "ui", Some(WALLET_A)).unwrap();

    let err = orchestrator::refresh(&mut conn, &gw, &allowlist, &mut limiter, "ui", Some(WALLET_A))
        .unwrap_err();
    assert!(err.to_string().contains("rate limit exceeded"));
}

#[test]
fn unregistered_wallet_is_rejected() {
    let mut conn = setup(&[WALLET_A]);
    let gw = FixtureGateway::default();
    let allowlist = AssetAllowlist::default();
    let mut limiter = RateLimiter::per_minute(100);
    let err = orchestrator::refresh(&mut conn, &gw, &allowlist, &mut limiter, "test", Some(WALLET_B))
        .unwrap_err();
    assert!(err.to_string().contains("not registered"));
}

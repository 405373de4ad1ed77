// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{AccountSnapshot, ClassifiedEvent, EventKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Fraction of estimated profit committed to each community fund.
/// 0.10 to the action fund and 0.10 to the impact fund, 0.20 total.
pub fn fund_allocation_fraction() -> Decimal {
    Decimal::new(1, 1)
}

fn clamp_nonneg(d: Decimal) -> Decimal {
    if d < Decimal::ZERO { Decimal::ZERO } else { d }
}

/// Fold one wallet's classified events into its snapshot. Pure: same events
/// in, same snapshot out, which is what makes a refresh a recompute instead
/// of an increment.
pub fn aggregate(
    wallet_address: &str,
    balances: HashMap<String, Decimal>,
    events: &[ClassifiedEvent],
    now: DateTime<Utc>,
) -> AccountSnapshot {
    let mut sold = Decimal::ZERO;
    let mut received = Decimal::ZERO;
    let mut liquidity = Decimal::ZERO;
    let mut count: i64 = 0;
    let mut last: Option<DateTime<Utc>> = None;

    for ev in events {
        match ev.kind {
            EventKind::Sale => {
                sold += ev.token_amount;
                received += ev.counter_amount;
            }
            EventKind::Purchase => {}
            EventKind::LiquidityDeposit => {
                // Pool deposits contribute their shares; trust-line commits
                // contribute the committed limit.
                liquidity += ev.pool_shares.unwrap_or(ev.token_amount);
            }
            EventKind::CandidateSale | EventKind::Irrelevant => {}
        }
        if ev.is_countable() {
            count += 1;
        }
        if ev.kind != EventKind::Irrelevant {
            last = match (last, ev.recorded_at) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (None, b) => b,
                (a, None) => a,
            };
        }
    }

    let sold = clamp_nonneg(sold);
    let received = clamp_nonneg(received);
    let liquidity = clamp_nonneg(liquidity);
    let average_sell_price = if sold.is_zero() {
        Decimal::ZERO
    } else {
        received / sold
    };
    // Profit is recognized proceeds: what sales actually brought in.
    let profit = received;
    let fraction = fund_allocation_fraction();

    AccountSnapshot {
        wallet_address: wallet_address.to_string(),
        balances,
        total_token_sold: sold,
        total_counter_received: received,
        average_sell_price,
        estimated_profit: profit,
        action_fund: profit * fraction,
        impact_fund: profit * fraction,
        total_liquidity: liquidity,
        transaction_count: count,
        last_transaction_at: last,
        updated_at: now,
    }
}

/// Multi-wallet totals served by the read path. Every total is clamped to
/// zero so one corrupted snapshot cannot drag the aggregate negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedTotals {
    pub total_token_sold: Decimal,
    pub total_counter_received: Decimal,
    pub average_sell_price: Decimal,
    pub estimated_profit: Decimal,
    pub action_fund: Decimal,
    pub impact_fund: Decimal,
    pub total_liquidity: Decimal,
    pub transaction_count: i64,
    pub last_transaction_at: Option<DateTime<Utc>>,
}

pub fn combine(snapshots: &[AccountSnapshot]) -> CombinedTotals {
    let mut sold = Decimal::ZERO;
    let mut received = Decimal::ZERO;
    let mut profit = Decimal::ZERO;
    let mut action = Decimal::ZERO;
    let mut impact = Decimal::ZERO;
    let mut liquidity = Decimal::ZERO;
    let mut count: i64 = 0;
    let mut last: Option<DateTime<Utc>> = None;

    for s in snapshots {
        sold += clamp_nonneg(s.total_token_sold);
        received += clamp_nonneg(s.total_counter_received);
        profit += clamp_nonneg(s.estimated_profit);
        action += clamp_nonneg(s.action_fund);
        impact += clamp_nonneg(s.impact_fund);
        liquidity += clamp_nonneg(s.total_liquidity);
        count += s.transaction_count.max(0);
        last = match (last, s.last_transaction_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (None, b) => b,
            (a, None) => a,
        };
    }

    CombinedTotals {
        total_token_sold: sold,
        total_counter_received: received,
        average_sell_price: if sold.is_zero() { Decimal::ZERO } else { received / sold },
        estimated_profit: profit,
        action_fund: action,
        impact_fund: impact,
        total_liquidity: liquidity,
        transaction_count: count,
        last_transaction_at: last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordSource;
    use chrono::TimeZone;

    const WALLET: &str = "GR7NI6P62MGG3W325DGDZVGPMM4I3LR5PE4GDAFPK276NZDKYAYQ5S37";

    fn event(kind: EventKind, token: i64, counter: i64, at: Option<DateTime<Utc>>) -> ClassifiedEvent {
        ClassifiedEvent {
            record_id: format!("{:?}-{}-{}", kind, token, counter),
            recorded_at: at,
            wallet_address: WALLET.to_string(),
            kind,
            token_amount: Decimal::from(token),
            counter_amount: Decimal::from(counter),
            counterparty: None,
            issuer: None,
            source: RecordSource::Trade,
            pool_shares: None,
            skip_reason: matches!(kind, EventKind::Irrelevant).then(|| "test".to_string()),
        }
    }

    fn ts(h: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap())
    }

    #[test]
    fn sale_totals_and_allocation_identity() {
        let events = vec![
            event(EventKind::Sale, 100, 5, ts(1)),
            event(EventKind::Sale, 300, 10, ts(3)),
            event(EventKind::Purchase, 50, 2, ts(2)),
            event(EventKind::CandidateSale, 40, 0, ts(4)),
            event(EventKind::Irrelevant, 999, 999, ts(9)),
        ];
        let snap = aggregate(WALLET, HashMap::new(), &events, Utc::now());
        assert_eq!(snap.total_token_sold, Decimal::from(400));
        assert_eq!(snap.total_counter_received, Decimal::from(15));
        assert_eq!(snap.estimated_profit, Decimal::from(15));
        assert_eq!(
            snap.average_sell_price,
            Decimal::from(15) / Decimal::from(400)
        );
        // purchases and candidate sales never touch the sale totals
        assert_eq!(snap.transaction_count, 3);
        assert_eq!(
            snap.action_fund + snap.impact_fund,
            snap.estimated_profit * fund_allocation_fraction() * Decimal::from(2)
        );
        // irrelevant events do not move the last-transaction clock
        assert_eq!(snap.last_transaction_at, ts(4));
    }

    #[test]
    fn no_sales_means_zero_average() {
        let events = vec![event(EventKind::Purchase, 10, 1, ts(1))];
        let snap = aggregate(WALLET, HashMap::new(), &events, Utc::now());
        assert_eq!(snap.total_token_sold, Decimal::ZERO);
        assert_eq!(snap.average_sell_price, Decimal::ZERO);
        assert_eq!(snap.estimated_profit, Decimal::ZERO);
        assert_eq!(snap.transaction_count, 1);
    }

    #[test]
    fn liquidity_prefers_pool_shares() {
        let mut trust = event(EventKind::LiquidityDeposit, 1000, 0, ts(1));
        trust.source = RecordSource::Operation;
        let mut pool = event(EventKind::LiquidityDeposit, 60, 0, ts(2));
        pool.source = RecordSource::Effect;
        pool.pool_shares = Some(Decimal::new(125, 1));
        let snap = aggregate(WALLET, HashMap::new(), &[trust, pool], Utc::now());
        assert_eq!(snap.total_liquidity, Decimal::from(1000) + Decimal::new(125, 1));
        assert_eq!(snap.transaction_count, 2);
    }

    #[test]
    fn empty_event_set_is_a_zero_snapshot() {
        let snap = aggregate(WALLET, HashMap::new(), &[], Utc::now());
        assert_eq!(snap.total_token_sold, Decimal::ZERO);
        assert_eq!(snap.transaction_count, 0);
        assert_eq!(snap.last_transaction_at, None);
    }

    #[test]
    fn combine_clamps_corrupted_snapshots() {
        let now = Utc::now();
        let mut good = AccountSnapshot::empty(WALLET, now);
        good.total_token_sold = Decimal::from(100);
        good.total_counter_received = Decimal::from(5);
        good.estimated_profit = Decimal::from(5);
        good.transaction_count = 2;
        let mut bad = AccountSnapshot::empty("GJMSNDDUDD6KDFLEEPZHPCF2UQNUPQZIT5UEA5GENQIWEPXSK4TATGIQ", now);
        bad.total_token_sold = Decimal::from(-50);
        bad.estimated_profit = Decimal::from(-1);
        bad.transaction_count = -3;

        let totals = combine(&[good, bad]);
        assert_eq!(totals.total_token_sold, Decimal::from(100));
        assert_eq!(totals.estimated_profit, Decimal::from(5));
        assert_eq!(totals.transaction_count, 2);
        assert!(totals.average_sell_price > Decimal::ZERO);
    }
}

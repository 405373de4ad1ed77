// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::allowlist::AssetAllowlist;
use crate::gateway::{EffectRecord, OperationRecord, PaymentRecord, TradeRecord};
use crate::models::{ClassifiedEvent, EventKind, RecordSource};
use crate::utils::{parse_amount_clamped, parse_record_time};
use log::debug;
use rust_decimal::Decimal;

/// Closed union over every record shape the upstream feed can hand us.
/// Classification matches exhaustively on it; a new shape has to be added
/// here and handled, it cannot slip through partial logic.
#[derive(Debug, Clone)]
pub enum RawRecord {
    Trade(TradeRecord),
    Payment(PaymentRecord),
    Operation(OperationRecord),
    Effect(EffectRecord),
}

/// Map one raw record to exactly one classified event. Never fails: anything
/// malformed, ambiguous, or simply not ours becomes `Irrelevant` with a
/// reason, so a bad record can never abort the rest of the batch.
pub fn classify(record: &RawRecord, wallet: &str, allowlist: &AssetAllowlist) -> ClassifiedEvent {
    match record {
        RawRecord::Trade(t) => classify_trade(t, wallet, allowlist),
        RawRecord::Payment(p) => classify_payment(p, wallet, allowlist),
        RawRecord::Operation(o) => classify_operation(o, wallet, allowlist),
        RawRecord::Effect(e) => classify_effect(e, wallet, allowlist),
    }
}

pub fn classify_batch(
    records: &[RawRecord],
    wallet: &str,
    allowlist: &AssetAllowlist,
) -> Vec<ClassifiedEvent> {
    let events: Vec<ClassifiedEvent> = records
        .iter()
        .map(|r| classify(r, wallet, allowlist))
        .collect();
    for ev in events.iter().filter(|e| e.kind == EventKind::Irrelevant) {
        debug!(
            "skipped record {} for {}: {}",
            ev.record_id,
            wallet,
            ev.skip_reason.as_deref().unwrap_or("unstated")
        );
    }
    events
}

fn irrelevant(
    record_id: &str,
    recorded_at: &str,
    wallet: &str,
    source: RecordSource,
    reason: impl Into<String>,
) -> ClassifiedEvent {
    ClassifiedEvent {
        record_id: record_id.to_string(),
        recorded_at: parse_record_time(recorded_at),
        wallet_address: wallet.to_string(),
        kind: EventKind::Irrelevant,
        token_amount: Decimal::ZERO,
        counter_amount: Decimal::ZERO,
        counterparty: None,
        issuer: None,
        source,
        pool_shares: None,
        skip_reason: Some(reason.into()),
    }
}

fn classify_trade(t: &TradeRecord, wallet: &str, allowlist: &AssetAllowlist) -> ClassifiedEvent {
    let base_tracked = allowlist.matches(t.base_asset_code.as_deref(), t.base_asset_issuer.as_deref());
    let counter_tracked = allowlist.matches(
        t.counter_asset_code.as_deref(),
        t.counter_asset_issuer.as_deref(),
    );

    if base_tracked && counter_tracked {
        return irrelevant(
            &t.id,
            &t.ledger_close_time,
            wallet,
            RecordSource::Trade,
            "complex/unhandled trade shape: token on both sides",
        );
    }
    if !base_tracked && !counter_tracked {
        let code_only = t.base_asset_code.as_deref() == Some(allowlist.code())
            || t.counter_asset_code.as_deref() == Some(allowlist.code());
        let reason = if code_only {
            "tracked code from unlisted issuer"
        } else {
            "no allowlisted side"
        };
        return irrelevant(&t.id, &t.ledger_close_time, wallet, RecordSource::Trade, reason);
    }

    let watched_is_base = t.base_account.as_deref() == Some(wallet);
    let watched_is_counter = t.counter_account.as_deref() == Some(wallet);
    if !watched_is_base && !watched_is_counter {
        return irrelevant(
            &t.id,
            &t.ledger_close_time,
            wallet,
            RecordSource::Trade,
            "account not a party",
        );
    }

    let base_amt = parse_amount_clamped(&t.base_amount);
    let counter_amt = parse_amount_clamped(&t.counter_amount);

    // Normalize to (token side, counter side) regardless of which side of
    // the trade carries the token.
    let (token_amount, counter_amount, issuer) = if base_tracked {
        (base_amt, counter_amt, t.base_asset_issuer.clone())
    } else {
        (counter_amt, base_amt, t.counter_asset_issuer.clone())
    };

    if token_amount.is_zero() || counter_amount.is_zero() {
        return irrelevant(
            &t.id,
            &t.ledger_close_time,
            wallet,
            RecordSource::Trade,
            "zero or malformed trade amount",
        );
    }

    // Four exhaustive direction cases: {token on base/counter side} x
    // {watched is base/counter account}, resolved with base_is_seller.
    // base_is_seller=true means the base account gave up the base asset.
    let watched_sold_token = match (base_tracked, watched_is_base) {
        (true, true) => t.base_is_seller,
        (true, false) => !t.base_is_seller,
        (false, true) => !t.base_is_seller,
        (false, false) => t.base_is_seller,
    };

    let counterparty = if watched_is_base {
        t.counter_account.clone()
    } else {
        t.base_account.clone()
    };

    ClassifiedEvent {
        record_id: t.id.clone(),
        recorded_at: parse_record_time(&t.ledger_close_time),
        wallet_address: wallet.to_string(),
        kind: if watched_sold_token {
            EventKind::Sale
        } else {
            EventKind::Purchase
        },
        token_amount,
        counter_amount,
        counterparty,
        issuer,
        source: RecordSource::Trade,
        pool_shares: None,
        skip_reason: None,
    }
}

fn classify_payment(p: &PaymentRecord, wallet: &str, allowlist: &AssetAllowlist) -> ClassifiedEvent {
    if let Some(kind) = p.kind.as_deref() {
        if kind != "payment" {
            return irrelevant(
                &p.id,
                &p.created_at,
                wallet,
                RecordSource::Payment,
                format!("non-payment record '{}' in payments feed", kind),
            );
        }
    }
    if !allowlist.matches(p.asset_code.as_deref(), p.asset_issuer.as_deref()) {
        let reason = if p.asset_code.as_deref() == Some(allowlist.code()) {
            "tracked code from unlisted issuer"
        } else {
            "asset not tracked"
        };
        return irrelevant(&p.id, &p.created_at, wallet, RecordSource::Payment, reason);
    }

    let amount = parse_amount_clamped(p.amount.as_deref().unwrap_or(""));
    let outgoing = p.from.as_deref() == Some(wallet);
    let incoming = p.to.as_deref() == Some(wallet);

    if !outgoing && !incoming {
        return irrelevant(
            &p.id,
            &p.created_at,
            wallet,
            RecordSource::Payment,
            "account not a party",
        );
    }
    if incoming {
        // A bare inbound transfer is not purchase evidence; there is no
        // counter leg to confirm an exchange.
        return irrelevant(
            &p.id,
            &p.created_at,
            wallet,
            RecordSource::Payment,
            "inbound transfer, no counter leg",
        );
    }
    if amount.is_zero() {
        return irrelevant(
            &p.id,
            &p.created_at,
            wallet,
            RecordSource::Payment,
            "zero or malformed payment amount",
        );
    }

    // Outgoing token payment: candidate sale until someone correlates an
    // incoming counter-asset payment against the same transaction hash.
    ClassifiedEvent {
        record_id: p.id.clone(),
        recorded_at: parse_record_time(&p.created_at),
        wallet_address: wallet.to_string(),
        kind: EventKind::CandidateSale,
        token_amount: amount,
        counter_amount: Decimal::ZERO,
        counterparty: p.to.clone(),
        issuer: p.asset_issuer.clone(),
        source: RecordSource::Payment,
        pool_shares: None,
        skip_reason: None,
    }
}

fn classify_operation(
    o: &OperationRecord,
    wallet: &str,
    allowlist: &AssetAllowlist,
) -> ClassifiedEvent {
    if o.source_account.as_deref() != Some(wallet) {
        return irrelevant(
            &o.id,
            &o.created_at,
            wallet,
            RecordSource::Operation,
            "account not the source",
        );
    }

    match o.kind.as_str() {
        // Legacy direct-offer trading path (pre-AMM).
        "manage_sell_offer" | "create_passive_sell_offer" | "manage_buy_offer" => {
            let selling_tracked = allowlist.matches(
                o.selling_asset_code.as_deref(),
                o.selling_asset_issuer.as_deref(),
            );
            let buying_tracked = allowlist.matches(
                o.buying_asset_code.as_deref(),
                o.buying_asset_issuer.as_deref(),
            );
            if !selling_tracked && !buying_tracked {
                return irrelevant(
                    &o.id,
                    &o.created_at,
                    wallet,
                    RecordSource::Operation,
                    "offer does not touch tracked asset",
                );
            }
            let amount = parse_amount_clamped(
                o.amount
                    .as_deref()
                    .or(o.buy_amount.as_deref())
                    .unwrap_or(""),
            );
            let price = parse_amount_clamped(o.price.as_deref().unwrap_or(""));
            if amount.is_zero() {
                // Amount 0 deletes the offer.
                return irrelevant(
                    &o.id,
                    &o.created_at,
                    wallet,
                    RecordSource::Operation,
                    "offer cancellation",
                );
            }
            if price.is_zero() {
                return irrelevant(
                    &o.id,
                    &o.created_at,
                    wallet,
                    RecordSource::Operation,
                    "zero or malformed offer price",
                );
            }
            // Offer amounts are denominated in the selling asset for sell
            // offers and the buying asset for buy offers; price converts
            // between the two sides.
            let (kind, token_amount, counter_amount, issuer) = if selling_tracked {
                if o.kind == "manage_buy_offer" {
                    (EventKind::Sale, amount * price, amount, o.selling_asset_issuer.clone())
                } else {
                    (EventKind::Sale, amount, amount * price, o.selling_asset_issuer.clone())
                }
            } else if o.kind == "manage_buy_offer" {
                (EventKind::Purchase, amount, amount * price, o.buying_asset_issuer.clone())
            } else {
                (EventKind::Purchase, amount * price, amount, o.buying_asset_issuer.clone())
            };
            ClassifiedEvent {
                record_id: o.id.clone(),
                recorded_at: parse_record_time(&o.created_at),
                wallet_address: wallet.to_string(),
                kind,
                token_amount,
                counter_amount,
                counterparty: None,
                issuer,
                source: RecordSource::Operation,
                pool_shares: None,
                skip_reason: None,
            }
        }
        "change_trust" => {
            if !allowlist.matches(o.asset_code.as_deref(), o.asset_issuer.as_deref()) {
                return irrelevant(
                    &o.id,
                    &o.created_at,
                    wallet,
                    RecordSource::Operation,
                    "trust line for untracked asset",
                );
            }
            let limit = parse_amount_clamped(o.limit.as_deref().unwrap_or(""));
            if limit.is_zero() {
                return irrelevant(
                    &o.id,
                    &o.created_at,
                    wallet,
                    RecordSource::Operation,
                    "trust line removed",
                );
            }
            // Trust-line limit read as a liquidity commitment.
            ClassifiedEvent {
                record_id: o.id.clone(),
                recorded_at: parse_record_time(&o.created_at),
                wallet_address: wallet.to_string(),
                kind: EventKind::LiquidityDeposit,
                token_amount: limit,
                counter_amount: Decimal::ZERO,
                counterparty: None,
                issuer: o.asset_issuer.clone(),
                source: RecordSource::Operation,
                pool_shares: None,
                skip_reason: None,
            }
        }
        other => irrelevant(
            &o.id,
            &o.created_at,
            wallet,
            RecordSource::Operation,
            format!("unhandled operation type '{}'", other),
        ),
    }
}

fn classify_effect(e: &EffectRecord, wallet: &str, allowlist: &AssetAllowlist) -> ClassifiedEvent {
    if e.account.as_deref() != Some(wallet) {
        return irrelevant(
            &e.id,
            &e.created_at,
            wallet,
            RecordSource::Effect,
            "account not a party",
        );
    }

    if e.kind == "liquidity_pool_deposited" {
        let deposited = e
            .reserves_deposited
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .find(|r| allowlist.matches_key(&r.asset));
        if let Some(reserve) = deposited {
            let token_amount = parse_amount_clamped(&reserve.amount);
            let shares = parse_amount_clamped(e.shares_received.as_deref().unwrap_or(""));
            let issuer = reserve.asset.split_once(':').map(|(_, i)| i.to_string());
            return ClassifiedEvent {
                record_id: e.id.clone(),
                recorded_at: parse_record_time(&e.created_at),
                wallet_address: wallet.to_string(),
                kind: EventKind::LiquidityDeposit,
                token_amount,
                counter_amount: Decimal::ZERO,
                counterparty: None,
                issuer,
                source: RecordSource::Effect,
                pool_shares: Some(shares),
                skip_reason: None,
            };
        }
        return irrelevant(
            &e.id,
            &e.created_at,
            wallet,
            RecordSource::Effect,
            "pool deposit without tracked reserve",
        );
    }

    // Trade/credit/debit effects duplicate what the trades and payments
    // feeds already report; they stay cross-checking data only.
    let touches_tracked = allowlist.matches(e.asset_code.as_deref(), e.asset_issuer.as_deref())
        || allowlist.matches(e.bought_asset_code.as_deref(), e.bought_asset_issuer.as_deref())
        || allowlist.matches(e.sold_asset_code.as_deref(), e.sold_asset_issuer.as_deref());
    let reason = if touches_tracked {
        "effect record, informational only"
    } else {
        "no allowlisted asset in effect"
    };
    irrelevant(&e.id, &e.created_at, wallet, RecordSource::Effect, reason)
}

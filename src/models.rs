// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchedWallet {
    pub address: String,
    pub display_name: String,
    pub color: String,
    pub description: String,
    pub active: bool,
}

/// Latest reconciled state for one watched wallet. One row per wallet,
/// fully recomputed and replaced on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub wallet_address: String,
    pub balances: HashMap<String, Decimal>,
    pub total_token_sold: Decimal,
    pub total_counter_received: Decimal,
    pub average_sell_price: Decimal,
    pub estimated_profit: Decimal,
    pub action_fund: Decimal,
    pub impact_fund: Decimal,
    pub total_liquidity: Decimal,
    pub transaction_count: i64,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl AccountSnapshot {
    pub fn empty(wallet_address: &str, updated_at: DateTime<Utc>) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            balances: HashMap::new(),
            total_token_sold: Decimal::ZERO,
            total_counter_received: Decimal::ZERO,
            average_sell_price: Decimal::ZERO,
            estimated_profit: Decimal::ZERO,
            action_fund: Decimal::ZERO,
            impact_fund: Decimal::ZERO,
            total_liquidity: Decimal::ZERO,
            transaction_count: 0,
            last_transaction_at: None,
            updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Trade,
    Payment,
    Liquidity,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Trade => "trade",
            TransactionType::Payment => "payment",
            TransactionType::Liquidity => "liquidity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trade" => Some(TransactionType::Trade),
            "payment" => Some(TransactionType::Payment),
            "liquidity" => Some(TransactionType::Liquidity),
            _ => None,
        }
    }
}

/// Append-only history row, keyed by the upstream record id. First-seen data
/// wins: re-inserting an existing id is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: String,
    pub wallet_address: String,
    pub transaction_at: Option<DateTime<Utc>>,
    pub transaction_type: TransactionType,
    pub token_amount: Decimal,
    pub counter_amount: Decimal,
    pub price: Decimal,
    pub issuer: Option<String>,
    pub counterparty: Option<String>,
    pub pool_shares: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Sale,
    Purchase,
    LiquidityDeposit,
    /// Outgoing token payment: necessary but not sufficient evidence of a
    /// sale. Surfaced for manual correlation, never folded into totals.
    CandidateSale,
    Irrelevant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Trade,
    Payment,
    Operation,
    Effect,
}

/// Outcome of classifying one raw ledger record for one watched wallet.
/// `kind == Irrelevant` always carries a `skip_reason`; records are never
/// silently dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedEvent {
    pub record_id: String,
    pub recorded_at: Option<DateTime<Utc>>,
    pub wallet_address: String,
    pub kind: EventKind,
    pub token_amount: Decimal,
    pub counter_amount: Decimal,
    pub counterparty: Option<String>,
    pub issuer: Option<String>,
    pub source: RecordSource,
    pub pool_shares: Option<Decimal>,
    pub skip_reason: Option<String>,
}

impl ClassifiedEvent {
    /// Unit price implied by the event, 0 when no token amount exists to
    /// divide by.
    pub fn price(&self) -> Decimal {
        if self.token_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.counter_amount / self.token_amount
        }
    }

    pub fn is_countable(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Sale | EventKind::Purchase | EventKind::LiquidityDeposit
        )
    }

    /// Kind of row this event would produce in the persisted ledger.
    pub fn transaction_type(&self) -> Option<TransactionType> {
        match self.kind {
            EventKind::Sale | EventKind::Purchase => match self.source {
                RecordSource::Trade | RecordSource::Operation => Some(TransactionType::Trade),
                RecordSource::Payment => Some(TransactionType::Payment),
                RecordSource::Effect => None,
            },
            EventKind::CandidateSale => Some(TransactionType::Payment),
            EventKind::LiquidityDeposit => Some(TransactionType::Liquidity),
            EventKind::Irrelevant => None,
        }
    }
}

// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{http_client, is_ledger_address};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Upstream read bases we are willing to talk to. Every constructed URL must
/// start with one of these; anything else is refused before dispatch.
pub const APPROVED_BASES: [&str; 2] = [
    "https://horizon.stellar.org",
    "https://horizon-testnet.stellar.org",
];

/// Upstream pages are bounded; reconciliation is a rolling window, not a
/// full-history replay.
pub const MAX_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid ledger address '{0}'")]
    InvalidAddress(String),
    #[error("refusing non-approved upstream URL '{0}'")]
    UnsafeUpstreamUrl(String),
    #[error("upstream request timed out")]
    UpstreamTimeout,
    #[error("upstream returned status {status}")]
    UpstreamError { status: u16 },
    #[error("upstream transport failure: {0}")]
    Transport(String),
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordPage<T> {
    #[serde(rename = "_embedded")]
    pub embedded: Embedded<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Embedded<T> {
    pub records: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    #[serde(default)]
    pub balances: Vec<BalanceLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceLine {
    pub balance: String,
    pub asset_type: String,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
}

impl BalanceLine {
    /// Stable map key: "native" for lumens, "CODE:ISSUER" otherwise.
    pub fn asset_key(&self) -> String {
        if self.asset_type == "native" {
            "native".to_string()
        } else {
            format!(
                "{}:{}",
                self.asset_code.as_deref().unwrap_or(""),
                self.asset_issuer.as_deref().unwrap_or("")
            )
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub ledger_close_time: String,
    #[serde(default)]
    pub base_account: Option<String>,
    #[serde(default)]
    pub counter_account: Option<String>,
    #[serde(default)]
    pub base_asset_type: Option<String>,
    #[serde(default)]
    pub base_asset_code: Option<String>,
    #[serde(default)]
    pub base_asset_issuer: Option<String>,
    pub base_amount: String,
    #[serde(default)]
    pub counter_asset_type: Option<String>,
    #[serde(default)]
    pub counter_asset_code: Option<String>,
    #[serde(default)]
    pub counter_asset_issuer: Option<String>,
    pub counter_amount: String,
    pub base_is_seller: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    #[serde(default)]
    pub source_account: Option<String>,
    // offer management
    #[serde(default)]
    pub selling_asset_code: Option<String>,
    #[serde(default)]
    pub selling_asset_issuer: Option<String>,
    #[serde(default)]
    pub buying_asset_code: Option<String>,
    #[serde(default)]
    pub buying_asset_issuer: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub buy_amount: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    // trust-line changes
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveAmount {
    pub asset: String,
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EffectRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
    #[serde(default)]
    pub bought_asset_code: Option<String>,
    #[serde(default)]
    pub bought_asset_issuer: Option<String>,
    #[serde(default)]
    pub sold_asset_code: Option<String>,
    #[serde(default)]
    pub sold_asset_issuer: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub shares_received: Option<String>,
    #[serde(default)]
    pub reserves_deposited: Option<Vec<ReserveAmount>>,
}

/// Read-only view of the upstream ledger for one account. The HTTP
/// implementation lives below; tests substitute fixtures.
pub trait LedgerSource {
    /// `Ok(None)` means the address has no on-chain presence yet — a valid,
    /// empty account, not a failure.
    fn account(&self, address: &str) -> Result<Option<AccountRecord>, GatewayError>;
    fn trades(&self, address: &str, limit: u32) -> Result<Vec<TradeRecord>, GatewayError>;
    fn payments(&self, address: &str, limit: u32) -> Result<Vec<PaymentRecord>, GatewayError>;
    fn operations(&self, address: &str, limit: u32) -> Result<Vec<OperationRecord>, GatewayError>;
    fn effects(&self, address: &str, limit: u32) -> Result<Vec<EffectRecord>, GatewayError>;
}

/// Stateless blocking client over the ledger's public read API.
#[derive(Debug)]
pub struct HttpGateway {
    client: reqwest::blocking::Client,
    base: String,
}

impl HttpGateway {
    pub fn new() -> Result<Self, GatewayError> {
        Self::with_base(APPROVED_BASES[0])
    }

    pub fn with_base(base: &str) -> Result<Self, GatewayError> {
        if !APPROVED_BASES.contains(&base) {
            return Err(GatewayError::UnsafeUpstreamUrl(base.to_string()));
        }
        let client = http_client().map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn checked_url(&self, path: &str) -> Result<String, GatewayError> {
        let url = format!("{}{}", self.base, path);
        // Belt-and-braces: the base is already vetted, but a crafted address
        // reaching URL construction must never redirect the request.
        if !APPROVED_BASES.iter().any(|b| url.starts_with(b)) {
            return Err(GatewayError::UnsafeUpstreamUrl(url));
        }
        Ok(url)
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, GatewayError> {
        debug!("GET {}", url);
        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                GatewayError::UpstreamTimeout
            } else {
                GatewayError::Transport(e.to_string())
            }
        })?;
        Ok(resp)
    }

    fn fetch_records<T: DeserializeOwned>(
        &self,
        address: &str,
        endpoint: &str,
        limit: u32,
    ) -> Result<Vec<T>, GatewayError> {
        if !is_ledger_address(address) {
            return Err(GatewayError::InvalidAddress(address.to_string()));
        }
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let url = self.checked_url(&format!(
            "/accounts/{}/{}?limit={}&order=desc",
            address, endpoint, limit
        ))?;
        let resp = self.get(&url)?;
        let status = resp.status();
        if !status.is_success() {
            warn!("upstream {} for {} returned {}", endpoint, address, status);
            return Err(GatewayError::UpstreamError {
                status: status.as_u16(),
            });
        }
        let page: RecordPage<T> = resp
            .json()
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        Ok(page.embedded.records)
    }
}

impl LedgerSource for HttpGateway {
    fn account(&self, address: &str) -> Result<Option<AccountRecord>, GatewayError> {
        if !is_ledger_address(address) {
            return Err(GatewayError::InvalidAddress(address.to_string()));
        }
        let url = self.checked_url(&format!("/accounts/{}", address))?;
        let resp = self.get(&url)?;
        let status = resp.status();
        if status.as_u16() == 404 {
            // Unfunded account: valid and empty.
            return Ok(None);
        }
        if !status.is_success() {
            warn!("upstream account lookup for {} returned {}", address, status);
            return Err(GatewayError::UpstreamError {
                status: status.as_u16(),
            });
        }
        let rec: AccountRecord = resp
            .json()
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        Ok(Some(rec))
    }

    fn trades(&self, address: &str, limit: u32) -> Result<Vec<TradeRecord>, GatewayError> {
        self.fetch_records(address, "trades", limit)
    }

    fn payments(&self, address: &str, limit: u32) -> Result<Vec<PaymentRecord>, GatewayError> {
        self.fetch_records(address, "payments", limit)
    }

    fn operations(&self, address: &str, limit: u32) -> Result<Vec<OperationRecord>, GatewayError> {
        self.fetch_records(address, "operations", limit)
    }

    fn effects(&self, address: &str, limit: u32) -> Result<Vec<EffectRecord>, GatewayError> {
        self.fetch_records(address, "effects", limit)
    }
}

// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

const UA: &str = concat!(
    "tokenclip/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/tokenclip/tokenclip)"
);

/// Upstream requests are bounded; a hung ledger node must not hang a refresh.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

pub fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

// Ledger account ids: 56 chars, 'G' prefix, base-32 alphabet.
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^G[A-Z2-7]{55}$").unwrap());

pub fn is_ledger_address(s: &str) -> bool {
    ADDRESS_RE.is_match(s)
}

/// Parse an upstream amount string, clamping anything unparsable or negative
/// to zero so malformed feed data cannot corrupt aggregates.
pub fn parse_amount_clamped(s: &str) -> Decimal {
    match s.trim().parse::<Decimal>() {
        Ok(d) if d >= Decimal::ZERO => d,
        _ => Decimal::ZERO,
    }
}

pub fn parse_record_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

pub fn fmt_amount(d: &Decimal) -> String {
    d.round_dp(7).normalize().to_string()
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

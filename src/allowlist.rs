// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

/// Single source of truth for "is this record about our token."
///
/// The token is identified by its code *and* a finite set of issuer
/// addresses. A record carrying the right code under an unlisted issuer is a
/// different asset entirely (anyone can issue an asset with the same code)
/// and must never reach the aggregates.
#[derive(Debug, Clone)]
pub struct AssetAllowlist {
    code: String,
    issuers: Vec<String>,
}

/// Tracked token code. Changed only by redeploying.
pub const TOKEN_CODE: &str = "CMTY";

/// Issuers that have minted genuine tracked tokens, oldest first.
pub const TOKEN_ISSUERS: [&str; 2] = [
    "GHBRPOIGF3CBFNOBM2O4RAK3VRJNVGFYGWWQC5HYFSXMECOSFOGYR5XK",
    "GXWNREKPK5YROUDOCUZRENUN7Z5JQIPQ3ZXOI7FDHJK3EYY5QAHRVHS3",
];

impl Default for AssetAllowlist {
    fn default() -> Self {
        Self::new(TOKEN_CODE, TOKEN_ISSUERS.iter().map(|s| s.to_string()))
    }
}

impl AssetAllowlist {
    pub fn new(code: &str, issuers: impl IntoIterator<Item = String>) -> Self {
        Self {
            code: code.to_string(),
            issuers: issuers.into_iter().collect(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// True only when both the code and the issuer match.
    pub fn matches(&self, asset_code: Option<&str>, asset_issuer: Option<&str>) -> bool {
        match (asset_code, asset_issuer) {
            (Some(code), Some(issuer)) => {
                code == self.code && self.issuers.iter().any(|i| i == issuer)
            }
            _ => false,
        }
    }

    /// Match a combined "CODE:ISSUER" asset key (the form pool reserves use).
    pub fn matches_key(&self, asset_key: &str) -> bool {
        match asset_key.split_once(':') {
            Some((code, issuer)) => self.matches(Some(code), Some(issuer)),
            None => false,
        }
    }
}

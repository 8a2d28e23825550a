use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use strum::EnumIter;
use strum::IntoEnumIterator;

use crate::error::Result;
use crate::error::WalletError;

pub const MAX_NETWORK_NAME_LEN: usize = 32;
pub const MAX_CHAIN_PREFIX_LEN: usize = 8;

/// Networks whose chain prefixes address parsing recognizes without
/// configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default, EnumIter)]
#[non_exhaustive]
pub enum KnownNetwork {
    /// Main net.
    #[default]
    Main,

    /// Public test network.
    Testnet,

    /// Local network for development and tests.
    RegTest,
}

impl KnownNetwork {
    pub fn chain_prefix(&self) -> &'static str {
        match self {
            Self::Main => "PR",
            Self::Testnet => "TPR",
            Self::RegTest => "RPR",
        }
    }

    /// Chain prefixes tried first when splitting an address.
    pub fn recognized_prefixes() -> Vec<&'static str> {
        Self::iter().map(|network| network.chain_prefix()).collect()
    }
}

impl fmt::Display for KnownNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            KnownNetwork::Main => "main",
            KnownNetwork::Testnet => "testnet",
            KnownNetwork::RegTest => "regtest",
        };
        write!(f, "{}", string)
    }
}

impl FromStr for KnownNetwork {
    type Err = String;
    fn from_str(input: &str) -> Result<KnownNetwork, Self::Err> {
        match input {
            "main" => Ok(KnownNetwork::Main),
            "testnet" => Ok(KnownNetwork::Testnet),
            "regtest" => Ok(KnownNetwork::RegTest),
            _ => Err(format!("Failed to parse {} as network", input)),
        }
    }
}

/// Connectivity test counters of a configured network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub tests: u64,
    pub successes: u64,
    pub failures: u64,
}

/// A user-configured network, stored in plain text under `network:<name>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub name: String,
    pub url: String,
    pub prefix: String,
    pub added_at: DateTime<Utc>,
    pub last_tested: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: NetworkStats,
}

impl NetworkRecord {
    /// Validates all fields and builds a record that has never been tested.
    pub fn new(name: &str, url: &str, prefix: &str, added_at: DateTime<Utc>) -> Result<Self> {
        validate_network_name(name)?;
        validate_url(url)?;
        validate_chain_prefix(prefix)?;

        Ok(Self {
            name: name.to_string(),
            url: url.trim_end_matches('/').to_string(),
            prefix: prefix.to_string(),
            added_at,
            last_tested: None,
            stats: NetworkStats::default(),
        })
    }

    pub fn record_test(&mut self, success: bool, at: DateTime<Utc>) {
        self.last_tested = Some(at);
        self.stats.tests += 1;
        if success {
            self.stats.successes += 1;
        } else {
            self.stats.failures += 1;
        }
    }
}

/// 1 to 32 characters of `[A-Za-z0-9_-]`
pub fn validate_network_name(name: &str) -> Result<()> {
    let well_formed = (1..=MAX_NETWORK_NAME_LEN).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(WalletError::Validation(format!(
            "network name '{name}' must be 1-{MAX_NETWORK_NAME_LEN} characters of letters, digits, '_' or '-'"
        )))
    }
}

/// 1 to 8 uppercase ASCII letters
pub fn validate_chain_prefix(prefix: &str) -> Result<()> {
    let well_formed = (1..=MAX_CHAIN_PREFIX_LEN).contains(&prefix.len())
        && prefix.chars().all(|c| c.is_ascii_uppercase());
    if well_formed {
        Ok(())
    } else {
        Err(WalletError::Validation(format!(
            "chain prefix '{prefix}' must be 1-{MAX_CHAIN_PREFIX_LEN} uppercase letters"
        )))
    }
}

pub fn validate_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.contains(char::is_whitespace) => Ok(()),
        _ => Err(WalletError::Validation(format!(
            "url '{url}' must start with http:// or https://"
        ))),
    }
}

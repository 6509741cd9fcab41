//! Configuration loading and validation

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::vault::types::{DepositIntent, IdentityPair};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default = "default_deposits")]
    pub deposits: Vec<DepositConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries for read calls only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Unset means wait for finality without a deadline
    #[serde(default)]
    pub receipt_timeout_secs: Option<u64>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            chain_id: default_chain_id(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            confirmations: default_confirmations(),
            receipt_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    #[serde(default = "default_vault_factory")]
    pub vault_factory: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            vault_factory: default_vault_factory(),
        }
    }
}

/// Vault identity pair. Either side defaults to the signer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub leader: Option<String>,
    #[serde(default)]
    pub follower: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
    /// Environment variable holding the hex secret key
    #[serde(default = "default_key_env")]
    pub key_env: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositConfig {
    pub label: String,
    pub token: String,
    /// Decimal string in the token's smallest denomination
    pub amount: String,
    #[serde(default)]
    pub decimals: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

fn default_rpc_endpoint() -> String {
    "https://sepolia.base.org".to_string()
}

fn default_chain_id() -> u64 {
    84532
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_confirmations() -> u64 {
    1
}

fn default_vault_factory() -> String {
    "0xdEc456e502CB9baB4a33153206a470B65Bedcf9E".to_string()
}

fn default_key_env() -> String {
    "PRIVATE_KEY".to_string()
}

fn default_deposits() -> Vec<DepositConfig> {
    vec![
        DepositConfig {
            label: "USDC".to_string(),
            token: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".to_string(),
            amount: "2".to_string(),
            decimals: 6,
        },
        DepositConfig {
            label: "WETH".to_string(),
            token: "0x4200000000000000000000000000000000000006".to_string(),
            amount: "50000000000000".to_string(),
            decimals: 18,
        },
    ]
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix VAULT_)
            .add_source(
                config::Environment::with_prefix("VAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.rpc.endpoint.trim().is_empty() {
            anyhow::bail!("rpc.endpoint cannot be empty");
        }

        if self.rpc.confirmations == 0 {
            anyhow::bail!("rpc.confirmations must be at least 1");
        }

        let factory = self.factory_address()?;
        if factory == Address::ZERO {
            anyhow::bail!("contracts.vault_factory cannot be the zero address");
        }

        for (field, value) in [
            ("identity.leader", &self.identity.leader),
            ("identity.follower", &self.identity.follower),
        ] {
            if let Some(addr) = value {
                parse_address(addr).with_context(|| format!("Invalid {}", field))?;
            }
        }

        let mut seen = HashSet::new();
        for intent in self.deposit_intents()? {
            if !seen.insert(intent.token) {
                anyhow::bail!("Token {} is configured more than once", intent.token);
            }
        }

        Ok(())
    }

    /// Non-fatal configuration problems, for the caller to log once
    /// tracing is up
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.deposits.is_empty() {
            warnings.push("No deposits configured - the run will only resolve and report".to_string());
        }
        warnings
    }

    /// Vault factory address
    pub fn factory_address(&self) -> Result<Address> {
        parse_address(&self.contracts.vault_factory).context("Invalid contracts.vault_factory")
    }

    /// Resolve the identity pair, defaulting either side to the signer
    pub fn identity_pair(&self, signer: Address) -> Result<IdentityPair> {
        let resolve = |value: &Option<String>| -> Result<Address> {
            match value {
                Some(addr) => parse_address(addr),
                None => Ok(signer),
            }
        };
        Ok(IdentityPair::new(
            resolve(&self.identity.leader)?,
            resolve(&self.identity.follower)?,
        ))
    }

    /// Typed deposit intents, in configured order
    pub fn deposit_intents(&self) -> Result<Vec<DepositIntent>> {
        self.deposits
            .iter()
            .map(|d| {
                let label = d.label.trim();
                if label.is_empty() {
                    anyhow::bail!("Deposit label cannot be empty (token {})", d.token);
                }
                if d.decimals > 77 {
                    anyhow::bail!("{}: decimals cannot exceed 77", label);
                }
                let token = parse_address(&d.token).with_context(|| format!("{}: invalid token", label))?;
                let amount = U256::from_str_radix(d.amount.trim(), 10)
                    .with_context(|| format!("{}: invalid amount '{}'", label, d.amount))?;
                if amount.is_zero() {
                    anyhow::bail!("{}: amount must be positive", label);
                }
                Ok(DepositIntent::new(label, token, amount, d.decimals))
            })
            .collect()
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        let mut deposits = String::new();
        for d in &self.deposits {
            deposits.push_str(&format!(
                "    - {}: {} (decimals {}) token {}\n",
                d.label, d.amount, d.decimals, d.token
            ));
        }

        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    chain_id: {}
    timeout: {}ms
    max_retries: {}
    confirmations: {}
    receipt_timeout: {}
  Contracts:
    vault_factory: {}
  Identity:
    leader: {}
    follower: {}
  Signer:
    key_env: {} ({})
  Deposits:
{}"#,
            mask_url(&self.rpc.endpoint),
            self.rpc.chain_id,
            self.rpc.timeout_ms,
            self.rpc.max_retries,
            self.rpc.confirmations,
            self.rpc
                .receipt_timeout_secs
                .map(|s| format!("{}s", s))
                .unwrap_or_else(|| "none".to_string()),
            self.contracts.vault_factory,
            self.identity.leader.as_deref().unwrap_or("(signer)"),
            self.identity.follower.as_deref().unwrap_or("(signer)"),
            self.signer.key_env,
            if std::env::var(&self.signer.key_env).is_ok() {
                "set"
            } else {
                "not set"
            },
            deposits,
        )
    }
}

fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value.trim()).map_err(|e| anyhow::anyhow!("'{}' is not an address: {}", value, e))
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            contracts: ContractsConfig::default(),
            identity: IdentityConfig::default(),
            signer: SignerConfig::default(),
            deposits: default_deposits(),
            logging: LoggingConfig::default(),
        }
    }
}

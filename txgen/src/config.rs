//! Generation configuration with JSON and TOML file support.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use forge_types::Amount;

use crate::TxgenError;

/// Placeholder substituted by the account index when a spec expands to
/// several accounts.
pub const INDEX_PLACEHOLDER: &str = "{index}";

/// One `accounts` entry: a template for `count` accounts of the same role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountSpec {
    /// Account name, optionally containing `{index}`.
    pub name: String,

    /// Vesting transferred from `creator` on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vesting: Option<Amount>,

    #[serde(default = "default_count")]
    pub count: usize,

    /// Creating account. Absent for accounts that already exist at genesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    #[serde(default)]
    pub round_robin_votes_per_elector: usize,

    #[serde(default)]
    pub random_votes_per_elector: usize,

    #[serde(default)]
    pub randseed: u64,
}

impl AccountSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vesting: None,
            count: default_count(),
            creator: None,
            round_robin_votes_per_elector: 0,
            random_votes_per_elector: 0,
            randseed: 0,
        }
    }

    /// Expand into concrete accounts, substituting `{index}` by `0..count`.
    pub fn derive(&self, role: &str) -> Vec<DerivedAccount> {
        (0..self.count)
            .map(|index| DerivedAccount {
                role: role.to_string(),
                index,
                name: self.name.replace(INDEX_PLACEHOLDER, &index.to_string()),
            })
            .collect()
    }
}

/// A concrete account expanded from an [`AccountSpec`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedAccount {
    pub role: String,
    pub index: usize,
    pub name: String,
}

/// Which `accounts` entries play the well-known parts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleNames {
    #[serde(default = "default_root_role")]
    pub root: String,
    #[serde(default = "default_witness_role")]
    pub witness: String,
    #[serde(default = "default_elector_role")]
    pub elector: String,
    #[serde(default = "default_porter_role")]
    pub porter: String,
    #[serde(default = "default_manager_role")]
    pub manager: String,
}

impl Default for RoleNames {
    fn default() -> Self {
        Self {
            root: default_root_role(),
            witness: default_witness_role(),
            elector: default_elector_role(),
            porter: default_porter_role(),
            manager: default_manager_role(),
        }
    }
}

/// Configuration for one generation run.
///
/// Can be loaded from a JSON or TOML file via [`GenConfig::from_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenConfig {
    /// Maximum transactions packed into one block.
    #[serde(default = "default_transactions_per_block")]
    pub transactions_per_block: usize,

    /// Seconds between blocks.
    #[serde(default = "default_block_interval")]
    pub steem_block_interval: u64,

    /// Blocks to wait after witness registration before votes count.
    #[serde(default = "default_witness_round")]
    pub num_blocks_to_clear_witness_round: u32,

    /// Transactions of slack added to the miss-blocks estimate.
    #[serde(default = "default_setup_pad")]
    pub transaction_witness_setup_pad: usize,

    /// Cap on `account_auths` and `key_auths` list length.
    #[serde(default = "default_max_membership")]
    pub steem_max_authority_membership: usize,

    #[serde(default = "default_max_witness_votes")]
    pub max_account_witness_votes: usize,

    #[serde(default = "default_address_prefix")]
    pub steem_address_prefix: String,

    #[serde(default = "default_init_miner_name")]
    pub steem_init_miner_name: String,

    /// Unix time of the target network's genesis block.
    #[serde(default = "default_genesis_timestamp")]
    pub genesis_timestamp: u64,

    /// Secret mixed into every procedural key.
    #[serde(default)]
    pub key_secret: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backfill_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_vesting_per_account: Option<Amount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_port_balance: Option<Amount>,

    #[serde(default)]
    pub roles: RoleNames,

    /// Role name to account template.
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountSpec>,
}

// ── Defaults ───────────────────────────────────────────────────────────

fn default_count() -> usize {
    1
}

fn default_root_role() -> String {
    "initminer".to_string()
}

fn default_witness_role() -> String {
    "init".to_string()
}

fn default_elector_role() -> String {
    "elector".to_string()
}

fn default_porter_role() -> String {
    "porter".to_string()
}

fn default_manager_role() -> String {
    "manager".to_string()
}

fn default_transactions_per_block() -> usize {
    40
}

fn default_block_interval() -> u64 {
    3
}

fn default_witness_round() -> u32 {
    21
}

fn default_setup_pad() -> usize {
    100
}

fn default_max_membership() -> usize {
    10
}

fn default_max_witness_votes() -> usize {
    30
}

fn default_address_prefix() -> String {
    "TST".to_string()
}

fn default_init_miner_name() -> String {
    "initminer".to_string()
}

fn default_genesis_timestamp() -> u64 {
    1_451_606_400
}

// ── Impl ───────────────────────────────────────────────────────────────

impl GenConfig {
    /// Load configuration from a file; `.toml` files are parsed as TOML,
    /// everything else as JSON.
    ///
    /// Relative `snapshot_file` and `backfill_file` paths are resolved
    /// against the directory holding the configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TxgenError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            _ => Self::from_json_str(&content)?,
        };
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self, TxgenError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, TxgenError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, TxgenError> {
        toml::to_string_pretty(self).map_err(|e| TxgenError::InvalidConfig(e.to_string()))
    }

    fn resolve_paths(&mut self, dir: &Path) {
        for path in [&mut self.snapshot_file, &mut self.backfill_file]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
    }

    /// The spec for `role`, or `InvalidInvocation` when it is not configured.
    pub fn account(&self, role: &str) -> Result<&AccountSpec, TxgenError> {
        self.accounts
            .get(role)
            .ok_or_else(|| TxgenError::InvalidInvocation(format!("no account role '{role}'")))
    }

    /// Every account expanded from `role`.
    pub fn derived(&self, role: &str) -> Result<Vec<DerivedAccount>, TxgenError> {
        Ok(self.account(role)?.derive(role))
    }

    /// Name of the root account (the init miner).
    pub fn root_name(&self) -> &str {
        self.accounts
            .get(&self.roles.root)
            .map(|spec| spec.name.as_str())
            .unwrap_or(&self.steem_init_miner_name)
    }

    pub fn porter_name(&self) -> Option<&str> {
        self.accounts
            .get(&self.roles.porter)
            .map(|spec| spec.name.as_str())
    }

    pub fn manager_name(&self) -> Option<&str> {
        self.accounts
            .get(&self.roles.manager)
            .map(|spec| spec.name.as_str())
    }

    /// Account substituted for references to accounts that will not exist.
    pub fn fallback_account(&self) -> &str {
        self.manager_name()
            .or_else(|| self.porter_name())
            .unwrap_or_else(|| self.root_name())
    }

    /// Every account name the configuration provisions or reserves.
    pub fn system_account_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self
            .accounts
            .iter()
            .flat_map(|(role, spec)| spec.derive(role))
            .map(|account| account.name)
            .collect();
        names.insert(self.steem_init_miner_name.clone());
        names
    }

    /// Roles with a creator, ordered so every creator exists before the
    /// accounts it creates.
    ///
    /// Witness, elector, porter and manager roles go first when possible;
    /// the rest follow in name order.
    pub fn creation_order(&self) -> Result<Vec<&str>, TxgenError> {
        let mut existing: BTreeSet<String> = self
            .accounts
            .iter()
            .filter(|(_, spec)| spec.creator.is_none())
            .flat_map(|(role, spec)| spec.derive(role))
            .map(|account| account.name)
            .collect();
        existing.insert(self.steem_init_miner_name.clone());

        let preferred = [
            &self.roles.witness,
            &self.roles.elector,
            &self.roles.porter,
            &self.roles.manager,
        ];
        let mut pending: Vec<&str> = preferred
            .iter()
            .map(|role| role.as_str())
            .filter(|role| self.accounts.contains_key(*role))
            .collect();
        for role in self.accounts.keys() {
            if !pending.contains(&role.as_str()) {
                pending.push(role);
            }
        }
        pending.retain(|role| self.accounts[*role].creator.is_some());

        let mut order = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let ready = pending.iter().position(|role| {
                self.accounts[*role]
                    .creator
                    .as_ref()
                    .is_some_and(|creator| existing.contains(creator))
            });
            let Some(position) = ready else {
                return Err(TxgenError::InvalidConfig(format!(
                    "roles {pending:?} have creators that are never created"
                )));
            };
            let role = pending.remove(position);
            existing.extend(self.accounts[role].derive(role).into_iter().map(|a| a.name));
            order.push(role);
        }
        Ok(order)
    }

    /// Check structural constraints before any generation work.
    pub fn validate(&self) -> Result<(), TxgenError> {
        if self.transactions_per_block == 0 {
            return Err(TxgenError::InvalidConfig(
                "transactions_per_block must be positive".into(),
            ));
        }
        if self.steem_block_interval == 0 {
            return Err(TxgenError::InvalidConfig(
                "steem_block_interval must be positive".into(),
            ));
        }
        if self.steem_max_authority_membership == 0 {
            return Err(TxgenError::InvalidConfig(
                "steem_max_authority_membership must be positive".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        for (role, spec) in &self.accounts {
            if spec.name.is_empty() {
                return Err(TxgenError::InvalidConfig(format!(
                    "role '{role}' has an empty name"
                )));
            }
            if spec.count > 1 && !spec.name.contains(INDEX_PLACEHOLDER) {
                return Err(TxgenError::InvalidConfig(format!(
                    "role '{role}' has count {} but no {INDEX_PLACEHOLDER} in its name",
                    spec.count
                )));
            }
            if spec.creator.is_some() && spec.vesting.is_none() {
                return Err(TxgenError::InvalidConfig(format!(
                    "role '{role}' has a creator but no vesting"
                )));
            }
            for account in spec.derive(role) {
                if !seen.insert(account.name.clone()) {
                    return Err(TxgenError::InvalidConfig(format!(
                        "account '{}' is configured twice",
                        account.name
                    )));
                }
            }
        }
        self.creation_order()?;
        Ok(())
    }
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            transactions_per_block: default_transactions_per_block(),
            steem_block_interval: default_block_interval(),
            num_blocks_to_clear_witness_round: default_witness_round(),
            transaction_witness_setup_pad: default_setup_pad(),
            steem_max_authority_membership: default_max_membership(),
            max_account_witness_votes: default_max_witness_votes(),
            steem_address_prefix: default_address_prefix(),
            steem_init_miner_name: default_init_miner_name(),
            genesis_timestamp: default_genesis_timestamp(),
            key_secret: String::new(),
            snapshot_file: None,
            backfill_file: None,
            min_vesting_per_account: None,
            total_port_balance: None,
            roles: RoleNames::default(),
            accounts: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, count: usize, creator: Option<&str>) -> AccountSpec {
        AccountSpec {
            count,
            creator: creator.map(str::to_string),
            vesting: creator.map(|_| Amount::steem(1_000_000)),
            ..AccountSpec::named(name)
        }
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let config = GenConfig::from_json_str("{}").unwrap();
        assert_eq!(config.transactions_per_block, 40);
        assert_eq!(config.steem_block_interval, 3);
        assert_eq!(config.num_blocks_to_clear_witness_round, 21);
        assert_eq!(config.steem_address_prefix, "TST");
        assert_eq!(config.genesis_timestamp, 1_451_606_400);
        assert_eq!(config.roles, RoleNames::default());
    }

    #[test]
    fn account_spec_defaults() {
        let config = GenConfig::from_json_str(r#"{"accounts": {"porter": {"name": "porter"}}}"#)
            .unwrap();
        let porter = &config.accounts["porter"];
        assert_eq!(porter.count, 1);
        assert!(porter.creator.is_none());
        assert_eq!(porter.randseed, 0);
    }

    #[test]
    fn toml_round_trip() {
        let mut config = GenConfig {
            total_port_balance: Some(Amount::steem(200_000_000_000)),
            ..GenConfig::default()
        };
        config
            .accounts
            .insert("init".into(), spec("init-{index}", 21, Some("initminer")));
        let text = config.to_toml_string().unwrap();
        let parsed = GenConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn derive_substitutes_index() {
        let names: Vec<_> = spec("init-{index}", 3, Some("initminer"))
            .derive("init")
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, ["init-0", "init-1", "init-2"]);
    }

    #[test]
    fn creation_order_follows_creators() {
        let mut config = GenConfig::default();
        config.accounts.insert("initminer".into(), spec("initminer", 1, None));
        config.accounts.insert("porter".into(), spec("porter", 1, Some("tnman")));
        config.accounts.insert("manager".into(), spec("tnman", 1, Some("initminer")));
        config
            .accounts
            .insert("init".into(), spec("init-{index}", 2, Some("initminer")));
        assert_eq!(config.creation_order().unwrap(), ["init", "manager", "porter"]);
    }

    #[test]
    fn unknown_creator_rejected() {
        let mut config = GenConfig::default();
        config.accounts.insert("porter".into(), spec("porter", 1, Some("nobody")));
        assert!(matches!(
            config.validate(),
            Err(TxgenError::InvalidConfig(_))
        ));
    }

    #[test]
    fn creator_cycle_rejected() {
        let mut config = GenConfig::default();
        config.accounts.insert("a".into(), spec("alpha", 1, Some("beta")));
        config.accounts.insert("b".into(), spec("beta", 1, Some("alpha")));
        assert!(config.creation_order().is_err());
    }

    #[test]
    fn count_without_placeholder_rejected() {
        let mut config = GenConfig::default();
        config.accounts.insert("init".into(), spec("init", 3, Some("initminer")));
        assert!(config.validate().is_err());
    }

    #[test]
    fn fallback_prefers_manager() {
        let mut config = GenConfig::default();
        assert_eq!(config.fallback_account(), "initminer");
        config.accounts.insert("porter".into(), spec("porter", 1, None));
        assert_eq!(config.fallback_account(), "porter");
        config.accounts.insert("manager".into(), spec("tnman", 1, None));
        assert_eq!(config.fallback_account(), "tnman");
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("txgen.json");
        std::fs::write(&path, r#"{"snapshot_file": "snap.json"}"#).unwrap();
        let config = GenConfig::from_file(&path).unwrap();
        assert_eq!(config.snapshot_file, Some(dir.path().join("snap.json")));
    }

    #[test]
    fn missing_file_returns_io_error() {
        let result = GenConfig::from_file("/nonexistent/txgen.json");
        assert!(matches!(result, Err(TxgenError::Io(_))));
    }
}

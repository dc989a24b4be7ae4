//! Balance porting from the snapshot.
//!
//! Every admitted snapshot account is recreated by the porter with its
//! scaled balances. Accounts whose authorities delegate to other accounts
//! then get an update re-establishing those delegations on the new network.

use std::collections::BTreeSet;

use forge_keys::KeyDatabase;
use forge_types::{
    AccountUpdateOperation, Amount, Authority, KeyRole, KeySeed, Operation, Transaction,
    TransferOperation,
};

use crate::config::GenConfig;
use crate::snapshot::{Snapshot, SnapshotAccount};
use crate::source::{PlannedSource, TransactionSource};
use crate::stats::{compute_proportions, AccountStats, Proportions};
use crate::system::{account_create, transfer_to_vesting};
use crate::TxgenError;

/// Memo attached to liquid balance transfers.
pub const PORTED_BALANCE_MEMO: &str = "Ported balance";

/// Scaled balances for one admitted snapshot account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortedAccount {
    pub name: String,
    pub vesting: u128,
    pub liquid: u128,
    pub json_metadata: String,
}

/// Snapshot accounts that will exist on the new network, in snapshot order.
pub fn ported_accounts(
    snapshot: &Snapshot,
    stats: &AccountStats,
    proportions: &Proportions,
) -> Result<Vec<PortedAccount>, TxgenError> {
    let mut ported = Vec::new();
    for account in &snapshot.accounts {
        if !stats.account_names.contains(&account.name) {
            continue;
        }
        let vesting = proportions.scale_vests(account.vesting_shares.raw())?;
        if !proportions.admits(vesting) {
            tracing::trace!(account = %account.name, vesting, "below minimum vesting");
            continue;
        }
        ported.push(PortedAccount {
            name: account.name.clone(),
            vesting: proportions.vesting_grant(vesting)?,
            liquid: proportions.scale_steem(account.balance.raw())?,
            json_metadata: account.json_metadata.clone(),
        });
    }
    tracing::info!(
        ported = ported.len(),
        skipped = stats.account_names.len() - ported.len(),
        "selected snapshot accounts to port"
    );
    Ok(ported)
}

/// Maps snapshot account references onto names that exist on the new
/// network.
#[derive(Clone, Debug)]
pub struct AccountResolver {
    known: BTreeSet<String>,
    fallback: String,
}

impl AccountResolver {
    pub fn new(
        ported: impl IntoIterator<Item = String>,
        system: BTreeSet<String>,
        fallback: impl Into<String>,
    ) -> Self {
        let mut known = system;
        known.extend(ported);
        Self {
            known,
            fallback: fallback.into(),
        }
    }

    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        if self.known.contains(name) {
            name
        } else {
            tracing::debug!(account = name, fallback = %self.fallback, "substituting missing account");
            &self.fallback
        }
    }
}

/// Porter-signed creation of every ported account: `account_create`,
/// `transfer_to_vesting`, and a liquid `transfer` when there is any.
pub fn account_creation_source(
    ported: &[PortedAccount],
    config: &GenConfig,
) -> Result<impl TransactionSource + 'static, TxgenError> {
    let porter = config
        .porter_name()
        .ok_or_else(|| TxgenError::InvalidInvocation("porter role is not configured".into()))?
        .to_string();
    let manager = config.manager_name().map(str::to_string);

    Ok(PlannedSource::new(
        ported.to_vec(),
        move |account: PortedAccount, keydb: &mut KeyDatabase| {
            let mut operations = vec![
                account_create(
                    keydb,
                    &porter,
                    &account.name,
                    manager.as_deref(),
                    account.json_metadata,
                )?,
                transfer_to_vesting(&porter, &account.name, Amount::steem(account.vesting)),
            ];
            if account.liquid > 0 {
                operations.push(Operation::Transfer(TransferOperation {
                    from: porter.clone(),
                    to: account.name.clone(),
                    amount: Amount::steem(account.liquid),
                    memo: PORTED_BALANCE_MEMO.to_string(),
                }));
            }
            Ok(Transaction::signed_by(operations, KeySeed::active(porter.as_str())))
        },
    ))
}

/// Authority for one level of a ported account: the manager, then the
/// snapshot's delegations resolved onto existing accounts, then the
/// account's procedural key. Both lists are capped at `max_membership`.
pub fn ported_authority(
    keydb: &mut KeyDatabase,
    resolver: &AccountResolver,
    account: &str,
    role: KeyRole,
    manager: &str,
    source: &Authority,
    max_membership: usize,
) -> Result<Authority, TxgenError> {
    let mut authority = Authority {
        weight_threshold: 1,
        account_auths: vec![(manager.to_string(), 1)],
        key_auths: vec![(keydb.public_key(&KeySeed::new(account, role))?, 1)],
    };
    for (name, weight) in &source.account_auths {
        let resolved = resolver.resolve(name);
        if resolved != account {
            authority.push_account(resolved, *weight);
        }
    }
    let removed = authority.truncate(max_membership);
    if removed > 0 {
        tracing::debug!(account, %role, removed, "truncated authority to maximum membership");
    }
    Ok(authority)
}

struct UpdatePlan {
    name: String,
    owner: Authority,
    active: Authority,
    posting: Authority,
}

/// Owner-signed `account_update` for every ported account whose snapshot
/// authorities reference other accounts.
pub fn account_update_source(
    snapshot: &Snapshot,
    ported: &[PortedAccount],
    config: &GenConfig,
) -> Result<impl TransactionSource + 'static, TxgenError> {
    let manager = config
        .manager_name()
        .ok_or_else(|| TxgenError::InvalidInvocation("manager role is not configured".into()))?
        .to_string();
    let resolver = AccountResolver::new(
        ported.iter().map(|account| account.name.clone()),
        config.system_account_names(),
        config.fallback_account(),
    );
    let max_membership = config.steem_max_authority_membership;

    let plans: Vec<UpdatePlan> = ported
        .iter()
        .filter_map(|account| snapshot.account(&account.name))
        .filter(|account| account.has_account_auths())
        .map(|account: &SnapshotAccount| UpdatePlan {
            name: account.name.clone(),
            owner: account.owner.clone(),
            active: account.active.clone(),
            posting: account.posting.clone(),
        })
        .collect();

    Ok(PlannedSource::new(
        plans,
        move |plan: UpdatePlan, keydb: &mut KeyDatabase| {
            let mut level = |role: KeyRole, source: &Authority| {
                ported_authority(
                    keydb,
                    &resolver,
                    &plan.name,
                    role,
                    &manager,
                    source,
                    max_membership,
                )
            };
            let owner = level(KeyRole::Owner, &plan.owner)?;
            let active = level(KeyRole::Active, &plan.active)?;
            let posting = level(KeyRole::Posting, &plan.posting)?;
            let operation = Operation::AccountUpdate(AccountUpdateOperation {
                account: plan.name.clone(),
                owner: Some(owner),
                active: Some(active),
                posting: Some(posting),
                memo_key: keydb.public_key(&KeySeed::new(plan.name.as_str(), KeyRole::Memo))?,
                json_metadata: String::new(),
            });
            Ok(Transaction::signed_by(vec![operation], KeySeed::owner(plan.name)))
        },
    ))
}

pub fn create_accounts(
    snapshot: &Snapshot,
    stats: &AccountStats,
    config: &GenConfig,
    keydb: &mut KeyDatabase,
) -> Result<Vec<Transaction>, TxgenError> {
    let proportions = compute_proportions(stats, config)?;
    let ported = ported_accounts(snapshot, stats, &proportions)?;
    account_creation_source(&ported, config)?.collect_transactions(keydb)
}

pub fn update_accounts(
    snapshot: &Snapshot,
    stats: &AccountStats,
    config: &GenConfig,
    keydb: &mut KeyDatabase,
) -> Result<Vec<Transaction>, TxgenError> {
    let proportions = compute_proportions(stats, config)?;
    let ported = ported_accounts(snapshot, stats, &proportions)?;
    account_update_source(snapshot, &ported, config)?.collect_transactions(keydb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountSpec;
    use crate::snapshot::{DynamicGlobalProperties, SnapshotMetadata};
    use crate::stats::{compute_stats, DENOM};

    fn account(name: &str, vests: u128, balance: u128, refs: &[&str]) -> SnapshotAccount {
        let key = |role: &str| vec![(format!("STM{name}{role}"), 1)];
        SnapshotAccount {
            name: name.into(),
            vesting_shares: Amount::vests(vests),
            balance: Amount::steem(balance),
            owner: Authority {
                weight_threshold: 1,
                account_auths: refs.iter().map(|r| (r.to_string(), 1)).collect(),
                key_auths: key("owner"),
            },
            active: Authority {
                weight_threshold: 1,
                account_auths: Vec::new(),
                key_auths: key("active"),
            },
            posting: Authority {
                weight_threshold: 1,
                account_auths: refs.iter().map(|r| (r.to_string(), 1)).collect(),
                key_auths: key("posting"),
            },
            memo_key: format!("STM{name}memo"),
            json_metadata: String::new(),
        }
    }

    fn snapshot(accounts: Vec<SnapshotAccount>) -> Snapshot {
        Snapshot {
            metadata: SnapshotMetadata {
                semver: "0.2".into(),
                origin_api: "http://calculon.local".into(),
            },
            dynamic_global_properties: DynamicGlobalProperties {
                total_vesting_fund_steem: Amount::steem(1_000_000),
            },
            accounts,
        }
    }

    fn config() -> GenConfig {
        let mut config = GenConfig {
            total_port_balance: Some(Amount::steem(2_000_000)),
            min_vesting_per_account: Some(Amount::steem(1)),
            ..GenConfig::default()
        };
        config.accounts.insert("porter".into(), AccountSpec::named("porter"));
        config.accounts.insert("manager".into(), AccountSpec::named("tnman"));
        config
    }

    fn sample() -> Snapshot {
        let refs: Vec<String> = (0..12).map(|i| format!("friend{i}")).collect();
        let many: Vec<&str> = refs.iter().map(String::as_str).collect();
        snapshot(vec![
            account("alice", 5_000_000, 10_000, &["bob", "ghost", "alice"]),
            account("bob", 3_000_000, 0, &[]),
            account("dust", 1, 500, &[]),
            account("carol", 2_000_000, 1, &many),
            account("porter", 9_000_000, 9, &[]),
        ])
    }

    #[test]
    fn creates_ported_accounts_from_porter() {
        let snapshot = sample();
        let config = config();
        let stats = compute_stats(&snapshot, &config).unwrap();
        let mut keydb = KeyDatabase::default();
        let txs = create_accounts(&snapshot, &stats, &config, &mut keydb).unwrap();
        let created: Vec<_> = txs
            .iter()
            .map(|tx| match &tx.operations[0] {
                Operation::AccountCreate(op) => op.new_account_name.clone(),
                other => panic!("unexpected {}", other.type_name()),
            })
            .collect();
        assert_eq!(created, ["alice", "bob", "carol"]);

        let alice = &txs[0];
        assert_eq!(alice.operations.len(), 3);
        assert_eq!(alice.wif_sigs.len(), 1);
        let Operation::AccountCreate(create) = &alice.operations[0] else {
            unreachable!()
        };
        assert_eq!(create.creator, "porter");
        assert!(create.owner.has_account("tnman"));
        let Operation::Transfer(transfer) = &alice.operations[2] else {
            panic!("expected transfer");
        };
        assert_eq!(transfer.from, "porter");
        assert_eq!(transfer.memo, PORTED_BALANCE_MEMO);
        assert!(transfer.amount.raw() > 0);

        // bob has no liquid balance
        assert_eq!(txs[1].operations.len(), 2);
    }

    #[test]
    fn updates_resolve_and_cap_references() {
        let snapshot = sample();
        let config = config();
        let stats = compute_stats(&snapshot, &config).unwrap();
        let mut keydb = KeyDatabase::default();
        let txs = update_accounts(&snapshot, &stats, &config, &mut keydb).unwrap();
        assert_eq!(txs.len(), 2);

        let Operation::AccountUpdate(alice) = &txs[0].operations[0] else {
            panic!("expected account_update");
        };
        assert_eq!(txs[0].wif_sigs.len(), 1);
        let owner = alice.owner.as_ref().unwrap();
        assert_eq!(
            owner.account_auths,
            [("tnman".to_string(), 1), ("bob".to_string(), 1)]
        );
        assert_eq!(owner.key_auths.len(), 1);
        assert_eq!(
            alice.active.as_ref().unwrap().account_auths,
            [("tnman".to_string(), 1)]
        );

        let Operation::AccountUpdate(carol) = &txs[1].operations[0] else {
            panic!("expected account_update");
        };
        for auth in carol.owner.iter().chain(&carol.active).chain(&carol.posting) {
            assert!(auth.account_auths.len() <= config.steem_max_authority_membership);
            assert_eq!(auth.account_auths[0], ("tnman".to_string(), 1));
        }
    }

    #[test]
    fn creation_requires_porter() {
        let snapshot = sample();
        let mut config = config();
        config.accounts.remove("porter");
        let stats = compute_stats(&snapshot, &config).unwrap();
        let err = create_accounts(&snapshot, &stats, &config, &mut KeyDatabase::default())
            .unwrap_err();
        assert!(matches!(err, TxgenError::InvalidInvocation(_)));
    }

    #[test]
    fn ported_authority_truncates_to_cap() {
        let friends: Vec<String> = (0..15).map(|i| format!("friend{i}")).collect();
        let resolver = AccountResolver::new(friends.clone(), BTreeSet::new(), "tnman");
        let source = Authority {
            weight_threshold: 2,
            account_auths: friends.iter().map(|f| (f.clone(), 1)).collect(),
            key_auths: Vec::new(),
        };
        let mut keydb = KeyDatabase::default();
        let auth =
            ported_authority(&mut keydb, &resolver, "carol", KeyRole::Owner, "tnman", &source, 10)
                .unwrap();
        assert_eq!(auth.weight_threshold, 1);
        assert_eq!(auth.account_auths.len(), 10);
        assert_eq!(auth.account_auths[0].0, "tnman");
        assert_eq!(auth.account_auths[9].0, "friend8");
        assert_eq!(
            auth.key_auths,
            [(keydb.public_key(&KeySeed::owner("carol")).unwrap(), 1)]
        );
    }

    #[test]
    fn resolver_substitutes_unknown_names() {
        let resolver = AccountResolver::new(
            ["alice".to_string()],
            BTreeSet::from(["tnman".to_string()]),
            "tnman",
        );
        assert_eq!(resolver.resolve("alice"), "alice");
        assert_eq!(resolver.resolve("tnman"), "tnman");
        assert_eq!(resolver.resolve("mallory"), "tnman");
    }

    #[test]
    fn admission_uses_scaled_vesting() {
        let snapshot = sample();
        let stats = compute_stats(&snapshot, &config()).unwrap();
        let proportions = Proportions {
            min_vesting_per_account: 2,
            vest_conversion_factor: DENOM,
            steem_conversion_factor: DENOM,
        };
        let ported = ported_accounts(&snapshot, &stats, &proportions).unwrap();
        assert!(ported.iter().all(|account| account.name != "dust"));
        assert_eq!(ported.len(), 3);
    }

    #[test]
    fn admitted_accounts_receive_the_reserved_floor() {
        let snapshot = sample();
        let config = config();
        let stats = compute_stats(&snapshot, &config).unwrap();
        let proportions = compute_proportions(&stats, &config).unwrap();
        let ported = ported_accounts(&snapshot, &stats, &proportions).unwrap();

        let alice = ported.iter().find(|a| a.name == "alice").unwrap();
        let scaled = proportions.scale_vests(5_000_000).unwrap();
        assert_eq!(alice.vesting, scaled + proportions.min_vesting_per_account);

        let granted: u128 = ported.iter().map(|a| a.vesting + a.liquid).sum();
        assert!(granted <= config.total_port_balance.as_ref().unwrap().raw());
    }

    #[test]
    fn duplicate_snapshot_account_never_creates_twice() {
        let mut snapshot = sample();
        snapshot.accounts.push(account("alice", 5_000_000, 10_000, &[]));
        let err = compute_stats(&snapshot, &config()).unwrap_err();
        assert!(matches!(err, TxgenError::InvalidSnapshot(_)));
        assert!(err.to_string().contains("alice"));
    }
}

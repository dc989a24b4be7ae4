//! System accounts, root setup and witness registration.

use std::collections::BTreeMap;

use forge_keys::{encode_wif, passphrase_secret, KeyDatabase};
use forge_types::{
    AccountCreateOperation, AccountUpdateOperation, Amount, Authority, KeyRole, KeySeed,
    Operation, SignatureMaterial, Transaction, TransferToVestingOperation,
    WitnessUpdateOperation,
};

use crate::config::GenConfig;
use crate::source::{PlannedSource, TransactionSource};
use crate::TxgenError;

/// Informational URL published by every genesis witness.
pub const WITNESS_URL: &str = "https://steemit.com/";

/// Brain key of the init miner on a freshly started node.
pub const INIT_MINER_PASSPHRASE: &str = "init_key";

/// Procedural authority for `(account, role)`, optionally co-controlled by
/// `manager` with weight 1.
pub(crate) fn procedural_authority(
    keydb: &mut KeyDatabase,
    account: &str,
    role: KeyRole,
    manager: Option<&str>,
) -> Result<Authority, TxgenError> {
    let mut authority = keydb.authority(&KeySeed::new(account, role))?;
    if let Some(manager) = manager {
        authority.push_account(manager, 1);
    }
    Ok(authority)
}

/// `account_create` with zero fee and procedural keys for every level.
pub(crate) fn account_create(
    keydb: &mut KeyDatabase,
    creator: &str,
    name: &str,
    manager: Option<&str>,
    json_metadata: String,
) -> Result<Operation, TxgenError> {
    Ok(Operation::AccountCreate(AccountCreateOperation {
        fee: Amount::steem(0),
        creator: creator.to_string(),
        new_account_name: name.to_string(),
        owner: procedural_authority(keydb, name, KeyRole::Owner, manager)?,
        active: procedural_authority(keydb, name, KeyRole::Active, manager)?,
        posting: procedural_authority(keydb, name, KeyRole::Posting, manager)?,
        memo_key: keydb.public_key(&KeySeed::new(name, KeyRole::Memo))?,
        json_metadata,
    }))
}

pub(crate) fn transfer_to_vesting(from: &str, to: &str, amount: Amount) -> Operation {
    Operation::TransferToVesting(TransferToVestingOperation {
        from: from.to_string(),
        to: to.to_string(),
        amount,
    })
}

/// One transaction per account of `role`: create it, then vest the spec's
/// `vesting` from its creator. Signed by the creator's active key.
pub fn system_account_source(
    config: &GenConfig,
    role: &str,
) -> Result<impl TransactionSource + 'static, TxgenError> {
    let spec = config.account(role)?;
    let creator = spec.creator.clone().ok_or_else(|| {
        TxgenError::InvalidInvocation(format!("role '{role}' has no creator"))
    })?;
    let vesting = spec.vesting.clone().ok_or_else(|| {
        TxgenError::InvalidInvocation(format!("role '{role}' has no vesting"))
    })?;
    let names = spec.derive(role).into_iter().map(|account| account.name);

    Ok(PlannedSource::new(names, move |name: String, keydb: &mut KeyDatabase| {
        let operations = vec![
            account_create(keydb, &creator, &name, None, String::new())?,
            transfer_to_vesting(&creator, &name, vesting.clone()),
        ];
        Ok(Transaction::signed_by(operations, KeySeed::active(creator.as_str())))
    }))
}

pub fn create_system_accounts(
    config: &GenConfig,
    keydb: &mut KeyDatabase,
    role: &str,
) -> Result<Vec<Transaction>, TxgenError> {
    system_account_source(config, role)?.collect_transactions(keydb)
}

/// One `witness_update` per account of `role`, signed by its active key.
pub fn witness_update_source(
    config: &GenConfig,
    role: &str,
) -> Result<impl TransactionSource + 'static, TxgenError> {
    let names = config.derived(role)?.into_iter().map(|account| account.name);

    Ok(PlannedSource::new(names, |name: String, keydb: &mut KeyDatabase| {
        let signing_key = keydb.public_key(&KeySeed::new(name.as_str(), KeyRole::Signing))?;
        let operation = Operation::WitnessUpdate(WitnessUpdateOperation {
            owner: name.clone(),
            url: WITNESS_URL.to_string(),
            block_signing_key: signing_key,
            props: BTreeMap::new(),
            fee: Amount::steem(0),
        });
        Ok(Transaction::signed_by(vec![operation], KeySeed::active(name)))
    }))
}

pub fn update_witnesses(
    config: &GenConfig,
    keydb: &mut KeyDatabase,
    role: &str,
) -> Result<Vec<Transaction>, TxgenError> {
    witness_update_source(config, role)?.collect_transactions(keydb)
}

/// Re-key the root account to its procedural keys and vest its configured
/// balance to itself.
///
/// The root still holds the node's well-known genesis key when this runs, so
/// the transaction is signed with that key rather than a procedural one.
pub fn root_setup_source(config: &GenConfig) -> impl TransactionSource + 'static {
    let root = config.root_name().to_string();
    let vesting = config
        .accounts
        .get(&config.roles.root)
        .and_then(|spec| spec.vesting.clone());

    PlannedSource::new([root], move |root: String, keydb: &mut KeyDatabase| {
        let mut operations = vec![Operation::AccountUpdate(AccountUpdateOperation {
            account: root.clone(),
            owner: Some(procedural_authority(keydb, &root, KeyRole::Owner, None)?),
            active: Some(procedural_authority(keydb, &root, KeyRole::Active, None)?),
            posting: Some(procedural_authority(keydb, &root, KeyRole::Posting, None)?),
            memo_key: keydb.public_key(&KeySeed::new(root.as_str(), KeyRole::Memo))?,
            json_metadata: String::new(),
        })];
        if let Some(vesting) = vesting.clone().filter(|amount| !amount.is_zero()) {
            operations.push(transfer_to_vesting(&root, &root, vesting));
        }
        let genesis_key = encode_wif(&passphrase_secret(INIT_MINER_PASSPHRASE));
        Ok(Transaction {
            operations,
            wif_sigs: vec![SignatureMaterial::Resolved(genesis_key)],
        })
    })
}

pub fn initminer_setup(
    config: &GenConfig,
    keydb: &mut KeyDatabase,
) -> Result<Vec<Transaction>, TxgenError> {
    root_setup_source(config).collect_transactions(keydb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountSpec;

    fn init_config() -> GenConfig {
        let mut config = GenConfig::default();
        config.accounts.insert(
            "init".into(),
            AccountSpec {
                count: 21,
                creator: Some("initminer".into()),
                vesting: Some(Amount::steem(1_000_000)),
                ..AccountSpec::named("init-{index}")
            },
        );
        config
    }

    #[test]
    fn creates_one_transaction_per_witness() {
        let mut keydb = KeyDatabase::default();
        let txs = create_system_accounts(&init_config(), &mut keydb, "init").unwrap();
        assert_eq!(txs.len(), 21);
        for (i, tx) in txs.iter().enumerate() {
            assert_eq!(tx.operations.len(), 2);
            assert_eq!(tx.wif_sigs, [SignatureMaterial::KeyHandle(KeySeed::active("initminer"))]);
            let Operation::AccountCreate(create) = &tx.operations[0] else {
                panic!("expected account_create, got {}", tx.operations[0].type_name());
            };
            assert_eq!(create.fee, Amount::steem(0));
            assert_eq!(create.creator, "initminer");
            assert_eq!(create.new_account_name, format!("init-{i}"));
            let Operation::TransferToVesting(vest) = &tx.operations[1] else {
                panic!("expected transfer_to_vesting");
            };
            assert_eq!(vest.from, "initminer");
            assert_eq!(vest.amount, Amount::steem(1_000_000));
        }
    }

    #[test]
    fn missing_role_is_invalid_invocation() {
        let mut keydb = KeyDatabase::default();
        let err = create_system_accounts(&GenConfig::default(), &mut keydb, "init").unwrap_err();
        assert!(matches!(err, TxgenError::InvalidInvocation(_)));
    }

    #[test]
    fn role_without_creator_is_invalid_invocation() {
        let mut config = GenConfig::default();
        config.accounts.insert("porter".into(), AccountSpec::named("porter"));
        let mut keydb = KeyDatabase::default();
        assert!(create_system_accounts(&config, &mut keydb, "porter").is_err());
    }

    #[test]
    fn witness_updates_publish_signing_keys() {
        let mut keydb = KeyDatabase::default();
        let txs = update_witnesses(&init_config(), &mut keydb, "init").unwrap();
        assert_eq!(txs.len(), 21);
        for tx in &txs {
            assert_eq!(tx.operations.len(), 1);
            assert_eq!(tx.wif_sigs.len(), 1);
            let Operation::WitnessUpdate(update) = &tx.operations[0] else {
                panic!("expected witness_update");
            };
            assert_eq!(update.url, WITNESS_URL);
            assert!(update.props.is_empty());
            assert_eq!(update.fee, Amount::steem(0));
            let seed = KeySeed::new(update.owner.as_str(), KeyRole::Signing);
            assert_eq!(update.block_signing_key, keydb.public_key(&seed).unwrap());
        }
    }

    #[test]
    fn root_setup_rekeys_and_vests() {
        let mut config = GenConfig::default();
        config.accounts.insert(
            "initminer".into(),
            AccountSpec {
                vesting: Some(Amount::steem(1_000_000)),
                ..AccountSpec::named("initminer")
            },
        );
        let mut keydb = KeyDatabase::default();
        let txs = initminer_setup(&config, &mut keydb).unwrap();
        assert_eq!(txs.len(), 1);
        let tx = &txs[0];
        assert_eq!(tx.operations[0].type_name(), "account_update_operation");
        assert_eq!(tx.operations[1].type_name(), "transfer_to_vesting_operation");
        assert_eq!(
            tx.wif_sigs[0].as_str(),
            Some("5JNHfZYKGaomSFvd4NUdQ9qMcEAC43kujbfjueTHpVapX1Kzq2n")
        );
    }

    #[test]
    fn root_setup_without_vesting_only_rekeys() {
        let mut keydb = KeyDatabase::default();
        let txs = initminer_setup(&GenConfig::default(), &mut keydb).unwrap();
        assert_eq!(txs[0].operations.len(), 1);
    }

    #[test]
    fn source_len_counts_down() {
        let mut keydb = KeyDatabase::default();
        let mut source = system_account_source(&init_config(), "init").unwrap();
        assert_eq!(source.len(), 21);
        source.next_transaction(&mut keydb).unwrap().unwrap();
        assert_eq!(source.len(), 20);
        assert!(keydb.contains(&KeySeed::owner("init-0")));
        assert!(!keydb.contains(&KeySeed::owner("init-1")));
    }
}

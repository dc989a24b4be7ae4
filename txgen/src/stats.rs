//! Snapshot aggregates and the conversion factors derived from them.

use std::collections::BTreeSet;

use forge_types::{Amount, TypesError};

use crate::config::GenConfig;
use crate::snapshot::Snapshot;
use crate::TxgenError;

/// Fixed-point scale of the conversion factors.
pub const DENOM: u128 = 1_000_000_000_000;

/// Totals over the snapshot accounts that will be ported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountStats {
    pub account_names: BTreeSet<String>,
    /// Sum of `vesting_shares`, raw VESTS.
    pub total_vests: u128,
    /// Sum of liquid `balance`, raw STEEM.
    pub total_steem: u128,
    /// STEEM backing all vesting shares on the source network.
    pub total_vesting_fund_steem: u128,
}

/// Integer factors mapping snapshot balances onto the target supply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proportions {
    pub min_vesting_per_account: u128,
    /// STEEM per VESTS, scaled by [`DENOM`].
    pub vest_conversion_factor: u128,
    /// Target STEEM per source STEEM, scaled by [`DENOM`].
    pub steem_conversion_factor: u128,
}

impl Proportions {
    /// Vesting (raw STEEM) granted for `vests` snapshot shares.
    pub fn scale_vests(&self, vests: u128) -> Result<u128, TxgenError> {
        scale(vests, self.vest_conversion_factor)
    }

    /// Liquid STEEM granted for a snapshot `balance`.
    pub fn scale_steem(&self, balance: u128) -> Result<u128, TxgenError> {
        scale(balance, self.steem_conversion_factor)
    }

    /// Whether an account with `vesting` (already scaled) is ported.
    pub fn admits(&self, vesting: u128) -> bool {
        vesting > 0 && vesting >= self.min_vesting_per_account
    }

    /// Vesting granted to an admitted account: its scaled share plus the
    /// per-account floor reserved out of the port budget.
    pub fn vesting_grant(&self, scaled: u128) -> Result<u128, TxgenError> {
        Ok(scaled
            .checked_add(self.min_vesting_per_account)
            .ok_or(TypesError::AmountOverflow)?)
    }
}

fn scale(value: u128, factor: u128) -> Result<u128, TxgenError> {
    Ok(value.checked_mul(factor).ok_or(TypesError::AmountOverflow)? / DENOM)
}

/// Aggregate the snapshot, skipping every account the configuration
/// provisions itself.
pub fn compute_stats(snapshot: &Snapshot, config: &GenConfig) -> Result<AccountStats, TxgenError> {
    let system = config.system_account_names();
    let tvfs = &snapshot.dynamic_global_properties.total_vesting_fund_steem;
    if !tvfs.is_steem() {
        return Err(TxgenError::InvalidSnapshot(format!(
            "total_vesting_fund_steem is not STEEM: {tvfs}"
        )));
    }

    let mut total_vests = Amount::vests(0);
    let mut total_steem = Amount::steem(0);
    let mut account_names = BTreeSet::new();
    for account in &snapshot.accounts {
        if system.contains(&account.name) {
            tracing::debug!(account = %account.name, "skipping system account in snapshot");
            continue;
        }
        if !account.vesting_shares.is_vests() || !account.balance.is_steem() {
            return Err(TxgenError::InvalidSnapshot(format!(
                "account '{}' has unexpected assets ({}, {})",
                account.name, account.vesting_shares, account.balance
            )));
        }
        if !account_names.insert(account.name.clone()) {
            return Err(TxgenError::InvalidSnapshot(format!(
                "account '{}' is listed more than once",
                account.name
            )));
        }
        total_vests = total_vests.checked_add(&account.vesting_shares)?;
        total_steem = total_steem.checked_add(&account.balance)?;
    }

    Ok(AccountStats {
        account_names,
        total_vests: total_vests.raw(),
        total_steem: total_steem.raw(),
        total_vesting_fund_steem: tvfs.raw(),
    })
}

/// Split `total_port_balance` between vesting and liquid balances and
/// derive the factors applied to every ported account.
///
/// The budget left after reserving `min_vesting_per_account` for every
/// account is divided in the same ratio the source network holds between
/// its vesting fund and its liquid supply.
pub fn compute_proportions(
    stats: &AccountStats,
    config: &GenConfig,
) -> Result<Proportions, TxgenError> {
    let total_port = config.total_port_balance.as_ref().ok_or_else(|| {
        TxgenError::InvalidInvocation("total_port_balance is required".into())
    })?;
    if !total_port.is_steem() {
        return Err(TxgenError::InvalidConfig(format!(
            "total_port_balance must be STEEM, got {total_port}"
        )));
    }
    let min_vesting = match &config.min_vesting_per_account {
        Some(min) => {
            min.ensure_compatible(total_port)?;
            min.raw()
        }
        None => 0,
    };

    let accounts = stats.account_names.len() as u128;
    let reserved = min_vesting
        .checked_mul(accounts)
        .ok_or(TypesError::AmountOverflow)?;
    let avail = total_port.raw().checked_sub(reserved).ok_or_else(|| {
        TxgenError::InsufficientSupply(format!(
            "total_port_balance {} cannot cover {accounts} accounts at {min_vesting} each",
            total_port.raw()
        ))
    })?;

    let tvfs = stats.total_vesting_fund_steem;
    let weight = stats.total_steem + tvfs;
    let port_vests = if weight == 0 {
        0
    } else {
        avail.checked_mul(tvfs).ok_or(TypesError::AmountOverflow)? / weight
    };
    let port_steem = avail - port_vests;

    let vest_conversion_factor = factor("vest", port_vests, stats.total_vests)?;
    let steem_conversion_factor = factor("steem", port_steem, stats.total_steem)?;
    tracing::info!(
        avail,
        port_vests,
        port_steem,
        vest_conversion_factor,
        steem_conversion_factor,
        "computed proportions"
    );

    Ok(Proportions {
        min_vesting_per_account: min_vesting,
        vest_conversion_factor,
        steem_conversion_factor,
    })
}

fn factor(kind: &str, budget: u128, total: u128) -> Result<u128, TxgenError> {
    if total == 0 {
        return Ok(0);
    }
    let factor = budget.checked_mul(DENOM).ok_or(TypesError::AmountOverflow)? / total;
    if factor < 1 {
        return Err(TxgenError::InsufficientSupply(format!(
            "{kind} conversion factor is zero ({budget} over {total})"
        )));
    }
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(accounts: usize, total_vests: u128, total_steem: u128, tvfs: u128) -> AccountStats {
        AccountStats {
            account_names: (0..accounts).map(|i| format!("acct{i}")).collect(),
            total_vests,
            total_steem,
            total_vesting_fund_steem: tvfs,
        }
    }

    fn config(total: u128, min: u128) -> GenConfig {
        GenConfig {
            total_port_balance: Some(Amount::steem(total)),
            min_vesting_per_account: Some(Amount::steem(min)),
            ..GenConfig::default()
        }
    }

    #[test]
    fn reference_totals_yield_reference_factors() {
        let stats = stats(21, 103_927_120_221_962_824, 60_859_732_440, 196_793_227_578);
        let p = compute_proportions(&stats, &config(200_000_000_000, 1)).unwrap();
        assert_eq!(p.min_vesting_per_account, 1);
        assert_eq!(p.vest_conversion_factor, 1_469_860);
        assert_eq!(p.steem_conversion_factor, 776_237_928_593);
    }

    #[test]
    fn missing_total_is_invalid_invocation() {
        let err = compute_proportions(&stats(1, 1, 1, 1), &GenConfig::default()).unwrap_err();
        assert!(matches!(err, TxgenError::InvalidInvocation(_)));
    }

    #[test]
    fn reserve_above_total_is_insufficient() {
        let err = compute_proportions(&stats(10, 1, 1, 1), &config(5, 1)).unwrap_err();
        assert!(matches!(err, TxgenError::InsufficientSupply(_)));
    }

    #[test]
    fn tiny_budget_over_huge_total_is_insufficient() {
        let err = compute_proportions(&stats(1, u64::MAX.into(), 0, 1), &config(2, 1)).unwrap_err();
        assert!(matches!(err, TxgenError::InsufficientSupply(_)));
    }

    #[test]
    fn empty_totals_give_zero_factors() {
        let p = compute_proportions(&stats(0, 0, 0, 0), &config(1000, 1)).unwrap();
        assert_eq!(p.vest_conversion_factor, 0);
        assert_eq!(p.steem_conversion_factor, 0);
    }

    #[test]
    fn mismatched_minimum_rejected() {
        let mut conf = config(1000, 1);
        conf.min_vesting_per_account = Some(Amount::vests(1));
        assert!(matches!(
            compute_proportions(&stats(1, 1, 1, 1), &conf),
            Err(TxgenError::Types(_))
        ));
    }

    #[test]
    fn admits_requires_minimum_and_nonzero() {
        let p = Proportions {
            min_vesting_per_account: 0,
            vest_conversion_factor: DENOM,
            steem_conversion_factor: DENOM,
        };
        assert!(!p.admits(0));
        assert!(p.admits(1));
        assert_eq!(p.scale_vests(7).unwrap(), 7);
    }
}

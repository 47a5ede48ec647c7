// Slashing: tokens brûlés, parts intactes, entrées en cours rattrapées
use super::*;
use crate::staking::{BankKeeper, ErrorKind, PoolKind, SlashOutcome, StakingError};
use crate::types::Shares;
use rust_decimal_macros::dec;

/// v1 (100 self + 100 from account 10) and v2 (100 self), both bonded.
/// Account 10 then unbonds 20 from v1 at height 3 and moves 30 to v2 at height 4.
fn slashable_keeper() -> StakingKeeper<MemoryBank> {
    let mut keeper = new_keeper(test_params());
    let c = ctx(1, GENESIS_TIME);
    keeper.create_validator(&c, new_validator(1, 100)).unwrap();
    keeper.create_validator(&c, new_validator(2, 100)).unwrap();
    keeper.delegate(&c, &account(10), &account(1), 100).unwrap();
    keeper.end_block(&header(1, GENESIS_TIME)).unwrap();

    keeper
        .undelegate(&ctx(3, GENESIS_TIME + 3), &account(10), &account(1), 20)
        .unwrap();
    keeper
        .begin_redelegate(&ctx(4, GENESIS_TIME + 4), &account(10), &account(1), &account(2), 30)
        .unwrap();
    keeper
}

#[test]
fn test_slash_past_infraction_reaches_pending_entries() {
    let mut keeper = slashable_keeper();
    let outcome = keeper
        .slash(&ctx(5, GENESIS_TIME + 5), &account(1), 2, dec!(0.1))
        .unwrap();

    assert_eq!(
        outcome,
        SlashOutcome {
            validator_burned: 15,
            unbonding_burned: 2,
            redelegation_burned: 3,
        }
    );
    assert_eq!(outcome.total(), 20);
    assert_eq!(keeper.bank().burned(), 20);

    // Les parts ne bougent pas, le taux de change absorbe la perte
    let v1 = keeper.validator(&account(1)).unwrap();
    assert_eq!(v1.tokens, 135);
    assert_eq!(v1.delegator_shares, Shares::from_tokens(150).unwrap());
    let d_shares = keeper.state().delegation(&account(10), &account(1)).unwrap().shares;
    assert_eq!(v1.tokens_from_shares(d_shares).unwrap(), 45);

    let entry = &keeper
        .state()
        .unbonding_delegation(&account(10), &account(1))
        .unwrap()
        .entries[0];
    assert_eq!((entry.initial_balance, entry.balance), (20, 18));

    let v2 = keeper.validator(&account(2)).unwrap();
    assert_eq!(v2.tokens, 127);
    assert_eq!(
        keeper.state().delegation(&account(10), &account(2)).unwrap().shares,
        Shares::from_tokens(27).unwrap()
    );

    assert_eq!(keeper.bank().pool_balance(PoolKind::Bonded), 262);
    assert_eq!(keeper.bank().pool_balance(PoolKind::NotBonded), 18);
    keeper.check_invariants().unwrap();
}

#[test]
fn test_slash_skips_entries_created_before_infraction() {
    let mut keeper = slashable_keeper();
    let outcome = keeper
        .slash(&ctx(5, GENESIS_TIME + 5), &account(1), 5, dec!(0.5))
        .unwrap();

    // Infraction au bloc courant: seul le pool du validateur est touché
    assert_eq!(outcome.unbonding_burned, 0);
    assert_eq!(outcome.redelegation_burned, 0);
    assert_eq!(outcome.validator_burned, 75);
    assert_eq!(keeper.validator(&account(2)).unwrap().tokens, 130);

    let outcome = keeper
        .slash(&ctx(6, GENESIS_TIME + 6), &account(1), 4, dec!(0.5))
        .unwrap();
    // L'unbonding date du bloc 3: épargné; la redélégation du bloc 4: touchée
    assert_eq!(outcome.unbonding_burned, 0);
    assert_eq!(outcome.redelegation_burned, 15);
    keeper.check_invariants().unwrap();
}

#[test]
fn test_slash_ignores_matured_entries() {
    let mut keeper = slashable_keeper();
    let late = GENESIS_TIME + 4 + UNBONDING_TIME;
    let outcome = keeper
        .slash(&ctx(9, late), &account(1), 2, dec!(0.1))
        .unwrap();
    assert_eq!(outcome.unbonding_burned, 0);
    assert_eq!(outcome.redelegation_burned, 0);
    keeper.check_invariants().unwrap();
}

#[test]
fn test_slash_argument_errors() {
    let mut keeper = slashable_keeper();
    let c = ctx(5, GENESIS_TIME + 5);
    let before = keeper.state().clone();

    let err = keeper.slash(&c, &account(1), 2, dec!(1)).unwrap_err();
    assert_eq!(err, StakingError::InvalidSlashFraction(dec!(1)));
    let err = keeper.slash(&c, &account(1), 2, dec!(-0.1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = keeper.slash(&c, &account(1), 6, dec!(0.1)).unwrap_err();
    assert_eq!(
        err,
        StakingError::FutureInfraction {
            infraction: 6,
            current: 5
        }
    );
    let err = keeper.slash(&c, &account(9), 2, dec!(0.1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(keeper.state(), &before);
    assert_eq!(keeper.bank().burned(), 0);
}

#[test]
fn test_slashed_unbonding_releases_reduced_balance() {
    let mut keeper = slashable_keeper();
    keeper
        .slash(&ctx(5, GENESIS_TIME + 5), &account(1), 2, dec!(0.1))
        .unwrap();
    let spendable = keeper.bank().spendable_balance(&account(10));

    keeper
        .end_block(&header(6, GENESIS_TIME + 3 + UNBONDING_TIME))
        .unwrap();
    assert_eq!(keeper.bank().spendable_balance(&account(10)), spendable + 18);
    keeper.check_invariants().unwrap();
}

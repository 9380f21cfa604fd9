//! Randomized adds and reorgs checked against an independent balance model.

mod common;

use alloy_primitives::{Address, U256};
use common::{Inbox, OWNER, OWNER_BALANCE, account, ending, inbox, transfer};
use inbox_executor::BalanceEngine;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::BTreeMap;

/// The expected outcome after some prefix of the ledger.
#[derive(Debug, Clone)]
struct Checkpoint {
    balances: BTreeMap<Address, u64>,
    accounts: Vec<Address>,
    message_count: u64,
}

impl Checkpoint {
    fn genesis() -> Self {
        Self {
            balances: BTreeMap::from([(OWNER, OWNER_BALANCE)]),
            accounts: vec![OWNER],
            message_count: 0,
        }
    }
}

fn assert_matches_model(inbox: &Inbox, engine: &BalanceEngine, expected: &Checkpoint) {
    let head = inbox.head();
    assert_eq!(head.message_count, expected.message_count);
    for (account, balance) in &expected.balances {
        assert_eq!(
            engine.balance(head.state, *account).unwrap(),
            U256::from(*balance),
            "balance of {account} after {} messages",
            expected.message_count
        );
    }
    let total = engine.balances(head.state).unwrap().values().fold(U256::ZERO, |acc, v| acc + *v);
    assert_eq!(total, U256::from(OWNER_BALANCE));
}

#[test]
fn test_random_adds_and_reorgs() {
    for seed in [1, 7, 42, 1_633_932_474] {
        run(seed);
    }
}

fn run(seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let inbox = inbox();
    let engine = inbox.engine().clone();
    let mut checkpoints = vec![Checkpoint::genesis()];

    for i in 1..100u64 {
        if i % 10 == 0 {
            let target = rng.random_range(0..checkpoints.len());
            checkpoints.truncate(target + 1);
            let checkpoint = &checkpoints[target];
            inbox.reorg_to(checkpoint.message_count).unwrap();
            assert_matches_model(&inbox, &engine, checkpoint);
            continue;
        }

        let mut state = checkpoints.last().cloned().unwrap();
        let count = rng.random_range(0..5usize);
        let mut messages = Vec::with_capacity(count);
        for j in 0..count {
            let source = state.accounts[rng.random_range(0..state.accounts.len())];
            let available = state.balances.get(&source).copied().unwrap_or_default();
            let amount = rng.random_range(0..=available);
            let dest = if j == 0 {
                let fresh = account(state.accounts.len() as u64);
                state.accounts.push(fresh);
                fresh
            } else {
                state.accounts[rng.random_range(0..state.accounts.len())]
            };

            let message = transfer(source, dest, amount);
            messages.push(if j == count - 1 && i % 2 == 0 { ending(message) } else { message });
            *state.balances.entry(source).or_default() -= amount;
            *state.balances.entry(dest).or_default() += amount;
        }

        inbox.add_messages(state.message_count, false, messages).unwrap();
        state.message_count += count as u64;
        assert_matches_model(&inbox, &engine, &state);
        checkpoints.push(state);
    }

    // Sealed blocks tile the ledger prefix without gaps.
    let head = inbox.head();
    let mut end = 0;
    for number in 1..=head.head_block.number() {
        let block = inbox.block_by_number(number).unwrap().unwrap();
        assert_eq!(block.header.message_start, end);
        assert!(block.header.message_end > end);
        end = block.header.message_end;
    }
    assert_eq!(head.open_range, end..head.message_count);
}

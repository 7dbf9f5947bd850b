use proptest::prelude::*;
use proptest::sample::Index;
use replicoin_core::{Amount, CoinId, Command, HolderId, Response, SpendOutcome};
use replicoin_ledger::{snapshot, Interpreter};

/// A command template. Spend inputs are picked from the sender's coins at
/// apply time so that a good share of generated spends succeed.
#[derive(Debug, Clone)]
enum Op {
    Query(u32),
    Mint(u32, u64),
    Spend {
        sender: u32,
        picks: Vec<Index>,
        receiver: u32,
        percent: u64,
    },
    /// Spend of an arbitrary (likely foreign or missing) coin id.
    RawSpend {
        sender: u32,
        coin: u64,
        receiver: u32,
        units: u64,
    },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..4).prop_map(Op::Query),
        (0u32..4, 0u64..50_000_000).prop_map(|(holder, units)| Op::Mint(holder, units)),
        (
            0u32..4,
            prop::collection::vec(any::<Index>(), 1..4),
            0u32..4,
            0u64..=120,
        )
            .prop_map(|(sender, picks, receiver, percent)| Op::Spend {
                sender,
                picks,
                receiver,
                percent,
            }),
        (0u32..4, 0u64..40, 0u32..4, 0u64..10_000_000).prop_map(
            |(sender, coin, receiver, units)| Op::RawSpend {
                sender,
                coin,
                receiver,
                units,
            }
        ),
    ]
}

/// Resolve a template into a concrete command against current state.
fn to_command(interpreter: &Interpreter, op: &Op) -> (HolderId, Command) {
    match op {
        Op::Query(holder) => (HolderId(*holder), Command::Query),
        Op::Mint(holder, units) => (HolderId(*holder), Command::mint(Amount::from_units(*units))),
        Op::Spend {
            sender,
            picks,
            receiver,
            percent,
        } => {
            let sender = HolderId(*sender);
            let owned: Vec<(CoinId, Amount)> = interpreter.peek(sender).into_iter().collect();
            let mut inputs: Vec<CoinId> = Vec::new();
            let mut total = 0u64;
            if !owned.is_empty() {
                for pick in picks {
                    let (id, value) = owned[pick.index(owned.len())];
                    if !inputs.contains(&id) {
                        inputs.push(id);
                        total += value.units();
                    }
                }
            }
            let amount = Amount::from_units(total * percent / 100);
            (sender, Command::spend(inputs, HolderId(*receiver), amount))
        }
        Op::RawSpend {
            sender,
            coin,
            receiver,
            units,
        } => (
            HolderId(*sender),
            Command::spend(vec![CoinId(*coin)], HolderId(*receiver), Amount::from_units(*units)),
        ),
    }
}

fn input_total(interpreter: &Interpreter, command: &Command) -> Option<Amount> {
    match command {
        Command::Spend { inputs, .. } => Amount::checked_sum(
            inputs
                .iter()
                .map(|id| interpreter.ledger().value_of(*id).unwrap_or(Amount::ZERO)),
        ),
        _ => None,
    }
}

proptest! {
    /// Replaying the same commands on two ledgers yields identical snapshots.
    #[test]
    fn replay_is_deterministic(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut a = Interpreter::new();
        let mut b = Interpreter::new();

        for op in &ops {
            let (requester, command) = to_command(&a, op);
            let response_a = a.apply(requester, command.clone());
            let response_b = b.apply(requester, command);
            prop_assert_eq!(response_a, response_b);
        }

        let snap_a = snapshot::export(a.ledger()).unwrap();
        let snap_b = snapshot::export(b.ledger()).unwrap();
        prop_assert_eq!(snap_a, snap_b);
    }

    /// Invariants hold after every command, spends conserve value, rejected
    /// commands change nothing, and allocated ids only grow.
    #[test]
    fn every_command_preserves_invariants(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut interpreter = Interpreter::new();
        let mut highest: Option<CoinId> = None;

        for op in &ops {
            let (requester, command) = to_command(&interpreter, op);
            let before = interpreter.ledger().clone();
            let inputs = input_total(&interpreter, &command);
            let supply_before = before.total_supply().unwrap();

            let response = interpreter.apply(requester, command);
            let ledger = interpreter.ledger();
            prop_assert_eq!(ledger.check_invariants(), Ok(()));

            let allocated: Vec<CoinId> = match &response {
                Response::Minted(id) => vec![*id],
                Response::Spent(SpendOutcome::Exact { transferred }) => vec![*transferred],
                Response::Spent(SpendOutcome::WithChange { change, transferred }) => {
                    vec![*change, *transferred]
                }
                _ => vec![],
            };
            for id in allocated {
                if let Some(prev) = highest {
                    prop_assert!(id > prev, "id {} not above {}", id, prev);
                }
                prop_assert!(!before.contains(id));
                highest = Some(id);
            }

            match &response {
                Response::Spent(outcome) => {
                    let produced = Amount::checked_sum(
                        [Some(outcome.transferred()), outcome.change()]
                            .into_iter()
                            .flatten()
                            .map(|id| ledger.value_of(id).unwrap()),
                    );
                    prop_assert_eq!(inputs, produced);
                    prop_assert_eq!(ledger.total_supply().unwrap(), supply_before);
                }
                Response::Rejected(_) => {
                    prop_assert_eq!(ledger, &before);
                }
                _ => {}
            }
        }
    }

    /// Exporting, mutating, and importing returns to the exported state.
    #[test]
    fn snapshot_restores_exported_state(
        prefix in prop::collection::vec(arb_op(), 0..30),
        suffix in prop::collection::vec(arb_op(), 1..30),
    ) {
        let mut interpreter = Interpreter::new();
        for op in &prefix {
            let (requester, command) = to_command(&interpreter, op);
            interpreter.apply(requester, command);
        }
        let saved = interpreter.ledger().clone();
        let bytes = snapshot::export(&saved).unwrap();

        for op in &suffix {
            let (requester, command) = to_command(&interpreter, op);
            interpreter.apply(requester, command);
        }

        snapshot::import(interpreter.ledger_mut(), &bytes).unwrap();
        prop_assert_eq!(interpreter.ledger(), &saved);
    }
}

#[test]
fn query_on_unknown_holder_is_idempotent() {
    let mut interpreter = Interpreter::new();
    let carol = HolderId(3);

    let first = interpreter.apply(carol, Command::Query);
    let shape = interpreter.ledger().clone();
    let second = interpreter.apply(carol, Command::Query);

    assert_eq!(first, Response::Coins(Default::default()));
    assert_eq!(first, second);
    assert_eq!(interpreter.ledger(), &shape);
    assert_eq!(interpreter.ledger().holders().len(), 1);
}

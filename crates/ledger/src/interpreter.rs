//! Command interpreter.
//!
//! Maps decoded commands onto ledger mutations and queries. Replicas apply
//! ordered commands strictly one at a time, so the interpreter needs no
//! locking; determinism comes from every replica running the same sequence
//! of primitive ledger operations.

use crate::ledger::Ledger;
use replicoin_core::{Amount, CoinId, Command, HolderId, Rejection, Response, SpendOutcome};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

pub type Result<T> = std::result::Result<T, Rejection>;

/// Executes commands against the ledger it owns.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    ledger: Ledger,
}

impl Interpreter {
    /// Create an interpreter over an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an interpreter over an existing ledger.
    pub fn with_ledger(ledger: Ledger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Mutable access, used only for wholesale snapshot installation.
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    /// Execute a command delivered through the ordered path.
    pub fn apply(&mut self, requester: HolderId, command: Command) -> Response {
        debug!(%requester, kind = %command.kind(), "applying ordered command");
        match command {
            Command::Query => Response::Coins(self.query(requester)),
            Command::Mint { value } => self.mint(requester, &value).into(),
            Command::Spend {
                inputs,
                receiver,
                amount,
            } => self.spend(requester, &inputs, receiver, &amount).into(),
        }
    }

    /// Execute a command delivered through the unordered path.
    ///
    /// Only queries are served, and they never register the requester: a
    /// read that skips the ordered log must not change replica state.
    pub fn apply_read_only(&self, requester: HolderId, command: &Command) -> Response {
        debug!(%requester, kind = %command.kind(), "serving unordered command");
        match command {
            Command::Query => Response::Coins(self.peek(requester)),
            Command::Mint { .. } | Command::Spend { .. } => Response::Rejected(Rejection::OrderedOnly),
        }
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Coins owned by `requester` with their values. A first-time requester
    /// is registered with an empty set.
    pub fn query(&mut self, requester: HolderId) -> BTreeMap<CoinId, Amount> {
        if self.ledger.register(requester) {
            info!(%requester, "registered holder");
        }
        self.peek(requester)
    }

    /// Like [`Interpreter::query`] but without registering unknown holders.
    pub fn peek(&self, requester: HolderId) -> BTreeMap<CoinId, Amount> {
        let Some(owned) = self.ledger.owned_by(requester) else {
            return BTreeMap::new();
        };
        owned
            .iter()
            .filter_map(|id| self.ledger.value_of(*id).map(|value| (*id, value)))
            .collect()
    }

    // =========================================================================
    // Mint
    // =========================================================================

    /// Create a coin of `value` owned by `requester`.
    pub fn mint(&mut self, requester: HolderId, value: &str) -> Result<CoinId> {
        let value = parse_amount(value)?;
        if !self.ledger.can_allocate(1) {
            return Err(Rejection::IdsExhausted);
        }
        let id = self.issue(requester, value);
        info!(%requester, coin = %id, %value, "minted coin");
        Ok(id)
    }

    // =========================================================================
    // Spend
    // =========================================================================

    /// Consume `inputs` owned by `sender`, give `amount` to `receiver` as a
    /// fresh coin, and return any remainder to `sender` as a change coin.
    ///
    /// All checks run before the first mutation, so a rejected spend leaves
    /// the ledger untouched.
    pub fn spend(
        &mut self,
        sender: HolderId,
        inputs: &[CoinId],
        receiver: HolderId,
        amount: &str,
    ) -> Result<SpendOutcome> {
        let requested = parse_amount(amount)?;
        let remainder = self.validate_spend(sender, inputs, receiver, requested)?;

        // Consume inputs
        for id in inputs {
            self.ledger.remove(*id);
            self.ledger.remove_ownership(sender, *id);
        }

        // Change is allocated before the transfer; every replica must hand
        // out ids in this order.
        let outcome = if remainder.is_zero() {
            SpendOutcome::Exact {
                transferred: self.issue(receiver, requested),
            }
        } else {
            let change = self.issue(sender, remainder);
            let transferred = self.issue(receiver, requested);
            SpendOutcome::WithChange {
                change,
                transferred,
            }
        };

        info!(
            %sender,
            %receiver,
            amount = %requested,
            inputs = inputs.len(),
            transferred = %outcome.transferred(),
            change = ?outcome.change(),
            "spent coins"
        );
        Ok(outcome)
    }

    /// Run every spend check against current state and return what is left
    /// of the inputs after the transfer. Never mutates.
    fn validate_spend(
        &self,
        sender: HolderId,
        inputs: &[CoinId],
        receiver: HolderId,
        requested: Amount,
    ) -> Result<Amount> {
        let owned = self
            .ledger
            .owned_by(sender)
            .ok_or(Rejection::UnknownSender)?;
        if inputs.is_empty() {
            return Err(Rejection::EmptyInputs);
        }

        let mut seen = BTreeSet::new();
        let mut values = Vec::with_capacity(inputs.len());
        for id in inputs {
            if !seen.insert(*id) {
                return Err(Rejection::DuplicateInput(*id));
            }
            let value = self.ledger.value_of(*id).ok_or(Rejection::UnknownCoin(*id))?;
            if !owned.contains(id) {
                return Err(Rejection::NotOwned(*id));
            }
            values.push(value);
        }

        if !self.ledger.is_known(receiver) {
            return Err(Rejection::UnknownReceiver(receiver));
        }
        if sender == receiver {
            return Err(Rejection::SelfTransfer);
        }

        let total = Amount::checked_sum(values)
            .ok_or_else(|| Rejection::InvalidValue("input total overflows".to_string()))?;
        let remainder = total.checked_sub(requested).ok_or_else(|| {
            debug!(%sender, available = %total, requested = %requested, "insufficient funds");
            Rejection::InsufficientFunds {
                available: total,
                requested,
            }
        })?;

        let outputs = if remainder.is_zero() { 1 } else { 2 };
        if !self.ledger.can_allocate(outputs) {
            return Err(Rejection::IdsExhausted);
        }
        Ok(remainder)
    }

    /// Allocate the next id for a coin of `value` owned by `owner`.
    fn issue(&mut self, owner: HolderId, value: Amount) -> CoinId {
        let id = self.ledger.next_id();
        self.ledger.put(id, value);
        self.ledger.add_ownership(owner, id);
        id
    }
}

fn parse_amount(raw: &str) -> Result<Amount> {
    raw.parse()
        .map_err(|e| Rejection::InvalidValue(format!("{raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MAX_MARK;

    const ALICE: HolderId = HolderId(1);
    const BOB: HolderId = HolderId(2);
    const CAROL: HolderId = HolderId(3);

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    /// Alice owns coin 0 = 10, Bob is registered.
    fn setup() -> Interpreter {
        let mut interpreter = Interpreter::new();
        interpreter.mint(ALICE, "10").unwrap();
        interpreter.query(BOB);
        interpreter
    }

    #[test]
    fn test_mint_first_coin() {
        let mut interpreter = Interpreter::new();
        let id = interpreter.mint(ALICE, "10").unwrap();

        assert_eq!(id, CoinId(0));
        assert_eq!(interpreter.ledger().value_of(id), Some(amount("10")));
        assert!(interpreter.ledger().owned_by(ALICE).unwrap().contains(&id));
        assert_eq!(interpreter.ledger().len(), 1);
    }

    #[test]
    fn test_mint_ids_increase() {
        let mut interpreter = Interpreter::new();
        assert_eq!(interpreter.mint(ALICE, "1").unwrap(), CoinId(0));
        assert_eq!(interpreter.mint(BOB, "2").unwrap(), CoinId(1));
        assert_eq!(interpreter.mint(ALICE, "0.5").unwrap(), CoinId(2));
    }

    #[test]
    fn test_mint_zero_is_allowed() {
        let mut interpreter = Interpreter::new();
        let id = interpreter.mint(ALICE, "0").unwrap();
        assert_eq!(interpreter.ledger().value_of(id), Some(Amount::ZERO));
    }

    #[test]
    fn test_mint_invalid_value() {
        let mut interpreter = Interpreter::new();
        for raw in ["-1", "ten", "", "1.0000001"] {
            let result = interpreter.mint(ALICE, raw);
            assert!(matches!(result, Err(Rejection::InvalidValue(_))), "{raw}");
        }
        assert!(interpreter.ledger().is_empty());
        assert!(!interpreter.ledger().is_known(ALICE));
    }

    #[test]
    fn test_query_registers_unknown_holder_once() {
        let mut interpreter = Interpreter::new();
        assert!(interpreter.query(CAROL).is_empty());
        assert!(interpreter.ledger().is_known(CAROL));

        let before = interpreter.ledger().clone();
        assert!(interpreter.query(CAROL).is_empty());
        assert_eq!(interpreter.ledger(), &before);
    }

    #[test]
    fn test_query_returns_values() {
        let mut interpreter = setup();
        interpreter.mint(ALICE, "2.5").unwrap();

        let coins = interpreter.query(ALICE);
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[&CoinId(0)], amount("10"));
        assert_eq!(coins[&CoinId(1)], amount("2.5"));
    }

    #[test]
    fn test_peek_does_not_register() {
        let interpreter = Interpreter::new();
        assert!(interpreter.peek(CAROL).is_empty());
        assert!(!interpreter.ledger().is_known(CAROL));
    }

    #[test]
    fn test_spend_with_change() {
        let mut interpreter = setup();
        let outcome = interpreter.spend(ALICE, &[CoinId(0)], BOB, "4").unwrap();

        assert_eq!(
            outcome,
            SpendOutcome::WithChange {
                change: CoinId(1),
                transferred: CoinId(2)
            }
        );
        let ledger = interpreter.ledger();
        assert!(!ledger.contains(CoinId(0)));
        assert_eq!(ledger.value_of(CoinId(1)), Some(amount("6")));
        assert_eq!(ledger.value_of(CoinId(2)), Some(amount("4")));
        assert_eq!(ledger.owner_of(CoinId(1)), Some(ALICE));
        assert_eq!(ledger.owner_of(CoinId(2)), Some(BOB));
        assert_eq!(ledger.check_invariants(), Ok(()));
    }

    #[test]
    fn test_spend_exact_amount() {
        let mut interpreter = setup();
        interpreter.mint(ALICE, "5").unwrap(); // coin 1

        let outcome = interpreter
            .spend(ALICE, &[CoinId(0), CoinId(1)], BOB, "15")
            .unwrap();

        assert_eq!(outcome, SpendOutcome::Exact { transferred: CoinId(2) });
        assert!(interpreter.peek(ALICE).is_empty());
        assert_eq!(interpreter.peek(BOB)[&CoinId(2)], amount("15"));
    }

    #[test]
    fn test_spend_highest_coin_does_not_reuse_id() {
        let mut interpreter = setup();
        interpreter.spend(ALICE, &[CoinId(0)], BOB, "10").unwrap();
        // Coin 0 is gone but id 0 must not come back
        assert_eq!(interpreter.ledger().next_id(), CoinId(2));
        assert_eq!(interpreter.mint(ALICE, "1").unwrap(), CoinId(2));
    }

    #[test]
    fn test_spend_insufficient_funds() {
        let mut interpreter = setup();
        let before = interpreter.ledger().clone();

        let result = interpreter.spend(ALICE, &[CoinId(0)], BOB, "10.000001");
        assert_eq!(
            result,
            Err(Rejection::InsufficientFunds {
                available: amount("10"),
                requested: amount("10.000001")
            })
        );
        assert_eq!(interpreter.ledger(), &before);
    }

    #[test]
    fn test_spend_self_transfer() {
        let mut interpreter = setup();
        let before = interpreter.ledger().clone();
        assert_eq!(
            interpreter.spend(ALICE, &[CoinId(0)], ALICE, "1"),
            Err(Rejection::SelfTransfer)
        );
        assert_eq!(interpreter.ledger(), &before);
    }

    #[test]
    fn test_spend_unknown_sender() {
        let mut interpreter = setup();
        assert_eq!(
            interpreter.spend(CAROL, &[CoinId(0)], BOB, "1"),
            Err(Rejection::UnknownSender)
        );
    }

    #[test]
    fn test_spend_empty_inputs() {
        let mut interpreter = setup();
        assert_eq!(
            interpreter.spend(ALICE, &[], BOB, "1"),
            Err(Rejection::EmptyInputs)
        );
    }

    #[test]
    fn test_spend_duplicate_input() {
        let mut interpreter = setup();
        // Listing coin 0 twice must not count its value twice
        assert_eq!(
            interpreter.spend(ALICE, &[CoinId(0), CoinId(0)], BOB, "15"),
            Err(Rejection::DuplicateInput(CoinId(0)))
        );
    }

    #[test]
    fn test_spend_unknown_and_unowned_coins() {
        let mut interpreter = setup();
        interpreter.mint(BOB, "3").unwrap(); // coin 1, Bob's

        assert_eq!(
            interpreter.spend(ALICE, &[CoinId(0), CoinId(9)], BOB, "1"),
            Err(Rejection::UnknownCoin(CoinId(9)))
        );
        assert_eq!(
            interpreter.spend(ALICE, &[CoinId(0), CoinId(1)], BOB, "1"),
            Err(Rejection::NotOwned(CoinId(1)))
        );
    }

    #[test]
    fn test_double_spend_rejected() {
        let mut interpreter = setup();
        interpreter.spend(ALICE, &[CoinId(0)], BOB, "4").unwrap();
        assert_eq!(
            interpreter.spend(ALICE, &[CoinId(0)], BOB, "4"),
            Err(Rejection::UnknownCoin(CoinId(0)))
        );
    }

    #[test]
    fn test_spend_unknown_receiver() {
        let mut interpreter = setup();
        assert_eq!(
            interpreter.spend(ALICE, &[CoinId(0)], CAROL, "1"),
            Err(Rejection::UnknownReceiver(CAROL))
        );
    }

    #[test]
    fn test_spend_invalid_amount() {
        let mut interpreter = setup();
        assert!(matches!(
            interpreter.spend(ALICE, &[CoinId(0)], BOB, "-4"),
            Err(Rejection::InvalidValue(_))
        ));
    }

    #[test]
    fn test_apply_dispatches_commands() {
        let mut interpreter = Interpreter::new();
        assert_eq!(
            interpreter.apply(BOB, Command::Query),
            Response::Coins(BTreeMap::new())
        );
        assert_eq!(
            interpreter.apply(ALICE, Command::mint(amount("10"))),
            Response::Minted(CoinId(0))
        );
        assert_eq!(
            interpreter.apply(ALICE, Command::spend(vec![CoinId(0)], BOB, amount("10"))),
            Response::Spent(SpendOutcome::Exact { transferred: CoinId(1) })
        );
        assert_eq!(
            interpreter.apply(ALICE, Command::spend(vec![CoinId(0)], BOB, amount("1"))),
            Response::Rejected(Rejection::UnknownCoin(CoinId(0)))
        );
    }

    #[test]
    fn test_apply_read_only_refuses_mutations() {
        let interpreter = setup();
        assert_eq!(
            interpreter.apply_read_only(ALICE, &Command::mint(amount("1"))),
            Response::Rejected(Rejection::OrderedOnly)
        );
        let coins = match interpreter.apply_read_only(ALICE, &Command::Query) {
            Response::Coins(coins) => coins,
            other => panic!("unexpected response: {other:?}"),
        };
        assert_eq!(coins[&CoinId(0)], amount("10"));
    }

    /// Alice owns one coin worth 10 and a single id is left to allocate.
    fn nearly_full() -> Interpreter {
        let last = MAX_MARK.0 - 1;
        let coins = BTreeMap::from([(CoinId(last - 1), amount("10"))]);
        let owners = BTreeMap::from([
            (ALICE, BTreeSet::from([CoinId(last - 1)])),
            (BOB, BTreeSet::new()),
        ]);
        let ledger = Ledger::from_parts(coins, owners, CoinId(last));
        assert_eq!(ledger.check_invariants(), Ok(()));
        Interpreter::with_ledger(ledger)
    }

    #[test]
    fn test_mint_stops_when_ids_run_out() {
        let mut interpreter = nearly_full();
        assert_eq!(interpreter.mint(ALICE, "1").unwrap(), CoinId(MAX_MARK.0 - 1));

        let before = interpreter.ledger().clone();
        assert_eq!(interpreter.mint(ALICE, "1"), Err(Rejection::IdsExhausted));
        assert_eq!(interpreter.mint(BOB, "1"), Err(Rejection::IdsExhausted));
        assert_eq!(interpreter.ledger(), &before);
        assert_eq!(interpreter.ledger().check_invariants(), Ok(()));
    }

    #[test]
    fn test_spend_needs_an_id_per_output() {
        let mut interpreter = nearly_full();
        let coin = CoinId(MAX_MARK.0 - 2);
        let before = interpreter.ledger().clone();

        // Change plus transfer needs two ids, only one is left
        assert_eq!(
            interpreter.spend(ALICE, &[coin], BOB, "4"),
            Err(Rejection::IdsExhausted)
        );
        assert_eq!(interpreter.ledger(), &before);

        let outcome = interpreter.spend(ALICE, &[coin], BOB, "10").unwrap();
        assert_eq!(
            outcome,
            SpendOutcome::Exact {
                transferred: CoinId(MAX_MARK.0 - 1)
            }
        );
        assert_eq!(interpreter.ledger().owner_of(outcome.transferred()), Some(BOB));
        assert_eq!(interpreter.ledger().check_invariants(), Ok(()));
    }
}

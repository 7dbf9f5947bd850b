//! Coin ownership and value state.

use replicoin_core::{Amount, Coin, CoinId, HolderId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A broken ledger invariant, reported by [`Ledger::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("holder {holder} owns coin {coin}, which does not exist")]
    DanglingOwnership { holder: HolderId, coin: CoinId },

    #[error("coin {coin} is owned by both {first} and {second}")]
    DoubleOwnership {
        coin: CoinId,
        first: HolderId,
        second: HolderId,
    },

    #[error("coin {coin} is not owned by any holder")]
    Unowned { coin: CoinId },

    #[error("coin {coin} is not below the allocation mark {next_id}")]
    AboveAllocationMark { coin: CoinId, next_id: CoinId },

    #[error("allocation mark {0} is past the last allocatable id")]
    MarkOutOfRange(CoinId),
}

/// Highest allocation mark a ledger may reach. Every allocated id is below
/// it, so the mark never sits at `u64::MAX` where it could not advance.
pub const MAX_MARK: CoinId = CoinId(u64::MAX - 1);

/// The replicated ledger: coin values plus the holder -> coins index.
///
/// The ledger is a plain state container. It does not validate commands;
/// callers must sequence the primitive operations so the invariants hold
/// after each command:
///
/// - every owned coin id exists in `coins`
/// - a coin id belongs to at most one holder
/// - every coin id is below `next_id`, which never decreases
/// - `next_id` never passes [`MAX_MARK`]
///
/// Both maps are ordered, so iteration (and therefore any serialization) is
/// independent of insertion history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    /// Coin id -> value.
    coins: BTreeMap<CoinId, Amount>,
    /// Holder id -> ids of the coins it currently owns.
    owners: BTreeMap<HolderId, BTreeSet<CoinId>>,
    /// One past the highest id ever allocated.
    next_id: CoinId,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from raw parts. The result is not validated; call
    /// [`Ledger::check_invariants`] before trusting it.
    pub(crate) fn from_parts(
        coins: BTreeMap<CoinId, Amount>,
        owners: BTreeMap<HolderId, BTreeSet<CoinId>>,
        next_id: CoinId,
    ) -> Self {
        Self {
            coins,
            owners,
            next_id,
        }
    }

    // =========================================================================
    // Coin Operations
    // =========================================================================

    /// The id the next allocation will use. Does not mutate.
    ///
    /// This is `max(allocated id) + 1`, or `0` on a fresh ledger. It depends
    /// only on replicated state, so every replica computes the same value.
    pub fn next_id(&self) -> CoinId {
        self.next_id
    }

    /// Whether `count` more ids can be allocated without the mark passing
    /// [`MAX_MARK`].
    pub fn can_allocate(&self, count: u64) -> bool {
        self.next_id
            .0
            .checked_add(count)
            .is_some_and(|mark| mark <= MAX_MARK.0)
    }

    /// Store a coin value, advancing the allocation mark past `id`.
    /// Returns the previous value if the id was already present.
    pub fn put(&mut self, id: CoinId, value: Amount) -> Option<Amount> {
        if id >= self.next_id {
            self.next_id = id.next().unwrap_or(id);
        }
        self.coins.insert(id, value)
    }

    /// Remove a coin, returning its value. The allocation mark is left alone
    /// so the id is never handed out again.
    pub fn remove(&mut self, id: CoinId) -> Option<Amount> {
        self.coins.remove(&id)
    }

    /// Value of a coin, if it exists.
    pub fn value_of(&self, id: CoinId) -> Option<Amount> {
        self.coins.get(&id).copied()
    }

    /// Check if a coin exists.
    pub fn contains(&self, id: CoinId) -> bool {
        self.coins.contains_key(&id)
    }

    /// All coins, ordered by id.
    pub fn coins(&self) -> &BTreeMap<CoinId, Amount> {
        &self.coins
    }

    /// Number of live coins.
    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// Sum of all live coin values, or `None` if it does not fit.
    pub fn total_supply(&self) -> Option<Amount> {
        Amount::checked_sum(self.coins.values().copied())
    }

    // =========================================================================
    // Ownership Operations
    // =========================================================================

    /// Coins owned by a holder, or `None` for a holder never seen.
    pub fn owned_by(&self, holder: HolderId) -> Option<&BTreeSet<CoinId>> {
        self.owners.get(&holder)
    }

    /// Check if a holder has an entry (possibly empty).
    pub fn is_known(&self, holder: HolderId) -> bool {
        self.owners.contains_key(&holder)
    }

    /// Create an empty entry for a holder. Returns true if the holder was new.
    pub fn register(&mut self, holder: HolderId) -> bool {
        if self.owners.contains_key(&holder) {
            return false;
        }
        self.owners.insert(holder, BTreeSet::new());
        true
    }

    /// Record that `holder` owns `id`, creating the holder entry if needed.
    pub fn add_ownership(&mut self, holder: HolderId, id: CoinId) -> bool {
        self.owners.entry(holder).or_default().insert(id)
    }

    /// Drop `id` from `holder`'s set. An emptied set stays in place.
    pub fn remove_ownership(&mut self, holder: HolderId, id: CoinId) -> bool {
        self.owners
            .get_mut(&holder)
            .map(|owned| owned.remove(&id))
            .unwrap_or(false)
    }

    /// All holders and their coin sets, ordered by holder id.
    pub fn holders(&self) -> &BTreeMap<HolderId, BTreeSet<CoinId>> {
        &self.owners
    }

    /// Find the owner of a coin. Linear in the number of holders.
    pub fn owner_of(&self, id: CoinId) -> Option<HolderId> {
        self.owners
            .iter()
            .find(|(_, owned)| owned.contains(&id))
            .map(|(holder, _)| *holder)
    }

    /// Full view of one coin.
    pub fn coin(&self, id: CoinId) -> Option<Coin> {
        let value = self.value_of(id)?;
        let owner = self.owner_of(id)?;
        Some(Coin::new(id, value, owner))
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Verify the structural invariants of the ledger.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut owner_of: BTreeMap<CoinId, HolderId> = BTreeMap::new();

        for (holder, owned) in &self.owners {
            for coin in owned {
                if !self.coins.contains_key(coin) {
                    return Err(InvariantViolation::DanglingOwnership {
                        holder: *holder,
                        coin: *coin,
                    });
                }
                if let Some(first) = owner_of.insert(*coin, *holder) {
                    return Err(InvariantViolation::DoubleOwnership {
                        coin: *coin,
                        first,
                        second: *holder,
                    });
                }
            }
        }

        for coin in self.coins.keys() {
            if !owner_of.contains_key(coin) {
                return Err(InvariantViolation::Unowned { coin: *coin });
            }
        }

        if self.next_id > MAX_MARK {
            return Err(InvariantViolation::MarkOutOfRange(self.next_id));
        }

        if let Some((&highest, _)) = self.coins.last_key_value() {
            if highest >= self.next_id {
                return Err(InvariantViolation::AboveAllocationMark {
                    coin: highest,
                    next_id: self.next_id,
                });
            }
        }

        Ok(())
    }
}

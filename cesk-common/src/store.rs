//! # Persistent Store
//!
//! A finite map from opaque, totally ordered [`Address`]es to values. The store is
//! what makes `set!` observable: environments map names to addresses, and only the
//! store maps addresses to values.
//!
//! ## Functional Semantics
//!
//! Every allocation or update returns a **new** `Store`; the original is never
//! modified. Cells live in an `im::OrdMap`, so a new version shares all unchanged
//! cells with the old one and entries are always kept in address order.
//!
//! Addresses are issued from a monotonically increasing counter, so the domain of
//! a store never contains duplicates.
//!
//! ## Hidden Entries
//!
//! Cells allocated with the `*_hidden` variants behave exactly like ordinary cells
//! except that the `Display` rendering of the store leaves them out. They are meant
//! for primitive bindings that would otherwise clutter every printout.
//!
//! ## Example
//!
//! ```
//! use cesk_common::store::Store;
//!
//! let (store, addrs) = Store::new().alloc_lots(["a", "b"]);
//! assert_eq!(store.deref(addrs[0]), Ok(&"a"));
//!
//! // Updates produce a new store; the old one still sees the old value.
//! let updated = store.update(addrs[1], "z").unwrap();
//! assert_eq!(store.deref(addrs[1]), Ok(&"b"));
//! assert_eq!(updated.deref(addrs[1]), Ok(&"z"));
//! ```

use std::fmt;

use im::OrdMap;

use crate::equal::{equal, Equal};
use crate::error::StoreError;
use crate::list::{pair, Pair};

/// An opaque handle naming one storage cell.
///
/// Addresses are only ever created by [`Store`] allocation. They are `Copy`,
/// totally ordered by issue order, and render as `Addr(n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
    /// Returns the raw index of this address.
    ///
    /// Useful for debugging; the machine never does arithmetic on addresses.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    fn succ(self) -> Self {
        Address(self.0 + 1)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Addr({})", self.0)
    }
}

impl Equal for Address {
    fn equal(&self, other: &Self) -> bool {
        self == other
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    hidden: bool,
}

/// A persistent map from [`Address`] to `V`.
#[derive(Debug, Clone)]
pub struct Store<V> {
    next: Address,
    entries: OrdMap<Address, Entry<V>>,
}

impl<V: Clone> Default for Store<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Store<V> {
    /// Creates an empty store whose first allocation is `Addr(0)`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: Address(0),
            entries: OrdMap::new(),
        }
    }

    /// Creates a store holding `values` as hidden cells, in order, from `Addr(0)` up.
    ///
    /// # Example
    /// ```
    /// use cesk_common::store::Store;
    /// let (store, addrs) = Store::base([10, 20]);
    /// assert_eq!(addrs[1].index(), 1);
    /// assert_eq!(store.deref(addrs[1]), Ok(&20));
    /// assert!(!store.to_string().contains("20"));
    /// ```
    #[must_use]
    pub fn base(values: impl IntoIterator<Item = V>) -> Pair<Self, Vec<Address>> {
        Self::new().alloc_lots_hidden(values)
    }

    /// Allocates a fresh cell holding `value`.
    ///
    /// Returns the new store together with the address it issued.
    #[must_use]
    pub fn alloc(&self, value: V) -> Pair<Self, Address> {
        self.alloc_entry(value, false)
    }

    /// Like [`alloc`](Self::alloc), but the cell is hidden from `Display`.
    #[must_use]
    pub fn alloc_hidden(&self, value: V) -> Pair<Self, Address> {
        self.alloc_entry(value, true)
    }

    fn alloc_entry(&self, value: V, hidden: bool) -> Pair<Self, Address> {
        let address = self.next;
        let store = Self {
            next: address.succ(),
            entries: self.entries.update(address, Entry { value, hidden }),
        };
        pair(store, address)
    }

    /// Allocates one cell per value.
    ///
    /// Addresses are issued in the same order as the input sequence.
    ///
    /// # Example
    /// ```
    /// use cesk_common::store::Store;
    /// let (store, addrs) = Store::new().alloc_lots(vec![1, 2, 3]);
    /// assert!(addrs.windows(2).all(|w| w[0] < w[1]));
    /// assert_eq!(store.len(), 3);
    /// ```
    #[must_use]
    pub fn alloc_lots(&self, values: impl IntoIterator<Item = V>) -> Pair<Self, Vec<Address>> {
        self.alloc_lots_entries(values, false)
    }

    /// Like [`alloc_lots`](Self::alloc_lots), but every cell is hidden.
    #[must_use]
    pub fn alloc_lots_hidden(
        &self,
        values: impl IntoIterator<Item = V>,
    ) -> Pair<Self, Vec<Address>> {
        self.alloc_lots_entries(values, true)
    }

    fn alloc_lots_entries(
        &self,
        values: impl IntoIterator<Item = V>,
        hidden: bool,
    ) -> Pair<Self, Vec<Address>> {
        let mut next = self.next;
        let mut entries = self.entries.clone();
        let mut addresses = Vec::new();
        for value in values {
            entries.insert(next, Entry { value, hidden });
            addresses.push(next);
            next = next.succ();
        }
        pair(Self { next, entries }, addresses)
    }

    /// Returns true if `address` names a cell in this store.
    #[must_use]
    pub fn allocated(&self, address: Address) -> bool {
        self.entries.contains_key(&address)
    }

    /// Returns the value held at `address`.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnboundAddress`] if the address is not allocated here.
    pub fn deref(&self, address: Address) -> Result<&V, StoreError> {
        self.entries
            .get(&address)
            .map(|entry| &entry.value)
            .ok_or(StoreError::UnboundAddress { address })
    }

    /// Returns a new store in which `address` holds `value`.
    ///
    /// The hidden flag of the cell is preserved; every other cell is unchanged.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnboundAddress`] if the address is not allocated here. It is a
    /// contract violation to update with an address from a different store lineage.
    pub fn update(&self, address: Address, value: V) -> Result<Self, StoreError> {
        let hidden = self
            .entries
            .get(&address)
            .map(|entry| entry.hidden)
            .ok_or(StoreError::UnboundAddress { address })?;
        Ok(Self {
            next: self.next,
            entries: self.entries.update(address, Entry { value, hidden }),
        })
    }

    /// Returns the address the next allocation will issue.
    #[must_use]
    pub fn next_address(&self) -> Address {
        self.next
    }

    /// Returns the number of allocated cells, hidden ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no cell has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(address, value, hidden)` in address order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, &V, bool)> {
        self.entries
            .iter()
            .map(|(address, entry)| (*address, &entry.value, entry.hidden))
    }
}

impl<V: Clone + Equal> Equal for Store<V> {
    // Entries are kept sorted by address, so walking both maps in order is the
    // canonical comparison.
    fn equal(&self, other: &Self) -> bool {
        self.next == other.next
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((a1, e1), (a2, e2))| {
                    a1 == a2 && e1.hidden == e2.hidden && equal(&e1.value, &e2.value)
                })
    }
}

impl<V: Clone + fmt::Display> fmt::Display for Store<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Store:")?;
        writeln!(f, "  nextAddr: {}", self.next)?;
        writeln!(f, "  entries:")?;
        for (address, value, hidden) in self.iter() {
            if !hidden {
                writeln!(f, "    {address}: {value}")?;
            }
        }
        Ok(())
    }
}

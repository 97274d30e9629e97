//! # Persistent Environments
//!
//! Functional environments mapping identifiers to store [`Address`]es (never
//! directly to values: the indirection through the store is what makes `set!`
//! and variable aliasing observable).
//!
//! ## Shadowing
//!
//! Bindings live in a persistent [`List`]. Extending an environment conses a new
//! binding onto the front and shares everything else, so several bindings for the
//! same identifier may coexist. Lookup returns the **leftmost** (most recently
//! added) one, which is exactly lexical shadowing for `let`, `letrec` and
//! procedure application without any destructive update.
//!
//! ## Binding Variables
//!
//! The free functions [`bind`] and [`bind_lots`] allocate fresh store cells and
//! extend the environment in one step. They are the only sanctioned way to
//! introduce a variable, so an environment and its store cannot drift apart.
//!
//! ## Example
//!
//! ```
//! use cesk_common::environment::{bind, Environment};
//! use cesk_common::store::Store;
//!
//! let env: Environment<String> = Environment::empty();
//! let (env, store) = bind(&env, &Store::new(), "x".to_string(), 10);
//! let (inner, store) = bind(&env, &store, "x".to_string(), 20);
//!
//! // The inner binding shadows the outer one.
//! assert_eq!(store.deref(inner.lookup(&"x".to_string()).unwrap()), Ok(&20));
//! assert_eq!(store.deref(env.lookup(&"x".to_string()).unwrap()), Ok(&10));
//! ```

use std::fmt;

use crate::equal::{equal, Equal};
use crate::error::EnvError;
use crate::list::{pair, List, Pair};
use crate::store::{Address, Store};

/// A persistent, immutable environment from identifiers `K` to addresses.
///
/// Identifier comparison uses the function supplied at construction time
/// ([`Environment::empty_with`]), or structural [`Equal`] by default.
pub struct Environment<K> {
    same: fn(&K, &K) -> bool,
    bindings: List<Pair<K, Address>>,
}

impl<K> Clone for Environment<K> {
    fn clone(&self) -> Self {
        Self {
            same: self.same,
            bindings: self.bindings.clone(),
        }
    }
}

impl<K: Equal> Default for Environment<K> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: Equal> Environment<K> {
    /// Creates an empty environment comparing identifiers with [`Equal`].
    #[must_use]
    pub fn empty() -> Self {
        Self::empty_with(<K as Equal>::equal)
    }
}

impl<K> Environment<K> {
    /// Creates an empty environment comparing identifiers with `same`.
    ///
    /// # Example
    /// ```
    /// use cesk_common::environment::Environment;
    /// use cesk_common::store::Store;
    ///
    /// fn same_ignoring_case(x: &String, y: &String) -> bool {
    ///     x.eq_ignore_ascii_case(y)
    /// }
    ///
    /// let (_, addr) = Store::new().alloc(1);
    /// let env = Environment::empty_with(same_ignoring_case).extend("Foo".to_string(), addr);
    /// assert_eq!(env.lookup(&"FOO".to_string()), Ok(addr));
    /// ```
    #[must_use]
    pub fn empty_with(same: fn(&K, &K) -> bool) -> Self {
        Self {
            same,
            bindings: List::empty(),
        }
    }

    /// Returns the address of the leftmost binding for `key`, if any.
    #[must_use]
    pub fn try_lookup(&self, key: &K) -> Option<Address> {
        self.bindings
            .iter()
            .find(|(k, _)| (self.same)(k, key))
            .map(|(_, address)| *address)
    }

    /// Returns true if `key` has at least one binding.
    #[must_use]
    pub fn is_bound(&self, key: &K) -> bool {
        self.try_lookup(key).is_some()
    }

    /// Returns a new environment in which `key` is bound to `address`.
    ///
    /// The new binding shadows any existing binding for `key`.
    #[must_use]
    pub fn extend(&self, key: K, address: Address) -> Self {
        Self {
            same: self.same,
            bindings: self.bindings.cons(pair(key, address)),
        }
    }

    /// Extends the environment with several bindings at once.
    ///
    /// If `pairs` repeats an identifier, the **leftmost** occurrence wins: the pairs
    /// are folded in right to left, so earlier pairs end up in front.
    ///
    /// # Example
    /// ```
    /// use cesk_common::environment::Environment;
    /// use cesk_common::store::Store;
    ///
    /// let (_, addrs) = Store::new().alloc_lots([15, 25, 64]);
    /// let env: Environment<char> = Environment::empty()
    ///     .extend_lots([('a', addrs[0]), ('b', addrs[1]), ('a', addrs[2])]);
    /// assert_eq!(env.lookup(&'a'), Ok(addrs[0]));
    /// ```
    #[must_use]
    pub fn extend_lots(&self, pairs: impl IntoIterator<Item = Pair<K, Address>>) -> Self {
        let pairs: Vec<_> = pairs.into_iter().collect();
        pairs
            .into_iter()
            .rev()
            .fold(self.clone(), |env, (key, address)| env.extend(key, address))
    }

    /// Returns the number of bindings, shadowed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if the environment has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over bindings from most to least recent.
    pub fn iter(&self) -> impl Iterator<Item = (&K, Address)> {
        self.bindings.iter().map(|(key, address)| (key, *address))
    }
}

impl<K: fmt::Display> Environment<K> {
    /// Returns the address of the leftmost binding for `key`.
    ///
    /// # Errors
    ///
    /// [`EnvError::UnboundIdentifier`] if no binding matches.
    pub fn lookup(&self, key: &K) -> Result<Address, EnvError> {
        self.try_lookup(key)
            .ok_or_else(|| EnvError::UnboundIdentifier {
                name: key.to_string(),
            })
    }
}

impl<K: Equal> Equal for Environment<K> {
    fn equal(&self, other: &Self) -> bool {
        self.bindings.ptr_eq(&other.bindings) || equal(&self.bindings, &other.bindings)
    }
}

impl<K: fmt::Debug> fmt::Debug for Environment<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.bindings.iter().map(|(k, a)| (k, a)))
            .finish()
    }
}

impl<K: fmt::Display> fmt::Display for Environment<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, (key, address)) in self.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key} -> {address}")?;
        }
        write!(f, "}}")
    }
}

/// Allocates a cell for `value` and binds `key` to it.
///
/// Returns the extended environment and the grown store together.
#[must_use]
pub fn bind<K, V: Clone>(
    env: &Environment<K>,
    store: &Store<V>,
    key: K,
    value: V,
) -> Pair<Environment<K>, Store<V>> {
    let (store, address) = store.alloc(value);
    pair(env.extend(key, address), store)
}

/// Allocates one cell per pair and binds each key to its cell.
///
/// As with [`Environment::extend_lots`], the leftmost occurrence of a repeated key
/// wins. Every value still gets its own cell.
///
/// # Example
/// ```
/// use cesk_common::environment::{bind_lots, Environment};
/// use cesk_common::store::Store;
///
/// let (env, store) = bind_lots(
///     &Environment::empty(),
///     &Store::new(),
///     [('x', 54), ('q', 25), ('x', 16)],
/// );
/// assert_eq!(store.deref(env.lookup(&'x').unwrap()), Ok(&54));
/// assert_eq!(store.len(), 3);
/// ```
#[must_use]
pub fn bind_lots<K, V: Clone>(
    env: &Environment<K>,
    store: &Store<V>,
    pairs: impl IntoIterator<Item = Pair<K, V>>,
) -> Pair<Environment<K>, Store<V>> {
    let (keys, values): (Vec<K>, Vec<V>) = pairs.into_iter().unzip();
    let (store, addresses) = store.alloc_lots(values);
    pair(env.extend_lots(keys.into_iter().zip(addresses)), store)
}

/// Like [`bind_lots`], but the cells are allocated hidden.
#[must_use]
pub fn bind_lots_hidden<K, V: Clone>(
    env: &Environment<K>,
    store: &Store<V>,
    pairs: impl IntoIterator<Item = Pair<K, V>>,
) -> Pair<Environment<K>, Store<V>> {
    let (keys, values): (Vec<K>, Vec<V>) = pairs.into_iter().unzip();
    let (store, addresses) = store.alloc_lots_hidden(values);
    pair(env.extend_lots(keys.into_iter().zip(addresses)), store)
}

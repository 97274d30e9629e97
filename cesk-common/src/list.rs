//! # Persistent Lists
//!
//! An immutable singly linked list with structural sharing: `cons` allocates one
//! node and shares the whole tail. This is the backing sequence for environments,
//! continuation frames and the sub-expression lists of the syntax tree.
//!
//! ## Scheme Correspondence
//!
//! | Scheme          | Rust                      |
//! |-----------------|---------------------------|
//! | `'()`           | [`List::empty`]           |
//! | `(cons x xs)`   | [`cons`] / [`List::cons`] |
//! | `(car xs)`      | [`List::head`]            |
//! | `(cdr xs)`      | [`List::tail`]            |
//! | `(null? xs)`    | [`List::is_empty`]        |
//!
//! ## Example
//!
//! ```
//! use cesk_common::list::{cons, List};
//!
//! // Scheme: (cons 1 (cons 2 (cons 3 '())))
//! let lst = cons(1, cons(2, cons(3, List::empty())));
//!
//! assert_eq!(lst.head(), Some(&1));
//! assert_eq!(lst.tail().to_vec(), vec![2, 3]);
//! assert_eq!(lst.to_string(), "(1, 2, 3)");
//!
//! // The tail is shared, not copied.
//! let longer = lst.cons(0);
//! assert_eq!(longer.len(), 4);
//! assert_eq!(lst.len(), 3);
//! ```

use std::fmt;
use std::rc::Rc;

use crate::equal::{equal, Equal};

/// A pair `(first, second)`.
///
/// In Scheme, `(cons a b)` creates a pair. Operations that return two results
/// (a new store and the address it allocated, say) use tuples directly.
pub type Pair<A, B> = (A, B);

/// Creates a pair.
///
/// # Example
/// ```
/// use cesk_common::list::pair;
/// assert_eq!(pair(1, "one"), (1, "one"));
/// ```
#[inline]
pub fn pair<A, B>(first: A, second: B) -> Pair<A, B> {
    (first, second)
}

struct Node<T> {
    value: T,
    tail: List<T>,
}

/// An immutable, structurally shared singly linked list.
pub struct List<T> {
    head: Option<Rc<Node<T>>>,
}

/// Prepends `head` to `tail`.
///
/// # Scheme equivalent
/// ```scheme
/// (cons 1 '(2 3)) => (1 2 3)
/// ```
#[inline]
pub fn cons<T>(head: T, tail: List<T>) -> List<T> {
    List {
        head: Some(Rc::new(Node { value: head, tail })),
    }
}

impl<T> List<T> {
    /// The empty list.
    #[must_use]
    pub const fn empty() -> Self {
        Self { head: None }
    }

    /// Returns a new list with `value` in front of `self`; `self` is shared.
    #[must_use]
    pub fn cons(&self, value: T) -> Self {
        cons(value, self.clone())
    }

    /// Returns true if the list has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns the first element (car), or `None` for the empty list.
    #[must_use]
    pub fn head(&self) -> Option<&T> {
        self.head.as_deref().map(|node| &node.value)
    }

    /// Returns everything after the first element (cdr).
    ///
    /// The tail of the empty list is the empty list.
    #[must_use]
    pub fn tail(&self) -> Self {
        match &self.head {
            Some(node) => node.tail.clone(),
            None => Self::empty(),
        }
    }

    /// Splits the list into its first element and the (shared) rest.
    ///
    /// # Example
    /// ```
    /// use cesk_common::list::List;
    /// let lst: List<i32> = vec![1, 2].into();
    /// let (first, rest) = lst.split_first().unwrap();
    /// assert_eq!(*first, 1);
    /// assert_eq!(rest.to_vec(), vec![2]);
    /// ```
    #[must_use]
    pub fn split_first(&self) -> Option<(&T, Self)> {
        self.head
            .as_deref()
            .map(|node| (&node.value, node.tail.clone()))
    }

    /// Returns the number of elements. Walks the whole list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns an iterator over references to the elements, front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Maps a function over the list, preserving order.
    ///
    /// # Example
    /// ```
    /// use cesk_common::list::List;
    /// let lst: List<i32> = vec![1, 2, 3].into();
    /// assert_eq!(lst.map(|x| x + 1).to_vec(), vec![2, 3, 4]);
    /// ```
    #[must_use]
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> List<U> {
        self.iter().map(f).collect()
    }

    /// Detaches the elements of the uniquely owned prefix, front to back.
    ///
    /// Nodes still shared with another list stay where they are, and `self` is left
    /// holding that shared remainder.
    ///
    /// # Example
    /// ```
    /// use cesk_common::list::List;
    /// let shared: List<i32> = vec![3, 4].into();
    /// let mut lst = shared.cons(2).cons(1);
    /// assert_eq!(lst.take_unique(), vec![1, 2]);
    /// assert!(lst.ptr_eq(&shared));
    /// ```
    pub fn take_unique(&mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(node) = self.head.take() {
            match Rc::try_unwrap(node) {
                Ok(Node { value, tail }) => {
                    items.push(value);
                    *self = tail;
                }
                Err(node) => {
                    self.head = Some(node);
                    break;
                }
            }
        }
        items
    }

    /// Returns true if both lists share the same first node (or are both empty).
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (Some(x), Some(y)) => Rc::ptr_eq(x, y),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Clone> List<T> {
    /// Copies the elements into a `Vec`, front to back.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Returns the list reversed.
    ///
    /// # Example
    /// ```
    /// use cesk_common::list::List;
    /// let lst: List<i32> = vec![1, 2, 3].into();
    /// assert_eq!(lst.reverse().to_vec(), vec![3, 2, 1]);
    /// ```
    #[must_use]
    pub fn reverse(&self) -> Self {
        self.iter()
            .fold(Self::empty(), |acc, value| cons(value.clone(), acc))
    }
}

impl<T> Clone for List<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::empty()
    }
}

// Unlink iteratively so that dropping a long list cannot exhaust the host stack.
impl<T> Drop for List<T> {
    fn drop(&mut self) {
        let mut link = self.head.take();
        while let Some(node) = link {
            match Rc::try_unwrap(node) {
                Ok(mut node) => link = node.tail.head.take(),
                Err(_) => break,
            }
        }
    }
}

/// Borrowing iterator over a [`List`].
pub struct Iter<'a, T> {
    next: Option<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|node| {
            self.next = node.tail.head.as_deref();
            &node.value
        })
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Self::empty(), |acc, value| cons(value, acc))
    }
}

impl<T> From<Vec<T>> for List<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Equal> Equal for List<T> {
    fn equal(&self, other: &Self) -> bool {
        let mut lhs = self.iter();
        let mut rhs = other.iter();
        loop {
            match (lhs.next(), rhs.next()) {
                (Some(x), Some(y)) if equal(x, y) => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl<T: PartialEq> PartialEq for List<T> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, value) in self.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

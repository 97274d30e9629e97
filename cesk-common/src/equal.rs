//! # Structural Equality
//!
//! A single equivalence relation shared by every persistent structure in the
//! machine, similar in spirit to Scheme's `equal?`.
//!
//! ## Rules
//!
//! Two values `x` and `y` are equal when:
//!
//! - they are the very same object (reference identity short-circuits), or
//! - they are sequences of the same length whose elements are pairwise equal, or
//! - they are both NaN (deliberately non-IEEE), or
//! - their type's [`Equal`] implementation says so.
//!
//! `PartialEq` for floats is not reflexive, which breaks comparisons of stores and
//! environments that happen to contain NaN. [`Equal`] is a true equivalence relation
//! over every value the machine can produce.
//!
//! ## Example
//!
//! ```
//! use cesk_common::equal::equal;
//!
//! assert!(equal(&f64::NAN, &f64::NAN));
//! assert!(!equal(&3.0, &f64::NAN));
//! assert!(equal(&vec![vec![1, 2], vec![3]], &vec![vec![1, 2], vec![3]]));
//! assert!(!equal(&vec![1, 2, 3], &vec![1, 2, 3, 4]));
//! ```

use std::rc::Rc;

/// Structural equality hook.
///
/// Types opt in by implementing `equal`; composite types delegate to the
/// `Equal` implementations of their parts.
pub trait Equal {
    /// Returns `true` if `self` and `other` are structurally equal.
    fn equal(&self, other: &Self) -> bool;
}

/// Compares two values with a reference-identity short-circuit.
///
/// # Example
/// ```
/// use cesk_common::equal::equal;
/// let xs = vec![1.0, f64::NAN];
/// assert!(equal(&xs, &xs));
/// assert!(equal(&xs, &vec![1.0, f64::NAN]));
/// ```
#[inline]
pub fn equal<T: Equal + ?Sized>(lhs: &T, rhs: &T) -> bool {
    std::ptr::eq(lhs, rhs) || lhs.equal(rhs)
}

macro_rules! equal_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Equal for $ty {
                #[inline]
                fn equal(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

equal_by_eq!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    str,
    String,
);

impl Equal for f64 {
    #[inline]
    fn equal(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }
}

impl Equal for f32 {
    #[inline]
    fn equal(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }
}

impl<T: Equal> Equal for [T] {
    fn equal(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(x, y)| equal(x, y))
    }
}

impl<T: Equal> Equal for Vec<T> {
    #[inline]
    fn equal(&self, other: &Self) -> bool {
        self.as_slice().equal(other.as_slice())
    }
}

impl<T: Equal> Equal for Option<T> {
    fn equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(x), Some(y)) => equal(x, y),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Equal + ?Sized> Equal for Box<T> {
    #[inline]
    fn equal(&self, other: &Self) -> bool {
        equal(&**self, &**other)
    }
}

impl<T: Equal + ?Sized> Equal for Rc<T> {
    #[inline]
    fn equal(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).equal(other)
    }
}

impl<T: Equal + ?Sized> Equal for &T {
    #[inline]
    fn equal(&self, other: &Self) -> bool {
        equal(*self, *other)
    }
}

impl<A: Equal, B: Equal> Equal for (A, B) {
    fn equal(&self, other: &Self) -> bool {
        equal(&self.0, &other.0) && equal(&self.1, &other.1)
    }
}

impl<A: Equal, B: Equal, C: Equal> Equal for (A, B, C) {
    fn equal(&self, other: &Self) -> bool {
        equal(&self.0, &other.0) && equal(&self.1, &other.1) && equal(&self.2, &other.2)
    }
}

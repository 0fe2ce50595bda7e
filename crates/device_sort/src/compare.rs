/// Strict-weak-ordering "less than" over keys.
///
/// Called from many groups at once, so it must be pure. Any
/// `Fn(&K, &K) -> bool` closure that is `Clone + Send + Sync` qualifies.
pub trait BinaryPredicate<K>: Clone + Send + Sync + 'static {
    fn less(&self, a: &K, b: &K) -> bool;
}

impl<K, F> BinaryPredicate<K> for F
where
    F: Fn(&K, &K) -> bool + Clone + Send + Sync + 'static,
{
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}

/// Ascending order; the default predicate.
#[derive(Clone, Copy, Debug, Default)]
pub struct Less;

impl<K: PartialOrd> BinaryPredicate<K> for Less {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

/// Descending order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Greater;

impl<K: PartialOrd> BinaryPredicate<K> for Greater {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a > b
    }
}

use crate::types::FloatElement;

/// Applies `f` to every element of `src`.
pub(crate) fn map<T: Copy, U>(src: &[T], f: impl Fn(T) -> U) -> Vec<U> {
    src.iter().map(|&v| f(v)).collect()
}

/// Applies `f` pairwise. Both slices must have the same length.
pub(crate) fn zip_map<T: Copy, U>(a: &[T], b: &[T], f: impl Fn(T, T) -> U) -> Vec<U> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect()
}

/// Sequential left-to-right sum.
pub(crate) fn sum<T: FloatElement>(src: &[T]) -> T {
    src.iter().fold(T::zero(), |acc, &v| acc + v)
}

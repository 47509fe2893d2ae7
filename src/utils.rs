use ndarray::{Array, Dimension};

/// Easy access to the first element of a non-empty slice.
pub trait Front<T> {
    fn front(&self) -> &T;
}

/// Easy access to the last element of a non-empty slice.
pub trait Back<T> {
    fn back(&self) -> &T;
}

impl<T> Front<T> for [T] {
    #[inline(always)]
    fn front(&self) -> &T {
        &self[0]
    }
}

impl<T> Back<T> for [T] {
    #[inline(always)]
    fn back(&self) -> &T {
        &self[self.len() - 1]
    }
}

/// A trait to replace all elements in a container with zeros.
pub trait ZeroOut {
    fn zero_out(&mut self);
}

impl<D: Dimension> ZeroOut for Array<f64, D> {
    fn zero_out(&mut self) {
        self.fill(0.0);
    }
}

use crate::traits::Scalar;
use serde::{Deserialize, Serialize};

/// One particle's point in phase space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State<T = f64> {
    pub position: T,
    pub velocity: T,
}

impl<T: Scalar> State<T> {
    pub fn new(position: T, velocity: T) -> Self {
        Self { position, velocity }
    }

    pub fn zero() -> Self {
        Self::new(T::zero(), T::zero())
    }

    pub fn to_array(self) -> [T; 2] {
        [self.position, self.velocity]
    }

    pub fn from_array(values: [T; 2]) -> Self {
        Self::new(values[0], values[1])
    }

    /// Component-wise |self - other|.
    pub fn abs_diff(&self, other: &Self) -> Self {
        Self::new(
            (self.position - other.position).abs(),
            (self.velocity - other.velocity).abs(),
        )
    }

    /// Component-wise maximum. A NaN component on either side wins so that a
    /// diverged trajectory is never hidden behind a finite running maximum.
    pub fn max(&self, other: &Self) -> Self {
        Self::new(
            nan_max(self.position, other.position),
            nan_max(self.velocity, other.velocity),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

impl<T: Scalar> Default for State<T> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<T: Scalar> From<[T; 2]> for State<T> {
    fn from(values: [T; 2]) -> Self {
        Self::from_array(values)
    }
}

impl<T: Scalar> From<(T, T)> for State<T> {
    fn from((position, velocity): (T, T)) -> Self {
        Self::new(position, velocity)
    }
}

fn nan_max<T: Scalar>(a: T, b: T) -> T {
    if a.is_nan() || b.is_nan() {
        T::nan()
    } else if b > a {
        b
    } else {
        a
    }
}

//! Q16.16 fixed-point numbers for the simulation.
//!
//! Every operation on the canonical path is integer-only, so two peers fed the
//! same bit patterns produce the same bit patterns. Overflow saturates to
//! [`Fix16::MAX`] / [`Fix16::MIN`]; division by zero saturates toward the sign
//! of the dividend (zero counts as positive).

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

mod trig;

pub const FRACTIONAL_BITS: u32 = 16;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Fix16(i32);

impl Fix16 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1 << FRACTIONAL_BITS);
    pub const HALF: Self = Self(1 << (FRACTIONAL_BITS - 1));
    pub const MAX: Self = Self(i32::MAX);
    pub const MIN: Self = Self(i32::MIN);

    pub const PI: Self = Self(205_887);
    pub const HALF_PI: Self = Self(102_944);
    pub const QUARTER_PI: Self = Self(51_472);
    pub const TWO_PI: Self = Self(411_775);

    pub const INT_MAX: i32 = i16::MAX as i32;
    pub const INT_MIN: i32 = i16::MIN as i32;

    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Integers outside `INT_MIN..=INT_MAX` saturate.
    #[inline]
    pub const fn from_int(value: i32) -> Self {
        if value > Self::INT_MAX {
            Self::MAX
        } else if value < Self::INT_MIN {
            Self::MIN
        } else {
            Self(value << FRACTIONAL_BITS)
        }
    }

    /// Rounds toward negative infinity.
    #[inline]
    pub const fn to_int(self) -> i32 {
        self.0 >> FRACTIONAL_BITS
    }

    /// For configuration and display only; never feed the result back into
    /// simulation state.
    #[inline]
    pub fn from_f32(value: f32) -> Self {
        Self((value * Self::ONE.0 as f32).round() as i32)
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / Self::ONE.0 as f32
    }

    #[inline]
    fn saturate(wide: i64) -> Self {
        Self(wide.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    #[inline]
    pub const fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub const fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    #[inline]
    pub fn mul(self, rhs: Self) -> Self {
        let wide = (self.0 as i64) * (rhs.0 as i64);
        Self::saturate(wide >> FRACTIONAL_BITS)
    }

    #[inline]
    pub fn div(self, rhs: Self) -> Self {
        if rhs.0 == 0 {
            return if self.0 >= 0 { Self::MAX } else { Self::MIN };
        }
        let wide = (self.0 as i64) << FRACTIONAL_BITS;
        Self::saturate(wide / rhs.0 as i64)
    }

    /// Unlike `Ord::clamp` this never panics; with `lo > hi` the result is `hi`.
    #[inline]
    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        if self.0 < lo.0 {
            lo.min(hi)
        } else if self.0 > hi.0 {
            hi
        } else {
            self
        }
    }

    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Exact integer square root of the raw value; negative inputs yield zero.
    pub fn sqrt(self) -> Self {
        if self.0 <= 0 {
            return Self::ZERO;
        }
        let radicand = (self.0 as u64) << FRACTIONAL_BITS;
        Self(radicand.isqrt() as i32)
    }
}

impl Add for Fix16 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Fix16::add(self, rhs)
    }
}

impl AddAssign for Fix16 {
    fn add_assign(&mut self, rhs: Self) {
        *self = Fix16::add(*self, rhs);
    }
}

impl Sub for Fix16 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Fix16::sub(self, rhs)
    }
}

impl SubAssign for Fix16 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = Fix16::sub(*self, rhs);
    }
}

impl Mul for Fix16 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Fix16::mul(self, rhs)
    }
}

impl Div for Fix16 {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Fix16::div(self, rhs)
    }
}

impl Neg for Fix16 {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl fmt::Display for Fix16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_f32())
    }
}

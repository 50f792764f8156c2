//! Element types supported by the reference layout engine.

use core::fmt;

use half::{bf16, f16};
use serde::{Deserialize, Serialize};

/// Runtime tag for an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    F16,
    BF16,
    F32,
    F64,
    I32,
    I64,
    U8,
    U32,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::U8 => 1,
            DType::F16 | DType::BF16 => 2,
            DType::F32 | DType::I32 | DType::U32 => 4,
            DType::F64 | DType::I64 => 8,
        }
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F16 | DType::BF16 | DType::F32 | DType::F64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U32 => "u32",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Arithmetic needed by reductions, implemented for every [`DType`].
///
/// Integer arithmetic wraps on overflow. Half-precision floats accumulate in `f32`.
pub trait Element: Copy + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    fn zero() -> Self;
    fn one() -> Self;
    fn plus(self, other: Self) -> Self;
    fn times(self, other: Self) -> Self;

    /// Divides by an element count (used by `mean`).
    fn div_count(self, count: usize) -> Self;

    #[inline]
    fn is_nan(self) -> bool {
        false
    }

    /// Sums `values`. Floats use compensated (Kahan) summation.
    fn sum<I: Iterator<Item = Self>>(values: I) -> Self {
        values.fold(Self::zero(), Self::plus)
    }
}

macro_rules! kahan_sum {
    ($ty:ty, $values:expr) => {{
        let mut sum: $ty = 0.0;
        let mut compensation: $ty = 0.0;
        for value in $values {
            let y = value - compensation;
            let t = sum + y;
            // Compensation is meaningless once the sum leaves the finite range.
            compensation = if t.is_finite() { (t - sum) - y } else { 0.0 };
            sum = t;
        }
        sum
    }};
}

macro_rules! impl_float_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            #[inline]
            fn zero() -> Self {
                0.0
            }

            #[inline]
            fn one() -> Self {
                1.0
            }

            #[inline]
            fn plus(self, other: Self) -> Self {
                self + other
            }

            #[inline]
            fn times(self, other: Self) -> Self {
                self * other
            }

            #[inline]
            fn div_count(self, count: usize) -> Self {
                self / count as $ty
            }

            #[inline]
            fn is_nan(self) -> bool {
                <$ty>::is_nan(self)
            }

            fn sum<I: Iterator<Item = Self>>(values: I) -> Self {
                kahan_sum!($ty, values)
            }
        }
    };
}

macro_rules! impl_half_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            #[inline]
            fn zero() -> Self {
                <$ty>::ZERO
            }

            #[inline]
            fn one() -> Self {
                <$ty>::ONE
            }

            #[inline]
            fn plus(self, other: Self) -> Self {
                <$ty>::from_f32(self.to_f32() + other.to_f32())
            }

            #[inline]
            fn times(self, other: Self) -> Self {
                <$ty>::from_f32(self.to_f32() * other.to_f32())
            }

            #[inline]
            fn div_count(self, count: usize) -> Self {
                <$ty>::from_f32(self.to_f32() / count as f32)
            }

            #[inline]
            fn is_nan(self) -> bool {
                <$ty>::is_nan(self)
            }

            fn sum<I: Iterator<Item = Self>>(values: I) -> Self {
                <$ty>::from_f32(kahan_sum!(f32, values.map(|v| v.to_f32())))
            }
        }
    };
}

macro_rules! impl_int_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            #[inline]
            fn zero() -> Self {
                0
            }

            #[inline]
            fn one() -> Self {
                1
            }

            #[inline]
            fn plus(self, other: Self) -> Self {
                self.wrapping_add(other)
            }

            #[inline]
            fn times(self, other: Self) -> Self {
                self.wrapping_mul(other)
            }

            #[inline]
            fn div_count(self, count: usize) -> Self {
                // Quotient magnitude never exceeds `self`, so the cast back is lossless.
                (self as i128 / count as i128) as $ty
            }
        }
    };
}

impl_float_element!(f32, F32);
impl_float_element!(f64, F64);
impl_half_element!(f16, F16);
impl_half_element!(bf16, BF16);
impl_int_element!(i32, I32);
impl_int_element!(i64, I64);
impl_int_element!(u8, U8);
impl_int_element!(u32, U32);

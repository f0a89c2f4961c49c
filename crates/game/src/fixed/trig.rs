use super::Fix16;

// Horner coefficients for sin(x) = x(1 - x²/6(1 - x²/20(1 - x²/42))).
const INV_6: Fix16 = Fix16::from_bits(10_923);
const INV_20: Fix16 = Fix16::from_bits(3_277);
const INV_42: Fix16 = Fix16::from_bits(1_560);

// Octant approximation: atan ≈ π/4 - 0.9817r + 0.1963r³.
const ATAN_CUBIC: Fix16 = Fix16::from_bits(0x3240);
const ATAN_LINEAR: Fix16 = Fix16::from_bits(0xFB50);
const THREE_QUARTER_PI: Fix16 = Fix16::from_bits(154_415);

/// Wraps an angle into [-π, π].
fn reduce(angle: Fix16) -> Fix16 {
    let two_pi = Fix16::TWO_PI.to_bits();
    let pi = Fix16::PI.to_bits();
    let mut raw = angle.to_bits() % two_pi;
    if raw > pi {
        raw -= two_pi;
    } else if raw < -pi {
        raw += two_pi;
    }
    Fix16::from_bits(raw)
}

impl Fix16 {
    pub fn sin(self) -> Self {
        let mut x = reduce(self);
        if x > Self::HALF_PI {
            x = Self::PI - x;
        } else if x < -Self::HALF_PI {
            x = -Self::PI - x;
        }

        let x2 = x * x;
        let mut series = Self::ONE - x2 * INV_42;
        series = Self::ONE - x2 * INV_20 * series;
        series = Self::ONE - x2 * INV_6 * series;
        x * series
    }

    pub fn cos(self) -> Self {
        (reduce(self) + Self::HALF_PI).sin()
    }

    /// Saturates near the asymptotes.
    pub fn tan(self) -> Self {
        self.sin() / self.cos()
    }

    pub fn atan2(y: Self, x: Self) -> Self {
        if x == Self::ZERO && y == Self::ZERO {
            return Self::ZERO;
        }

        let abs_y = y.abs();
        let angle = if x >= Self::ZERO {
            let r = (x - abs_y) / (x + abs_y);
            ATAN_CUBIC * r * r * r - ATAN_LINEAR * r + Self::QUARTER_PI
        } else {
            let r = (x + abs_y) / (abs_y - x);
            ATAN_CUBIC * r * r * r - ATAN_LINEAR * r + THREE_QUARTER_PI
        };

        if y.is_negative() { -angle } else { angle }
    }

    pub fn atan(self) -> Self {
        Self::atan2(self, Self::ONE)
    }

    /// Inputs outside [-1, 1] are clamped into the domain.
    pub fn asin(self) -> Self {
        let x = self.clamp(-Self::ONE, Self::ONE);
        let cos = (Self::ONE - x * x).sqrt();
        Self::atan2(x, cos)
    }

    pub fn acos(self) -> Self {
        Self::HALF_PI - self.asin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 0.01;

    fn close(actual: Fix16, expected: f32) -> bool {
        (actual.to_f32() - expected).abs() < TOLERANCE
    }

    #[test]
    fn test_sin_and_cos_at_landmarks() {
        assert_eq!(Fix16::ZERO.sin(), Fix16::ZERO);
        assert!(close(Fix16::HALF_PI.sin(), 1.0));
        assert!(close(Fix16::PI.sin(), 0.0));
        assert!(close(Fix16::from_f32(-0.5236).sin(), -0.5));
        assert!(close(Fix16::ZERO.cos(), 1.0));
        assert!(close(Fix16::PI.cos(), -1.0));
    }

    #[test]
    fn test_sin_reduces_large_angles() {
        let angle = Fix16::from_int(100);
        assert!(close(angle.sin(), 100f32.sin()));
        assert!(close((-angle).cos(), 100f32.cos()));
    }

    #[test]
    fn test_tan_matches_ratio() {
        assert!(close(Fix16::QUARTER_PI.tan(), 1.0));
    }

    #[test]
    fn test_atan2_quadrants() {
        let one = Fix16::ONE;
        assert!(close(Fix16::atan2(Fix16::ZERO, one), 0.0));
        assert!(close(Fix16::atan2(one, one), std::f32::consts::FRAC_PI_4));
        assert!(close(Fix16::atan2(one, Fix16::ZERO), std::f32::consts::FRAC_PI_2));
        assert!(close(Fix16::atan2(Fix16::ZERO, -one), std::f32::consts::PI));
        assert!(close(Fix16::atan2(-one, -one), -3.0 * std::f32::consts::FRAC_PI_4));
        assert_eq!(Fix16::atan2(Fix16::ZERO, Fix16::ZERO), Fix16::ZERO);
    }

    #[test]
    fn test_inverse_functions() {
        assert!(close(Fix16::HALF.asin(), 0.5236));
        assert!(close(Fix16::ONE.asin(), std::f32::consts::FRAC_PI_2));
        assert!(close(Fix16::from_int(3).asin(), std::f32::consts::FRAC_PI_2));
        assert!(close(Fix16::HALF.acos(), 1.0472));
        assert!(close(Fix16::ONE.atan(), std::f32::consts::FRAC_PI_4));
    }

    #[test]
    fn test_identical_bits_give_identical_results() {
        let angle = Fix16::from_bits(123_457);
        assert_eq!(angle.sin().to_bits(), angle.sin().to_bits());
        assert_eq!(
            Fix16::atan2(angle, Fix16::ONE).to_bits(),
            Fix16::atan2(angle, Fix16::ONE).to_bits()
        );
    }
}

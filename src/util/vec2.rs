use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// 2D vector in world units (x right, y down)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const X: Vec2 = Vec2 { x: 1.0, y: 0.0 };
    pub const Y: Vec2 = Vec2 { x: 0.0, y: 1.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector for a mathematical angle (0 = +x, counter-clockwise in y-up terms)
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    /// Forward axis of a body with the given heading.
    ///
    /// Heading 0 faces up the screen (-y); positive headings turn clockwise.
    #[inline]
    pub fn heading(angle: f32) -> Self {
        Self {
            x: angle.sin(),
            y: -angle.cos(),
        }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Normalized vector, or `fallback` when the length is (near) zero
    pub fn normalize_or(&self, fallback: Vec2) -> Self {
        let len = self.length();
        if len > f32::EPSILON {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            fallback
        }
    }

    pub fn normalize_or_zero(&self) -> Self {
        self.normalize_or(Self::ZERO)
    }

    #[inline]
    pub fn dot(&self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z-component)
    #[inline]
    pub fn distance_to(&self, other: Vec2) -> f32 {
        (*self - other).length()
    }

    #[inline]
    pub fn distance_sq_to(&self, other: Vec2) -> f32 {
        (*self - other).length_sq()
    }

    /// Rotate by `angle` radians (same sense as [`Vec2::heading`])
    pub fn rotate(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Express `self` in a frame rotated by `angle` (inverse of [`Vec2::rotate`])
    pub fn unrotate(&self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos + self.y * sin,
            y: -self.x * sin + self.y * cos,
        }
    }

    /// Polar angle via atan2
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn clamp(&self, min: Vec2, max: Vec2) -> Self {
        Self {
            x: self.x.clamp(min.x, max.x),
            y: self.y.clamp(min.y, max.y),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn approx_eq(&self, other: Vec2, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

/// Wrap an angle into [-PI, PI]
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    angle.sin().atan2(angle.cos())
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Vec2> for f32 {
    type Output = Vec2;
    fn mul(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self * rhs.x, self * rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl MulAssign<f32> for Vec2 {
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_length() {
        let v = Vec2::new(3.0, 4.0);
        assert!(approx_eq(v.length(), 5.0));
        assert!(approx_eq(v.length_sq(), 25.0));
    }

    #[test]
    fn test_normalize_or_fallback() {
        let n = Vec2::new(3.0, 4.0).normalize_or(Vec2::X);
        assert!(approx_eq(n.x, 0.6));
        assert!(approx_eq(n.y, 0.8));

        assert_eq!(Vec2::ZERO.normalize_or(Vec2::Y), Vec2::Y);
        assert_eq!(Vec2::ZERO.normalize_or_zero(), Vec2::ZERO);
    }

    #[test]
    fn test_heading_faces_up_at_zero() {
        let f = Vec2::heading(0.0);
        assert!(f.approx_eq(Vec2::new(0.0, -1.0), EPSILON));

        // Quarter turn clockwise faces +x
        let f = Vec2::heading(FRAC_PI_2);
        assert!(f.approx_eq(Vec2::new(1.0, 0.0), EPSILON));
    }

    #[test]
    fn test_heading_matches_rotated_up_vector() {
        for angle in [0.3_f32, 1.7, -2.2, PI] {
            let rotated = Vec2::new(0.0, -1.0).rotate(angle);
            assert!(rotated.approx_eq(Vec2::heading(angle), 1e-4));
        }
    }

    #[test]
    fn test_rotate_unrotate_inverse() {
        let v = Vec2::new(12.0, -7.5);
        let back = v.rotate(0.83).unrotate(0.83);
        assert!(back.approx_eq(v, 1e-4));
    }

    #[test]
    fn test_dot() {
        assert!(approx_eq(Vec2::X.dot(Vec2::Y), 0.0));
        assert!(approx_eq(Vec2::new(1.0, 2.0).dot(Vec2::new(3.0, 4.0)), 11.0));
    }

    #[test]
    fn test_component_clamp() {
        let v = Vec2::new(-5.0, 50.0).clamp(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        assert_eq!(v, Vec2::new(0.0, 10.0));
    }

    #[test]
    fn test_operators() {
        let mut a = Vec2::new(1.0, 2.0);
        a += Vec2::new(3.0, 4.0);
        assert_eq!(a, Vec2::new(4.0, 6.0));
        a -= Vec2::new(1.0, 1.0);
        assert_eq!(a, Vec2::new(3.0, 5.0));
        a *= 2.0;
        assert_eq!(a, Vec2::new(6.0, 10.0));
        assert_eq!(-a, Vec2::new(-6.0, -10.0));
        assert_eq!(0.5 * a, Vec2::new(3.0, 5.0));
    }

    #[test]
    fn test_wrap_angle() {
        assert!(approx_eq(wrap_angle(3.0 * PI / 2.0), -FRAC_PI_2));
        assert!(approx_eq(wrap_angle(-3.0 * PI / 2.0), FRAC_PI_2));
        assert!(approx_eq(wrap_angle(0.25), 0.25));
    }

    #[test]
    fn test_serde_json_shape() {
        let v: Vec2 = serde_json::from_str(r#"{"x":1.5,"y":-2.0}"#).unwrap();
        assert_eq!(v, Vec2::new(1.5, -2.0));
    }
}

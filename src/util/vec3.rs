use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

/// 3D vector for positions and orientations
///
/// Left handed with y pointing upwards: 2D hosts only use x and z.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    /// Sentinel returned by position queries that have nothing to report
    /// (no zone, unknown group, no leader character)
    pub const INFINITE: Vec3 = Vec3 {
        x: f32::INFINITY,
        y: f32::INFINITY,
        z: f32::INFINITY,
    };

    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Unit vector in the xz plane pointing along `angle` (radians)
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: 0.0,
            z: angle.sin(),
        }
    }

    /// Heading in the xz plane in radians, the inverse of `from_angle`
    pub fn angle(&self) -> f32 {
        self.z.atan2(self.x)
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length_sq().sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            *self / len
        } else {
            Self::ZERO
        }
    }

    #[inline]
    pub fn dot(&self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: Vec3) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    #[inline]
    pub fn distance_to(&self, other: Vec3) -> f32 {
        (*self - other).length()
    }

    #[inline]
    pub fn distance_sq_to(&self, other: Vec3) -> f32 {
        (*self - other).length_sq()
    }

    pub fn lerp(&self, other: Vec3, t: f32) -> Self {
        *self + (other - *self) * t
    }

    /// Check whether any component is infinite (the "no position" sentinel)
    pub fn is_infinite(&self) -> bool {
        self.x.is_infinite() || self.y.is_infinite() || self.z.is_infinite()
    }

    /// Check if vector is approximately equal to another
    pub fn approx_eq(&self, other: Vec3, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.z - other.z).abs() < epsilon
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;
    fn div(self, rhs: f32) -> Self {
        Self {
            x: self.x / rhs,
            y: self.y / rhs,
            z: self.z / rhs,
        }
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl MulAssign<f32> for Vec3 {
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
        self.z *= rhs;
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_length() {
        let v = Vec3::new(2.0, 3.0, 6.0);
        assert!(approx_eq(v.length(), 7.0));
        assert!(approx_eq(v.length_sq(), 49.0));
    }

    #[test]
    fn test_angle_round_trip() {
        let v = Vec3::from_angle(std::f32::consts::FRAC_PI_2);
        assert!(v.approx_eq(Vec3::new(0.0, 0.0, 1.0), EPSILON));
        assert!(approx_eq(v.angle(), std::f32::consts::FRAC_PI_2));
        assert!(approx_eq(Vec3::new(-2.0, 5.0, 0.0).angle(), std::f32::consts::PI));
    }

    #[test]
    fn test_normalize_zero() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
    }

    #[test]
    fn test_cross() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_distance() {
        let a = Vec3::new(1.0, 1.0, 1.0);
        let b = Vec3::new(1.0, 4.0, 5.0);
        assert!(approx_eq(a.distance_to(b), 5.0));
    }

    #[test]
    fn test_infinite_sentinel() {
        assert!(Vec3::INFINITE.is_infinite());
        assert!(!Vec3::ZERO.is_infinite());
        // INFINITY == INFINITY, so the sentinel compares equal to itself
        assert_eq!(Vec3::INFINITE, Vec3::INFINITE);
    }

    #[test]
    fn test_mean_via_div() {
        let sum = Vec3::new(0.0, 0.0, 0.0) + Vec3::new(2.0, 0.0, 0.0) + Vec3::new(4.0, 0.0, 0.0);
        assert!((sum / 3.0).approx_eq(Vec3::new(2.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn test_assign_ops() {
        let mut a = Vec3::new(1.0, 2.0, 3.0);
        a += Vec3::ONE;
        a -= Vec3::new(0.0, 1.0, 0.0);
        a *= 2.0;
        assert_eq!(a, Vec3::new(4.0, 4.0, 8.0));
        assert_eq!(-a, Vec3::new(-4.0, -4.0, -8.0));
    }

    #[test]
    fn test_serde() {
        let v = Vec3::new(1.5, 2.5, -3.0);
        let encoded = serde_json::to_string(&v).unwrap();
        let decoded: Vec3 = serde_json::from_str(&encoded).unwrap();
        assert_eq!(v, decoded);
    }
}

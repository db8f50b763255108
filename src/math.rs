//! Small vector / quaternion helpers.
//!
//! Vectors are plain `[f32; 3]` arrays. Quaternions use [`Quat`], which stores
//! components as `[x, y, z, w]`; the wire format is scalar-first `[w, x, y, z]`
//! and every conversion goes through [`Quat::from_wxyz`] / [`Quat::to_wxyz`].

/// Magnitudes below this are treated as zero for directional indicators.
pub const VECTOR_EPSILON: f32 = 1e-6;

#[inline(always)]
pub fn add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline(always)]
pub fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline(always)]
pub fn scale(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline(always)]
pub fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0].mul_add(b[0], a[1].mul_add(b[1], a[2] * b[2]))
}

#[inline(always)]
pub fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline(always)]
pub fn length(a: [f32; 3]) -> f32 {
    dot(a, a).sqrt()
}

/// Unit vector and magnitude. `None` when the magnitude is below [`VECTOR_EPSILON`].
pub fn normalize(a: [f32; 3]) -> Option<([f32; 3], f32)> {
    let len = length(a);
    if !(len >= VECTOR_EPSILON) {
        return None;
    }
    let inv = 1.0 / len;
    Some((scale(a, inv), len))
}

#[inline(always)]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (b - a).mul_add(t, a)
}

/// Rotation quaternion, stored `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat(pub [f32; 4]);

impl Quat {
    pub const IDENTITY: Self = Self([0.0, 0.0, 0.0, 1.0]);

    /// From scalar-first wire order `[w, x, y, z]`. Degenerate input yields identity.
    pub fn from_wxyz(q: [f32; 4]) -> Self {
        Self([q[1], q[2], q[3], q[0]]).normalized()
    }

    /// Back to scalar-first wire order `[w, x, y, z]`.
    pub fn to_wxyz(self) -> [f32; 4] {
        let [x, y, z, w] = self.0;
        [w, x, y, z]
    }

    pub fn w(self) -> f32 {
        self.0[3]
    }

    pub fn normalized(self) -> Self {
        let [x, y, z, w] = self.0;
        let n = (x * x + y * y + z * z + w * w).sqrt();
        if !(n > VECTOR_EPSILON) || !n.is_finite() {
            return Self::IDENTITY;
        }
        let inv = 1.0 / n;
        Self([x * inv, y * inv, z * inv, w * inv])
    }

    /// Rotate a vector: v' = v + 2w(q × v) + 2 q × (q × v)
    pub fn rotate(self, v: [f32; 3]) -> [f32; 3] {
        let [x, y, z, w] = self.0;
        let q = [x, y, z];
        let t = scale(cross(q, v), 2.0);
        add(add(v, scale(t, w)), cross(q, t))
    }

    /// Roll / pitch / yaw in degrees (ZYX convention), for the inspector.
    pub fn to_euler_degrees(self) -> [f32; 3] {
        let [x, y, z, w] = self.0;
        let sinr = 2.0 * (w * x + y * z);
        let cosr = 1.0 - 2.0 * (x * x + y * y);
        let roll = sinr.atan2(cosr);

        let sinp = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
        let pitch = sinp.asin();

        let siny = 2.0 * (w * z + x * y);
        let cosy = 1.0 - 2.0 * (y * y + z * z);
        let yaw = siny.atan2(cosy);

        [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()]
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position + orientation of one body in one batch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: [f32; 3],
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: [0.0; 3],
        orientation: Quat::IDENTITY,
    };

    /// From the 7-element wire transform `[x, y, z, qw, qx, qy, qz]`.
    pub fn from_transform(t: &[f32]) -> Option<Self> {
        if t.len() != 7 {
            return None;
        }
        Some(Self {
            position: [t[0], t[1], t[2]],
            orientation: Quat::from_wxyz([t[3], t[4], t[5], t[6]]),
        })
    }

    /// Inverse of [`Pose::from_transform`].
    pub fn to_transform(&self) -> [f32; 7] {
        let [w, x, y, z] = self.orientation.to_wxyz();
        let [px, py, pz] = self.position;
        [px, py, pz, w, x, y, z]
    }

    /// Body-local point to world space (before the batch offset).
    pub fn apply(&self, local: [f32; 3]) -> [f32; 3] {
        add(self.orientation.rotate(local), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wire_order_round_trip() {
        let q = Quat::from_wxyz([1.0, 0.0, 0.0, 0.0]);
        assert_eq!(q, Quat::IDENTITY);
        assert_eq!(q.to_wxyz(), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn rotate_quarter_turn_about_z() {
        let h = std::f32::consts::FRAC_1_SQRT_2;
        let q = Quat::from_wxyz([h, 0.0, 0.0, h]);
        let v = q.rotate([1.0, 0.0, 0.0]);
        assert_relative_eq!(v[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(v[1], 1.0, epsilon = 1e-6);
        assert_relative_eq!(v[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_quaternion_is_identity() {
        assert_eq!(Quat::from_wxyz([0.0; 4]), Quat::IDENTITY);
    }

    #[test]
    fn transform_needs_seven_components() {
        assert!(Pose::from_transform(&[0.0, 0.0, 1.0]).is_none());
        let p = Pose::from_transform(&[0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.position, [0.0, 0.0, 1.0]);
        assert_eq!(p.orientation, Quat::IDENTITY);
    }

    #[test]
    fn normalize_rejects_tiny_vectors() {
        assert!(normalize([1e-8, 0.0, 0.0]).is_none());
        let (u, m) = normalize([3.0, 4.0, 0.0]).unwrap();
        assert_relative_eq!(m, 5.0);
        assert_relative_eq!(u[0], 0.6);
    }
}

// src/orient.rs - Direction helpers for driving node orientation
use nalgebra::{Unit, UnitQuaternion, Vector3};

const NORMALIZE_EPSILON: f32 = 1e-5;
const PARALLEL_EPSILON: f32 = 1e-6;

/// Unit vector along `v`, or zero when `v` is too short to have a direction.
pub fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    let mag = v.norm();
    if mag > NORMALIZE_EPSILON {
        v / mag
    } else {
        Vector3::zeros()
    }
}

/// Projection of `v` onto the ground plane (vertical component dropped).
pub fn horizontal(v: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(v.x, 0.0, v.z)
}

/// Moves `current` straight towards `target` by at most `max_distance`.
pub fn move_towards(current: Vector3<f32>, target: Vector3<f32>, max_distance: f32) -> Vector3<f32> {
    let delta = target - current;
    let dist = delta.norm();
    if dist <= max_distance || dist == 0.0 {
        target
    } else {
        current + delta / dist * max_distance
    }
}

fn clamped_move(from: f32, to: f32, max_delta: f32) -> f32 {
    let delta = to - from;
    if delta > 0.0 {
        from + delta.min(max_delta)
    } else {
        from - (-delta).min(max_delta)
    }
}

/// Any unit vector perpendicular to `n`.
fn orthonormal(n: Vector3<f32>) -> Vector3<f32> {
    let candidate = if n.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    normalize_or_zero(n.cross(&candidate))
}

/// Rotates `current` towards `target` by at most `max_radians`, while its
/// magnitude moves towards the target magnitude by at most
/// `max_magnitude_delta`.
///
/// With `max_radians >= PI` the result always points along `target`.
pub fn rotate_towards(
    current: Vector3<f32>,
    target: Vector3<f32>,
    max_radians: f32,
    max_magnitude_delta: f32,
) -> Vector3<f32> {
    let current_mag = current.norm();
    let target_mag = target.norm();

    if current_mag <= PARALLEL_EPSILON || target_mag <= PARALLEL_EPSILON {
        return move_towards(current, target, max_magnitude_delta);
    }

    let current_dir = current / current_mag;
    let target_dir = target / target_mag;
    let dot = current_dir.dot(&target_dir);

    if dot > 1.0 - PARALLEL_EPSILON {
        return move_towards(current, target, max_magnitude_delta);
    }

    let (axis, angle) = if dot < -1.0 + PARALLEL_EPSILON {
        (orthonormal(current_dir), std::f32::consts::PI)
    } else {
        (current_dir.cross(&target_dir), dot.clamp(-1.0, 1.0).acos())
    };
    let Some(axis) = Unit::try_new(axis, PARALLEL_EPSILON) else {
        return move_towards(current, target, max_magnitude_delta);
    };

    let step = angle.min(max_radians.max(0.0));
    let rotation = UnitQuaternion::from_axis_angle(&axis, step);

    rotation * current_dir * clamped_move(current_mag, target_mag, max_magnitude_delta)
}

/// Rotation whose forward (+Z) axis points along `forward`, keeping world Y
/// as up where possible. `None` for a zero-length direction.
pub fn look_rotation(forward: Vector3<f32>) -> Option<UnitQuaternion<f32>> {
    let dir = normalize_or_zero(forward);
    if dir == Vector3::zeros() {
        return None;
    }

    let up = if dir.cross(&Vector3::y()).norm() > PARALLEL_EPSILON {
        Vector3::y()
    } else {
        // Looking straight up or down: tip the up axis back over -Z/+Z
        Vector3::new(0.0, 0.0, -dir.y.signum())
    };

    Some(UnitQuaternion::face_towards(&dir, &up))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn approx_eq(a: Vector3<f32>, b: Vector3<f32>, eps: f32) -> bool {
        (a - b).norm() < eps
    }

    #[test]
    fn test_normalize_or_zero() {
        assert!(approx_eq(normalize_or_zero(Vector3::new(3.0, 0.0, 4.0)), Vector3::new(0.6, 0.0, 0.8), 1e-6));
        assert_eq!(normalize_or_zero(Vector3::new(1e-7, 0.0, 0.0)), Vector3::zeros());
    }

    #[test]
    fn test_horizontal_drops_vertical() {
        assert_eq!(horizontal(Vector3::new(1.0, 5.0, -2.0)), Vector3::new(1.0, 0.0, -2.0));
    }

    #[test]
    fn test_rotate_towards_unbounded_snaps() {
        let result = rotate_towards(Vector3::z(), Vector3::x(), 2.0 * PI, 0.0);
        assert!(approx_eq(result, Vector3::x(), 1e-5));

        let result = rotate_towards(Vector3::z(), Vector3::new(0.0, 1.0, 1.0).normalize(), 2.0 * PI, 0.0);
        assert!(approx_eq(result, Vector3::new(0.0, 1.0, 1.0).normalize(), 1e-5));
    }

    #[test]
    fn test_rotate_towards_partial_step() {
        let result = rotate_towards(Vector3::z(), Vector3::x(), FRAC_PI_4, 0.0);
        let expected = Vector3::new(FRAC_PI_4.sin(), 0.0, FRAC_PI_4.cos());
        assert!(approx_eq(result, expected, 1e-5));
    }

    #[test]
    fn test_rotate_towards_opposite() {
        let result = rotate_towards(Vector3::z(), -Vector3::z(), 2.0 * PI, 0.0);
        assert!(approx_eq(result, -Vector3::z(), 1e-5));

        // Half a turn allowed: lands somewhere on the perpendicular circle
        let result = rotate_towards(Vector3::z(), -Vector3::z(), FRAC_PI_2, 0.0);
        assert!(result.z.abs() < 1e-5);
        assert!((result.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rotate_towards_keeps_magnitude() {
        let result = rotate_towards(Vector3::z() * 2.0, Vector3::x() * 5.0, 2.0 * PI, 0.0);
        assert!(approx_eq(result, Vector3::x() * 2.0, 1e-5));

        let result = rotate_towards(Vector3::z() * 2.0, Vector3::x() * 5.0, 2.0 * PI, 1.0);
        assert!(approx_eq(result, Vector3::x() * 3.0, 1e-5));
    }

    #[test]
    fn test_rotate_towards_zero_current() {
        // Nothing to rotate; magnitude may not move either
        let result = rotate_towards(Vector3::zeros(), Vector3::x(), 2.0 * PI, 0.0);
        assert_eq!(result, Vector3::zeros());
    }

    #[test]
    fn test_look_rotation_faces_direction() {
        let dir = Vector3::new(1.0, 0.5, -2.0);
        let rotation = look_rotation(dir).unwrap();
        assert!(approx_eq(rotation * Vector3::z(), dir.normalize(), 1e-5));

        // Up stays in the vertical plane containing the direction
        let up = rotation * Vector3::y();
        assert!(up.y > 0.0);
    }

    #[test]
    fn test_look_rotation_vertical() {
        let rotation = look_rotation(Vector3::y()).unwrap();
        assert!(approx_eq(rotation * Vector3::z(), Vector3::y(), 1e-5));
        assert!(approx_eq(rotation * Vector3::y(), -Vector3::z(), 1e-5));

        let rotation = look_rotation(-Vector3::y()).unwrap();
        assert!(approx_eq(rotation * Vector3::z(), -Vector3::y(), 1e-5));
    }

    #[test]
    fn test_look_rotation_zero() {
        assert!(look_rotation(Vector3::zeros()).is_none());
    }
}

//! 4×4 matrix helpers for per-draw transforms.
//!
//! Column-major layout matching WGSL `mat4x4f`, so a `Mat4` can be uploaded
//! as a uniform block without reordering.

/// 4×4 column-major matrix stored as `[f32; 16]`.
pub type Mat4 = [f32; 16];

/// Identity matrix.
pub const IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, // col 0
    0.0, 1.0, 0.0, 0.0, // col 1
    0.0, 0.0, 1.0, 0.0, // col 2
    0.0, 0.0, 0.0, 1.0, // col 3
];

/// Counter-clockwise rotation around the Z axis by `angle` radians.
pub fn rotate_z(angle: f32) -> Mat4 {
    let c = angle.cos();
    let s = angle.sin();
    [
        c, s, 0.0, 0.0, // col 0
        -s, c, 0.0, 0.0, // col 1
        0.0, 0.0, 1.0, 0.0, // col 2
        0.0, 0.0, 0.0, 1.0, // col 3
    ]
}

/// Transforms the column vector `v` by `m` (m × v).
pub fn transform(m: &Mat4, v: [f32; 4]) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for (row, slot) in out.iter_mut().enumerate() {
        *slot = (0..4).map(|k| m[k * 4 + row] * v[k]).sum();
    }
    out
}

/// Transforms a 2D point lying in the z = 0 plane and returns its x/y.
pub fn transform_point2(m: &Mat4, p: [f32; 2]) -> [f32; 2] {
    let [x, y, _, w] = transform(m, [p[0], p[1], 0.0, 1.0]);
    if w == 0.0 { [x, y] } else { [x / w, y / w] }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &[f32], b: &[f32], eps: f32) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < eps)
    }

    #[test]
    fn identity_leaves_points_alone() {
        let p = transform_point2(&IDENTITY, [0.25, -0.75]);
        assert!(approx_eq(&p, &[0.25, -0.75], 1e-6));
    }

    #[test]
    fn rotate_z_30_degrees_matches_hand_written_matrix() {
        let r = rotate_z(30f32.to_radians());
        let expected: Mat4 = [
            0.866, 0.5, 0.0, 0.0, //
            -0.5, 0.866, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        assert!(approx_eq(&r, &expected, 1e-3));
    }

    #[test]
    fn rotate_z_90_maps_x_to_y() {
        let r = rotate_z(std::f32::consts::FRAC_PI_2);
        let p = transform_point2(&r, [1.0, 0.0]);
        assert!(approx_eq(&p, &[0.0, 1.0], 1e-6));
    }

    #[test]
    fn rotations_compose() {
        let a = rotate_z(10f32.to_radians());
        let b = rotate_z(20f32.to_radians());
        let twice = transform_point2(&a, transform_point2(&b, [0.5, 0.5]));
        let once = transform_point2(&rotate_z(30f32.to_radians()), [0.5, 0.5]);
        assert!(approx_eq(&twice, &once, 1e-5));
    }

    #[test]
    fn transform_preserves_w() {
        let v = transform(&rotate_z(1.0), [0.3, -0.4, 0.0, 1.0]);
        assert!((v[3] - 1.0).abs() < 1e-6);
    }
}

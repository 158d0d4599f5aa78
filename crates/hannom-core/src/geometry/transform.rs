//! Planar transforms used to de-skew text regions.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use super::Point;
use crate::error::GeometryError;

/// A 3x3 homogeneous transform of the image plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    matrix: Matrix3<f64>,
}

impl Transform {
    /// Affine transform mapping three source points onto three destination points.
    pub fn affine(src: &[Point; 3], dst: &[Point; 3]) -> Result<Self, GeometryError> {
        let mut a = DMatrix::<f64>::zeros(6, 6);
        let mut b = DVector::<f64>::zeros(6);

        for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
            let (sx, sy) = (s.x as f64, s.y as f64);

            a[(i * 2, 0)] = sx;
            a[(i * 2, 1)] = sy;
            a[(i * 2, 2)] = 1.0;
            b[i * 2] = d.x as f64;

            a[(i * 2 + 1, 3)] = sx;
            a[(i * 2 + 1, 4)] = sy;
            a[(i * 2 + 1, 5)] = 1.0;
            b[i * 2 + 1] = d.y as f64;
        }

        let h = solve(a, b, "affine")?;

        Ok(Self {
            matrix: Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], 0.0, 0.0, 1.0),
        })
    }

    /// Perspective transform mapping four source points onto four destination points.
    pub fn perspective(src: &[Point; 4], dst: &[Point; 4]) -> Result<Self, GeometryError> {
        let mut a = DMatrix::<f64>::zeros(8, 8);
        let mut b = DVector::<f64>::zeros(8);

        for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
            let (sx, sy) = (s.x as f64, s.y as f64);
            let (dx, dy) = (d.x as f64, d.y as f64);

            // x' = (h0 x + h1 y + h2) / (h6 x + h7 y + 1)
            a[(i * 2, 0)] = sx;
            a[(i * 2, 1)] = sy;
            a[(i * 2, 2)] = 1.0;
            a[(i * 2, 6)] = -sx * dx;
            a[(i * 2, 7)] = -sy * dx;
            b[i * 2] = dx;

            // y' = (h3 x + h4 y + h5) / (h6 x + h7 y + 1)
            a[(i * 2 + 1, 3)] = sx;
            a[(i * 2 + 1, 4)] = sy;
            a[(i * 2 + 1, 5)] = 1.0;
            a[(i * 2 + 1, 6)] = -sx * dy;
            a[(i * 2 + 1, 7)] = -sy * dy;
            b[i * 2 + 1] = dy;
        }

        let h = solve(a, b, "perspective")?;

        Ok(Self {
            matrix: Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0),
        })
    }

    /// Map a point through the transform.
    ///
    /// Returns `None` when the point maps to infinity.
    pub fn apply(&self, point: Point) -> Option<Point> {
        self.apply_f64(point.x as f64, point.y as f64)
            .map(|(x, y)| Point::new(x as f32, y as f32))
    }

    pub(crate) fn apply_f64(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let mapped = self.matrix * Vector3::new(x, y, 1.0);
        if mapped.z.abs() <= f64::EPSILON {
            return None;
        }
        Some((mapped.x / mapped.z, mapped.y / mapped.z))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }
}

fn solve(a: DMatrix<f64>, b: DVector<f64>, kind: &str) -> Result<DVector<f64>, GeometryError> {
    a.lu()
        .solve(&b)
        .filter(|h| h.iter().all(|v| v.is_finite()))
        .ok_or_else(|| GeometryError::invalid(format!("{kind} transform is singular")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Point, expected: Point) {
        assert!(
            actual.distance(&expected) < 1e-3,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_perspective_maps_corners() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(60.0, 0.0),
            Point::new(60.0, 40.0),
            Point::new(0.0, 40.0),
        ];
        let dst = [
            Point::new(20.0, 20.0),
            Point::new(80.0, 30.0),
            Point::new(80.0, 70.0),
            Point::new(20.0, 80.0),
        ];

        let transform = Transform::perspective(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(transform.apply(*s).unwrap(), *d);
        }
    }

    #[test]
    fn test_affine_maps_fourth_corner() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(0.0, 20.0),
        ];
        let dst = [
            Point::new(10.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(0.0, 20.0),
        ];

        let transform = Transform::affine(&src, &dst).unwrap();
        assert_close(
            transform.apply(Point::new(30.0, 20.0)).unwrap(),
            Point::new(30.0, 20.0),
        );
    }

    #[test]
    fn test_collinear_points_are_singular() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
        ];
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];

        assert!(matches!(
            Transform::affine(&src, &dst),
            Err(GeometryError::InvalidGeometry(_))
        ));
    }
}

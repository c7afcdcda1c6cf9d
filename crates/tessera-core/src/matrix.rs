//! 4×4 homogeneous matrices.
//!
//! Storage is column major: `d[col * 4 + row]`, so the translation lives in
//! `d[12]`, `d[13]` and `d[14]`. [`Matrix::multiply`] composes left to
//! right: `a.multiply(&b)` yields a matrix that applies `a` first, then `b`.

/// A homogeneous point or direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    pub f: [f32; 4],
}

impl Vector {
    pub const fn point(x: f32, y: f32) -> Self {
        Self {
            f: [x, y, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub d: [f32; 16],
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub const fn identity() -> Self {
        Self {
            d: [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::identity();
        m.translate(x, y, z);
        m
    }

    pub fn from_scale(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::identity();
        m.scale(x, y, z);
        m
    }

    /// Rotation in the xy plane given the cosine and sine of the angle.
    pub fn from_rotation(cos: f32, sin: f32) -> Self {
        let mut m = Self::identity();
        m.d[0] = cos;
        m.d[1] = sin;
        m.d[4] = -sin;
        m.d[5] = cos;
        m
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// `self = self then other`.
    pub fn multiply(&mut self, other: &Self) {
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = (0..4)
                    .map(|k| other.d[k * 4 + row] * self.d[col * 4 + k])
                    .sum();
            }
        }
        self.d = out;
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.multiply(&Self {
            d: [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                x, y, z, 1.0,
            ],
        });
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.multiply(&Self {
            d: [
                x, 0.0, 0.0, 0.0, //
                0.0, y, 0.0, 0.0, //
                0.0, 0.0, z, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        });
    }

    pub fn transform(&self, v: Vector) -> Vector {
        let mut out = [0.0f32; 4];
        for (row, slot) in out.iter_mut().enumerate() {
            *slot = (0..4).map(|col| self.d[col * 4 + row] * v.f[col]).sum();
        }
        Vector { f: out }
    }

    /// Inverse by Gaussian elimination with partial pivoting.
    ///
    /// Returns `None` for singular matrices.
    pub fn invert(&self) -> Option<Self> {
        // Row-major working copy in f64, augmented with the identity.
        let mut a = [[0.0f64; 8]; 4];
        for (row, line) in a.iter_mut().enumerate() {
            for col in 0..4 {
                line[col] = f64::from(self.d[col * 4 + row]);
            }
            line[4 + row] = 1.0;
        }

        for col in 0..4 {
            let pivot = (col..4)
                .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
                .unwrap_or(col);
            if a[pivot][col].abs() < 1e-9 {
                return None;
            }
            a.swap(col, pivot);

            let p = a[col][col];
            for v in &mut a[col] {
                *v /= p;
            }
            for row in 0..4 {
                if row == col {
                    continue;
                }
                let factor = a[row][col];
                if factor == 0.0 {
                    continue;
                }
                for k in 0..8 {
                    a[row][k] -= factor * a[col][k];
                }
            }
        }

        let mut inv = Self::identity();
        for (row, line) in a.iter().enumerate() {
            for col in 0..4 {
                inv.d[col * 4 + row] = line[4 + col] as f32;
            }
        }
        Some(inv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn translate_then_scale_applies_in_order() {
        let mut m = Matrix::from_translation(10.0, 0.0, 0.0);
        m.scale(2.0, 2.0, 1.0);
        let v = m.transform(Vector::point(1.0, 1.0));
        assert!(approx(v.f[0], 22.0));
        assert!(approx(v.f[1], 2.0));
        assert!(approx(v.f[3], 1.0));
    }

    #[test]
    fn translation_sits_in_last_column() {
        let m = Matrix::from_translation(3.0, 4.0, 5.0);
        assert_eq!((m.d[12], m.d[13], m.d[14]), (3.0, 4.0, 5.0));
    }

    #[test]
    fn rotation_quarter_turn() {
        let m = Matrix::from_rotation(0.0, 1.0);
        let v = m.transform(Vector::point(1.0, 0.0));
        assert!(approx(v.f[0], 0.0));
        assert!(approx(v.f[1], 1.0));
    }

    #[test]
    fn inverse_round_trips() {
        let mut m = Matrix::from_rotation(0.6, 0.8);
        m.translate(-40.0, 25.0, 0.0);
        m.scale(1.5, 0.5, 1.0);
        let inv = m.invert().expect("invertible");
        let p = m.transform(Vector::point(7.0, -3.0));
        let back = inv.transform(p);
        assert!(approx(back.f[0], 7.0));
        assert!(approx(back.f[1], -3.0));

        let mut product = m;
        product.multiply(&inv);
        for (a, b) in product.d.iter().zip(Matrix::identity().d.iter()) {
            assert!(approx(*a, *b));
        }
    }

    #[test]
    fn degenerate_scale_is_singular() {
        assert!(Matrix::from_scale(0.0, 1.0, 1.0).invert().is_none());
        assert!(Matrix::identity().invert().is_some());
    }
}

//! Periodic unit cell and minimum-image wrapping of distance vectors.

use nalgebra::{Matrix3, Vector3};

/// Shape of the simulation box around a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum UnitCell {
    /// No periodicity; vectors are used as-is.
    #[default]
    Infinite,
    /// Rectangular box with edge lengths `[a, b, c]`.
    Orthorhombic([f64; 3]),
    /// General cell, stored as the matrix whose columns are the cell vectors
    /// together with its inverse.
    Triclinic {
        matrix: Matrix3<f64>,
        inverse: Matrix3<f64>,
    },
}

impl UnitCell {
    pub fn orthorhombic(lengths: [f64; 3]) -> Result<Self, String> {
        if lengths.iter().any(|&l| !(l > 0.0)) {
            return Err(format!(
                "Cell lengths must be strictly positive, got {:?}",
                lengths
            ));
        }
        Ok(UnitCell::Orthorhombic(lengths))
    }

    /// Build a triclinic cell from its three cell vectors `a`, `b` and `c`.
    pub fn triclinic(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Result<Self, String> {
        let matrix = Matrix3::new(a[0], b[0], c[0], a[1], b[1], c[1], a[2], b[2], c[2]);
        let inverse = matrix
            .try_inverse()
            .ok_or_else(|| "Triclinic cell matrix is singular".to_string())?;
        Ok(UnitCell::Triclinic { matrix, inverse })
    }

    /// Apply the minimum image convention to a distance vector.
    pub fn wrap(&self, vector: [f64; 3]) -> [f64; 3] {
        match self {
            UnitCell::Infinite => vector,
            UnitCell::Orthorhombic(lengths) => [
                vector[0] - (vector[0] / lengths[0]).round() * lengths[0],
                vector[1] - (vector[1] / lengths[1]).round() * lengths[1],
                vector[2] - (vector[2] / lengths[2]).round() * lengths[2],
            ],
            UnitCell::Triclinic { matrix, inverse } => {
                let mut fractional = inverse * Vector3::new(vector[0], vector[1], vector[2]);
                for d in 0..3 {
                    fractional[d] -= fractional[d].round();
                }
                let wrapped = matrix * fractional;
                [wrapped[0], wrapped[1], wrapped[2]]
            }
        }
    }
}

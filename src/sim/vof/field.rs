use std::ops::Index;

use rayon::prelude::*;

use crate::sim::vof::error::{VofError, VofResult};
use crate::sim::vof::mesh::VofMesh;

/// Per-cell volume fraction of the reference fluid, each value in `[0, 1]`.
///
/// Indexed by cell id. The advection driver is the only component that
/// mutates it, and only by writing back a complete, checked update.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeFractionField {
    values: Vec<f64>,
}

impl VolumeFractionField {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn uniform(n_cells: usize, value: f64) -> Self {
        Self {
            values: vec![value; n_cells],
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks the size against the mesh and every value against `[0, 1]`.
    pub fn validate(&self, mesh: &VofMesh) -> VofResult<()> {
        check_size("volume fraction", mesh.n_cells(), self.values.len())?;
        for (cell, &value) in self.values.iter().enumerate() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(VofError::InvalidFraction { cell, value });
            }
        }
        Ok(())
    }

    /// Total fluid volume, `sum(alpha_i * V_i)`.
    pub fn total_volume(&self, mesh: &VofMesh) -> f64 {
        fluid_volume(mesh, &self.values)
    }

    /// Cells whose fraction lies strictly inside `(tol, 1 - tol)`.
    pub fn interface_cells(&self, tol: f64) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|&(_, &a)| a > tol && a < 1.0 - tol)
            .map(|(i, _)| i)
            .collect()
    }

    pub(crate) fn overwrite(&mut self, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.values.len());
        self.values = values;
    }
}

impl Index<usize> for VolumeFractionField {
    type Output = f64;

    fn index(&self, cell: usize) -> &f64 {
        &self.values[cell]
    }
}

/// Signed volumetric flux per face, `u . S`, positive from owner to neighbour.
///
/// The advection core assumes (but does not enforce) that the field is
/// divergence-free; [`FaceFluxField::divergence`] reports the residual.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceFluxField {
    values: Vec<f64>,
}

impl FaceFluxField {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn zeros(n_faces: usize) -> Self {
        Self {
            values: vec![0.0; n_faces],
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn validate(&self, mesh: &VofMesh) -> VofResult<()> {
        check_size("face flux", mesh.n_faces(), self.values.len())?;
        if let Some(face) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(VofError::InvalidFlux {
                face,
                value: self.values[face],
            });
        }
        Ok(())
    }

    /// Same field with every face flux negated.
    pub fn negated(&self) -> Self {
        Self {
            values: self.values.iter().map(|v| -v).collect(),
        }
    }

    /// Net outflow per cell, zero for a divergence-free field.
    pub fn divergence(&self, mesh: &VofMesh) -> Vec<f64> {
        (0..mesh.n_cells())
            .into_par_iter()
            .map(|c| mesh.net_outflow(c, &self.values))
            .collect()
    }

    /// Largest cell Courant number `sum(outflow) * dt / V` over the mesh.
    pub fn max_courant(&self, mesh: &VofMesh, dt: f64) -> f64 {
        (0..mesh.n_cells())
            .into_par_iter()
            .map(|c| mesh.total_outflow(c, &self.values) * dt / mesh.cells[c].volume)
            .reduce(|| 0.0, f64::max)
    }
}

impl Index<usize> for FaceFluxField {
    type Output = f64;

    fn index(&self, face: usize) -> &f64 {
        &self.values[face]
    }
}

/// `sum(alpha_i * V_i)` in cell order.
pub(crate) fn fluid_volume(mesh: &VofMesh, alpha: &[f64]) -> f64 {
    mesh.cells
        .iter()
        .zip(alpha)
        .map(|(cell, a)| a * cell.volume)
        .sum()
}

fn check_size(field: &'static str, expected: usize, found: usize) -> VofResult<()> {
    if expected != found {
        return Err(VofError::FieldSizeMismatch {
            field,
            expected,
            found,
        });
    }
    Ok(())
}

//! Fitting an affine transform to ground control points
use crate::error::{Error, Result};
use crate::model::{AffineTransform, GroundControlPoint};
use log::debug;
use nalgebra::{Matrix4x2, Matrix4x3, Vector4};

// Relative size below which a singular value counts as zero
const RANK_TOLERANCE: f64 = 1e-10;

/// Fit the affine transform mapping pixel positions to geography
///
/// Each axis is solved independently in the least squares sense, so
/// four points that are exactly affine related are reproduced to
/// floating point precision.
///
/// # Errors
///
/// Returns [`Error::SingularTransform`] if the pixel positions are
/// collinear or coincident, or if the fitted transform collapses the
/// raster onto a line or a point.
pub fn from_gcps(gcps: &[GroundControlPoint; 4]) -> Result<AffineTransform> {
    if is_degenerate(gcps.map(|g| (g.col, g.row))) {
        return Err(Error::SingularTransform(
            "control point pixels are collinear or coincident".to_string(),
        ));
    }
    if is_degenerate(gcps.map(|g| (g.x, g.y))) {
        return Err(Error::SingularTransform(
            "control point positions are collinear or coincident".to_string(),
        ));
    }

    let a = Matrix4x3::from_fn(|i, j| match j {
        0 => gcps[i].col,
        1 => gcps[i].row,
        _ => 1.0,
    });
    let xs = Vector4::from_fn(|i, _| gcps[i].x);
    let ys = Vector4::from_fn(|i, _| gcps[i].y);

    let svd = a.svd(true, true);
    let eps = RANK_TOLERANCE * svd.singular_values.max();
    let px = svd
        .solve(&xs, eps)
        .map_err(|e| Error::SingularTransform(e.to_string()))?;
    let py = svd
        .solve(&ys, eps)
        .map_err(|e| Error::SingularTransform(e.to_string()))?;

    let transform = AffineTransform {
        a: px[0],
        b: px[1],
        c: px[2],
        d: py[0],
        e: py[1],
        f: py[2],
    };

    let det = transform.determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(Error::SingularTransform(format!(
            "fitted transform {:?} has a singular linear part",
            transform
        )));
    }

    let residual = gcps
        .iter()
        .map(|g| {
            let (x, y) = transform.apply(g.col, g.row);
            (x - g.x).powi(2) + (y - g.y).powi(2)
        })
        .sum::<f64>()
        .sqrt();
    debug!("Affine fit {:?}, residual {:e}", transform, residual);

    Ok(transform)
}

/// True if the points do not span a plane
fn is_degenerate(points: [(f64, f64); 4]) -> bool {
    let mx = points.iter().map(|p| p.0).sum::<f64>() / 4.0;
    let my = points.iter().map(|p| p.1).sum::<f64>() / 4.0;
    let centered = Matrix4x2::from_fn(|i, j| match j {
        0 => points[i].0 - mx,
        _ => points[i].1 - my,
    });
    let s = centered.singular_values();
    let s_max = s.max();
    !(s_max > 0.0) || s.min() <= RANK_TOLERANCE * s_max
}

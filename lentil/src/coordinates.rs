//! Rescaling raw spatial coordinates into the unit square.

use crate::common::*;

/// How the two coordinate axes are rescaled
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoordinateScaling {
    /// Shift to the origin and divide both axes by the bounding-box
    /// diagonal. Keeps the aspect ratio and Euclidean geometry.
    #[default]
    Diagonal,
    /// Min-max scale each axis independently
    PerAxis,
}

/// Rescale an `n x 2` coordinate matrix into `[0, 1]`.
///
/// Order along each axis is preserved. An axis (or the whole diagonal)
/// with zero extent maps to the constant 0.
///
/// * `coords` - raw coordinates, one row per cell
/// * `scaling` - joint (diagonal) or per-axis policy
pub fn normalize_coordinates(coords: &Mat, scaling: CoordinateScaling) -> anyhow::Result<Mat> {
    if coords.ncols() != 2 {
        return Err(anyhow::anyhow!(
            "expected 2 coordinate columns, found {}",
            coords.ncols()
        ));
    }

    let ranges = column_ranges(coords)
        .ok_or_else(|| anyhow::anyhow!("cannot normalize coordinates of zero cells"))?;

    if coords.iter().any(|x| !x.is_finite()) {
        return Err(anyhow::anyhow!("non-finite coordinate values"));
    }

    let (min_x, max_x) = ranges[0];
    let (min_y, max_y) = ranges[1];
    let extent_x = max_x - min_x;
    let extent_y = max_y - min_y;

    let (scale_x, scale_y) = match scaling {
        CoordinateScaling::Diagonal => {
            let diag = (extent_x * extent_x + extent_y * extent_y).sqrt();
            (diag, diag)
        }
        CoordinateScaling::PerAxis => (extent_x, extent_y),
    };

    let rescale = |v: f32, lb: f32, scale: f32| -> f32 {
        if scale > 0.0 {
            ((v - lb) / scale).clamp(0.0, 1.0)
        } else {
            0.0
        }
    };

    Ok(Mat::from_fn(coords.nrows(), 2, |i, j| {
        if j == 0 {
            rescale(coords[(i, 0)], min_x, scale_x)
        } else {
            rescale(coords[(i, 1)], min_y, scale_y)
        }
    }))
}

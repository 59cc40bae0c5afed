//! Ground control points for a sidescan raster
use crate::algorithms::geodesy::SwathEdge;
use crate::error::{Error, Result};
use crate::model::{GroundControlPoint, Side};

/// Build the four corner control points of a single-channel raster
///
/// Row 0 is the last ping and the bottom row the first ping. For a
/// starboard channel the sensor track runs down the left edge and the
/// outer swath edge down the right; a port channel is the mirror image.
///
/// The points are returned in corner order: top-left, top-right,
/// bottom-right, bottom-left. Positions in `first` and `last` are
/// `(lat, lon)`; control points carry longitude as x and latitude as y.
///
/// # Errors
///
/// Returns [`Error::Geometry`] if the raster is not at least 2 x 2.
pub fn build_gcps(
    first: &SwathEdge,
    last: &SwathEdge,
    side: Side,
    height: u32,
    width: u32,
) -> Result<[GroundControlPoint; 4]> {
    if height <= 1 || width <= 1 {
        return Err(Error::Geometry(format!(
            "raster of {} x {} pixels has no distinct corners",
            width, height
        )));
    }

    let bottom = f64::from(height - 1);
    let right = f64::from(width - 1);

    let (top_left, top_right, bottom_right, bottom_left) = match side {
        Side::Starboard => (last.sensor, last.outer, first.outer, first.sensor),
        Side::Port => (last.outer, last.sensor, first.sensor, first.outer),
    };

    let gcp = |row: f64, col: f64, (lat, lon): (f64, f64)| {
        GroundControlPoint::new(row, col, lon, lat)
    };

    Ok([
        gcp(0.0, 0.0, top_left),
        gcp(0.0, right, top_right),
        gcp(bottom, right, bottom_right),
        gcp(bottom, 0.0, bottom_left),
    ])
}

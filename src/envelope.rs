use crate::crs::Crs;
use crate::tms::TileMatrixSet;
use crate::TileCoordinate;

/// The rectangle covered by one tile, in the CRS of its tile matrix set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub crs: Crs,
}

impl Envelope {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Computes the envelope of a tile from the matrix parameters for its zoom level.
///
/// Returns `None` if the matrix set has no matrix for `coord.z`. Column and row are
/// not range checked here; that is the registry's job.
pub fn envelope(tms: &TileMatrixSet, coord: &TileCoordinate) -> Option<Envelope> {
    let matrix = tms.matrix(coord.zoom()?)?;
    let (span_x, span_y) = matrix.tile_span();
    let [origin_x, origin_y] = matrix.point_of_origin;

    let min_x = origin_x + coord.x as f64 * span_x;
    let max_y = origin_y - coord.y as f64 * span_y;

    Some(Envelope {
        min_x,
        min_y: max_y - span_y,
        max_x: min_x + span_x,
        max_y,
        crs: tms.crs,
    })
}

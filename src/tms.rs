//! OGC Two Dimensional Tile Matrix Sets
//!
//! Further reading: https://docs.ogc.org/is/17-083r4/17-083r4.html
//!
//! Only the two sets every OGC API - Tiles server is expected to know are built in:
//! `WebMercatorQuad` and `WorldCRS84Quad`. Both use a top-left point of origin and
//! 256 pixel tiles.
use once_cell::sync::Lazy;

use crate::crs::Crs;

/// Standardized rendering pixel size, in metres (0.28 mm).
const PIXEL_SIZE: f64 = 0.00028;

const WEB_MERCATOR_HALF_EXTENT: f64 = 20_037_508.342_789_244;
const WEB_MERCATOR_CELL_SIZE: f64 = 156_543.033_928_040_97;
const WEB_MERCATOR_MAX_ZOOM: u8 = 24;

/// Metres per degree at the equator of the WGS 84 ellipsoid.
const METRES_PER_DEGREE: f64 = 111_319.490_793_273_58;
const CRS84_CELL_SIZE: f64 = 0.703_125;
const CRS84_MAX_ZOOM: u8 = 23;

pub const WEB_MERCATOR_QUAD: &str = "WebMercatorQuad";
pub const WORLD_CRS84_QUAD: &str = "WorldCRS84Quad";

/// One zoom level of a tile matrix set.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMatrix {
    pub id: String,
    pub scale_denominator: f64,
    /// Size of one pixel in CRS units.
    pub cell_size: f64,
    /// Top-left corner of the matrix, in CRS axis order (x, y).
    pub point_of_origin: [f64; 2],
    pub tile_width: u32,
    pub tile_height: u32,
    pub matrix_width: u64,
    pub matrix_height: u64,
}

impl TileMatrix {
    /// Width and height of one tile in CRS units.
    pub fn tile_span(&self) -> (f64, f64) {
        (
            f64::from(self.tile_width) * self.cell_size,
            f64::from(self.tile_height) * self.cell_size,
        )
    }
}

/// A named grid over a CRS. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMatrixSet {
    pub id: String,
    pub crs: Crs,
    pub tile_matrices: Vec<TileMatrix>,
}

impl TileMatrixSet {
    pub fn new(id: impl Into<String>, crs: Crs, tile_matrices: Vec<TileMatrix>) -> TileMatrixSet {
        TileMatrixSet {
            id: id.into(),
            crs,
            tile_matrices,
        }
    }

    /// The matrix for a zoom level. Matrices are stored in zoom order, so the
    /// zoom level doubles as the index.
    pub fn matrix(&self, zoom: u8) -> Option<&TileMatrix> {
        self.tile_matrices.get(usize::from(zoom))
    }

    pub fn max_zoom(&self) -> u8 {
        self.tile_matrices.len().saturating_sub(1) as u8
    }
}

fn quad_matrices(
    max_zoom: u8,
    base_cell_size: f64,
    metres_per_unit: f64,
    origin: [f64; 2],
    base_width: u64,
) -> Vec<TileMatrix> {
    (0..=max_zoom)
        .map(|zoom| {
            let cell_size = base_cell_size / f64::from(1u32 << zoom);
            TileMatrix {
                id: zoom.to_string(),
                scale_denominator: cell_size * metres_per_unit / PIXEL_SIZE,
                cell_size,
                point_of_origin: origin,
                tile_width: 256,
                tile_height: 256,
                matrix_width: base_width << zoom,
                matrix_height: 1u64 << zoom,
            }
        })
        .collect()
}

static WEB_MERCATOR: Lazy<TileMatrixSet> = Lazy::new(|| {
    TileMatrixSet::new(
        WEB_MERCATOR_QUAD,
        Crs::WEB_MERCATOR,
        quad_matrices(
            WEB_MERCATOR_MAX_ZOOM,
            WEB_MERCATOR_CELL_SIZE,
            1.0,
            [-WEB_MERCATOR_HALF_EXTENT, WEB_MERCATOR_HALF_EXTENT],
            1,
        ),
    )
});

static WORLD_CRS84: Lazy<TileMatrixSet> = Lazy::new(|| {
    TileMatrixSet::new(
        WORLD_CRS84_QUAD,
        Crs::CRS84,
        quad_matrices(
            CRS84_MAX_ZOOM,
            CRS84_CELL_SIZE,
            METRES_PER_DEGREE,
            [-180.0, 90.0],
            2,
        ),
    )
});

/// Looks up one of the built-in tile matrix sets by its OGC identifier.
pub fn builtin(id: &str) -> Option<&'static TileMatrixSet> {
    match id {
        WEB_MERCATOR_QUAD => Some(&*WEB_MERCATOR),
        WORLD_CRS84_QUAD => Some(&*WORLD_CRS84),
        _ => None,
    }
}

pub fn builtin_ids() -> [&'static str; 2] {
    [WEB_MERCATOR_QUAD, WORLD_CRS84_QUAD]
}

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::tms::{self, TileMatrixSet};
use crate::TileCoordinate;

/// Inclusive zoom range a provider serves, independent of the matrix set.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct ZoomRange {
    #[serde(default)]
    pub min: u8,
    #[serde(default = "ZoomRange::default_max")]
    pub max: u8,
}

impl ZoomRange {
    fn default_max() -> u8 {
        u8::MAX
    }

    pub fn contains(&self, zoom: u8) -> bool {
        self.min <= zoom && zoom <= self.max
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        ZoomRange {
            min: 0,
            max: ZoomRange::default_max(),
        }
    }
}

/// Narrows the tiles available at one zoom level of a matrix set
/// (OGC `TileMatrixSetLimits`). Bounds are inclusive.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TileMatrixLimits {
    #[serde(rename = "tileMatrix")]
    pub tile_matrix: String,
    #[serde(rename = "minTileRow")]
    pub min_tile_row: i64,
    #[serde(rename = "maxTileRow")]
    pub max_tile_row: i64,
    #[serde(rename = "minTileCol")]
    pub min_tile_col: i64,
    #[serde(rename = "maxTileCol")]
    pub max_tile_col: i64,
}

impl TileMatrixLimits {
    fn contains(&self, coord: &TileCoordinate) -> bool {
        (self.min_tile_row..=self.max_tile_row).contains(&coord.y)
            && (self.min_tile_col..=self.max_tile_col).contains(&coord.x)
    }
}

/// The tiling schemes a provider offers, keyed by tileset identifier.
#[derive(Clone, Debug)]
pub struct TilesetRegistry {
    schemes: Vec<TileMatrixSet>,
    zoom: ZoomRange,
    limits: HashMap<String, Vec<TileMatrixLimits>>,
}

impl TilesetRegistry {
    /// Builds a registry, refusing duplicate identifiers up front so that
    /// [`resolve`](Self::resolve) can never be ambiguous on a running provider.
    pub fn new(schemes: Vec<TileMatrixSet>) -> Result<TilesetRegistry> {
        for (i, scheme) in schemes.iter().enumerate() {
            if schemes[..i].iter().any(|other| other.id == scheme.id) {
                return Err(Error::Configuration(format!(
                    "tiling scheme {} is defined more than once",
                    scheme.id
                )));
            }
        }

        Ok(TilesetRegistry {
            schemes,
            zoom: ZoomRange::default(),
            limits: HashMap::new(),
        })
    }

    /// Builds a registry from built-in tile matrix set identifiers.
    pub fn from_ids<S: AsRef<str>>(ids: &[S]) -> Result<TilesetRegistry> {
        let schemes = ids
            .iter()
            .map(|id| {
                let id = id.as_ref();
                tms::builtin(id).cloned().ok_or_else(|| {
                    Error::Configuration(format!("unknown tiling scheme {}", id))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        TilesetRegistry::new(schemes)
    }

    pub fn with_zoom_range(mut self, zoom: ZoomRange) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_limits(mut self, tileset: impl Into<String>, limits: Vec<TileMatrixLimits>) -> Self {
        self.limits.insert(tileset.into(), limits);
        self
    }

    pub fn schemes(&self) -> &[TileMatrixSet] {
        &self.schemes
    }

    /// Finds the one scheme whose identifier matches `tileset`.
    pub fn resolve(&self, tileset: &str) -> Result<&TileMatrixSet> {
        let mut matches = self.schemes.iter().filter(|scheme| scheme.id == tileset);

        match (matches.next(), matches.next()) {
            (Some(scheme), None) => Ok(scheme),
            (None, _) => Err(Error::SchemeNotFound(tileset.to_string())),
            (Some(_), Some(_)) => Err(Error::Configuration(format!(
                "tiling scheme {} matches more than one definition",
                tileset
            ))),
        }
    }

    /// Checks a coordinate against the matrix bounds of `scheme` at its zoom level,
    /// the provider's zoom range, and any configured matrix limits.
    pub fn is_in_limits(&self, scheme: &TileMatrixSet, coord: &TileCoordinate) -> bool {
        let zoom = match coord.zoom() {
            Some(zoom) => zoom,
            None => return false,
        };
        if !self.zoom.contains(zoom) {
            return false;
        }

        let matrix = match scheme.matrix(zoom) {
            Some(matrix) => matrix,
            None => return false,
        };

        let in_matrix = 0 <= coord.x
            && (coord.x as u64) < matrix.matrix_width
            && 0 <= coord.y
            && (coord.y as u64) < matrix.matrix_height;
        if !in_matrix {
            return false;
        }

        match self.limits.get(&scheme.id) {
            Some(limits) => limits
                .iter()
                .find(|limit| limit.tile_matrix == matrix.id)
                .map_or(false, |limit| limit.contains(coord)),
            None => true,
        }
    }
}

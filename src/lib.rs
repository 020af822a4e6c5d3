//! # Tile Conjurer
//!
//! Mapbox vector tiles rendered on the fly from PostGIS feature tables.
//!
//! ## Current features
//!
//! Given a feature table (geometry column, attribute fields, storage CRS) and a
//! PostGIS database, this crate answers OGC API - Tiles style requests
//! (`{tileMatrixSet}/{tileMatrix}/{tileRow}/{tileCol}`) with finished MVT tiles.
//! `WebMercatorQuad` and `WorldCRS84Quad` are supported out of the box.
//!
//! Everything that touches feature data happens inside the database in a single
//! statement: reprojection, curve linearization, the envelope filter, clipping and
//! `ST_AsMVT` encoding. The engine itself never sees individual features.
//!
//! ## Feature density
//!
//! Low zoom tiles over dense tables can get very large. A provider can set
//! `max_items_per_tile`; below `disable_at_z` only that many features are encoded,
//! picked by bounding-box area, largest first.
//!
//! ## Known Limitations
//!
//! There is no tile cache, and no statement timeout beyond whatever the database
//! enforces. Dropping a request future releases its pooled connection but does not
//! cancel the statement on the server.

#![deny(warnings)]

// TODO: remove once async fn in traits become stable
use async_trait::async_trait;

/// Executes [`TilePlan`]s. This is the seam between the engine and a spatial
/// database; [`PostgisBackend`] is the only implementation shipped.
#[async_trait]
pub trait TileBackend: Send + Sync {
    /// Runs the plan in one round trip and returns the encoded tile. A tile with no
    /// features comes back as an empty buffer, not an error.
    async fn render(&self, plan: &TilePlan<'_>) -> Result<Vec<u8>>;
}

pub mod config;
pub mod crs;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod plan;
pub mod postgis;
pub mod registry;
mod tile;
pub mod tms;

pub use config::{DataSource, DensityPolicy, FeatureSource, ProviderConfig};
pub use crs::Crs;
pub use engine::{ProviderContext, TileQueryEngine};
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use plan::{AreaRanking, TilePlan};
pub use postgis::PostgisBackend;
pub use registry::TilesetRegistry;
pub use tile::{TileCoordinate, TileFormat, TileRequest, TileResponse};
pub use tms::{TileMatrix, TileMatrixSet};

use std::sync::Arc;

use log::{debug, warn};

use crate::config::{DensityPolicy, FeatureSource, ProviderConfig};
use crate::envelope::envelope;
use crate::error::{Error, Result};
use crate::plan::TilePlan;
use crate::postgis::PostgisBackend;
use crate::registry::TilesetRegistry;
use crate::tms::TileMatrixSet;
use crate::{TileBackend, TileCoordinate, TileFormat, TileRequest, TileResponse};

/// Everything a provider loads once at startup. Shared read-only by all requests.
#[derive(Clone, Debug)]
pub struct ProviderContext {
    pub registry: TilesetRegistry,
    pub source: FeatureSource,
    pub policy: DensityPolicy,
    /// Layer name used when a request does not name one.
    pub layer: String,
}

impl ProviderContext {
    pub fn from_config(config: &ProviderConfig) -> Result<ProviderContext> {
        Ok(ProviderContext {
            registry: config.registry()?,
            source: config.feature_source(),
            policy: config.density_policy(),
            layer: config.layer().to_string(),
        })
    }
}

/// Answers tile requests for one feature source.
#[derive(Clone, Debug)]
pub struct TileQueryEngine<B> {
    context: Arc<ProviderContext>,
    backend: B,
}

impl TileQueryEngine<PostgisBackend> {
    /// Builds the context and connects to the database named in the `data` block.
    pub async fn from_config(config: &ProviderConfig) -> Result<Self> {
        let context = ProviderContext::from_config(config)?;
        let data = config.data.as_ref().ok_or_else(|| {
            Error::Configuration(String::from("a data block is required to connect"))
        })?;
        let backend = PostgisBackend::connect(data).await?;

        Ok(TileQueryEngine::new(context, backend))
    }
}

impl<B: TileBackend> TileQueryEngine<B> {
    pub fn new(context: ProviderContext, backend: B) -> Self {
        TileQueryEngine {
            context: Arc::new(context),
            backend,
        }
    }

    pub fn layer(&self) -> &str {
        &self.context.layer
    }

    pub fn tiling_schemes(&self) -> &[TileMatrixSet] {
        self.context.registry.schemes()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetches a tile from raw request path segments.
    ///
    /// Malformed coordinates and unknown tilesets are errors; coordinates outside
    /// the tileset's limits are [`TileResponse::NotFound`].
    pub async fn get_tile(
        &self,
        layer: Option<&str>,
        tileset: &str,
        z: &str,
        y: &str,
        x: &str,
        format: TileFormat,
    ) -> Result<TileResponse> {
        let request = TileRequest {
            layer: layer.map(str::to_string),
            tileset: tileset.to_string(),
            coord: TileCoordinate::parse(z, y, x)?,
            format,
        };

        self.render(&request).await
    }

    pub async fn render(&self, request: &TileRequest) -> Result<TileResponse> {
        let context = &self.context;
        let coord = request.coord;

        let scheme = context.registry.resolve(&request.tileset)?;
        if !context.registry.is_in_limits(scheme, &coord) {
            warn!("Tile {} not found in {}", coord, scheme.id);
            return Ok(TileResponse::NotFound);
        }

        let (zoom, envelope) = match (coord.zoom(), envelope(scheme, &coord)) {
            (Some(zoom), Some(envelope)) => (zoom, envelope),
            _ => {
                warn!("Tile {} not found in {}", coord, scheme.id);
                return Ok(TileResponse::NotFound);
            }
        };

        let layer = request
            .layer
            .as_deref()
            .filter(|layer| !layer.is_empty())
            .unwrap_or(&context.layer);
        let plan = TilePlan::new(
            &context.source,
            &context.policy,
            zoom,
            envelope,
            layer,
            request.format,
        );

        let tile = self.backend.render(&plan).await?;
        if tile.is_empty() {
            debug!("Tile {} in {} has no features", coord, scheme.id);
            Ok(TileResponse::Empty)
        } else {
            Ok(TileResponse::Tile(tile))
        }
    }
}

//! Provider definition YAML.
//!
//! The layout follows the provider blocks of an OGC API server resource definition:
//!
//! ```yaml
//! data:
//!   host: localhost
//!   dbname: osm
//!   user: postgres
//!   search_path: [osm, public]
//! table: hotosm_bdi_waterways
//! geometry_column: foo_geom
//! storage_crs: http://www.opengis.net/def/crs/EPSG/0/4326
//! max_items_per_tile: 50
//! ```
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::registry::{TileMatrixLimits, TilesetRegistry, ZoomRange};
use crate::tms;

/// Connection parameters for the PostGIS database.
#[derive(Clone, Deserialize, Debug)]
pub struct DataSource {
    #[serde(default = "DataSource::default_host")]
    pub host: String,
    #[serde(default = "DataSource::default_port")]
    pub port: u16,
    pub dbname: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub search_path: Vec<String>,
    #[serde(default = "DataSource::default_max_connections")]
    pub max_connections: u32,
}

impl DataSource {
    fn default_host() -> String {
        String::from("localhost")
    }

    fn default_port() -> u16 {
        5432
    }

    fn default_max_connections() -> u32 {
        10
    }
}

/// Where the features of a layer live.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureSource {
    /// Table name, optionally schema qualified (`osm.waterways`).
    pub table: String,
    pub geometry_column: String,
    /// Attribute columns, in output order.
    pub fields: Vec<String>,
    pub storage_crs: Crs,
    /// Unique feature identifier, used to order features of equal area.
    pub id_field: Option<String>,
}

/// Caps the number of features per tile below a zoom threshold, keeping the
/// features with the largest bounding boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DensityPolicy {
    /// Zero means unlimited.
    pub max_items_per_tile: u32,
    pub disable_at_z: u8,
}

impl DensityPolicy {
    pub const DEFAULT_DISABLE_AT_Z: u8 = 6;

    pub fn unlimited() -> DensityPolicy {
        DensityPolicy {
            max_items_per_tile: 0,
            disable_at_z: DensityPolicy::DEFAULT_DISABLE_AT_Z,
        }
    }

    /// The cap in force at `zoom`, if any.
    pub fn limit_at(&self, zoom: u8) -> Option<u32> {
        if self.max_items_per_tile > 0 && zoom < self.disable_at_z {
            Some(self.max_items_per_tile)
        } else {
            None
        }
    }
}

impl Default for DensityPolicy {
    fn default() -> Self {
        DensityPolicy::unlimited()
    }
}

#[derive(Clone, Deserialize, Debug, Default)]
pub struct ProviderOptions {
    #[serde(default)]
    pub zoom: Option<ZoomRange>,
}

/// A provider definition as read from YAML.
#[derive(Clone, Deserialize, Debug)]
pub struct ProviderConfig {
    #[serde(default)]
    pub data: Option<DataSource>,
    pub table: String,
    #[serde(alias = "geom_field")]
    pub geometry_column: String,
    #[serde(default)]
    pub id_field: Option<String>,
    #[serde(default, alias = "properties")]
    pub fields: Vec<String>,
    pub storage_crs: Crs,
    #[serde(default)]
    pub layer: Option<String>,
    #[serde(default)]
    pub max_items_per_tile: u32,
    #[serde(default = "ProviderConfig::default_disable_at_z")]
    pub disable_at_z: u8,
    #[serde(default = "ProviderConfig::default_tiling_schemes")]
    pub tiling_schemes: Vec<String>,
    #[serde(default)]
    pub limits: HashMap<String, Vec<TileMatrixLimits>>,
    #[serde(default)]
    pub options: ProviderOptions,
}

impl ProviderConfig {
    fn default_disable_at_z() -> u8 {
        DensityPolicy::DEFAULT_DISABLE_AT_Z
    }

    fn default_tiling_schemes() -> Vec<String> {
        tms::builtin_ids().iter().map(|id| id.to_string()).collect()
    }

    /// Parses a provider definition from a YAML string.
    pub fn from(data: &str) -> Result<ProviderConfig> {
        let config: ProviderConfig = serde_yaml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<ProviderConfig> {
        let data = std::fs::read_to_string(path)?;
        ProviderConfig::from(&data)
    }

    fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(Error::Configuration(String::from("table must not be empty")));
        }
        if self.geometry_column.trim().is_empty() {
            return Err(Error::Configuration(String::from(
                "geometry_column must not be empty",
            )));
        }
        if self.tiling_schemes.is_empty() {
            return Err(Error::Configuration(String::from(
                "at least one tiling scheme is required",
            )));
        }
        if let Some(zoom) = self.options.zoom {
            if zoom.min > zoom.max {
                return Err(Error::Configuration(format!(
                    "zoom min {} is greater than zoom max {}",
                    zoom.min, zoom.max
                )));
            }
        }
        for tileset in self.limits.keys() {
            if !self.tiling_schemes.contains(tileset) {
                return Err(Error::Configuration(format!(
                    "limits given for tiling scheme {} which is not served",
                    tileset
                )));
            }
        }

        Ok(())
    }

    /// Layer name in encoded tiles. Defaults to the table name.
    pub fn layer(&self) -> &str {
        self.layer.as_deref().unwrap_or(&self.table)
    }

    pub fn feature_source(&self) -> FeatureSource {
        FeatureSource {
            table: self.table.clone(),
            geometry_column: self.geometry_column.clone(),
            fields: self.fields.clone(),
            storage_crs: self.storage_crs,
            id_field: self.id_field.clone(),
        }
    }

    pub fn density_policy(&self) -> DensityPolicy {
        DensityPolicy {
            max_items_per_tile: self.max_items_per_tile,
            disable_at_z: self.disable_at_z,
        }
    }

    pub fn registry(&self) -> Result<TilesetRegistry> {
        let mut registry = TilesetRegistry::from_ids(self.tiling_schemes.as_slice())?;
        if let Some(zoom) = self.options.zoom {
            registry = registry.with_zoom_range(zoom);
        }
        for (tileset, limits) in &self.limits {
            registry = registry.with_limits(tileset.clone(), limits.clone());
        }

        Ok(registry)
    }
}

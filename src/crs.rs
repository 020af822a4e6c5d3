//! Coordinate reference system identifiers.
//!
//! Tile matrix sets and provider definitions name their CRS with OGC URIs
//! (`http://www.opengis.net/def/crs/EPSG/0/3857`), URNs
//! (`urn:ogc:def:crs:EPSG::4326`) or the short `EPSG:4326` form. PostGIS only
//! needs the SRID, so that is all we keep.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::Error;

/// SRID PostGIS uses for OGC CRS84 (lon/lat WGS 84).
const CRS84_SRID: i32 = 4326;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Crs {
    srid: i32,
}

impl Crs {
    pub const WEB_MERCATOR: Crs = Crs { srid: 3857 };
    pub const CRS84: Crs = Crs { srid: CRS84_SRID };

    pub const fn from_srid(srid: i32) -> Crs {
        Crs { srid }
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }
}

impl FromStr for Crs {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = || Error::Configuration(format!("unrecognised CRS {:?}", value));

        // CRS84 is spelled a handful of ways, none of which carry an EPSG code
        if trimmed.ends_with("CRS84") {
            return Ok(Crs::CRS84);
        }

        let code = if let Some(rest) = trimmed.strip_prefix("http://www.opengis.net/def/crs/EPSG/") {
            // `{version}/{code}`, version is usually 0
            rest.rsplit('/').next()
        } else if let Some(rest) = trimmed.strip_prefix("urn:ogc:def:crs:EPSG:") {
            rest.rsplit(':').next()
        } else {
            trimmed
                .strip_prefix("EPSG:")
                .or_else(|| trimmed.strip_prefix("epsg:"))
        };

        let srid: i32 = code.ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        if srid <= 0 {
            return Err(invalid());
        }

        Ok(Crs { srid })
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.srid)
    }
}

impl<'de> Deserialize<'de> for Crs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

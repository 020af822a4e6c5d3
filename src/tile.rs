use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use crate::error::Error;

/// A cell of a tile matrix: zoom level, row and column.
///
/// All three components are wide signed integers so that any numeric request can
/// be represented, including negative or oversized indices. Those are turned away
/// by the limits check like any other tile outside the matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    pub z: i64,
    pub y: i64,
    pub x: i64,
}

impl TileCoordinate {
    pub fn new(z: u8, y: i64, x: i64) -> TileCoordinate {
        TileCoordinate {
            z: i64::from(z),
            y,
            x,
        }
    }

    /// The zoom level, if it can name a tile matrix at all.
    pub fn zoom(&self) -> Option<u8> {
        u8::try_from(self.z).ok()
    }

    /// Parses the path segments of a tile request.
    ///
    /// Only non-integer input is an error. Integers too large for `i64` saturate,
    /// which puts them outside every tile matrix.
    pub fn parse(z: &str, y: &str, x: &str) -> Result<TileCoordinate, Error> {
        fn component(name: &str, value: &str) -> Result<i64, Error> {
            match value.trim().parse::<i64>() {
                Ok(parsed) => Ok(parsed),
                Err(e) => match e.kind() {
                    IntErrorKind::PosOverflow => Ok(i64::MAX),
                    IntErrorKind::NegOverflow => Ok(i64::MIN),
                    _ => Err(Error::InvalidCoordinate(format!(
                        "{} must be an integer, got {:?}",
                        name, value
                    ))),
                },
            }
        }

        Ok(TileCoordinate {
            z: component("z", z)?,
            y: component("y", y)?,
            x: component("x", x)?,
        })
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.y, self.x)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileFormat {
    Mvt,
}

impl TileFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            TileFormat::Mvt => "application/vnd.mapbox-vector-tile",
        }
    }
}

impl FromStr for TileFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "mvt" | "pbf" | "application/vnd.mapbox-vector-tile" => Ok(TileFormat::Mvt),
            _ => Err(Error::UnsupportedFormat(value.to_string())),
        }
    }
}

/// One tile request. Transient.
#[derive(Clone, Debug, PartialEq)]
pub struct TileRequest {
    /// Layer name to encode under; the provider's configured layer if `None`.
    pub layer: Option<String>,
    pub tileset: String,
    pub coord: TileCoordinate,
    pub format: TileFormat,
}

/// Outcome of a tile request.
///
/// `Empty` and `NotFound` are deliberately distinct: a tile inside the matrix with
/// no intersecting features is valid content, a tile outside it does not exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileResponse {
    Tile(Vec<u8>),
    Empty,
    NotFound,
}

impl TileResponse {
    /// Tile bytes to send, an empty body for `Empty`, nothing for `NotFound`.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            TileResponse::Tile(bytes) => Some(bytes),
            TileResponse::Empty => Some(Vec::new()),
            TileResponse::NotFound => None,
        }
    }
}

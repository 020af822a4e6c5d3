//! Backend-independent description of a tile query.
//!
//! A [`TilePlan`] always has the same shape: keep features intersecting the tile
//! envelope, optionally rank them by bounding-box area and cap the count, project
//! the configured fields next to the tile geometry, and encode everything as a
//! single layer. Backends are free to express that however they like, as long as
//! the whole plan runs as one round trip.
use std::cmp::Ordering;

use crate::config::{DensityPolicy, FeatureSource};
use crate::crs::Crs;
use crate::envelope::Envelope;
use crate::TileFormat;

/// Keep only the `limit` features with the largest bounding boxes.
#[derive(Clone, Debug, PartialEq)]
pub struct AreaRanking {
    pub limit: u32,
    /// Secondary ascending sort key for features of equal area.
    pub tie_breaker: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TilePlan<'a> {
    pub source: &'a FeatureSource,
    /// Tile envelope in the CRS of the tiling scheme. Used to filter candidate
    /// rows (after transforming it into the storage CRS) and to clip geometry.
    pub envelope: Envelope,
    /// CRS encoded geometry is transformed into; curves are linearized first.
    pub output_crs: Crs,
    pub ranking: Option<AreaRanking>,
    pub layer: &'a str,
    pub format: TileFormat,
}

impl<'a> TilePlan<'a> {
    pub fn new(
        source: &'a FeatureSource,
        policy: &DensityPolicy,
        zoom: u8,
        envelope: Envelope,
        layer: &'a str,
        format: TileFormat,
    ) -> TilePlan<'a> {
        let ranking = policy.limit_at(zoom).map(|limit| AreaRanking {
            limit,
            tie_breaker: source.id_field.clone(),
        });

        TilePlan {
            source,
            envelope,
            output_crs: envelope.crs,
            ranking,
            layer,
            format,
        }
    }

    /// Attribute columns projected next to the geometry.
    pub fn projection(&self) -> &[String] {
        &self.source.fields
    }
}

/// Axis-aligned bounding box of a candidate feature, in storage CRS units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn area(&self) -> f64 {
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }
}

/// A feature as seen by the ranking step.
pub trait Ranked {
    type Key: Ord;

    fn bbox(&self) -> BoundingBox;
    fn key(&self) -> Self::Key;
}

/// Applies [`AreaRanking`] in memory, for backends that cannot push the ranking
/// down into the query.
///
/// Features are ordered by bounding-box area, largest first, then by key
/// ascending; the sort is stable so features with equal area and key keep their
/// input order. Without a ranking the candidates are returned untouched.
pub fn rank_by_area<T: Ranked>(mut candidates: Vec<T>, ranking: Option<&AreaRanking>) -> Vec<T> {
    let ranking = match ranking {
        Some(ranking) => ranking,
        None => return candidates,
    };

    candidates.sort_by(|a, b| {
        b.bbox()
            .area()
            .partial_cmp(&a.bbox().area())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key().cmp(&b.key()))
    });
    candidates.truncate(ranking.limit as usize);

    candidates
}

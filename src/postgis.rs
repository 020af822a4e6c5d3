//! PostGIS tile backend
//!
//! Renders a [`TilePlan`] into one `ST_AsMVT` statement, so filtering, ranking and
//! encoding all happen inside the database and only the finished tile crosses the
//! wire.
use crate::config::DataSource;
use crate::error::Result;
use crate::plan::TilePlan;
use crate::TileBackend;

// TODO: remove once async fn in traits become stable
use async_trait::async_trait;

use futures::TryStreamExt;
use log::{debug, info};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{query, PgPool, Row};

/// Quotes a possibly schema-qualified identifier for use in SQL.
fn quote_ident(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Builds the tile statement for a plan.
///
/// Parameters: `$1..$4` are the envelope corners (west, south, east, north) in
/// the scheme CRS, `$5` the layer name and, when the plan ranks features, `$6`
/// the feature cap. Ranked statements always have a total order, so the same
/// features are kept on every request.
pub fn tile_sql(plan: &TilePlan<'_>) -> String {
    let source = plan.source;
    let geom = format!("t.{}", quote_ident(&source.geometry_column));
    let envelope = format!(
        "ST_MakeEnvelope($1, $2, $3, $4, {})",
        plan.envelope.crs.srid()
    );
    let out_srid = plan.output_crs.srid();

    let clipped = format!(
        "ST_AsMVTGeom(ST_Transform(ST_CurveToLine({geom}), {out}), ST_Transform({env}, {out}))",
        geom = geom,
        env = envelope,
        out = out_srid
    );

    let mut columns = vec![format!("{} AS mvtgeom", clipped)];
    columns.extend(
        plan.projection()
            .iter()
            .map(|field| format!("t.{}", quote_ident(field))),
    );

    // Features that clip away to nothing must not take a slot under the cap
    let mut rows = format!(
        "SELECT {} FROM {} AS t WHERE ST_Intersects({}, ST_Transform({}, {})) AND {} IS NOT NULL",
        columns.join(", "),
        quote_ident(&source.table),
        geom,
        envelope,
        source.storage_crs.srid(),
        clipped
    );

    if let Some(ranking) = &plan.ranking {
        rows.push_str(&format!(
            " ORDER BY (ST_XMax({geom}) - ST_XMin({geom})) * (ST_YMax({geom}) - ST_YMin({geom})) DESC",
            geom = geom
        ));
        match &ranking.tie_breaker {
            Some(key) => rows.push_str(&format!(", t.{} ASC", quote_ident(key))),
            // Without a key column the geometry itself orders features of equal area
            None => rows.push_str(&format!(", ST_AsEWKB({}) ASC", geom)),
        }
        rows.push_str(" LIMIT $6");
    }

    format!(
        "WITH mvtrow AS ({}) SELECT ST_AsMVT(mvtrow.*, $5::text, 4096, 'mvtgeom') FROM mvtrow",
        rows
    )
}

/// Executes tile plans against a PostGIS connection pool.
///
/// Each render checks out one pooled connection for the duration of the statement;
/// it goes back to the pool when the render finishes, fails, or is dropped.
#[derive(Clone, Debug)]
pub struct PostgisBackend {
    pool: PgPool,
}

impl PostgisBackend {
    pub fn new(pool: PgPool) -> PostgisBackend {
        PostgisBackend { pool }
    }

    /// Opens a pool from a provider's `data` block.
    pub async fn connect(source: &DataSource) -> Result<PostgisBackend> {
        let mut options = PgConnectOptions::new()
            .host(&source.host)
            .port(source.port)
            .database(&source.dbname)
            .username(&source.user);
        if let Some(password) = &source.password {
            options = options.password(password);
        }
        if !source.search_path.is_empty() {
            options = options.options([("search_path", source.search_path.join(","))]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(source.max_connections)
            .connect_with(options)
            .await?;
        info!(
            "Connected to {}:{}/{} with up to {} connections",
            source.host, source.port, source.dbname, source.max_connections
        );

        Ok(PostgisBackend { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TileBackend for PostgisBackend {
    async fn render(&self, plan: &TilePlan<'_>) -> Result<Vec<u8>> {
        let sql = tile_sql(plan);
        debug!("Tile query for layer {}: {}", plan.layer, sql);

        let mut conn = self.pool.acquire().await?;
        let envelope = &plan.envelope;
        let mut statement = query(&sql)
            .bind(envelope.min_x)
            .bind(envelope.min_y)
            .bind(envelope.max_x)
            .bind(envelope.max_y)
            .bind(plan.layer);
        if let Some(ranking) = &plan.ranking {
            statement = statement.bind(i64::from(ranking.limit));
        }

        let mut raw_tile: Vec<u8> = Vec::new();
        let mut stream = statement.fetch(&mut *conn);
        while let Some(row) = stream.try_next().await? {
            // ST_AsMVT yields NULL rather than an empty tile on some PostGIS versions
            let layer: Option<Vec<u8>> = row.try_get(0)?;
            if let Some(layer) = layer {
                raw_tile.extend_from_slice(&layer);
            }
        }

        Ok(raw_tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DensityPolicy, FeatureSource};
    use crate::crs::Crs;
    use crate::envelope::envelope;
    use crate::tms::{builtin, WEB_MERCATOR_QUAD, WORLD_CRS84_QUAD};
    use crate::{TileCoordinate, TileFormat};

    fn source() -> FeatureSource {
        FeatureSource {
            table: String::from("osm.hotosm_bdi_waterways"),
            geometry_column: String::from("foo_geom"),
            fields: vec![String::from("name"), String::from("waterway")],
            storage_crs: Crs::CRS84,
            id_field: Some(String::from("osm_id")),
        }
    }

    fn policy() -> DensityPolicy {
        DensityPolicy {
            max_items_per_tile: 50,
            disable_at_z: 6,
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!("\"waterways\"", quote_ident("waterways"));
        assert_eq!("\"osm\".\"waterways\"", quote_ident("osm.waterways"));
        assert_eq!("\"odd\"\"name\"", quote_ident("odd\"name"));
    }

    #[test]
    fn test_generate_unranked_sql() {
        let source = source();
        let tms = builtin(WEB_MERCATOR_QUAD).unwrap();
        let coord = TileCoordinate::new(10, 384, 384);
        let env = envelope(tms, &coord).unwrap();
        let plan = TilePlan::new(&source, &policy(), coord.zoom().unwrap(), env, "waterways", TileFormat::Mvt);

        let sql = tile_sql(&plan);

        assert!(sql.starts_with("WITH mvtrow AS (SELECT ST_AsMVTGeom("));
        assert!(sql.contains(
            "ST_AsMVTGeom(ST_Transform(ST_CurveToLine(t.\"foo_geom\"), 3857), \
             ST_Transform(ST_MakeEnvelope($1, $2, $3, $4, 3857), 3857)) AS mvtgeom"
        ));
        assert!(sql.contains("t.\"name\", t.\"waterway\" FROM \"osm\".\"hotosm_bdi_waterways\" AS t"));
        assert!(sql.contains(
            "WHERE ST_Intersects(t.\"foo_geom\", ST_Transform(ST_MakeEnvelope($1, $2, $3, $4, 3857), 4326)) \
             AND ST_AsMVTGeom(ST_Transform(ST_CurveToLine(t.\"foo_geom\"), 3857), \
             ST_Transform(ST_MakeEnvelope($1, $2, $3, $4, 3857), 3857)) IS NOT NULL)"
        ));
        assert!(sql.ends_with("SELECT ST_AsMVT(mvtrow.*, $5::text, 4096, 'mvtgeom') FROM mvtrow"));

        assert!(!sql.contains("ORDER BY"));
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("$6"));
    }

    #[test]
    fn test_generate_ranked_sql() {
        let source = source();
        let tms = builtin(WEB_MERCATOR_QUAD).unwrap();
        let coord = TileCoordinate::new(2, 1, 1);
        let env = envelope(tms, &coord).unwrap();
        let plan = TilePlan::new(&source, &policy(), coord.zoom().unwrap(), env, "waterways", TileFormat::Mvt);

        let sql = tile_sql(&plan);

        assert!(sql.contains("IS NOT NULL ORDER BY"));
        assert!(sql.contains(
            "ORDER BY (ST_XMax(t.\"foo_geom\") - ST_XMin(t.\"foo_geom\")) * \
             (ST_YMax(t.\"foo_geom\") - ST_YMin(t.\"foo_geom\")) DESC, t.\"osm_id\" ASC LIMIT $6)"
        ));
    }

    #[test]
    fn test_ranked_sql_without_id_field() {
        let mut source = source();
        source.id_field = None;
        let tms = builtin(WEB_MERCATOR_QUAD).unwrap();
        let coord = TileCoordinate::new(0, 0, 0);
        let env = envelope(tms, &coord).unwrap();
        let plan = TilePlan::new(&source, &policy(), coord.zoom().unwrap(), env, "waterways", TileFormat::Mvt);

        let sql = tile_sql(&plan);
        assert!(sql.contains("DESC, ST_AsEWKB(t.\"foo_geom\") ASC LIMIT $6)"));
        assert!(!sql.contains("DESC LIMIT"));
    }

    #[test]
    fn test_generate_crs84_sql() {
        let mut source = source();
        source.fields.clear();
        let tms = builtin(WORLD_CRS84_QUAD).unwrap();
        let coord = TileCoordinate::new(8, 10, 20);
        let env = envelope(tms, &coord).unwrap();
        let plan = TilePlan::new(&source, &policy(), coord.zoom().unwrap(), env, "rivers", TileFormat::Mvt);

        let sql = tile_sql(&plan);

        assert!(sql.contains("ST_Transform(ST_CurveToLine(t.\"foo_geom\"), 4326)"));
        assert!(sql.contains("ST_MakeEnvelope($1, $2, $3, $4, 4326)"));
        assert!(sql.contains("AS mvtgeom FROM"));
    }
}

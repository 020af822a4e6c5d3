//! Runs the generated SQL against a real PostGIS database.
//!
//! Ignored by default. Point `DATABASE_URL` at a database with the `postgis`
//! extension installed and run `cargo test -- --ignored`.
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use tile_conjurer::registry::TilesetRegistry;
use tile_conjurer::tms::{self, WEB_MERCATOR_QUAD};
use tile_conjurer::{
    Crs, DensityPolicy, FeatureSource, PostgisBackend, ProviderContext, TileFormat,
    TileQueryEngine, TileResponse,
};

async fn connect() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    // One connection, so temporary tables are visible to every query
    PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("Unable to connect to the test database")
}

fn engine_for(
    pool: PgPool,
    table: &str,
    id_field: Option<&str>,
    policy: DensityPolicy,
) -> TileQueryEngine<PostgisBackend> {
    let context = ProviderContext {
        registry: TilesetRegistry::from_ids(&tms::builtin_ids()).unwrap(),
        source: FeatureSource {
            table: table.to_string(),
            geometry_column: String::from("geom"),
            fields: vec![String::from("name")],
            storage_crs: Crs::CRS84,
            id_field: id_field.map(str::to_string),
        },
        policy,
        layer: table.to_string(),
    };

    TileQueryEngine::new(context, PostgisBackend::new(pool))
}

async fn engine(policy: DensityPolicy) -> TileQueryEngine<PostgisBackend> {
    let pool = connect().await;

    sqlx::query(
        "CREATE TEMPORARY TABLE waterways (osm_id bigint PRIMARY KEY, name text, geom geometry(Geometry, 4326))",
    )
    .execute(&pool)
    .await
    .unwrap();

    // Three lines inside tile 10/384/384 of WebMercatorQuad, one far away
    sqlx::query(
        "INSERT INTO waterways VALUES \
         (1, 'short', ST_SetSRID(ST_MakeLine(ST_Point(-44.9, 40.9), ST_Point(-44.85, 40.85)), 4326)), \
         (2, 'long', ST_SetSRID(ST_MakeLine(ST_Point(-44.95, 40.95), ST_Point(-44.7, 40.76)), 4326)), \
         (3, 'curvy', ST_GeomFromText('CIRCULARSTRING(-44.9 40.9, -44.88 40.92, -44.86 40.9)', 4326)), \
         (4, 'elsewhere', ST_SetSRID(ST_MakeLine(ST_Point(100, -10), ST_Point(101, -11)), 4326))",
    )
    .execute(&pool)
    .await
    .unwrap();

    engine_for(pool, "waterways", Some("osm_id"), policy)
}

/// Five points inside tile 10/384/384. Every bounding box has zero area, so the
/// density cap has to choose among equals.
async fn points_engine(id_field: Option<&str>, policy: DensityPolicy) -> TileQueryEngine<PostgisBackend> {
    let pool = connect().await;

    sqlx::query("CREATE TEMPORARY TABLE points (gid integer PRIMARY KEY, name text, geom geometry(Point, 4326))")
        .execute(&pool)
        .await
        .unwrap();

    // Inserted out of id order so heap order and id order differ
    sqlx::query(
        "INSERT INTO points VALUES \
         (4, 'point-d', ST_SetSRID(ST_Point(-44.75, 40.85), 4326)), \
         (2, 'point-b', ST_SetSRID(ST_Point(-44.85, 40.85), 4326)), \
         (5, 'point-e', ST_SetSRID(ST_Point(-44.7, 40.85), 4326)), \
         (1, 'point-a', ST_SetSRID(ST_Point(-44.9, 40.85), 4326)), \
         (3, 'point-c', ST_SetSRID(ST_Point(-44.8, 40.85), 4326))",
    )
    .execute(&pool)
    .await
    .unwrap();

    engine_for(pool, "points", id_field, policy)
}

const POINT_NAMES: [&str; 5] = ["point-a", "point-b", "point-c", "point-d", "point-e"];

fn names_in(tile: &[u8]) -> Vec<&'static str> {
    let tile = String::from_utf8_lossy(tile);
    POINT_NAMES
        .iter()
        .copied()
        .filter(|name| tile.contains(name))
        .collect()
}

#[tokio::test]
#[ignore]
async fn test_render_tile() {
    let engine = engine(DensityPolicy::unlimited()).await;

    let tile = engine
        .get_tile(None, WEB_MERCATOR_QUAD, "10", "384", "384", TileFormat::Mvt)
        .await
        .unwrap();
    match tile {
        TileResponse::Tile(bytes) => assert!(!bytes.is_empty()),
        other => panic!("expected a tile, got {:?}", other),
    }

    let first = engine
        .get_tile(None, WEB_MERCATOR_QUAD, "10", "384", "384", TileFormat::Mvt)
        .await
        .unwrap();
    let second = engine
        .get_tile(None, WEB_MERCATOR_QUAD, "10", "384", "384", TileFormat::Mvt)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
#[ignore]
async fn test_render_empty_tile() {
    let engine = engine(DensityPolicy::unlimited()).await;

    let tile = engine
        .get_tile(None, WEB_MERCATOR_QUAD, "10", "0", "0", TileFormat::Mvt)
        .await
        .unwrap();
    assert_eq!(TileResponse::Empty, tile);
}

#[tokio::test]
#[ignore]
async fn test_render_ranked_tile() {
    let policy = DensityPolicy {
        max_items_per_tile: 1,
        disable_at_z: 12,
    };
    let engine = engine(policy).await;

    let capped = engine
        .get_tile(None, WEB_MERCATOR_QUAD, "10", "384", "384", TileFormat::Mvt)
        .await
        .unwrap()
        .into_bytes()
        .unwrap();
    let full = engine
        .get_tile(None, WEB_MERCATOR_QUAD, "12", "1536", "1536", TileFormat::Mvt)
        .await
        .unwrap()
        .into_bytes()
        .unwrap();

    // Only the longest line survives the cap
    let capped = String::from_utf8_lossy(&capped);
    assert!(capped.contains("long"));
    assert!(!capped.contains("short"));
    assert!(!capped.contains("curvy"));
    assert!(!full.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_equal_area_cap_is_stable_without_id_field() {
    let policy = DensityPolicy {
        max_items_per_tile: 2,
        disable_at_z: 12,
    };
    let engine = points_engine(None, policy).await;

    let first = engine
        .get_tile(None, WEB_MERCATOR_QUAD, "10", "384", "384", TileFormat::Mvt)
        .await
        .unwrap()
        .into_bytes()
        .unwrap();
    assert_eq!(2, names_in(&first).len());

    for _ in 0..5 {
        let again = engine
            .get_tile(None, WEB_MERCATOR_QUAD, "10", "384", "384", TileFormat::Mvt)
            .await
            .unwrap()
            .into_bytes()
            .unwrap();
        assert_eq!(first, again);
    }
}

#[tokio::test]
#[ignore]
async fn test_equal_area_cap_keeps_lowest_ids() {
    let policy = DensityPolicy {
        max_items_per_tile: 2,
        disable_at_z: 12,
    };
    let engine = points_engine(Some("gid"), policy).await;

    let tile = engine
        .get_tile(None, WEB_MERCATOR_QUAD, "10", "384", "384", TileFormat::Mvt)
        .await
        .unwrap()
        .into_bytes()
        .unwrap();
    assert_eq!(vec!["point-a", "point-b"], names_in(&tile));

    let uncapped = points_engine(Some("gid"), DensityPolicy::unlimited()).await;
    let full = uncapped
        .get_tile(None, WEB_MERCATOR_QUAD, "10", "384", "384", TileFormat::Mvt)
        .await
        .unwrap()
        .into_bytes()
        .unwrap();
    assert_eq!(POINT_NAMES.to_vec(), names_in(&full));
}

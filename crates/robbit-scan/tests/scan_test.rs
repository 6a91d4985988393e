//! End-to-end scans against the in-memory store and a fake search

use async_trait::async_trait;
use geo::{polygon, MultiPolygon};
use robbit_core::config::Settings;
use robbit_core::models::{
    BoundingBox, PhotoRecord, ScanArea, SearchPage, Tile, TileKey, TileStatus, MAX_DEPTH,
};
use robbit_flickr::{FlickrError, PhotoSearch};
use robbit_scan::{LevelSummary, ScanError, ScanObserver, Scanner, TileOutcome};
use robbit_store::{AreaStore, ImageStore, MemoryStore, TileStore};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

type Responder = dyn Fn(&BoundingBox, u32) -> robbit_flickr::Result<SearchPage> + Send + Sync;

struct FakeSearch {
    respond: Box<Responder>,
    calls: AtomicUsize,
}

impl FakeSearch {
    fn new(respond: impl Fn(&BoundingBox, u32) -> robbit_flickr::Result<SearchPage> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self { respond: Box::new(respond), calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoSearch for FakeSearch {
    async fn search(&self, bbox: &BoundingBox, page: u32, _extras: &[String]) -> robbit_flickr::Result<SearchPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(bbox, page)
    }

    fn key_count(&self) -> usize {
        2
    }
}

fn photo(id: i64, lon: f64, lat: f64) -> PhotoRecord {
    serde_json::from_value(json!({
        "id": id.to_string(),
        "longitude": lon.to_string(),
        "latitude": lat.to_string(),
        "datetaken": "2019-07-17 10:48:00",
        "count_faves": "3",
    }))
    .unwrap()
}

/// Search over a fixed set of photos; boundaries are inclusive so edge photos
/// show up in every touching tile
fn world(photos: Vec<(i64, f64, f64)>, per_page: usize) -> impl Fn(&BoundingBox, u32) -> robbit_flickr::Result<SearchPage> {
    move |bbox: &BoundingBox, page: u32| {
        let hits: Vec<PhotoRecord> = photos
            .iter()
            .filter(|(_, lon, lat)| {
                bbox.low.lon <= *lon && *lon <= bbox.high.lon && bbox.low.lat <= *lat && *lat <= bbox.high.lat
            })
            .map(|(id, lon, lat)| photo(*id, *lon, *lat))
            .collect();
        let total = hits.len();
        let start = (page as usize - 1) * per_page;
        Ok(SearchPage {
            total_results: total as u64,
            total_pages: total.div_ceil(per_page) as u32,
            records: hits.into_iter().skip(start).take(per_page).collect(),
        })
    }
}

fn settings() -> Settings {
    Settings {
        api_keys: vec!["test".to_string()],
        per_page: 10,
        max_results_multiplier: 2,
        ..Settings::default()
    }
}

fn france() -> ScanArea {
    let outline = polygon![
        (x: -5.0, y: 41.0),
        (x: 10.0, y: 41.0),
        (x: 10.0, y: 51.0),
        (x: -5.0, y: 51.0),
        (x: -5.0, y: 41.0),
    ];
    ScanArea::new("france", MultiPolygon::new(vec![outline])).unwrap()
}

fn earth() -> ScanArea {
    let outline = polygon![
        (x: -180.0, y: -90.0),
        (x: 180.0, y: -90.0),
        (x: 180.0, y: 90.0),
        (x: -180.0, y: 90.0),
        (x: -180.0, y: -90.0),
    ];
    ScanArea::new("earth", MultiPolygon::new(vec![outline])).unwrap()
}

async fn store_with(areas: &[ScanArea]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for area in areas {
        store.put_area(area).await.unwrap();
    }
    store
}

fn scanner(search: Arc<FakeSearch>, store: &Arc<MemoryStore>, settings: Settings) -> Scanner {
    Scanner::new(search, store.clone(), store.clone(), store.clone(), settings)
}

/// 50 photos spread around Paris
fn paris_cluster() -> Vec<(i64, f64, f64)> {
    (0..50).map(|i| (1000 + i, 2.05 + (i % 10) as f64 * 0.08, 48.52 + (i / 10) as f64 * 0.07)).collect()
}

#[tokio::test]
async fn test_unknown_area_fails_before_any_work() {
    let store = store_with(&[]).await;
    let search = FakeSearch::new(world(vec![], 10));

    let err = scanner(search.clone(), &store, settings())
        .scan("atlantis", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::UnknownArea(name) if name == "atlantis"));
    assert_eq!(search.calls(), 0);
    assert!(store.tiles().is_empty());
}

#[tokio::test]
async fn test_invalid_settings_are_a_config_error() {
    let store = store_with(&[france()]).await;
    let search = FakeSearch::new(world(vec![], 10));
    let bad = Settings { workers_per_key: 0, ..settings() };

    let err = scanner(search.clone(), &store, bad).scan("france", &CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, ScanError::Config(_)));
    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn test_sparse_world_is_harvested_at_the_root() {
    let store = store_with(&[earth()]).await;
    let photos = vec![(1, 2.35, 48.85), (2, -73.98, 40.75), (3, 139.69, 35.68)];
    let search = FakeSearch::new(world(photos, 10));

    let report = scanner(search.clone(), &store, settings()).scan("earth", &CancellationToken::new()).await.unwrap();

    assert_eq!(search.calls(), 1);
    assert_eq!(report.levels.len(), 1);
    assert_eq!(report.levels[0].contained, 1);
    assert_eq!(report.images_inserted(), 3);
    assert!(report.is_complete());
    assert_eq!(store.get_tile(TileKey::root()).await.unwrap().unwrap().status, TileStatus::Contained);

    let image = &store.images()[0];
    assert_eq!(image.external_id, 1);
    assert_eq!(image.popularity, 3);
    assert!(image.date_taken.is_some());
}

#[tokio::test]
async fn test_forty_results_harvest_one_page() {
    let store = store_with(&[france()]).await;
    let photos: Vec<(i64, f64, f64)> = (0..40).map(|i| (i, 2.0 + i as f64 * 0.01, 48.0)).collect();
    let search = FakeSearch::new(world(photos, 250));
    let defaults = Settings { api_keys: vec!["test".to_string()], ..Settings::default() };
    assert_eq!(defaults.max_search_results(), 2000);

    let report = scanner(search.clone(), &store, defaults).scan("france", &CancellationToken::new()).await.unwrap();

    assert_eq!(search.calls(), 1);
    assert_eq!(store.count_images().await.unwrap(), 40);
    assert_eq!(report.levels[0].split, 0);
    assert_eq!(store.get_tile(TileKey::root()).await.unwrap().unwrap().status, TileStatus::Contained);
}

#[tokio::test]
async fn test_dense_area_is_split_until_harvestable() {
    let store = store_with(&[france()]).await;
    let search = FakeSearch::new(world(paris_cluster(), 10));

    let report = scanner(search, &store, settings()).scan("france", &CancellationToken::new()).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.levels[0].split, 1);
    assert!(report.levels.len() > 2);
    assert_eq!(store.count_images().await.unwrap(), 50);
    assert_eq!(report.images_inserted(), 50);

    let area = france();
    for tile in store.tiles() {
        let intersects = store.area_intersects(&area.name, &tile.bbox()).await.unwrap();
        if intersects {
            assert_ne!(tile.status, TileStatus::ToProbe, "tile {} left {}", tile.key, tile.status);
        }
        if tile.status == TileStatus::Split {
            // Only tiles that really were over capacity were split
            let inside = paris_cluster()
                .iter()
                .filter(|(_, lon, lat)| tile.bbox().contains(robbit_core::models::Coordinate::new(*lon, *lat)))
                .count();
            assert!(inside > 20, "tile {} split with only {} photos", tile.key, inside);
        }
    }
}

#[tokio::test]
async fn test_tiles_outside_the_area_are_left_alone() {
    let store = store_with(&[france()]).await;
    let search = FakeSearch::new(world(paris_cluster(), 10));

    scanner(search, &store, settings()).scan("france", &CancellationToken::new()).await.unwrap();

    // Depth 1: only the north-east quarter touches France
    let level_one: Vec<Tile> = store.tiles().into_iter().filter(|t| t.key.depth == 1).collect();
    assert_eq!(level_one.len(), 4);
    let untouched = level_one.iter().filter(|t| t.status == TileStatus::ToProbe).count();
    assert_eq!(untouched, 2);
}

#[tokio::test]
async fn test_photo_on_a_tile_corner_is_stored_once() {
    let store = store_with(&[earth()]).await;
    // Dense enough to split the root; one photo sits where the four children meet
    let mut photos: Vec<(i64, f64, f64)> = (0..25).map(|i| (i, 100.0 + i as f64, 30.0)).collect();
    photos.push((999, 0.0, 0.0));
    let search = FakeSearch::new(world(photos, 10));

    let report = scanner(search, &store, settings()).scan("earth", &CancellationToken::new()).await.unwrap();

    let ids: Vec<i64> = store.images().iter().map(|i| i.external_id).collect();
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());
    assert!(unique.contains(&999));
    assert_eq!(report.images_inserted(), 26);
}

#[tokio::test]
async fn test_rerun_after_completion_does_nothing() {
    let store = store_with(&[france()]).await;
    let search = FakeSearch::new(world(paris_cluster(), 10));
    scanner(search, &store, settings()).scan("france", &CancellationToken::new()).await.unwrap();
    let tiles_before = store.tiles();

    let search = FakeSearch::new(world(paris_cluster(), 10));
    let report = scanner(search.clone(), &store, settings()).scan("france", &CancellationToken::new()).await.unwrap();

    assert_eq!(search.calls(), 0);
    assert_eq!(report.images_inserted(), 0);
    assert!(report.levels.iter().all(|l| l.relevant == 0));
    assert_eq!(store.tiles(), tiles_before);
}

#[tokio::test]
async fn test_malformed_record_is_skipped() {
    let store = store_with(&[earth()]).await;
    let search = FakeSearch::new(|_, _| {
        let mut records: Vec<PhotoRecord> = (1..=9).map(|i| photo(i, 1.0, 1.0)).collect();
        records.push(
            serde_json::from_value(json!({
                "id": "10", "longitude": "1.0", "latitude": "1.0", "datetaken": "yesterday-ish",
            }))
            .unwrap(),
        );
        Ok(SearchPage { total_results: 10, total_pages: 1, records })
    });

    let report = scanner(search, &store, settings()).scan("earth", &CancellationToken::new()).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(store.count_images().await.unwrap(), 9);
}

#[tokio::test]
async fn test_failing_tile_stays_to_probe_and_resumes() {
    let store = store_with(&[earth()]).await;
    let photos: Vec<(i64, f64, f64)> = (0..30).map(|i| (i, -170.0 + i as f64 * 11.0, 10.0)).collect();
    // Depth-1 tile (1, 1) is the north-east quarter
    let broken = TileKey::new(1, 1, 1).unwrap().bbox();

    let failing = {
        let inner = world(photos.clone(), 10);
        FakeSearch::new(move |bbox, page| {
            if *bbox == broken {
                return Err(FlickrError::ServiceUnavailable { attempts: 100, status: 500 });
            }
            inner(bbox, page)
        })
    };

    let report = scanner(failing, &store, settings()).scan("earth", &CancellationToken::new()).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert!(!report.is_complete());
    let broken_tile = store.get_tile(TileKey::new(1, 1, 1).unwrap()).await.unwrap().unwrap();
    assert_eq!(broken_tile.status, TileStatus::ToProbe);
    for sibling in TileKey::root().children().unwrap().into_iter().filter(|k| (k.x, k.y) != (1, 1)) {
        let tile = store.get_tile(sibling).await.unwrap().unwrap();
        assert_eq!(tile.status, TileStatus::Contained);
    }
    let stored_before = store.count_images().await.unwrap();

    // The service recovers: only the failed tile is probed again
    let search = FakeSearch::new(world(photos, 10));
    let report = scanner(search.clone(), &store, settings()).scan("earth", &CancellationToken::new()).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.levels[0].level, 1);
    assert_eq!(report.levels[0].relevant, 1);
    assert_eq!(store.count_images().await.unwrap(), 30);
    assert!(store.count_images().await.unwrap() > stored_before);
}

#[tokio::test]
async fn test_max_depth_tile_keeps_first_results() {
    let store = store_with(&[earth()]).await;
    store.put_tile(Tile { key: TileKey::root(), parent: None, status: TileStatus::Contained });

    let size = 1u32 << MAX_DEPTH;
    let x = ((2.35 + 180.0) / 360.0 * size as f64) as u32;
    let y = ((48.85 + 90.0) / 180.0 * size as f64) as u32;
    let key = TileKey::new(MAX_DEPTH, x, y).unwrap();
    store.put_tile(Tile { key, parent: key.parent(), status: TileStatus::ToProbe });

    // 100 distinct photos in a 10-per-page listing
    let search = FakeSearch::new(move |bbox, page| {
        let center = (bbox.low.lon + bbox.width() / 2.0, bbox.low.lat + bbox.height() / 2.0);
        let records = (0..10).map(|i| photo(page as i64 * 100 + i, center.0, center.1)).collect();
        Ok(SearchPage { total_results: 100, total_pages: 10, records })
    });

    let report = scanner(search.clone(), &store, settings()).scan("earth", &CancellationToken::new()).await.unwrap();

    // Threshold is 20: two pages fetched, no children created
    assert_eq!(search.calls(), 2);
    assert_eq!(store.count_images().await.unwrap(), 20);
    assert_eq!(store.get_tile(key).await.unwrap().unwrap().status, TileStatus::Contained);
    assert_eq!(store.tiles().len(), 2);
    assert_eq!(report.levels.last().map(|l| l.level), Some(MAX_DEPTH));
}

#[tokio::test]
async fn test_cancelled_scan_starts_nothing() {
    let store = store_with(&[earth()]).await;
    let search = FakeSearch::new(world(vec![(1, 0.5, 0.5)], 10));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = scanner(search.clone(), &store, settings()).scan("earth", &cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(search.calls(), 0);
    assert_eq!(store.get_tile(TileKey::root()).await.unwrap().unwrap().status, TileStatus::ToProbe);

    // A later run picks it up
    let report = scanner(search.clone(), &store, settings()).scan("earth", &CancellationToken::new()).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(store.count_images().await.unwrap(), 1);
}

/// Single-key search that cancels the scan while its first request is in flight
struct CancellingSearch {
    cancel: CancellationToken,
    calls: AtomicUsize,
}

#[async_trait]
impl PhotoSearch for CancellingSearch {
    async fn search(&self, bbox: &BoundingBox, _page: u32, _extras: &[String]) -> robbit_flickr::Result<SearchPage> {
        let id = self.calls.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        self.cancel.cancel();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let lon = (bbox.low.lon + bbox.high.lon) / 2.0;
        let lat = (bbox.low.lat + bbox.high.lat) / 2.0;
        Ok(SearchPage { total_results: 1, total_pages: 1, records: vec![photo(id, lon, lat)] })
    }

    fn key_count(&self) -> usize {
        1
    }
}

#[tokio::test]
async fn test_cancel_mid_level_finishes_running_tile() {
    let store = store_with(&[earth()]).await;
    store.ensure_root().await.unwrap();
    store.need_children(TileKey::root()).await.unwrap();

    let cancel = CancellationToken::new();
    let search = Arc::new(CancellingSearch { cancel: cancel.clone(), calls: AtomicUsize::new(0) });
    let settings = Settings { workers_per_key: 1, ..settings() };
    let scanner = Scanner::new(search.clone(), store.clone(), store.clone(), store.clone(), settings);
    assert_eq!(scanner.workers(), 1);

    let report = scanner.scan("earth", &cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.count_images().await.unwrap(), 1);

    let statuses: Vec<TileStatus> = store.tiles().into_iter().filter(|t| t.key.depth == 1).map(|t| t.status).collect();
    assert_eq!(statuses.len(), 4);
    assert_eq!(statuses.iter().filter(|s| **s == TileStatus::Contained).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == TileStatus::ToProbe).count(), 3);
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl ScanObserver for RecordingObserver {
    fn level_started(&self, level: u32, total: usize) {
        self.events.lock().unwrap().push(format!("start {} {}", level, total));
    }

    fn tile_finished(&self, level: u32, outcome: TileOutcome) {
        self.events.lock().unwrap().push(format!("tile {} {:?}", level, outcome));
    }

    fn level_finished(&self, summary: &LevelSummary) {
        self.events.lock().unwrap().push(format!("end {}", summary.level));
    }
}

#[tokio::test]
async fn test_observer_sees_levels_in_order() {
    let store = store_with(&[earth()]).await;
    let photos: Vec<(i64, f64, f64)> = (0..30).map(|i| (i, -170.0 + i as f64 * 11.0, 10.0)).collect();
    let search = FakeSearch::new(world(photos, 10));
    let observer = Arc::new(RecordingObserver::default());

    scanner(search, &store, settings())
        .with_observer(observer.clone())
        .scan("earth", &CancellationToken::new())
        .await
        .unwrap();

    let events = observer.events.lock().unwrap().clone();
    assert_eq!(events[0], "start 0 1");
    assert_eq!(events[1], "tile 0 Split");
    assert_eq!(events[2], "end 0");
    assert_eq!(events[3], "start 1 4");
    assert_eq!(events.iter().filter(|e| e.starts_with("tile 1")).count(), 4);
    assert_eq!(events.last().map(String::as_str), Some("end 1"));
}

//! Integration test: slice synthetic climate cubes, persist them to Zarr and
//! read the output back through `open_store`.
//!
//! The cube value at (t, y, x) is `250 + t + y * 0.1 + x * 0.01`, so the
//! min and max of any slice are the values at its first and last corners.

use array_slicer::{
    open_store, persist_slice, resolve_axes_and_slice, slice_variables, ArrayRequest,
    CancellationFlag, CoordinateCache, MemoryArray, MemoryArrayStore, SliceError, SliceRequest,
    SlicerConfig,
};
use eo_common::{BoundingBox, TimeRange};
use test_utils::{create_coordinate_axis, create_temperature_cube, temp_test_dir_with_prefix};

fn cube_value(t: usize, y: usize, x: usize) -> f64 {
    250.0 + t as f64 + y as f64 * 0.1 + x as f64 * 0.01
}

/// Daily steps from 2020-01-01, latitudes 54.5 down to 45.5, longitudes
/// 0..359 (a 0-360 store).
fn global_store() -> MemoryArrayStore {
    MemoryArrayStore::new("mem://era5")
        .with_array(
            "time",
            MemoryArray::coordinate("time", vec![0.0, 1.0, 2.0, 3.0])
                .with_attribute("units", "days since 2020-01-01"),
        )
        .with_coordinate("lat", create_coordinate_axis(54.5, -1.0, 10))
        .with_coordinate("lon", create_coordinate_axis(0.0, 1.0, 360))
        .with_array(
            "t2m",
            MemoryArray::new(&["time", "lat", "lon"], &[4, 10, 360], create_temperature_cube(4, 10, 360))
                .unwrap()
                .with_attribute("units", "K")
                .with_attribute("long_name", "2 metre temperature"),
        )
}

fn request(variables: &[&str], bbox: BoundingBox, time: Option<&str>) -> SliceRequest {
    SliceRequest {
        collection_id: "era5-land".to_string(),
        variables: variables.iter().map(|v| v.to_string()).collect(),
        bbox: Some(bbox),
        time: time.map(|t| TimeRange::parse(t).unwrap()),
    }
}

#[tokio::test]
async fn test_seam_crossing_slice_roundtrip() {
    let dir = temp_test_dir_with_prefix("slice_roundtrip");
    let output = dir.path().join("subset.zarr");
    let store = global_store();
    let config = SlicerConfig {
        rows_per_step: 1,
        output_chunk_size: 8,
        ..SlicerConfig::default()
    };
    let cache = CoordinateCache::from_config(&config);

    let outcome = slice_variables(
        &store,
        &request(&["t2m"], BoundingBox::new(-10.0, 48.0, 10.0, 50.0), Some("2020-01-02/2020-01-03")),
        &output,
        &config,
        &cache,
        &CancellationFlag::new(),
    )
    .await
    .expect("slice failed");

    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(outcome.results.len(), 1);
    let result = &outcome.results[0];

    // time [1, 3), lat [5, 7), lon [350, 360) + [0, 11)
    assert_eq!(result.shape, vec![2, 2, 21]);
    assert_eq!(result.dims, vec!["time", "lat", "lon"]);
    assert_eq!(result.min, Some(cube_value(1, 5, 0)));
    assert_eq!(result.max, Some(cube_value(2, 6, 359)));
    assert_eq!(result.valid_values, 84);

    let summary = &result.summary;
    let time = summary.time.as_ref().unwrap();
    assert_eq!(time.start.as_deref(), Some("2020-01-02T00:00:00Z"));
    assert_eq!(time.end.as_deref(), Some("2020-01-03T00:00:00Z"));
    assert_eq!(time.count, 2);
    let lon = summary.lon_range.unwrap();
    assert_eq!((lon.min, lon.max), (-10.0, 10.0));

    // Read the output back as an ordinary store
    let written = open_store(output.to_str().unwrap()).unwrap();
    assert_eq!(written.list_arrays().await.unwrap(), vec!["lat", "lon", "t2m", "time"]);

    let info = written.array_info("t2m").await.unwrap();
    assert_eq!(info.shape, vec![2, 2, 21]);
    assert_eq!(info.dimensions, vec!["time", "lat", "lon"]);
    assert_eq!(info.units(), Some("K"));
    assert_eq!(info.attributes["requested_bbox"], serde_json::json!([-10.0, 48.0, 10.0, 50.0]));
    assert_eq!(
        info.attributes["requested_time"],
        serde_json::json!("2020-01-02T00:00:00Z/2020-01-03T23:59:59Z")
    );

    let values = written.read_subset("t2m", &[0, 0, 0], &[2, 2, 21]).await.unwrap();
    // First column is lon 350, column 10 is lon 0
    assert_eq!(values[0], cube_value(1, 5, 350));
    assert_eq!(values[10], cube_value(1, 5, 0));
    assert_eq!(values[20], cube_value(1, 5, 10));
    assert_eq!(values[83], cube_value(2, 6, 10));

    let lons = written.read_coordinates("lon").await.unwrap();
    assert_eq!(lons.len(), 21);
    assert_eq!(lons, create_coordinate_axis(-10.0, 1.0, 21));
    assert_eq!(written.read_coordinates("lat").await.unwrap(), vec![49.5, 48.5]);
    assert_eq!(
        written.read_coordinates("time").await.unwrap(),
        vec![1_577_923_200.0, 1_578_009_600.0]
    );
}

#[tokio::test]
async fn test_partial_failure_keeps_other_variables() {
    let dir = temp_test_dir_with_prefix("slice_partial");
    let store = global_store()
        .with_coordinate("latitude", create_coordinate_axis(-51.0, -1.0, 10))
        .with_array(
            "sst",
            MemoryArray::new(&["time", "latitude", "lon"], &[4, 10, 360], create_temperature_cube(4, 10, 360))
                .unwrap(),
        );
    let config = SlicerConfig::default();
    let cache = CoordinateCache::from_config(&config);

    let outcome = slice_variables(
        &store,
        &request(&["sst", "t2m"], BoundingBox::new(0.0, 45.0, 5.0, 50.0), None),
        &dir.path().join("out.zarr"),
        &config,
        &cache,
        &CancellationFlag::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].variable, "t2m");
    assert_eq!(outcome.results[0].shape, vec![4, 5, 6]);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].starts_with("sst:"), "{}", outcome.warnings[0]);
}

#[tokio::test]
async fn test_nothing_sliced_when_no_variable_overlaps() {
    let dir = temp_test_dir_with_prefix("slice_empty");
    let config = SlicerConfig::default();
    let cache = CoordinateCache::from_config(&config);

    let err = slice_variables(
        &global_store(),
        &request(&[], BoundingBox::new(0.0, -40.0, 5.0, -30.0), None),
        &dir.path().join("out.zarr"),
        &config,
        &cache,
        &CancellationFlag::new(),
    )
    .await
    .unwrap_err();

    assert!(err.is_retryable());
    match err {
        SliceError::NothingSliced { warnings } => assert_eq!(warnings.len(), 1),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_variable_fails_request() {
    let dir = temp_test_dir_with_prefix("slice_missing");
    let config = SlicerConfig::default();
    let cache = CoordinateCache::from_config(&config);

    let err = slice_variables(
        &global_store(),
        &request(&["tp"], BoundingBox::new(0.0, 45.0, 5.0, 50.0), None),
        &dir.path().join("out.zarr"),
        &config,
        &cache,
        &CancellationFlag::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "variable 'tp' not found; available: t2m");
}

#[tokio::test]
async fn test_cancelled_slice_stops_between_blocks() {
    let dir = temp_test_dir_with_prefix("slice_cancel");
    let store = global_store();
    let config = SlicerConfig::default();
    let cache = CoordinateCache::from_config(&config);
    let selection = resolve_axes_and_slice(
        &store,
        &ArrayRequest {
            collection_id: "era5-land".to_string(),
            variable: "t2m".to_string(),
            bbox: None,
            time: None,
        },
        &cache,
    )
    .await
    .unwrap();

    let cancel = CancellationFlag::new();
    cancel.cancel();
    let reads_before = store.reads();
    let err = persist_slice(&store, &selection, &dir.path().join("out.zarr"), &config, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SliceError::Cancelled(ref v) if v == "t2m"));
    assert_eq!(store.reads(), reads_before);
}

#[tokio::test]
async fn test_daymet_fallback_axes() {
    // Two years of daily steps on a 2x3 corner of the Daymet grid, with no
    // coordinate arrays at all
    let (times, rows, cols) = (730, 2, 3);
    let store = MemoryArrayStore::new("mem://daymet").with_array(
        "tmax",
        MemoryArray::new(&["time", "y", "x"], &[times, rows, cols], create_temperature_cube(730, 2, 3))
            .unwrap()
            .with_attribute("units", "degrees C"),
    );
    let cache = CoordinateCache::default();
    let selection = resolve_axes_and_slice(
        &store,
        &ArrayRequest {
            collection_id: "daymet-daily-na".to_string(),
            variable: "tmax".to_string(),
            bbox: None,
            time: Some(TimeRange::parse("1981-01-01/1981-01-10").unwrap()),
        },
        &cache,
    )
    .await
    .unwrap();

    assert!(selection.warnings.is_empty(), "{:?}", selection.warnings);
    assert_eq!(selection.shape(), vec![10, 2, 3]);
    assert_eq!(selection.dimensions[0].pieces[0].start, 365);
    assert_eq!(selection.dimensions[0].coordinate_source, None);

    let dir = temp_test_dir_with_prefix("slice_daymet");
    let result = persist_slice(
        &store,
        &selection,
        &dir.path().join("daymet.zarr"),
        &SlicerConfig::default(),
        &CancellationFlag::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.min, Some(cube_value(365, 0, 0)));
    assert_eq!(result.max, Some(cube_value(374, 1, 2)));
    let lat = result.summary.lat_range.unwrap();
    assert_eq!((lat.min, lat.max), (4_983_500.0, 4_984_500.0));
    let lon = result.summary.lon_range.unwrap();
    assert_eq!((lon.min, lon.max), (-4_560_250.0, -4_558_250.0));
}

//! Directory ingestion through the public library API.

use track_library::{BoundsOverrides, ParseMode, SkipReason, TrackLibrary};
use test_utils::{corner_track, elevation_track, temp_test_dir, untimed_track, write_file};
use track_common::{GeoBounds, Metric, ValueRange};

#[test]
fn test_add_path_three_track_scenario() {
    let dir = temp_test_dir();
    corner_track(0.0, 0.0, 1.0, 1.0).write_to(dir.path(), "2012/a.gpx");
    corner_track(0.5, 0.5, 2.0, 2.0).write_to(dir.path(), "2012/b.gpx");
    corner_track(-1.0, -1.0, 0.0, 0.0).write_to(dir.path(), "2013/c.gpx");
    write_file(dir.path(), "2013/readme.txt", "not a track");

    let mut library = TrackLibrary::new(BoundsOverrides::default(), ParseMode::Streaming);
    let accepted = library.add_path(dir.path()).unwrap();

    assert_eq!(accepted, 3);
    assert!(library.skipped().is_empty());
    let effective = library.finalize().unwrap();
    assert_eq!(effective.geo, GeoBounds::new(-1.0, 2.0, -1.0, 2.0));
}

#[test]
fn test_add_path_reports_skips_and_continues() {
    let dir = temp_test_dir();
    corner_track(0.0, 0.0, 1.0, 1.0).write_to(dir.path(), "good.gpx");
    untimed_track().write_to(dir.path(), "untimed.gpx");
    write_file(dir.path(), "broken.gpx", "<gpx");

    let mut library = TrackLibrary::new(BoundsOverrides::default(), ParseMode::Retained);
    assert_eq!(library.add_path(dir.path()).unwrap(), 1);

    let skipped: Vec<_> = library
        .skipped()
        .iter()
        .map(|s| s.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(skipped, vec!["broken.gpx", "untimed.gpx"]);
    assert!(library
        .skipped()
        .iter()
        .all(|s| matches!(s.reason, SkipReason::Invalid(_))));
}

#[test]
fn test_elevation_and_speed_are_aggregated() {
    let dir = temp_test_dir();
    elevation_track(50.0, 80.0).write_to(dir.path(), "low.gpx");
    elevation_track(150.0, 400.0).write_to(dir.path(), "high.gpx");

    let mut library = TrackLibrary::new(BoundsOverrides::default(), ParseMode::Streaming);
    library.add_path(dir.path()).unwrap();

    let effective = library.finalize().unwrap();
    assert_eq!(
        effective.range_for(Metric::Elevation),
        Some(ValueRange::new(50.0, 400.0))
    );
    let speed = effective.range_for(Metric::Speed).unwrap();
    assert_eq!(speed.min, 0.0);
    assert!(speed.max > 0.0);
}

#[test]
fn test_tracks_by_time() {
    let dir = temp_test_dir();
    let early = corner_track(0.0, 0.0, 1.0, 1.0);
    let late = test_utils::GpxBuilder::new().segment([
        test_utils::point(0.0, 0.0).at(test_utils::reference_time() + chrono::Duration::days(3)),
        test_utils::point(1.0, 1.0).at(test_utils::reference_time() + chrono::Duration::days(4)),
    ]);
    let late_path = late.write_to(dir.path(), "a_late.gpx");
    let early_path = early.write_to(dir.path(), "b_early.gpx");

    let mut library = TrackLibrary::new(BoundsOverrides::default(), ParseMode::Streaming);
    library.add_path(dir.path()).unwrap();

    let ordered: Vec<_> = library.tracks_by_time().iter().map(|d| d.path()).collect();
    assert_eq!(ordered, vec![early_path, late_path]);
}

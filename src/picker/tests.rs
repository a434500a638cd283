//! Unit tests for the picker session, tile cache, and geocode dispositions.

use std::time::Duration;

use super::state::{
    batch_progress, MapLoadError, MapPhase, MapView, PickedLocation, PickerSession, TileCache,
    TileEntry,
};
use super::systems::{
    plan_open, reverse_disposition, search_disposition, ReverseDisposition, SearchDisposition,
};
use crate::constants::{CLOSE_ZOOM, MAP_LOAD_TIMEOUT_SECS, MAX_ZOOM, MIN_ZOOM, WIDE_ZOOM};
use crate::geo::{LonLat, TileId};
use crate::provider::geocoder::{AddressDetails, GeocodeCandidate, GeocodeOutcome};
use crate::provider::tiles::{DecodedTile, TileFetchResult};

const LAGOS: LonLat = LonLat {
    lon: 3.3792,
    lat: 6.5244,
};

fn candidate(display_name: &str, country_code: Option<&str>) -> GeocodeCandidate {
    GeocodeCandidate {
        lat: "6.45505".to_string(),
        lon: "3.39417".to_string(),
        display_name: display_name.to_string(),
        address: country_code.map(|code| AddressDetails {
            country: None,
            country_code: Some(code.to_string()),
        }),
    }
}

fn one_pixel() -> DecodedTile {
    DecodedTile {
        size: [1, 1],
        rgba: vec![0, 0, 0, 255],
    }
}

fn opened_session() -> PickerSession {
    let mut session = PickerSession::default();
    session.open_at(MapView::new(LAGOS, CLOSE_ZOOM), LAGOS);
    session
}

// Session planning tests

#[test]
fn test_plan_open_coordinates_win_over_address() {
    let plan = plan_open(Some("12 Broad Street"), Some(LAGOS), LonLat::new(8.0, 9.0));
    assert_eq!(plan.view.zoom, CLOSE_ZOOM);
    assert_eq!(plan.view.center, LAGOS);
    assert_eq!(plan.marker, LAGOS);
    // No search needed once coordinates pin the view
    assert!(plan.search_query.is_none());
}

#[test]
fn test_plan_open_address_only_searches_from_country_view() {
    let default_center = LonLat::new(8.0, 9.0);
    let plan = plan_open(Some("12 Broad Street, Lagos"), None, default_center);
    assert_eq!(plan.view.zoom, WIDE_ZOOM);
    assert_eq!(plan.view.center, default_center);
    assert_eq!(plan.search_query.as_deref(), Some("12 Broad Street, Lagos"));
}

#[test]
fn test_plan_open_blank_stop_uses_country_view() {
    let default_center = LonLat::new(8.0, 9.0);
    let plan = plan_open(None, None, default_center);
    assert_eq!(plan.view.zoom, WIDE_ZOOM);
    assert!(plan.search_query.is_none());

    // Whitespace-only saved addresses count as blank
    let plan = plan_open(Some("   "), None, default_center);
    assert!(plan.search_query.is_none());
}

// Session lifecycle tests

#[test]
fn test_open_at_starts_loading() {
    let session = opened_session();
    assert!(session.open);
    assert_eq!(session.phase, MapPhase::Loading);
    assert_eq!(session.generation, 1);
    assert!(!session.initial_batch.is_empty());
    assert!(session.resolved.is_none());

    let deadline = session.load_deadline.as_ref().unwrap();
    assert!((deadline.duration().as_secs_f32() - MAP_LOAD_TIMEOUT_SECS).abs() < f32::EPSILON);
}

#[test]
fn test_reopen_bumps_generation() {
    let mut session = opened_session();
    let first = session.generation;
    session.close();
    session.open_at(MapView::new(LAGOS, CLOSE_ZOOM), LAGOS);

    assert_eq!(session.generation, first + 1);
    // Results from the first session no longer apply
    assert!(!session.accepts(first));
    assert!(session.accepts(first + 1));
}

#[test]
fn test_mark_ready_disarms_deadline() {
    let mut session = opened_session();
    session.mark_ready();
    assert_eq!(session.phase, MapPhase::Ready);
    assert!(session.load_deadline.is_none());
}

#[test]
fn test_fail_records_error() {
    let mut session = opened_session();
    session.fail(MapLoadError::TimedOut);
    assert_eq!(session.phase, MapPhase::Error(MapLoadError::TimedOut));
    assert!(session.load_deadline.is_none());
}

#[test]
fn test_close_resets_session_state() {
    let mut session = opened_session();
    session.mark_ready();
    session.resolved = Some(PickedLocation {
        address: "somewhere".to_string(),
        position: LAGOS,
    });

    session.close();
    assert!(!session.open);
    assert_eq!(session.phase, MapPhase::Idle);
    assert!(session.resolved.is_none());
    assert!(session.initial_batch.is_empty());
    // Closed sessions accept nothing
    assert!(!session.accepts(session.generation));
}

#[test]
fn test_refresh_keeps_pin_and_address() {
    let mut session = opened_session();
    session.mark_ready();
    session.marker = LonLat::new(3.40, 6.46);
    session.resolved = Some(PickedLocation {
        address: "kept".to_string(),
        position: session.marker,
    });
    let generation = session.generation;

    session.begin_loading();
    assert_eq!(session.phase, MapPhase::Loading);
    assert_eq!(session.generation, generation);
    assert_eq!(session.marker, LonLat::new(3.40, 6.46));
    assert_eq!(session.resolved.as_ref().unwrap().address, "kept");
    assert!(session.load_deadline.is_some());
}

#[test]
fn test_retarget_while_loading_rebuilds_batch() {
    let mut session = PickerSession::default();
    session.open_at(MapView::new(LonLat::new(8.0, 9.0), WIDE_ZOOM), LonLat::new(8.0, 9.0));
    let old_batch = session.initial_batch.clone();

    session.retarget(LAGOS, CLOSE_ZOOM);
    assert_eq!(session.view.zoom, CLOSE_ZOOM);
    assert_eq!(session.marker, LAGOS);
    assert_ne!(session.initial_batch, old_batch);
    // The original deadline keeps running; retargeting does not extend it
    assert!(session.load_deadline.is_some());
}

#[test]
fn test_retarget_when_ready_keeps_phase() {
    let mut session = opened_session();
    session.mark_ready();
    session.retarget(LonLat::new(3.5, 6.6), CLOSE_ZOOM);
    assert_eq!(session.phase, MapPhase::Ready);
}

#[test]
fn test_deadline_expires_after_timeout() {
    let mut session = opened_session();
    let deadline = session.load_deadline.as_mut().unwrap();
    deadline.tick(Duration::from_secs_f32(MAP_LOAD_TIMEOUT_SECS + 0.1));
    assert!(deadline.is_finished());
}

// Lookup ordering tests

#[test]
fn test_lookups_apply_in_order() {
    let mut session = opened_session();
    let first = session.next_lookup_seq();
    let second = session.next_lookup_seq();
    assert!(session.awaiting_address);

    assert!(session.try_finish_lookup(first));
    // The newer lookup is still outstanding
    assert!(session.awaiting_address);
    assert!(session.try_finish_lookup(second));
    assert!(!session.awaiting_address);
}

#[test]
fn test_stale_lookup_is_dropped_after_newer_answer() {
    let mut session = opened_session();
    let first = session.next_lookup_seq();
    let second = session.next_lookup_seq();

    // The newer request answers first; the older one must be dropped
    assert!(session.try_finish_lookup(second));
    assert!(!session.awaiting_address);
    assert!(!session.try_finish_lookup(first));
}

// Batch progress tests

#[test]
fn test_batch_progress_counts_terminal_tiles() {
    let batch = vec![
        TileId { x: 0, y: 0, zoom: 3 },
        TileId { x: 1, y: 0, zoom: 3 },
        TileId { x: 2, y: 0, zoom: 3 },
    ];
    let mut cache = TileCache::default();
    cache.store(TileFetchResult::success(batch[0], one_pixel()));
    cache.store(TileFetchResult::error(batch[1], "HTTP 503".to_string()));
    cache.mark_pending(batch[2]);

    let progress = batch_progress(&batch, &cache);
    assert_eq!(progress.done, 2);
    assert_eq!(progress.total, 3);
    assert_eq!(progress.succeeded, 1);
    assert_eq!(progress.first_error.as_deref(), Some("HTTP 503"));
    assert!(!progress.is_complete());

    cache.store(TileFetchResult::success(batch[2], one_pixel()));
    let progress = batch_progress(&batch, &cache);
    assert!(progress.is_complete());
    assert_eq!(progress.succeeded, 2);
}

#[test]
fn test_batch_progress_fraction() {
    let batch = vec![
        TileId { x: 0, y: 0, zoom: 3 },
        TileId { x: 1, y: 0, zoom: 3 },
    ];
    let mut cache = TileCache::default();
    cache.store(TileFetchResult::success(batch[0], one_pixel()));

    let progress = batch_progress(&batch, &cache);
    assert!((progress.fraction() - 0.5).abs() < f32::EPSILON);
}

// Tile cache tests

#[test]
fn test_cache_retry_failed_only_clears_failures() {
    let ok = TileId { x: 0, y: 0, zoom: 5 };
    let bad = TileId { x: 1, y: 0, zoom: 5 };
    let other_bad = TileId { x: 9, y: 9, zoom: 5 };

    let mut cache = TileCache::default();
    cache.store(TileFetchResult::success(ok, one_pixel()));
    cache.store(TileFetchResult::error(bad, "boom".to_string()));
    cache.store(TileFetchResult::error(other_bad, "boom".to_string()));

    // Only failures among the listed tiles are re-queued
    let cleared = cache.retry_failed(&[ok, bad]);
    assert_eq!(cleared, 1);
    assert!(!cache.contains(&bad));
    assert!(cache.contains(&ok));
    assert!(cache.contains(&other_bad));
}

#[test]
fn test_cache_clear_resets_in_flight() {
    let mut cache = TileCache::default();
    cache.mark_pending(TileId { x: 0, y: 0, zoom: 5 });
    cache.in_flight = 3;

    cache.clear();
    assert_eq!(cache.in_flight, 0);
    assert!(!cache.contains(&TileId { x: 0, y: 0, zoom: 5 }));
}

#[test]
fn test_tile_entry_terminal_states() {
    assert!(!TileEntry::Pending.is_terminal());
    assert!(TileEntry::Decoded(one_pixel()).is_terminal());
    assert!(TileEntry::Failed("x".to_string()).is_terminal());
    assert!(TileEntry::Decoded(one_pixel()).is_ok());
    assert!(!TileEntry::Failed("x".to_string()).is_ok());
}

// Map view tests

#[test]
fn test_zoom_clamps_at_bounds() {
    let mut view = MapView::new(LAGOS, MAX_ZOOM);
    view.zoom_in();
    assert_eq!(view.zoom, MAX_ZOOM);

    let mut view = MapView::new(LAGOS, MIN_ZOOM);
    view.zoom_out();
    assert_eq!(view.zoom, MIN_ZOOM);

    // Construction clamps out-of-range zooms too
    assert_eq!(MapView::new(LAGOS, 25).zoom, MAX_ZOOM);
    assert_eq!(MapView::new(LAGOS, 0).zoom, MIN_ZOOM);
}

#[test]
fn test_pan_moves_center_against_drag() {
    let mut view = MapView::new(LAGOS, 10);
    let before = view.center;
    // Dragging the map to the right reveals terrain to the west
    view.pan_px(50.0, 0.0);
    assert!(view.center.lon < before.lon);
    assert!((view.center.lat - before.lat).abs() < 1e-9);
}

#[test]
fn test_for_position_picks_zoom() {
    let default_center = LonLat::new(8.0, 9.0);
    let close = MapView::for_position(Some(LAGOS), default_center);
    assert_eq!(close.zoom, CLOSE_ZOOM);
    assert_eq!(close.center, LAGOS);

    let wide = MapView::for_position(None, default_center);
    assert_eq!(wide.zoom, WIDE_ZOOM);
    assert_eq!(wide.center, default_center);
}

// Reverse disposition tests

#[test]
fn test_reverse_selected_reports_pin_position() {
    let outcome = GeocodeOutcome::success(vec![candidate("Broad Street, Lagos", Some("ng"))]);
    let pin = LonLat::new(3.40001, 6.45002);

    match reverse_disposition(outcome, "ng", pin) {
        ReverseDisposition::Selected(picked) => {
            assert_eq!(picked.address, "Broad Street, Lagos");
            // The pin's own coordinates are reported, not the candidate's
            assert_eq!(picked.position, pin);
        }
        other => panic!("expected Selected, got {:?}", other),
    }
}

#[test]
fn test_reverse_rejects_wrong_country() {
    let outcome = GeocodeOutcome::success(vec![candidate("Rue Principale, Cotonou", Some("bj"))]);
    let disposition = reverse_disposition(outcome, "ng", LAGOS);
    assert_eq!(disposition, ReverseDisposition::OutsideCountry);
}

#[test]
fn test_reverse_rejects_missing_country_code() {
    let outcome = GeocodeOutcome::success(vec![candidate("Somewhere", None)]);
    let disposition = reverse_disposition(outcome, "ng", LAGOS);
    assert_eq!(disposition, ReverseDisposition::OutsideCountry);
}

#[test]
fn test_reverse_empty_and_failed() {
    let empty = GeocodeOutcome::success(Vec::new());
    assert_eq!(
        reverse_disposition(empty, "ng", LAGOS),
        ReverseDisposition::NothingFound
    );

    let failed = GeocodeOutcome::failure("connection refused".to_string());
    assert_eq!(
        reverse_disposition(failed, "ng", LAGOS),
        ReverseDisposition::Failed("connection refused".to_string())
    );
}

// Search disposition tests

#[test]
fn test_search_centers_on_first_match_in_country() {
    let outcome = GeocodeOutcome::success(vec![
        candidate("Awolowo Road, Accra", Some("gh")),
        candidate("Awolowo Road, Ikoyi", Some("ng")),
    ]);
    match search_disposition(outcome, "ng") {
        SearchDisposition::Centered(position) => {
            assert!((position.lat - 6.45505).abs() < 1e-9);
            assert!((position.lon - 3.39417).abs() < 1e-9);
        }
        other => panic!("expected Centered, got {:?}", other),
    }
}

#[test]
fn test_search_no_match_and_failure() {
    let empty = GeocodeOutcome::success(Vec::new());
    assert_eq!(search_disposition(empty, "ng"), SearchDisposition::NoMatch);

    let wrong_country = GeocodeOutcome::success(vec![candidate("Elsewhere", Some("gh"))]);
    assert_eq!(
        search_disposition(wrong_country, "ng"),
        SearchDisposition::NoMatch
    );

    let failed = GeocodeOutcome::failure("HTTP 500".to_string());
    assert_eq!(
        search_disposition(failed, "ng"),
        SearchDisposition::Failed("HTTP 500".to_string())
    );
}

#[test]
fn test_search_skips_unparseable_coordinates() {
    let mut broken = candidate("Broken", Some("ng"));
    broken.lat = "not-a-number".to_string();
    let outcome = GeocodeOutcome::success(vec![broken]);
    assert_eq!(search_disposition(outcome, "ng"), SearchDisposition::NoMatch);
}

// Error message tests

#[test]
fn test_load_error_messages_differ() {
    let timeout = MapLoadError::TimedOut.user_message();
    let failure = MapLoadError::Failed("HTTP 503".to_string()).user_message();
    assert!(timeout.contains("too long"));
    assert!(failure.contains("HTTP 503"));
    assert_ne!(timeout, failure);
}

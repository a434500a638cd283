//! Bevy systems driving the picker: session lifecycle, tile fetching,
//! geocoding, and recovery sweeps.

use bevy::prelude::*;
use bevy::tasks::AsyncComputeTaskPool;
use bevy::window::WindowOccluded;
use futures_lite::future;

use crate::config::AppConfig;
use crate::constants::{CLOSE_ZOOM, MAP_LOAD_TIMEOUT_SECS, MAX_TILE_FETCHES_IN_FLIGHT};
use crate::geo::LonLat;
use crate::notify::Notifications;
use crate::provider::geocoder::{GeocodeOutcome, Geocoder};
use crate::provider::tiles::fetch_tile;

use super::messages::{
    CloseLocationPicker, LocationSelected, LookupAddress, OpenLocationPicker, RefreshMapView,
};
use super::state::{
    batch_progress, AddressSearchTask, MapLoadError, MapPhase, MapView, PickedLocation,
    PickerSession, ReverseLookupTask, StalenessPoll, TileCache, TileFetchTask,
};

/// Query filter matching every kind of picker background task.
type AnyPickerTask = Or<(
    With<TileFetchTask>,
    With<ReverseLookupTask>,
    With<AddressSearchTask>,
)>;

/// How a session starts: where the map aims and whether the saved address
/// still needs to be searched for.
#[derive(Debug, PartialEq)]
pub struct SessionPlan {
    pub view: MapView,
    pub marker: LonLat,
    pub search_query: Option<String>,
}

/// Decide the opening view from what the stop already knows.
pub fn plan_open(
    initial_address: Option<&str>,
    initial_position: Option<LonLat>,
    default_center: LonLat,
) -> SessionPlan {
    let view = MapView::for_position(initial_position, default_center);
    let search_query = match initial_position {
        // Coordinates pin the view directly; no search needed
        Some(_) => None,
        None => initial_address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string),
    };
    SessionPlan {
        view,
        marker: view.center,
        search_query,
    }
}

/// What to do with a finished reverse lookup.
#[derive(Debug, PartialEq)]
pub enum ReverseDisposition {
    /// Address found inside the operating country; report it
    Selected(PickedLocation),
    /// Address found, but in the wrong country
    OutsideCountry,
    /// The point has no address
    NothingFound,
    /// The lookup itself failed
    Failed(String),
}

/// Classify a reverse-geocode outcome for the pin position it was asked for.
///
/// The reported coordinates are the pin's own, not the centroid the geocoder
/// returns for the matched object.
pub fn reverse_disposition(
    outcome: GeocodeOutcome,
    country: &str,
    queried: LonLat,
) -> ReverseDisposition {
    if let Some(message) = outcome.error {
        return ReverseDisposition::Failed(message);
    }
    let Some(candidate) = outcome.candidates.into_iter().next() else {
        return ReverseDisposition::NothingFound;
    };
    if !candidate.country_matches(country) {
        return ReverseDisposition::OutsideCountry;
    }
    ReverseDisposition::Selected(PickedLocation {
        address: candidate.display_name,
        position: queried,
    })
}

/// What to do with a finished address search.
#[derive(Debug, PartialEq)]
pub enum SearchDisposition {
    /// Center the map here
    Centered(LonLat),
    /// Nothing usable came back; stay on the country view
    NoMatch,
    /// The search itself failed
    Failed(String),
}

/// Classify a forward-geocode outcome for aiming the opening view.
pub fn search_disposition(outcome: GeocodeOutcome, country: &str) -> SearchDisposition {
    if let Some(message) = outcome.error {
        return SearchDisposition::Failed(message);
    }
    outcome
        .candidates
        .iter()
        .filter(|c| c.country_matches(country))
        .find_map(|c| c.position())
        .map(SearchDisposition::Centered)
        .unwrap_or(SearchDisposition::NoMatch)
}

fn geocoder_from(config: &AppConfig) -> Geocoder {
    Geocoder::new(config.data.geocoder_url.clone(), config.data.user_agent())
}

fn teardown_tasks(commands: &mut Commands, tasks: &Query<Entity, AnyPickerTask>) {
    for entity in tasks.iter() {
        commands.entity(entity).despawn();
    }
}

/// Starts a session when a stop asks for the picker.
pub fn open_picker(
    mut commands: Commands,
    mut events: MessageReader<OpenLocationPicker>,
    mut session: ResMut<PickerSession>,
    mut cache: ResMut<TileCache>,
    config: Res<AppConfig>,
    tasks: Query<Entity, AnyPickerTask>,
) {
    for event in events.read() {
        // Reopening replaces any session in progress
        teardown_tasks(&mut commands, &tasks);
        cache.clear();

        let plan = plan_open(
            event.initial_address.as_deref(),
            event.initial_position,
            config.data.default_center,
        );
        session.open_at(plan.view, plan.marker);
        info!(
            "Location picker opened at ({:.4}, {:.4}) zoom {}",
            session.view.center.lat, session.view.center.lon, session.view.zoom
        );

        if let Some(query) = plan.search_query {
            let geocoder = geocoder_from(&config);
            let country = config.data.operating_country.clone();
            let task = AsyncComputeTaskPool::get()
                .spawn(async move { geocoder.search(&query, &country) });
            commands.spawn(AddressSearchTask {
                generation: session.generation,
                task,
            });
        }
    }
}

/// Tears the session down; dropping the task handles cancels their results.
pub fn close_picker(
    mut commands: Commands,
    mut events: MessageReader<CloseLocationPicker>,
    mut session: ResMut<PickerSession>,
    mut cache: ResMut<TileCache>,
    tasks: Query<Entity, AnyPickerTask>,
) {
    if events.read().next().is_none() {
        return;
    }
    teardown_tasks(&mut commands, &tasks);
    cache.clear();
    session.close();
    info!("Location picker closed");
}

/// Re-runs the initial tile load for the current view (Try Again / Refresh).
pub fn refresh_map(
    mut commands: Commands,
    mut events: MessageReader<RefreshMapView>,
    mut session: ResMut<PickerSession>,
    mut cache: ResMut<TileCache>,
    tile_tasks: Query<Entity, With<TileFetchTask>>,
) {
    if events.read().next().is_none() || !session.open {
        return;
    }
    // Only tile work restarts; an address lookup in flight stays valid
    for entity in tile_tasks.iter() {
        commands.entity(entity).despawn();
    }
    cache.clear();
    session.begin_loading();
    info!("Map view refreshing");
}

/// Keeps the visible tiles fetched, bounded by the in-flight cap.
pub fn spawn_tile_fetches(
    mut commands: Commands,
    session: Res<PickerSession>,
    mut cache: ResMut<TileCache>,
    config: Res<AppConfig>,
) {
    if !session.open || !matches!(session.phase, MapPhase::Loading | MapPhase::Ready) {
        return;
    }

    for tile in session.view.visible_tiles() {
        if cache.contains(&tile) {
            continue;
        }
        if cache.in_flight >= MAX_TILE_FETCHES_IN_FLIGHT {
            break;
        }
        cache.mark_pending(tile);
        cache.in_flight += 1;

        let template = config.data.tile_url_template.clone();
        let key = config.data.tile_access_key.clone();
        let agent = config.data.user_agent();
        let task = AsyncComputeTaskPool::get()
            .spawn(async move { fetch_tile(&template, key.as_deref(), &agent, tile) });
        commands.spawn(TileFetchTask {
            generation: session.generation,
            tile,
            task,
        });
    }
}

/// Collects finished tile downloads and decides readiness of the load.
pub fn poll_tile_fetches(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut TileFetchTask)>,
    mut session: ResMut<PickerSession>,
    mut cache: ResMut<TileCache>,
) {
    for (entity, mut task) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut task.task)) else {
            continue;
        };
        commands.entity(entity).despawn();
        cache.in_flight = cache.in_flight.saturating_sub(1);

        if !session.accepts(task.generation) {
            continue;
        }
        if let Some(ref message) = result.error {
            debug!("Tile {:?} failed: {}", result.tile, message);
        }
        cache.store(result);

        if matches!(session.phase, MapPhase::Loading) {
            let progress = batch_progress(&session.initial_batch, &cache);
            if progress.is_complete() {
                if progress.succeeded > 0 {
                    info!(
                        "Map ready: {}/{} initial tiles loaded",
                        progress.succeeded, progress.total
                    );
                    session.mark_ready();
                } else {
                    let message = progress
                        .first_error
                        .unwrap_or_else(|| "no tiles could be loaded".to_string());
                    warn!("Map load failed: {}", message);
                    session.fail(MapLoadError::Failed(message));
                }
            }
        }
    }
}

/// Fails the load when the initial batch overruns its deadline.
pub fn tick_load_deadline(time: Res<Time>, mut session: ResMut<PickerSession>) {
    if !session.open || !matches!(session.phase, MapPhase::Loading) {
        return;
    }
    let deadline_hit = match session.load_deadline.as_mut() {
        Some(deadline) => {
            deadline.tick(time.delta());
            deadline.is_finished()
        }
        None => false,
    };
    if deadline_hit {
        warn!("Map load timed out after {}s", MAP_LOAD_TIMEOUT_SECS);
        session.fail(MapLoadError::TimedOut);
    }
}

/// Spawns a reverse lookup for a freshly placed pin.
pub fn start_address_lookup(
    mut commands: Commands,
    mut events: MessageReader<LookupAddress>,
    mut session: ResMut<PickerSession>,
    config: Res<AppConfig>,
) {
    for event in events.read() {
        if !session.open {
            continue;
        }
        let seq = session.next_lookup_seq();
        let position = event.position;
        debug!(
            "Reverse lookup #{} at ({:.5}, {:.5})",
            seq, position.lat, position.lon
        );

        let geocoder = geocoder_from(&config);
        let task = AsyncComputeTaskPool::get().spawn(async move { geocoder.reverse(position) });
        commands.spawn(ReverseLookupTask {
            generation: session.generation,
            seq,
            position,
            task,
        });
    }
}

/// Applies finished reverse lookups; the newest pin position wins.
pub fn poll_reverse_lookups(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut ReverseLookupTask)>,
    mut session: ResMut<PickerSession>,
    config: Res<AppConfig>,
    mut notifications: ResMut<Notifications>,
    mut selections: MessageWriter<LocationSelected>,
) {
    for (entity, mut task) in tasks.iter_mut() {
        let Some(outcome) = future::block_on(future::poll_once(&mut task.task)) else {
            continue;
        };
        commands.entity(entity).despawn();

        if !session.accepts(task.generation) {
            continue;
        }
        if !session.try_finish_lookup(task.seq) {
            debug!("Dropping superseded lookup #{}", task.seq);
            continue;
        }

        match reverse_disposition(outcome, &config.data.operating_country, task.position) {
            ReverseDisposition::Selected(picked) => {
                info!(
                    "Selected \"{}\" at ({:.5}, {:.5})",
                    picked.address, picked.position.lat, picked.position.lon
                );
                selections.write(LocationSelected {
                    address: picked.address.clone(),
                    position: picked.position,
                });
                session.resolved = Some(picked);
            }
            ReverseDisposition::OutsideCountry => {
                notifications.warning(format!(
                    "That point is outside the delivery area ({})",
                    config.data.country_label()
                ));
            }
            ReverseDisposition::NothingFound => {
                notifications.info("No address found at that point");
            }
            ReverseDisposition::Failed(message) => {
                warn!("Reverse lookup failed: {}", message);
                notifications.error("Address lookup failed. Move the pin to retry.");
            }
        }
    }
}

/// Re-aims the opening view once the saved address search answers.
pub fn poll_address_searches(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut AddressSearchTask)>,
    mut session: ResMut<PickerSession>,
    config: Res<AppConfig>,
    mut notifications: ResMut<Notifications>,
) {
    for (entity, mut task) in tasks.iter_mut() {
        let Some(outcome) = future::block_on(future::poll_once(&mut task.task)) else {
            continue;
        };
        commands.entity(entity).despawn();

        if !session.accepts(task.generation) {
            continue;
        }
        match search_disposition(outcome, &config.data.operating_country) {
            SearchDisposition::Centered(position) => {
                debug!(
                    "Saved address found at ({:.5}, {:.5})",
                    position.lat, position.lon
                );
                session.retarget(position, CLOSE_ZOOM);
            }
            SearchDisposition::NoMatch => {
                notifications.info("Couldn't place the saved address. Starting from the country view.");
            }
            SearchDisposition::Failed(message) => {
                warn!("Address search failed: {}", message);
                notifications.warning("Couldn't look up the saved address.");
            }
        }
    }
}

/// Re-queues failed tiles when the window becomes visible again, since
/// fetches finishing while occluded can be missed entirely on some platforms.
pub fn recover_after_unocclusion(
    mut events: MessageReader<WindowOccluded>,
    session: Res<PickerSession>,
    mut cache: ResMut<TileCache>,
) {
    let mut revealed = false;
    for event in events.read() {
        if !event.occluded {
            revealed = true;
        }
    }
    if !revealed || !session.open {
        return;
    }
    let retried = cache.retry_failed(&session.view.visible_tiles());
    if retried > 0 {
        info!("Window visible again, retrying {} failed tiles", retried);
    }
}

/// Periodic fallback sweep for failed tiles while the map is up.
pub fn sweep_failed_tiles(
    time: Res<Time>,
    mut poll: ResMut<StalenessPoll>,
    session: Res<PickerSession>,
    mut cache: ResMut<TileCache>,
) {
    if !session.open || !matches!(session.phase, MapPhase::Ready) {
        poll.timer.reset();
        return;
    }
    poll.timer.tick(time.delta());
    if poll.timer.is_finished() {
        let retried = cache.retry_failed(&session.view.visible_tiles());
        if retried > 0 {
            debug!("Retrying {} failed tiles", retried);
        }
    }
}

//! Messages the rest of the app exchanges with the location picker.

use bevy::prelude::*;

use crate::geo::LonLat;

/// Open the picker for a stop.
///
/// Saved coordinates win over the saved address when both are present; with
/// neither, the map opens wide over the operating country.
#[derive(Message)]
pub struct OpenLocationPicker {
    /// Saved address text, used to aim the map when no coordinates exist
    pub initial_address: Option<String>,
    /// Saved coordinates for the stop
    pub initial_position: Option<LonLat>,
}

/// Dismiss the picker and cancel all of its in-flight work.
#[derive(Message)]
pub struct CloseLocationPicker;

/// A pin position resolved to an address inside the operating country.
///
/// Emitted once per accepted resolution; the picker stays open so the user
/// can keep adjusting the pin.
#[derive(Message)]
pub struct LocationSelected {
    pub address: String,
    pub position: LonLat,
}

/// Re-run the initial tile load for the current view (Try Again / Refresh).
#[derive(Message)]
pub struct RefreshMapView;

/// Ask for the address under a freshly placed pin.
#[derive(Message)]
pub struct LookupAddress {
    pub position: LonLat,
}

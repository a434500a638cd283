//! Centralized color theme for the application.
//!
//! This module provides all colors used throughout the UI and the map view.
//! Modify values here to change the application's color scheme.

use bevy_egui::egui;

// ============================================================================
// Map View Colors
// ============================================================================

/// Background behind tiles that have not arrived yet
pub const MAP_BACKGROUND: egui::Color32 = egui::Color32::from_rgb(38, 40, 44);

/// Fill for a tile slot that is still downloading
pub const TILE_PLACEHOLDER: egui::Color32 = egui::Color32::from_rgb(52, 54, 60);

/// Faint outline separating tile slots while they load
pub const TILE_GRID: egui::Color32 = egui::Color32::from_rgb(68, 70, 78);

/// Fill for a tile slot whose download failed
pub const TILE_FAILED: egui::Color32 = egui::Color32::from_rgb(66, 48, 48);

// ============================================================================
// Marker Colors
// ============================================================================

/// Fill of the marker pin head
pub const MARKER_FILL: egui::Color32 = egui::Color32::from_rgb(220, 60, 60);

/// Outline of the marker pin
pub const MARKER_STROKE: egui::Color32 = egui::Color32::WHITE;

// ============================================================================
// UI Colors
// ============================================================================

/// Red for error messages
pub const ERROR_TEXT: egui::Color32 = egui::Color32::from_rgb(230, 90, 90);

/// Grey for help/hint text
pub const HINT_TEXT: egui::Color32 = egui::Color32::GRAY;

/// Green for the resolved address line
pub const ADDRESS_TEXT: egui::Color32 = egui::Color32::from_rgb(140, 210, 140);

/// Badge showing the operating country in the toolbar
pub const COUNTRY_BADGE: egui::Color32 = egui::Color32::from_rgb(100, 160, 220);

// ============================================================================
// Toast Colors
// ============================================================================

/// Neutral toast accent
pub const TOAST_INFO: egui::Color32 = egui::Color32::from_rgb(130, 170, 220);

/// Success toast accent
pub const TOAST_SUCCESS: egui::Color32 = egui::Color32::from_rgb(100, 200, 100);

/// Warning toast accent
pub const TOAST_WARNING: egui::Color32 = egui::Color32::from_rgb(230, 180, 80);

/// Error toast accent
pub const TOAST_ERROR: egui::Color32 = egui::Color32::from_rgb(230, 90, 90);

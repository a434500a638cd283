//! Outbound HTTP: the tile server and the geocoder.
//!
//! Everything in here blocks on network I/O and is meant to run inside
//! task-pool tasks, never directly from a system.

pub mod geocoder;
pub mod tiles;

//! Toast notifications shown in the corner of the window.
//!
//! Geocoding outcomes that should not block the map (empty results, country
//! mismatches, lookup failures) surface here instead of in a modal.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

use crate::config::ConfigResetNotification;
use crate::constants::{MAX_TOASTS, TOAST_TTL_SECS};
use crate::theme;

/// Severity of a toast, controls the accent color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    fn color(self) -> egui::Color32 {
        match self {
            ToastKind::Info => theme::TOAST_INFO,
            ToastKind::Success => theme::TOAST_SUCCESS,
            ToastKind::Warning => theme::TOAST_WARNING,
            ToastKind::Error => theme::TOAST_ERROR,
        }
    }
}

/// One message currently on screen.
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    ttl: Timer,
}

/// Queue of active toasts, newest last.
#[derive(Resource, Default)]
pub struct Notifications {
    toasts: Vec<Toast>,
}

impl Notifications {
    pub fn push(&mut self, kind: ToastKind, text: impl Into<String>) {
        let text = text.into();
        debug!("Toast ({:?}): {}", kind, text);

        // Oldest toast gives way rather than stacking without bound
        if self.toasts.len() >= MAX_TOASTS {
            self.toasts.remove(0);
        }
        self.toasts.push(Toast {
            text,
            kind,
            ttl: Timer::from_seconds(TOAST_TTL_SECS, TimerMode::Once),
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(ToastKind::Info, text);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(ToastKind::Success, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(ToastKind::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(ToastKind::Error, text);
    }

    /// Advance timers and drop toasts whose time is up.
    fn prune(&mut self, delta: std::time::Duration) {
        for toast in &mut self.toasts {
            toast.ttl.tick(delta);
        }
        self.toasts.retain(|t| !t.ttl.is_finished());
    }
}

fn expire_toasts(time: Res<Time>, mut notifications: ResMut<Notifications>) {
    notifications.prune(time.delta());
}

/// Surface a config reset as a toast once at startup.
fn config_reset_toast(
    mut reset: ResMut<ConfigResetNotification>,
    mut notifications: ResMut<Notifications>,
) {
    if reset.show {
        let reason = reset
            .reason
            .take()
            .unwrap_or_else(|| "unknown error".to_string());
        notifications.warning(format!("Settings were reset to defaults: {}", reason));
        reset.show = false;
    }
}

fn notifications_ui(mut contexts: EguiContexts, notifications: Res<Notifications>) -> Result {
    if notifications.toasts.is_empty() {
        return Ok(());
    }
    let ctx = contexts.ctx_mut()?;

    egui::Area::new(egui::Id::new("toast_stack"))
        .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -16.0])
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            for toast in &notifications.toasts {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.colored_label(toast.kind.color(), "\u{25CF}");
                        ui.label(&toast.text);
                    });
                });
                ui.add_space(4.0);
            }
        });
    Ok(())
}

pub struct NotifyPlugin;

impl Plugin for NotifyPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Notifications>()
            .add_systems(Update, (expire_toasts, config_reset_toast))
            .add_systems(EguiPrimaryContextPass, notifications_ui);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_push_caps_queue_length() {
        let mut notifications = Notifications::default();
        for i in 0..10 {
            notifications.info(format!("toast {}", i));
        }
        assert_eq!(notifications.toasts.len(), MAX_TOASTS);
        // Oldest messages were dropped first
        assert_eq!(notifications.toasts[0].text, "toast 6");
    }

    #[test]
    fn test_prune_drops_expired_toasts() {
        let mut notifications = Notifications::default();
        notifications.warning("short-lived");
        assert_eq!(notifications.toasts.len(), 1);

        notifications.prune(Duration::from_secs_f32(TOAST_TTL_SECS / 2.0));
        assert_eq!(notifications.toasts.len(), 1);

        notifications.prune(Duration::from_secs_f32(TOAST_TTL_SECS));
        assert!(notifications.toasts.is_empty());
    }

    #[test]
    fn test_kind_colors_are_distinct() {
        let colors = [
            ToastKind::Info.color(),
            ToastKind::Success.color(),
            ToastKind::Warning.color(),
            ToastKind::Error.color(),
        ];
        for (i, a) in colors.iter().enumerate() {
            for b in colors.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}

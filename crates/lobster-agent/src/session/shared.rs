//! State written by the channel task and read by the foreground.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::Phase;
use crate::events::SessionEvent;
use crate::frames::{self, Inbound};
use crate::mirror::Mirror;

const EVENT_CAPACITY: usize = 64;

pub(crate) struct Shared {
    pub(crate) phase: watch::Sender<Phase>,
    pub(crate) mirror: watch::Sender<Mirror>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
    rejection: Mutex<Option<String>>,
}

impl Shared {
    pub(crate) fn new(phase: Phase) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            phase: watch::Sender::new(phase),
            mirror: watch::Sender::new(Mirror::default()),
            events,
            rejection: Mutex::new(None),
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.send_if_modified(|current| {
            let changed = *current != phase;
            *current = phase;
            changed
        });
    }

    /// Replaces the mirror with an edited copy.
    pub(crate) fn update_mirror(&self, edit: impl FnOnce(&mut Mirror) -> bool) {
        let mut next = self.mirror.borrow().clone();
        if edit(&mut next) {
            self.mirror.send_replace(next);
        }
    }

    pub(crate) fn take_rejection(&self) -> Option<String> {
        self.rejection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn handle_text(&self, text: &str) {
        match frames::decode(text) {
            Ok(frame) => self.dispatch(frame),
            Err(err) => debug!(error = %err, "dropping malformed frame"),
        }
    }

    pub(crate) fn dispatch(&self, frame: Inbound) {
        debug!(kind = frame.kind(), "frame received");
        self.update_mirror(|mirror| mirror.apply(&frame));

        match frame {
            Inbound::AuthSuccess { avatar, .. } => {
                let promoted = self.phase.send_if_modified(|phase| {
                    if *phase == Phase::Authenticated {
                        *phase = Phase::LiveConnected;
                        true
                    } else {
                        false
                    }
                });
                if promoted {
                    info!(avatar = %avatar, "live channel authenticated");
                    self.emit(SessionEvent::LiveAuthenticated);
                } else {
                    debug!(phase = %self.phase(), "late AUTH_SUCCESS ignored");
                }
            }
            Inbound::AuthFailed { error, message } => {
                let reason = error
                    .or(message)
                    .unwrap_or_else(|| "unknown reason".to_string());
                warn!(%reason, "live channel rejected credentials");
                *self
                    .rejection
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(reason.clone());
                self.phase.send_if_modified(|phase| {
                    if phase.is_authenticated() {
                        *phase = Phase::LiveUnavailable;
                        true
                    } else {
                        false
                    }
                });
                self.emit(SessionEvent::LiveRejected { reason });
            }
            Inbound::ActionResult {
                success: false,
                action,
                error,
                ..
            } => {
                debug!(?action, ?error, "action failed");
                self.emit(SessionEvent::ActionFailed { action, error });
            }
            Inbound::AvatarUpdate { fields } => {
                self.emit(SessionEvent::AvatarUpdate(Value::Object(fields)));
            }
            Inbound::LedgerEvent { event } => {
                let kind = event.get("type").and_then(Value::as_str).unwrap_or("?");
                let id = event.get("id").and_then(Value::as_str).unwrap_or("?");
                info!(kind, id, "ledger event");
                self.emit(SessionEvent::Ledger(event));
            }
            Inbound::ActionResult { .. } | Inbound::WorldState { .. } | Inbound::Unknown => {}
        }
    }

    /// The channel ended without a local disconnect.
    pub(crate) fn channel_lost(&self, reason: Option<String>) {
        let dropped = self.phase.send_if_modified(|phase| {
            if *phase == Phase::LiveConnected {
                *phase = Phase::LiveUnavailable;
                true
            } else {
                false
            }
        });
        if dropped {
            warn!(reason = reason.as_deref().unwrap_or("closed"), "live channel lost");
        }
        self.emit(SessionEvent::ChannelClosed { reason });
    }
}

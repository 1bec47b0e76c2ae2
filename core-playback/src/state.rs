//! Playback lifecycle state machine.
//!
//! Exactly one [`PlayerState`] is current at any time, owned by the
//! [`StateManager`] and mutated only through validated transitions.
//! An attempted edge outside the transition table is rejected (state
//! unchanged) and logged as a warning; it is never fatal.

use core_runtime::logging::LogHandle;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifecycle states of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Buffering,
    Error,
    Disposed,
}

impl PlayerState {
    /// States from which transport playback can start or continue.
    pub fn is_playable(self) -> bool {
        matches!(
            self,
            PlayerState::Ready | PlayerState::Paused | PlayerState::Playing | PlayerState::Buffering
        )
    }

    /// States in which the position is (or is about to be) advancing.
    pub fn is_active(self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Buffering)
    }

    /// Directed transition table.
    fn can_transition_to(self, to: PlayerState) -> bool {
        use PlayerState::*;
        match self {
            Idle => matches!(to, Loading | Disposed),
            Loading => matches!(to, Ready | Error | Idle | Disposed),
            Ready => matches!(to, Playing | Loading | Idle | Disposed),
            Playing => matches!(to, Paused | Buffering | Ready | Error | Idle | Disposed),
            Paused => matches!(to, Playing | Ready | Loading | Idle | Disposed),
            Buffering => matches!(to, Playing | Paused | Error | Idle | Disposed),
            Error => matches!(to, Loading | Idle | Disposed),
            // Terminal.
            Disposed => false,
        }
    }
}

/// A committed state change delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: PlayerState,
    pub to: PlayerState,
}

/// Identifier of a registered transition listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateListenerId(u64);

type TransitionListener = Arc<dyn Fn(StateTransition) + Send + Sync>;

/// Owner of the player lifecycle state.
pub struct StateManager {
    current: Mutex<PlayerState>,
    listeners: Mutex<Vec<(StateListenerId, TransitionListener)>>,
    next_listener_id: AtomicU64,
    log: LogHandle,
}

impl StateManager {
    pub fn new(log: LogHandle) -> Self {
        Self {
            current: Mutex::new(PlayerState::Idle),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            log,
        }
    }

    /// Current state.
    pub fn current(&self) -> PlayerState {
        *self.current.lock()
    }

    /// Attempt a transition.
    ///
    /// Transitioning to the current state is a no-op success (no listener
    /// fires). A valid edge commits the new state and then invokes every
    /// listener synchronously with `{from, to}`; a panicking listener is
    /// caught and logged, without blocking the others or rolling back.
    /// An invalid edge returns `false`, leaves the state unchanged, and is
    /// logged as a warning.
    pub fn transition(&self, to: PlayerState) -> bool {
        let from = {
            let mut current = self.current.lock();
            let from = *current;
            if from == to {
                return true;
            }
            if !from.can_transition_to(to) {
                drop(current);
                self.log.warn(
                    "state",
                    format!("rejected transition {from:?} -> {to:?}"),
                );
                return false;
            }
            *current = to;
            from
        };

        self.notify(StateTransition { from, to });
        true
    }

    /// Force `Idle`, unless already disposed.
    pub fn reset(&self) {
        let from = {
            let mut current = self.current.lock();
            let from = *current;
            if from == PlayerState::Disposed || from == PlayerState::Idle {
                return;
            }
            *current = PlayerState::Idle;
            from
        };
        self.notify(StateTransition {
            from,
            to: PlayerState::Idle,
        });
    }

    /// Force `Disposed` and clear listeners. Irreversible.
    pub fn dispose(&self) {
        let from = {
            let mut current = self.current.lock();
            let from = *current;
            if from == PlayerState::Disposed {
                return;
            }
            *current = PlayerState::Disposed;
            from
        };
        self.notify(StateTransition {
            from,
            to: PlayerState::Disposed,
        });
        self.listeners.lock().clear();
    }

    /// Register a transition listener.
    pub fn on_transition<F>(&self, listener: F) -> StateListenerId
    where
        F: Fn(StateTransition) + Send + Sync + 'static,
    {
        let id = StateListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a transition listener.
    pub fn remove_listener(&self, id: StateListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn notify(&self, transition: StateTransition) {
        // Snapshot so listeners may unsubscribe during notification.
        let snapshot: Vec<TransitionListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(transition)
            }));
            if outcome.is_err() {
                self.log.warn(
                    "state",
                    format!(
                        "transition listener panicked on {:?} -> {:?}",
                        transition.from, transition.to
                    ),
                );
            }
        }
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("current", &self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    const ALL_STATES: [PlayerState; 8] = [
        PlayerState::Idle,
        PlayerState::Loading,
        PlayerState::Ready,
        PlayerState::Playing,
        PlayerState::Paused,
        PlayerState::Buffering,
        PlayerState::Error,
        PlayerState::Disposed,
    ];

    fn manager_in(state: PlayerState) -> StateManager {
        let manager = StateManager::new(LogHandle::default());
        *manager.current.lock() = state;
        manager
    }

    #[test]
    fn exhaustive_transition_table() {
        for from in ALL_STATES {
            for to in ALL_STATES {
                let manager = manager_in(from);
                let events: Arc<PlMutex<Vec<StateTransition>>> =
                    Arc::new(PlMutex::new(Vec::new()));
                let sink = events.clone();
                manager.on_transition(move |t| sink.lock().push(t));

                let expected = from == to || from.can_transition_to(to);
                assert_eq!(manager.transition(to), expected, "{from:?} -> {to:?}");

                let events = events.lock();
                if expected && from != to {
                    assert_eq!(manager.current(), to);
                    assert_eq!(events.as_slice(), &[StateTransition { from, to }]);
                } else if from == to {
                    // No-op success: no event fired.
                    assert!(events.is_empty());
                } else {
                    assert_eq!(manager.current(), from, "state must be unchanged");
                    assert!(events.is_empty());
                }
            }
        }
    }

    #[test]
    fn disposed_is_terminal() {
        let manager = manager_in(PlayerState::Disposed);
        for to in ALL_STATES {
            if to == PlayerState::Disposed {
                continue;
            }
            assert!(!manager.transition(to));
        }
        assert_eq!(manager.current(), PlayerState::Disposed);
    }

    #[test]
    fn reset_forces_idle_except_when_disposed() {
        let manager = manager_in(PlayerState::Playing);
        manager.reset();
        assert_eq!(manager.current(), PlayerState::Idle);

        let manager = manager_in(PlayerState::Disposed);
        manager.reset();
        assert_eq!(manager.current(), PlayerState::Disposed);
    }

    #[test]
    fn dispose_clears_listeners() {
        let manager = manager_in(PlayerState::Ready);
        let hits = Arc::new(PlMutex::new(0u32));
        let sink = hits.clone();
        manager.on_transition(move |_| *sink.lock() += 1);

        manager.dispose();
        assert_eq!(*hits.lock(), 1);

        // Terminal and silent afterwards.
        manager.dispose();
        manager.reset();
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn removed_listeners_stop_receiving() {
        let manager = manager_in(PlayerState::Idle);
        let hits = Arc::new(PlMutex::new(0u32));
        let sink = hits.clone();
        let id = manager.on_transition(move |_| *sink.lock() += 1);

        assert!(manager.remove_listener(id));
        assert!(!manager.remove_listener(id));

        manager.transition(PlayerState::Loading);
        assert_eq!(*hits.lock(), 0);
    }

    #[test]
    fn listener_panic_is_isolated() {
        let manager = manager_in(PlayerState::Idle);
        let hits = Arc::new(PlMutex::new(0u32));

        manager.on_transition(|_| panic!("listener bug"));
        let sink = hits.clone();
        manager.on_transition(move |_| *sink.lock() += 1);

        assert!(manager.transition(PlayerState::Loading));
        assert_eq!(*hits.lock(), 1);
        assert_eq!(manager.current(), PlayerState::Loading);
    }

    #[test]
    fn predicates_match_state_groups() {
        assert!(PlayerState::Ready.is_playable());
        assert!(PlayerState::Paused.is_playable());
        assert!(PlayerState::Playing.is_playable());
        assert!(PlayerState::Buffering.is_playable());
        assert!(!PlayerState::Loading.is_playable());

        assert!(PlayerState::Playing.is_active());
        assert!(PlayerState::Buffering.is_active());
        assert!(!PlayerState::Paused.is_active());
    }
}

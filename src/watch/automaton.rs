use std::time::Duration;

/// Changes arriving this soon after the first one are folded into it.
pub const CAST_DELAY: Duration = Duration::from_millis(100);

/// Quiet period after a compile starts; changes here are deferred.
pub const COOLDOWN_DELAY: Duration = Duration::from_millis(900);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchState {
    #[default]
    Idle,
    /// Collecting changes before a compile
    Casting,
    /// A compile was launched; waiting out the cooldown
    Cooldown,
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// Arm the timer.
    StartTimer(Duration),
    /// Launch one compile without waiting for it, then arm the timer.
    LaunchCompile(Duration),
}

/// Debounce/cooldown scheduler.
///
/// Pure: owns no timers and runs no compiles. The driver feeds it events
/// and carries out the returned [`Action`]. At most one compile runs at a
/// time, because a compile is only launched from `Casting`, which is only
/// entered when no compile is running.
#[derive(Debug, Default)]
pub struct Automaton {
    state: WatchState,
    is_building: bool,
    pending_rebuild: bool,
}

impl Automaton {
    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn is_building(&self) -> bool {
        self.is_building
    }

    pub fn has_pending(&self) -> bool {
        self.pending_rebuild
    }

    /// A watched file changed.
    pub fn on_change(&mut self) -> Action {
        match self.state {
            WatchState::Casting => Action::None,
            WatchState::Cooldown => {
                self.pending_rebuild = true;
                Action::None
            }
            WatchState::Idle if self.is_building => {
                self.pending_rebuild = true;
                Action::None
            }
            WatchState::Idle => {
                self.pending_rebuild = false;
                self.state = WatchState::Casting;
                Action::StartTimer(CAST_DELAY)
            }
        }
    }

    /// Start a compile now. Used by `Casting` timeouts and for the initial
    /// compile of a watch session.
    pub fn cast(&mut self) -> Action {
        self.state = WatchState::Cooldown;
        self.is_building = true;
        Action::LaunchCompile(COOLDOWN_DELAY)
    }

    /// The armed timer elapsed.
    pub fn on_timer(&mut self) -> Action {
        match self.state {
            WatchState::Casting => self.cast(),
            WatchState::Cooldown => {
                self.state = WatchState::Idle;
                self.retrigger()
            }
            WatchState::Idle => Action::None,
        }
    }

    /// The running compile finished, successfully or not.
    pub fn on_build_finished(&mut self) -> Action {
        self.is_building = false;
        self.retrigger()
    }

    fn retrigger(&mut self) -> Action {
        if self.pending_rebuild {
            self.on_change()
        } else {
            Action::None
        }
    }
}

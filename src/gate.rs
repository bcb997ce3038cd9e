use std::collections::BTreeMap;
use std::time::Duration;

use crate::{core::Year, dataset::HistoryEvent};

/// How long the race holds on a historical event before resuming.
pub const PAUSE_DURATION: Duration = Duration::from_millis(3000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Running,
    /// `since` is the timer reading at pause entry, `resume_at` the deadline
    /// after which the next tick resumes.
    Paused { since: Duration, resume_at: Duration },
}

/// What the driving loop should do this tick.
#[derive(Debug, PartialEq)]
pub enum GateAction<'a> {
    /// Advance time and render normally.
    Run,
    /// A new event year was crossed: show `event` and stop advancing.
    Pause { event: &'a HistoryEvent },
    /// Still inside the pause window: render nothing, keep waiting.
    Hold,
    /// The pause window elapsed: credit `paused_for` against elapsed time
    /// and continue.
    Resume { paused_for: Duration },
}

/// Pauses the race once per event year.
///
/// The resume deadline is checked on each tick rather than scheduled as a
/// callback, so cancellation is just dropping the gate with the rest of the
/// race state. A year triggers at most once regardless of how many ticks
/// observe it; one event per year, first in file order.
#[derive(Clone, Debug)]
pub struct EventGate {
    events: BTreeMap<Year, HistoryEvent>,
    state: GateState,
    last_triggered: Option<Year>,
    pause_duration: Duration,
}

impl EventGate {
    pub fn new(events: Vec<HistoryEvent>, pause_duration: Duration) -> Self {
        let mut by_year = BTreeMap::new();
        for event in events {
            by_year.entry(event.year).or_insert(event);
        }
        tracing::debug!(years = by_year.len(), "event gate armed");
        Self {
            events: by_year,
            state: GateState::Running,
            last_triggered: None,
            pause_duration,
        }
    }

    /// Decides this tick's action for the current (floored) year at timer
    /// reading `elapsed`.
    pub fn check(&mut self, current_year: Year, elapsed: Duration) -> GateAction<'_> {
        match self.state {
            GateState::Paused { since, resume_at } => {
                if elapsed >= resume_at {
                    self.state = GateState::Running;
                    let paused_for = elapsed - since;
                    tracing::debug!(?paused_for, "resuming race");
                    GateAction::Resume { paused_for }
                } else {
                    GateAction::Hold
                }
            }
            GateState::Running => {
                if self.last_triggered == Some(current_year) {
                    return GateAction::Run;
                }
                match self.events.get(&current_year) {
                    Some(event) => {
                        self.last_triggered = Some(current_year);
                        self.state = GateState::Paused {
                            since: elapsed,
                            resume_at: elapsed + self.pause_duration,
                        };
                        tracing::info!(year = %current_year, title = %event.event, "pausing on event");
                        GateAction::Pause { event }
                    }
                    None => GateAction::Run,
                }
            }
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, GateState::Paused { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(year: i32, title: &str) -> HistoryEvent {
        HistoryEvent {
            year: Year(year),
            event: title.to_owned(),
            event_cn: String::new(),
            description: String::new(),
            description_cn: String::new(),
            impact: String::new(),
            impact_cn: String::new(),
            image_url: String::new(),
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn runs_through_quiet_years() {
        let mut gate = EventGate::new(vec![event(1970, "oil")], PAUSE_DURATION);
        assert_eq!(gate.check(Year(1965), secs(1)), GateAction::Run);
        assert!(!gate.is_paused());
    }

    #[test]
    fn pauses_then_holds_then_resumes_with_credit() {
        let mut gate = EventGate::new(vec![event(1970, "oil")], secs(3));

        assert!(matches!(
            gate.check(Year(1970), secs(1)),
            GateAction::Pause { event } if event.event == "oil"
        ));
        assert!(gate.is_paused());

        assert_eq!(gate.check(Year(1970), secs(2)), GateAction::Hold);

        // Deadline overshoot is credited exactly.
        match gate.check(Year(1970), Duration::from_millis(4120)) {
            GateAction::Resume { paused_for } => {
                assert_eq!(paused_for, Duration::from_millis(3120));
            }
            other => panic!("expected resume, got {other:?}"),
        }
        assert!(!gate.is_paused());
    }

    #[test]
    fn each_year_triggers_at_most_once() {
        let mut gate = EventGate::new(vec![event(1970, "oil")], secs(3));
        assert!(matches!(gate.check(Year(1970), secs(0)), GateAction::Pause { .. }));
        gate.check(Year(1970), secs(3));

        // Same floored year observed again after resume.
        assert_eq!(gate.check(Year(1970), secs(4)), GateAction::Run);
    }

    #[test]
    fn later_event_years_still_fire() {
        let mut gate = EventGate::new(vec![event(1970, "oil"), event(1980, "boom")], secs(3));
        assert!(matches!(gate.check(Year(1970), secs(0)), GateAction::Pause { .. }));
        gate.check(Year(1970), secs(3));
        assert!(matches!(
            gate.check(Year(1980), secs(10)),
            GateAction::Pause { event } if event.event == "boom"
        ));
    }

    #[test]
    fn first_event_wins_within_a_year() {
        let mut gate = EventGate::new(
            vec![event(1970, "first"), event(1970, "second")],
            secs(3),
        );
        assert!(matches!(
            gate.check(Year(1970), secs(0)),
            GateAction::Pause { event } if event.event == "first"
        ));
    }
}

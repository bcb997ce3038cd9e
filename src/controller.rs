//! The driving loop: owns the timer arithmetic, the gate, the smoother and
//! the scales, and feeds placed frames to a [`RenderSurface`].
//!
//! One tick = one frame. The caller owns the clock and passes a monotonic
//! timer reading in, which keeps the loop deterministic under test.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::{
    core::Year,
    dataset::HistoryEvent,
    error::{RaceError, RaceResult},
    gate::{EventGate, GateAction, PAUSE_DURATION},
    index::RaceIndex,
    interp::{RankEntry, ranked_snapshot},
    scale::{BandScale, LinearScale},
    smooth::{DEFAULT_LERP_FACTOR, PositionSmoother},
    surface::{BarFrame, PlacedBar, RenderSurface},
};

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_YEAR_DURATION: Duration = Duration::from_millis(3000);

/// Value-axis headroom above the current leader.
pub const AXIS_HEADROOM: f64 = 1.1;

/// New bars enter this far below the plot area.
const ENTER_OFFSET: f64 = 100.0;
const BAR_PADDING: f64 = 0.25;
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 150.0,
            bottom: 80.0,
            left: 200.0,
        }
    }
}

/// Tunables for one race. `Default` gives the reference look: ten bars,
/// three seconds per year, three-second event pauses.
#[derive(Clone, Debug, PartialEq)]
pub struct RaceConfig {
    /// How many bars stay on screen.
    pub top_n: usize,
    /// Wall-clock time spent per data year.
    pub year_duration: Duration,
    /// How long the race holds on a historical event.
    pub pause_duration: Duration,
    /// Easing factor for rank position changes, in `(0, 1]`.
    pub lerp_factor: f64,
    /// Plot size in abstract pixels; surfaces map it onto their medium.
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
    /// Requested value-axis tick count (approximate, round steps win).
    pub tick_count: usize,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            year_duration: DEFAULT_YEAR_DURATION,
            pause_duration: PAUSE_DURATION,
            lerp_factor: DEFAULT_LERP_FACTOR,
            width: 1200.0,
            height: 700.0,
            margins: Margins::default(),
            tick_count: 10,
        }
    }
}

impl RaceConfig {
    pub fn validate(&self) -> RaceResult<()> {
        if self.top_n == 0 {
            return Err(RaceError::validation("top_n must be at least 1"));
        }
        if self.year_duration.is_zero() {
            return Err(RaceError::validation("year duration must be positive"));
        }
        if !(self.width.is_finite() && self.width > 0.0)
            || !(self.height.is_finite() && self.height > 0.0)
        {
            return Err(RaceError::validation(format!(
                "plot size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        // lerp_factor is validated by the smoother.
        Ok(())
    }

    /// Plot width after margins, clamped to a usable minimum.
    pub fn inner_width(&self) -> f64 {
        (self.width - self.margins.left - self.margins.right).max(100.0)
    }

    pub fn inner_height(&self) -> f64 {
        (self.height - self.margins.top - self.margins.bottom).max(100.0)
    }
}

/// Lifecycle of the race. Event pauses are tracked by the gate, not here;
/// a paused race is still `Running`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RacePhase {
    /// Timeline advancing.
    Running,
    /// Timeline exhausted, bars still easing into final place.
    Settling,
    /// Final frame drawn, nothing left to do.
    Done,
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame went to the surface.
    Drawn,
    /// The gate held (pause active or just triggered); nothing drawn.
    Held,
    /// The race is complete; the final frame has been drawn.
    Done,
}

/// Aggregated run counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RaceStats {
    /// Frames drawn to the surface.
    pub frames_drawn: u64,
    /// Ticks that drew nothing while the gate held.
    pub frames_held: u64,
    /// Event pauses triggered.
    pub pauses: u64,
}

pub struct RaceController {
    index: RaceIndex,
    config: RaceConfig,
    gate: EventGate,
    smoother: PositionSmoother,
    x_scale: LinearScale,
    y_scale: BandScale,
    paused_total: Duration,
    total_duration: Duration,
    phase: RacePhase,
    stats: RaceStats,
}

impl RaceController {
    pub fn new(
        index: RaceIndex,
        events: Vec<HistoryEvent>,
        config: RaceConfig,
    ) -> RaceResult<Self> {
        config.validate()?;
        let smoother = PositionSmoother::new(config.lerp_factor)?;
        // Duration scales with distinct years, not the calendar span.
        let total_duration = config.year_duration * index.year_count().saturating_sub(1) as u32;
        let x_scale = LinearScale::new((0.0, 0.0), (0.0, config.inner_width()));
        let y_scale = BandScale::new((0.0, config.inner_height()), BAR_PADDING, BAR_PADDING);
        let gate = EventGate::new(events, config.pause_duration);

        tracing::info!(
            countries = index.country_count(),
            years = index.year_count(),
            total_secs = total_duration.as_secs_f64(),
            "race ready"
        );

        Ok(Self {
            index,
            config,
            gate,
            smoother,
            x_scale,
            y_scale,
            paused_total: Duration::ZERO,
            total_duration,
            phase: RacePhase::Running,
            stats: RaceStats::default(),
        })
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn stats(&self) -> RaceStats {
        self.stats
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Timeline progress and decimal year at timer reading `elapsed`, after
    /// subtracting time spent paused.
    fn progress(&self, elapsed: Duration) -> (f64, f64) {
        let adjusted = elapsed.saturating_sub(self.paused_total);
        let t = if self.total_duration.is_zero() {
            1.0
        } else {
            (adjusted.as_secs_f64() / self.total_duration.as_secs_f64()).min(1.0)
        };
        let min = self.index.min_year().as_f64();
        let max = self.index.max_year().as_f64();
        (t, min + t * (max - min))
    }

    fn placed<'a>(
        &self,
        snapshot: &[RankEntry<'a>],
        settled: bool,
        enter_from: f64,
    ) -> Vec<PlacedBar<'a>> {
        let bandwidth = self.y_scale.bandwidth();
        snapshot
            .iter()
            .enumerate()
            .map(|(rank, entry)| {
                let target = self.y_scale.position(entry.iso3).unwrap_or(enter_from);
                let y = if settled {
                    target
                } else {
                    self.smoother.position(entry.iso3).unwrap_or(enter_from)
                };
                PlacedBar {
                    rank,
                    iso3: entry.iso3,
                    meta: entry.meta,
                    value: entry.value,
                    y,
                    width: self.x_scale.scale(entry.value),
                    height: bandwidth,
                }
            })
            .collect()
    }

    /// Advances the race one tick at timer reading `elapsed` and draws to
    /// `surface` unless the gate holds. Readings must be monotonic across
    /// calls.
    #[tracing::instrument(skip(self, surface), level = "trace")]
    pub fn tick<S: RenderSurface>(
        &mut self,
        elapsed: Duration,
        surface: &mut S,
    ) -> RaceResult<TickOutcome> {
        if self.phase == RacePhase::Done {
            return Ok(TickOutcome::Done);
        }

        // The gate ignores the year while paused, and a trigger can only
        // involve the pre-credit year, so the tentative floor is enough.
        let (_, tentative) = self.progress(elapsed);
        match self.gate.check(Year::floor_of(tentative), elapsed) {
            GateAction::Hold => {
                self.stats.frames_held += 1;
                return Ok(TickOutcome::Held);
            }
            GateAction::Pause { event } => {
                surface.show_event(event)?;
                self.stats.pauses += 1;
                self.stats.frames_held += 1;
                return Ok(TickOutcome::Held);
            }
            GateAction::Resume { paused_for } => {
                self.paused_total += paused_for;
                surface.hide_event()?;
            }
            GateAction::Run => {}
        }

        // Timeline position after any resume credit.
        let (t, decimal_year) = self.progress(elapsed);
        let snapshot = ranked_snapshot(&self.index, decimal_year, self.config.top_n)?;

        let axis_max = snapshot
            .first()
            .map(|top| top.value * AXIS_HEADROOM)
            .unwrap_or(0.0);
        self.x_scale.set_domain(0.0, axis_max);
        self.y_scale
            .set_domain(snapshot.iter().map(|e| e.iso3).collect());

        let enter_from = self.config.inner_height() + ENTER_OFFSET;
        let mut visible = HashSet::with_capacity(snapshot.len());
        let mut targets = Vec::with_capacity(snapshot.len());
        for entry in &snapshot {
            visible.insert(entry.iso3);
            if let Some(target) = self.y_scale.position(entry.iso3) {
                targets.push((entry.iso3, target));
                self.smoother.step(entry.iso3, target, enter_from);
            }
        }
        self.smoother.maybe_purge(elapsed, &visible);

        if t >= 1.0 {
            if self.phase == RacePhase::Running {
                self.phase = RacePhase::Settling;
                tracing::debug!(decimal_year, "timeline exhausted, settling");
            }
            // Catch-up pass; the frame below then shows the snapped result.
            if self.smoother.finish_pass(&targets) {
                self.phase = RacePhase::Done;
            }
        }

        let frame = BarFrame {
            decimal_year,
            progress: t,
            axis_max,
            ticks: self.x_scale.ticks(self.config.tick_count),
            plot_height: self.config.inner_height(),
            bars: self.placed(&snapshot, false, enter_from),
        };
        surface.draw_frame(&frame)?;
        self.stats.frames_drawn += 1;

        if self.phase == RacePhase::Done {
            tracing::info!(
                frames = self.stats.frames_drawn,
                pauses = self.stats.pauses,
                "race complete"
            );
            return Ok(TickOutcome::Done);
        }
        Ok(TickOutcome::Drawn)
    }

    /// Draws one fully settled frame at `decimal_year`, outside any timer.
    pub fn draw_still<S: RenderSurface>(
        &mut self,
        decimal_year: f64,
        surface: &mut S,
    ) -> RaceResult<()> {
        let snapshot = ranked_snapshot(&self.index, decimal_year, self.config.top_n)?;

        let axis_max = snapshot
            .first()
            .map(|top| top.value * AXIS_HEADROOM)
            .unwrap_or(0.0);
        self.x_scale.set_domain(0.0, axis_max);
        self.y_scale
            .set_domain(snapshot.iter().map(|e| e.iso3).collect());

        let min = self.index.min_year().as_f64();
        let max = self.index.max_year().as_f64();
        let progress = if max > min {
            (decimal_year - min) / (max - min)
        } else {
            1.0
        };

        let frame = BarFrame {
            decimal_year,
            progress,
            axis_max,
            ticks: self.x_scale.ticks(self.config.tick_count),
            plot_height: self.config.inner_height(),
            bars: self.placed(&snapshot, true, self.config.inner_height() + ENTER_OFFSET),
        };
        surface.draw_frame(&frame)
    }

    /// Drives the race against the process clock until done, pacing ticks at
    /// roughly sixty frames per second.
    pub fn run<S: RenderSurface>(&mut self, surface: &mut S) -> RaceResult<RaceStats> {
        self.run_until(surface, || false)
    }

    /// Like [`RaceController::run`], but checks `should_stop` between ticks
    /// so the caller can cancel mid-race. A cancelled race keeps its phase;
    /// only a completed timeline reaches [`RacePhase::Done`].
    pub fn run_until<S, F>(&mut self, surface: &mut S, mut should_stop: F) -> RaceResult<RaceStats>
    where
        S: RenderSurface,
        F: FnMut() -> bool,
    {
        let start = Instant::now();
        loop {
            if self.tick(start.elapsed(), surface)? == TickOutcome::Done {
                return Ok(self.stats);
            }
            if should_stop() {
                tracing::info!(frames = self.stats.frames_drawn, "race cancelled");
                return Ok(self.stats);
            }
            std::thread::sleep(FRAME_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{Iso3, Year},
        dataset::{Dataset, tests::record},
        surface::BarFrame,
    };

    /// Surface that records everything that reaches it.
    #[derive(Default)]
    struct Probe {
        frames: Vec<(f64, Vec<(Iso3, f64, f64)>)>,
        shown: Vec<Year>,
        hidden: u32,
        fail_draws: bool,
    }

    impl RenderSurface for Probe {
        fn draw_frame(&mut self, frame: &BarFrame<'_>) -> RaceResult<()> {
            if self.fail_draws {
                return Err(RaceError::animation("probe rejected frame"));
            }
            let bars = frame
                .bars
                .iter()
                .map(|b| (b.iso3, b.value, b.y))
                .collect();
            self.frames.push((frame.decimal_year, bars));
            Ok(())
        }

        fn show_event(&mut self, event: &HistoryEvent) -> RaceResult<()> {
            self.shown.push(event.year);
            Ok(())
        }

        fn hide_event(&mut self) -> RaceResult<()> {
            self.hidden += 1;
            Ok(())
        }
    }

    fn event(year: i32) -> HistoryEvent {
        HistoryEvent {
            year: Year(year),
            event: "event".to_owned(),
            event_cn: String::new(),
            description: String::new(),
            description_cn: String::new(),
            impact: String::new(),
            impact_cn: String::new(),
            image_url: String::new(),
        }
    }

    fn two_year_index() -> RaceIndex {
        let dataset = Dataset::new(vec![
            record("USA", 1960, 100.0),
            record("USA", 1961, 200.0),
            record("FRA", 1960, 50.0),
            record("FRA", 1961, 80.0),
        ])
        .unwrap();
        RaceIndex::build(&dataset).unwrap()
    }

    fn fast_config() -> RaceConfig {
        RaceConfig {
            year_duration: Duration::from_millis(1000),
            pause_duration: Duration::from_millis(100),
            ..RaceConfig::default()
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn pause_freezes_the_decimal_year() {
        let mut ctl = RaceController::new(two_year_index(), vec![event(1960)], fast_config())
            .unwrap();
        let mut probe = Probe::default();

        // First tick lands on the event year: overlay up, no frame.
        assert_eq!(ctl.tick(ms(0), &mut probe).unwrap(), TickOutcome::Held);
        assert_eq!(probe.shown, vec![Year(1960)]);
        assert!(probe.frames.is_empty());

        assert_eq!(ctl.tick(ms(50), &mut probe).unwrap(), TickOutcome::Held);
        assert!(probe.frames.is_empty());

        // Resume credits the full pause, so the year picks up where it froze.
        assert_eq!(ctl.tick(ms(150), &mut probe).unwrap(), TickOutcome::Drawn);
        assert_eq!(probe.hidden, 1);
        assert!((probe.frames[0].0 - 1960.0).abs() < 1e-9);

        // Half a year of unpaused time later.
        ctl.tick(ms(650), &mut probe).unwrap();
        assert!((probe.frames[1].0 - 1960.5).abs() < 1e-9);
    }

    #[test]
    fn event_fires_once_and_race_finishes_settled() {
        let mut ctl = RaceController::new(two_year_index(), vec![event(1960)], fast_config())
            .unwrap();
        let mut probe = Probe::default();

        let mut elapsed = Duration::ZERO;
        let mut outcome = ctl.tick(elapsed, &mut probe).unwrap();
        let mut guard = 0;
        while outcome != TickOutcome::Done {
            elapsed += ms(16);
            outcome = ctl.tick(elapsed, &mut probe).unwrap();
            guard += 1;
            assert!(guard < 10_000, "race never finished");
        }

        assert_eq!(probe.shown.len(), 1);
        assert_eq!(ctl.phase(), RacePhase::Done);

        // Final frame is fully settled: bars sit exactly on band positions.
        let (_, last_bars) = probe.frames.last().unwrap();
        let usa_y = last_bars
            .iter()
            .find(|(iso3, _, _)| iso3.as_str() == "USA")
            .map(|&(_, _, y)| y)
            .unwrap();
        let expected = {
            let mut band = BandScale::new(
                (0.0, ctl.config().inner_height()),
                BAR_PADDING,
                BAR_PADDING,
            );
            band.set_domain(vec![
                Iso3::new("USA").unwrap(),
                Iso3::new("FRA").unwrap(),
            ]);
            band.position(Iso3::new("USA").unwrap()).unwrap()
        };
        assert!((usa_y - expected).abs() < 1e-9);

        // A finished race stays finished and draws nothing more.
        let frames_before = probe.frames.len();
        assert_eq!(ctl.tick(elapsed + ms(16), &mut probe).unwrap(), TickOutcome::Done);
        assert_eq!(probe.frames.len(), frames_before);

        let stats = ctl.stats();
        assert_eq!(stats.frames_drawn as usize, probe.frames.len());
        assert_eq!(stats.pauses, 1);
    }

    #[test]
    fn single_year_timeline_is_all_settling() {
        let dataset = Dataset::new(vec![record("USA", 1960, 100.0)]).unwrap();
        let index = RaceIndex::build(&dataset).unwrap();
        let mut ctl =
            RaceController::new(index, Vec::new(), RaceConfig::default()).unwrap();
        let mut probe = Probe::default();

        let mut elapsed = Duration::ZERO;
        let mut guard = 0;
        while ctl.tick(elapsed, &mut probe).unwrap() != TickOutcome::Done {
            elapsed += ms(16);
            guard += 1;
            assert!(guard < 1_000, "single-year race never settled");
        }
        assert!((probe.frames[0].0 - 1960.0).abs() < 1e-9);
    }

    #[test]
    fn surface_errors_abort_the_tick() {
        let mut ctl =
            RaceController::new(two_year_index(), Vec::new(), fast_config()).unwrap();
        let mut probe = Probe {
            fail_draws: true,
            ..Probe::default()
        };
        assert!(ctl.tick(ms(0), &mut probe).is_err());
    }

    #[test]
    fn still_frame_uses_exact_band_positions() {
        let mut ctl =
            RaceController::new(two_year_index(), Vec::new(), fast_config()).unwrap();
        let mut probe = Probe::default();
        ctl.draw_still(1960.5, &mut probe).unwrap();

        let (year, bars) = &probe.frames[0];
        assert!((year - 1960.5).abs() < 1e-9);
        assert_eq!(bars.len(), 2);
        // USA interpolates to 150, FRA to 65.
        assert!((bars[0].1 - 150.0).abs() < 1e-9);
        assert!((bars[1].1 - 65.0).abs() < 1e-9);
        // Settled still frames bypass the smoother: inner height 600 with
        // paddings 0.25 gives step 600/2.25 and outer start 200/3.
        assert!((bars[0].2 - 200.0 / 3.0).abs() < 1e-9);
        assert!((bars[1].2 - 1000.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_top_n_is_rejected() {
        let config = RaceConfig {
            top_n: 0,
            ..RaceConfig::default()
        };
        assert!(RaceController::new(two_year_index(), Vec::new(), config).is_err());
    }
}

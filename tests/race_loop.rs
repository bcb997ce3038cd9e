use std::time::Duration;

use rankrace::{
    BarFrame, Dataset, HistoryEvent, Iso3, RaceConfig, RaceController, RaceIndex, RacePhase,
    RaceResult, RenderSurface, TickOutcome, Year,
};

/// Records every call the race loop makes, in order.
#[derive(Default)]
struct RecordingSurface {
    log: Vec<Op>,
}

#[derive(Debug)]
enum Op {
    Frame {
        decimal_year: f64,
        progress: f64,
        /// `(iso3, value, y)` in rank order, top first.
        bars: Vec<(Iso3, f64, f64)>,
    },
    EventShown(Year),
    EventHidden,
}

impl RenderSurface for RecordingSurface {
    fn draw_frame(&mut self, frame: &BarFrame<'_>) -> RaceResult<()> {
        self.log.push(Op::Frame {
            decimal_year: frame.decimal_year,
            progress: frame.progress,
            bars: frame.bars.iter().map(|b| (b.iso3, b.value, b.y)).collect(),
        });
        Ok(())
    }

    fn show_event(&mut self, event: &HistoryEvent) -> RaceResult<()> {
        self.log.push(Op::EventShown(event.year));
        Ok(())
    }

    fn hide_event(&mut self) -> RaceResult<()> {
        self.log.push(Op::EventHidden);
        Ok(())
    }
}

impl RecordingSurface {
    fn frames(&self) -> impl Iterator<Item = (f64, f64, &[(Iso3, f64, f64)])> {
        self.log.iter().filter_map(|op| match op {
            Op::Frame {
                decimal_year,
                progress,
                bars,
            } => Some((*decimal_year, *progress, bars.as_slice())),
            _ => None,
        })
    }

    fn shown_years(&self) -> Vec<Year> {
        self.log
            .iter()
            .filter_map(|op| match op {
                Op::EventShown(year) => Some(*year),
                _ => None,
            })
            .collect()
    }
}

fn fixture_index() -> RaceIndex {
    let dataset = Dataset::from_json_str(include_str!("data/gdp_mini.json")).unwrap();
    RaceIndex::build(&dataset).unwrap()
}

fn fixture_events() -> Vec<HistoryEvent> {
    serde_json::from_str(include_str!("data/events_mini.json")).unwrap()
}

fn fast_config() -> RaceConfig {
    RaceConfig {
        top_n: 3,
        year_duration: Duration::from_millis(500),
        pause_duration: Duration::from_millis(100),
        ..RaceConfig::default()
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn last_frame_year(surface: &RecordingSurface) -> Option<f64> {
    surface.frames().map(|(decimal_year, _, _)| decimal_year).last()
}

#[test]
fn fixture_dataset_loads_and_indexes() {
    let idx = fixture_index();
    assert_eq!(idx.min_year(), Year(1960));
    assert_eq!(idx.max_year(), Year(1962));
    assert_eq!(idx.year_count(), 3);
    assert_eq!(idx.country_count(), 4);

    let usa = idx.meta(Iso3::new("USA").unwrap()).unwrap();
    assert_eq!(usa.name, "United States");
    assert_eq!(usa.name_cn, "美国");
}

#[test]
fn race_replays_fixture_pausing_on_each_event() {
    let mut ctl =
        RaceController::new(fixture_index(), fixture_events(), fast_config()).unwrap();
    let mut surface = RecordingSurface::default();

    let mut elapsed = Duration::ZERO;
    let mut ticks = 0;
    while ctl.tick(elapsed, &mut surface).unwrap() != TickOutcome::Done {
        elapsed += ms(16);
        ticks += 1;
        assert!(ticks < 10_000, "race never finished");
    }
    assert_eq!(ctl.phase(), RacePhase::Done);

    // Both events fired, once each, in timeline order.
    assert_eq!(surface.shown_years(), vec![Year(1961), Year(1962)]);
    assert_eq!(ctl.stats().pauses, 2);
    assert!(ctl.stats().frames_held >= 2);

    // No frame reaches the surface while an overlay is up.
    let mut overlay_up = false;
    for op in &surface.log {
        match op {
            Op::EventShown(_) => overlay_up = true,
            Op::EventHidden => overlay_up = false,
            Op::Frame { .. } => assert!(!overlay_up, "frame drawn during a pause"),
        }
    }

    // The decimal year never runs backwards and never jumps, pauses included.
    let years: Vec<f64> = surface.frames().map(|(decimal_year, _, _)| decimal_year).collect();
    assert_eq!(years.first().copied(), Some(1960.0));
    assert_eq!(years.last().copied(), Some(1962.0));
    for pair in years.windows(2) {
        let step = pair[1] - pair[0];
        assert!(step >= 0.0, "decimal year went backwards: {pair:?}");
        assert!(step < 0.05, "decimal year jumped across a pause: {pair:?}");
    }

    // Every frame carries the top three in descending value order.
    for (_, _, bars) in surface.frames() {
        assert_eq!(bars.len(), 3);
        assert!(bars.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    // China starts third and Japan overtakes it by the end.
    let (_, _, first_bars) = surface.frames().next().unwrap();
    assert_eq!(first_bars[2].0.as_str(), "CHN");
    let (_, progress, last_bars) = surface.frames().last().unwrap();
    assert_eq!(progress, 1.0);
    let order: Vec<&str> = last_bars.iter().map(|(iso3, _, _)| iso3.as_str()).collect();
    assert_eq!(order, vec!["USA", "FRA", "JPN"]);

    assert_eq!(ctl.stats().frames_drawn as usize, surface.frames().count());
}

#[test]
fn pause_resumes_without_skipping_years() {
    let mut events = fixture_events();
    events.truncate(1); // 1961 only
    let config = RaceConfig {
        top_n: 3,
        year_duration: Duration::from_millis(1000),
        pause_duration: Duration::from_millis(100),
        ..RaceConfig::default()
    };
    let mut ctl = RaceController::new(fixture_index(), events, config).unwrap();
    let mut surface = RecordingSurface::default();

    assert_eq!(ctl.tick(ms(0), &mut surface).unwrap(), TickOutcome::Drawn);
    assert_eq!(last_frame_year(&surface), Some(1960.0));

    assert_eq!(ctl.tick(ms(999), &mut surface).unwrap(), TickOutcome::Drawn);
    assert!(last_frame_year(&surface).unwrap() < 1961.0);

    // Crossing into 1961 raises the overlay instead of drawing.
    assert_eq!(ctl.tick(ms(1000), &mut surface).unwrap(), TickOutcome::Held);
    assert_eq!(surface.shown_years(), vec![Year(1961)]);

    assert_eq!(ctl.tick(ms(1050), &mut surface).unwrap(), TickOutcome::Held);

    // The pause window ends; paused time is credited, so the year picks up
    // exactly where it froze.
    assert_eq!(ctl.tick(ms(1100), &mut surface).unwrap(), TickOutcome::Drawn);
    assert_eq!(last_frame_year(&surface), Some(1961.0));

    // Half a year of unpaused time later.
    assert_eq!(ctl.tick(ms(1600), &mut surface).unwrap(), TickOutcome::Drawn);
    assert_eq!(last_frame_year(&surface), Some(1961.5));

    // The same floored year does not trigger twice.
    assert_eq!(surface.shown_years().len(), 1);
}

#[test]
fn cancelled_race_reports_partial_stats() {
    let config = RaceConfig {
        top_n: 3,
        ..RaceConfig::default()
    };
    let mut ctl = RaceController::new(fixture_index(), fixture_events(), config).unwrap();
    let mut surface = RecordingSurface::default();

    let stats = ctl.run_until(&mut surface, || true).unwrap();
    assert_eq!(stats.frames_drawn, 1);
    assert_eq!(surface.frames().count(), 1);
    assert_eq!(ctl.phase(), RacePhase::Running);
}

#[test]
fn still_frame_shows_final_standings() {
    let mut ctl =
        RaceController::new(fixture_index(), Vec::new(), fast_config()).unwrap();
    let mut surface = RecordingSurface::default();
    ctl.draw_still(1962.0, &mut surface).unwrap();

    let (year, progress, bars) = surface.frames().next().unwrap();
    assert_eq!(year, 1962.0);
    assert_eq!(progress, 1.0);

    let order: Vec<&str> = bars.iter().map(|(iso3, _, _)| iso3.as_str()).collect();
    assert_eq!(order, vec!["USA", "FRA", "JPN"]);
    let values: Vec<f64> = bars.iter().map(|&(_, value, _)| value).collect();
    assert_eq!(values, vec![605.1, 76.3, 60.7]);

    // Settled bars stack top to bottom in rank order.
    assert!(bars.windows(2).all(|w| w[0].2 < w[1].2));
}

use std::time::Duration;

use rankrace::{
    BarFrame, Dataset, HistoryEvent, RaceConfig, RaceController, RaceIndex, RaceResult,
    RenderSurface,
};

/// Prints a one-line summary of every tenth frame instead of drawing.
#[derive(Default)]
struct LogSurface {
    frames: u64,
}

impl RenderSurface for LogSurface {
    fn draw_frame(&mut self, frame: &BarFrame<'_>) -> RaceResult<()> {
        self.frames += 1;
        if self.frames % 10 == 1 {
            let leader = frame.bars.first().map(|b| b.iso3.as_str()).unwrap_or("-");
            println!(
                "{:7.2}  {:5.1}%  leader {leader}  ({} bars)",
                frame.decimal_year,
                frame.progress * 100.0,
                frame.bars.len()
            );
        }
        Ok(())
    }

    fn show_event(&mut self, event: &HistoryEvent) -> RaceResult<()> {
        println!("-- {} ({}) --", event.event, event.year);
        Ok(())
    }

    fn hide_event(&mut self) -> RaceResult<()> {
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let dataset = Dataset::from_json_str(include_str!("../tests/data/gdp_mini.json"))?;
    let events: Vec<HistoryEvent> =
        serde_json::from_str(include_str!("../tests/data/events_mini.json"))?;
    let index = RaceIndex::build(&dataset)?;

    let config = RaceConfig {
        top_n: 3,
        year_duration: Duration::from_millis(600),
        pause_duration: Duration::from_millis(300),
        ..RaceConfig::default()
    };

    let mut surface = LogSurface::default();
    let mut controller = RaceController::new(index, events, config)?;
    let stats = controller.run(&mut surface)?;

    println!(
        "done: {} frames drawn, {} held, {} pauses",
        stats.frames_drawn, stats.frames_held, stats.pauses
    );
    Ok(())
}

//! The boundary between the race loop and whatever draws it.
//!
//! The loop owns all geometry: interpolation, ranking, easing and scales
//! happen before a frame reaches a surface, so implementations only map
//! already-placed bars onto their own medium (terminal cells, a test
//! recording, ...).

use crate::{core::Iso3, dataset::HistoryEvent, error::RaceResult, index::CountryMeta};

/// One bar with its final geometry for this frame.
#[derive(Clone, Debug, serde::Serialize)]
pub struct PlacedBar<'a> {
    /// 0-based position in the ranking, top first.
    pub rank: usize,
    pub iso3: Iso3,
    pub meta: &'a CountryMeta,
    /// Interpolated value in billions.
    pub value: f64,
    /// Smoothed vertical offset within the plot area.
    pub y: f64,
    /// Scaled bar length.
    pub width: f64,
    /// Band height shared by all bars.
    pub height: f64,
}

/// Everything a surface needs to draw one tick of the race.
#[derive(Clone, Debug, serde::Serialize)]
pub struct BarFrame<'a> {
    pub decimal_year: f64,
    /// Timeline progress in `[0, 1]`.
    pub progress: f64,
    /// Upper end of the value axis (headroom included).
    pub axis_max: f64,
    /// Axis tick values in data space.
    pub ticks: Vec<f64>,
    /// Vertical extent of the plot area; `y` beyond it is off screen
    /// (bars entering from below).
    pub plot_height: f64,
    pub bars: Vec<PlacedBar<'a>>,
}

impl BarFrame<'_> {
    pub fn bar(&self, iso3: Iso3) -> Option<&PlacedBar<'_>> {
        self.bars.iter().find(|b| b.iso3 == iso3)
    }
}

/// Where frames go. Implementations draw; they never decide pacing or
/// geometry. Errors propagate and abort the race.
pub trait RenderSurface {
    fn draw_frame(&mut self, frame: &BarFrame<'_>) -> RaceResult<()>;

    /// Present an event overlay. The loop stops sending frames until it
    /// calls [`RenderSurface::hide_event`].
    fn show_event(&mut self, event: &HistoryEvent) -> RaceResult<()>;

    fn hide_event(&mut self) -> RaceResult<()>;
}

impl<S: RenderSurface + ?Sized> RenderSurface for &mut S {
    fn draw_frame(&mut self, frame: &BarFrame<'_>) -> RaceResult<()> {
        (**self).draw_frame(frame)
    }

    fn show_event(&mut self, event: &HistoryEvent) -> RaceResult<()> {
        (**self).show_event(event)
    }

    fn hide_event(&mut self) -> RaceResult<()> {
        (**self).hide_event()
    }
}

#![forbid(unsafe_code)]

pub mod controller;
pub mod core;
pub mod dataset;
pub mod error;
pub mod gate;
pub mod index;
pub mod interp;
pub mod scale;
pub mod smooth;
pub mod surface;
pub mod term;
pub mod worldbank;

pub use controller::{RaceConfig, RaceController, RacePhase, RaceStats, TickOutcome};
pub use core::{Iso3, Lang, Year};
pub use dataset::{Dataset, GdpRecord, HistoryEvent};
pub use error::{RaceError, RaceResult};
pub use index::RaceIndex;
pub use interp::{RankEntry, ranked_snapshot};
pub use surface::{BarFrame, PlacedBar, RenderSurface};

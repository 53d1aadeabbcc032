//! Audio-reactive show engine: interpretation trees that turn per-tick signal
//! frames into fixture states and composited visuals, and the "shift" that
//! regenerates parts of those trees as the show goes on.

pub mod canvas;
pub mod color;
pub mod config;
pub mod content;
pub mod director;
pub mod error;
pub mod frame;
pub mod fx;
pub mod generate;
pub mod interpretations;
pub mod layers;
pub mod lighting;
pub mod lights;
pub mod mailbox;
pub mod node;
pub mod num;
pub mod state;
pub mod utils;

pub use canvas::{FrameBuffer, RenderContext, Rgba, SoftwareRenderer};
pub use config::{RigConfig, ShowConfig};
pub use content::{ContentCycle, ContentLibrary, ContentUnit};
pub use director::{Command, ControlError, ControlHandle, Director, Outputs, TickReport};
pub use error::{ConfigError, RenderError, ShiftError};
pub use frame::{Signal, SignalFrame};
pub use generate::{recursive_generate, Fraction};
pub use lights::FixtureState;
pub use state::{ColorScheme, Mode};

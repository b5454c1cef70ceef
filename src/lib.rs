pub mod blog; // `---`-separated blog document
pub mod builder; // Recipe → graph instance
pub mod config;
pub mod dsp;
pub mod error;
pub mod graph; // Runtime audio graph and its nodes
pub mod io; // Devices, decoding, catalog listing
pub mod recipe; // Randomized effects chain description
pub mod selector;
pub mod session; // Playback state machine
pub mod site;
pub mod visualizer;

pub use builder::{GraphBuilder, GraphInstance};
pub use error::{BackendError, ConfigError, GraphError, PlaybackError, RecipeError};
pub use recipe::{ChainRecipe, EffectStageSpec, RecipeStyle, StageKind};
pub use selector::{pick_track, AudioCatalog, SourceRef};
pub use session::{Lifecycle, PlaybackSession, SessionOptions, SessionState, StartOutcome, StopOutcome};
pub use visualizer::{tick, BarPolicy, BarStyle, FrequencyFrame, VisualizerFeed};

pub const MAX_BLOCK_SIZE: usize = 2048;

/// Analyser transform size. Gives 32 bins, plenty for a row of bars.
pub const FFT_SIZE: usize = 64;

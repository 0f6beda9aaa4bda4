pub mod analysis; // Output level and spectrum summary
pub mod config;
pub mod control; // Control path towards the render thread
pub mod dsp;
pub mod engine; // Shared engine contract and the four algorithms
pub mod error;
pub mod io;
pub mod manager; // Layering, crossfade and overload protection
pub mod observer;
pub mod params;
pub mod snapshot;
pub mod voice;

pub use config::EngineConfig;
#[cfg(feature = "rtrb")]
pub use control::SynthHandle;
pub use engine::{EngineType, SynthEngine};
pub use error::{Result, SynthError};
pub use manager::{SynthesisManager, SynthesisMode};
pub use observer::{SynthEvent, SynthObserver};
pub use snapshot::SynthSnapshot;

pub const MAX_BLOCK_SIZE: usize = 2048;

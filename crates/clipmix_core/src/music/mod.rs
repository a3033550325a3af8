//! Background-music pools.

mod registry;

pub use registry::{
    pick_random_track, MusicPoolRegistry, PoolError, PoolResult, TrackInfo, AUDIO_EXTENSIONS,
};

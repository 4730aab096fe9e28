/// Frame module - frame pacing and the per-frame submission protocol

pub mod frame_ring;
pub mod frame_loop;
pub mod frame_timer;

pub use frame_ring::FrameRing;
pub use frame_loop::{
    FrameLoop, FrameState, FrameStatus,
    MAX_FRAMES_IN_FLIGHT, FENCE_TIMEOUT, ACQUIRE_TIMEOUT,
};
pub use frame_timer::FrameTimer;

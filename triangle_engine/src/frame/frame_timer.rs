/// Frame timing and frame-rate counter

use std::time::{Duration, Instant};

const FPS_INTERVAL: Duration = Duration::from_secs(1);

/// Measures per-frame CPU time and a frame rate refreshed once per second
///
/// Also keeps a normalized animation clock in `[0, 1)` advanced by
/// `frame_time * timer_speed` while not paused.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    frame_started: Option<Instant>,
    last_fps_update: Instant,
    frame_counter: u32,
    total_frames: u64,
    frame_time: f32,
    fps: u32,
    timer: f32,
    timer_speed: f32,
    paused: bool,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Timer whose first rate window opens at `now`
    pub fn starting_at(now: Instant) -> Self {
        Self {
            frame_started: None,
            last_fps_update: now,
            frame_counter: 0,
            total_frames: 0,
            frame_time: 1.0,
            fps: 0,
            timer: 0.0,
            timer_speed: 0.25,
            paused: false,
        }
    }

    pub fn frame_start(&mut self) {
        self.frame_start_at(Instant::now());
    }

    pub fn frame_start_at(&mut self, now: Instant) {
        self.frame_started = Some(now);
    }

    /// End the current frame. Returns true when the frame rate was refreshed.
    pub fn frame_stop(&mut self) -> bool {
        self.frame_stop_at(Instant::now())
    }

    pub fn frame_stop_at(&mut self, now: Instant) -> bool {
        self.frame_counter += 1;
        self.total_frames += 1;

        if let Some(started) = self.frame_started.take() {
            self.frame_time = now.saturating_duration_since(started).as_secs_f32();
        }

        if !self.paused {
            self.timer = (self.timer + self.timer_speed * self.frame_time).fract();
        }

        let window = now.saturating_duration_since(self.last_fps_update);
        if window > FPS_INTERVAL {
            self.fps = (self.frame_counter as f64 / window.as_secs_f64()) as u32;
            self.frame_counter = 0;
            self.last_fps_update = now;
            return true;
        }
        false
    }

    /// Duration of the last measured frame in seconds
    pub fn frame_time(&self) -> f32 {
        self.frame_time
    }

    /// Frame rate over the last completed one-second window
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn set_timer_speed(&mut self, speed: f32) {
        self.timer_speed = speed;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "frame_timer_tests.rs"]
mod tests;

//! Unit tests for frame_timer.rs

use crate::frame::FrameTimer;
use std::time::{Duration, Instant};

fn run_frames(timer: &mut FrameTimer, base: Instant, count: u32, frame: Duration) -> Instant {
    let mut now = base;
    for _ in 0..count {
        timer.frame_start_at(now);
        now += frame;
        timer.frame_stop_at(now);
    }
    now
}

#[test]
fn test_frame_time_in_seconds() {
    let base = Instant::now();
    let mut timer = FrameTimer::starting_at(base);
    timer.frame_start_at(base);
    timer.frame_stop_at(base + Duration::from_millis(16));
    assert!((timer.frame_time() - 0.016).abs() < 1e-4);
    assert_eq!(timer.total_frames(), 1);
}

#[test]
fn test_fps_zero_within_first_second() {
    let base = Instant::now();
    let mut timer = FrameTimer::starting_at(base);
    run_frames(&mut timer, base, 50, Duration::from_millis(10));
    assert_eq!(timer.fps(), 0);
}

#[test]
fn test_fps_refreshed_after_one_second() {
    let base = Instant::now();
    let mut timer = FrameTimer::starting_at(base);
    let now = run_frames(&mut timer, base, 4, Duration::from_millis(250));
    // exactly 1000 ms is not past the window yet
    assert_eq!(timer.fps(), 0);

    timer.frame_start_at(now);
    let refreshed = timer.frame_stop_at(now + Duration::from_millis(250));
    assert!(refreshed);
    // 5 frames over 1.25 s
    assert_eq!(timer.fps(), 4);
}

#[test]
fn test_counter_restarts_each_window() {
    let base = Instant::now();
    let mut timer = FrameTimer::starting_at(base);
    let now = run_frames(&mut timer, base, 5, Duration::from_millis(250));
    assert_eq!(timer.fps(), 4);

    // 9 frames over 1.125 s
    run_frames(&mut timer, now, 9, Duration::from_millis(125));
    assert_eq!(timer.fps(), 8);
    assert_eq!(timer.total_frames(), 14);
}

#[test]
fn test_animation_clock_wraps_and_pauses() {
    let base = Instant::now();
    let mut timer = FrameTimer::starting_at(base);
    timer.set_timer_speed(1.0);
    let now = run_frames(&mut timer, base, 3, Duration::from_millis(500));
    assert!((timer.timer() - 0.5).abs() < 1e-4);

    timer.toggle_pause();
    assert!(timer.is_paused());
    run_frames(&mut timer, now, 2, Duration::from_millis(500));
    assert!((timer.timer() - 0.5).abs() < 1e-4);
}

#[test]
fn test_animation_clock_stays_below_one() {
    let base = Instant::now();
    let mut timer = FrameTimer::starting_at(base);

    // 4 s at the default speed is exactly one turn
    timer.frame_start_at(base);
    timer.frame_stop_at(base + Duration::from_secs(4));
    assert!(timer.timer() < 1.0);
    assert!(timer.timer().abs() < 1e-4);

    // a 10 s stall advances 2.5 turns
    let now = base + Duration::from_secs(4);
    timer.frame_start_at(now);
    timer.frame_stop_at(now + Duration::from_secs(10));
    assert!((timer.timer() - 0.5).abs() < 1e-4);
}

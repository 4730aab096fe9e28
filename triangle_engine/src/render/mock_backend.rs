//! Mock device, presentation engine and draw strategy for protocol tests
//!
//! The mock GPU executes a submission only when something waits for it
//! (a fence wait or `wait_idle`). At that point the recorded draw reads the
//! slot's "mapped uniform memory", so a CPU write that races a pending
//! submission shows up as a mismatched read.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::render::{
    AcquireOutcome, DeviceFrameContext, DeviceSlot, DrawStrategy, Extent2D, FrameDevice,
    FrameSlot, PresentOutcome, PresentationEngine,
};

/// Everything the mocks observed, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CreateSlot,
    WaitFence(u64),
    ResetFence(u64),
    Begin(u64),
    End(u64),
    Submit { command_buffer: u64, wait: u64, signal: u64, fence: u64 },
    WaitIdle,
    DestroySlot,
    Configure { width: u32, height: u32 },
    Acquire { semaphore: u64, image_index: Option<u32> },
    Present { image_index: u32, semaphore: u64, stale: bool },
    Teardown,
    Prepare { slot_count: usize },
    Record { slot_index: usize, frame_index: u64, image_index: u32 },
    StrategyDestroy,
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// Host-visible uniform memory, one value per slot
pub type MappedMemory = Rc<RefCell<Vec<u64>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Signaled,
    Unsignaled,
    Pending,
}

#[derive(Debug, Clone, Copy)]
struct DrawCommand {
    slot_index: usize,
    frame_index: u64,
}

#[derive(Debug, Default)]
struct Recording {
    open: bool,
    draws: Vec<DrawCommand>,
}

#[derive(Debug)]
struct Submission {
    fence: u64,
    command_buffer: u64,
    draws: Vec<DrawCommand>,
}

#[derive(Debug, Default)]
struct DeviceState {
    next_handle: u64,
    fences: HashMap<u64, FenceState>,
    recordings: HashMap<u64, Recording>,
    pending: Vec<Submission>,
    live_slots: usize,
    violations: Vec<String>,
    /// (frame_index, value the GPU read for it)
    gpu_reads: Vec<(u64, u64)>,
}

impl DeviceState {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Mock device feature set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockFeatures {
    pub dynamic_rendering: bool,
    pub synchronization2: bool,
}

/// Mock GPU
pub struct MockDevice {
    state: RefCell<DeviceState>,
    events: EventLog,
    mapped: MappedMemory,
    /// Make the next `wait_for_fence` fail as a lost device
    pub lose_device: Cell<bool>,
}

impl MockDevice {
    pub fn new(events: EventLog, mapped: MappedMemory) -> Self {
        Self {
            state: RefCell::new(DeviceState::default()),
            events,
            mapped,
            lose_device: Cell::new(false),
        }
    }

    /// Record a draw that reads `slot_index`'s uniform memory for `frame_index`
    pub fn cmd_draw(&self, command_buffer: u64, slot_index: usize, frame_index: u64) -> Result<()> {
        let mut state = self.state.borrow_mut();
        match state.recordings.get_mut(&command_buffer) {
            Some(recording) if recording.open => {
                recording.draws.push(DrawCommand { slot_index, frame_index });
                Ok(())
            }
            _ => Err(Error::InvalidState(format!(
                "Draw recorded into command buffer {} outside begin/end", command_buffer
            ))),
        }
    }

    pub fn violations(&self) -> Vec<String> {
        self.state.borrow().violations.clone()
    }

    pub fn gpu_reads(&self) -> Vec<(u64, u64)> {
        self.state.borrow().gpu_reads.clone()
    }

    pub fn pending_submissions(&self) -> usize {
        self.state.borrow().pending.len()
    }

    pub fn live_slots(&self) -> usize {
        self.state.borrow().live_slots
    }

    fn log(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    /// Execute a pending submission: its draws read mapped memory now
    fn execute(&self, state: &mut DeviceState, index: usize) {
        let submission = state.pending.remove(index);
        let memory = self.mapped.borrow();
        for draw in &submission.draws {
            let value = memory.get(draw.slot_index).copied().unwrap_or(u64::MAX);
            state.gpu_reads.push((draw.frame_index, value));
        }
        state.fences.insert(submission.fence, FenceState::Signaled);
    }
}

impl FrameDevice for MockDevice {
    type Fence = u64;
    type Semaphore = u64;
    type CommandBuffer = u64;
    type Features = MockFeatures;

    fn create_slot(&self) -> Result<DeviceSlot<Self>> {
        self.log(Event::CreateSlot);
        let mut state = self.state.borrow_mut();
        let fence = state.handle();
        let image_available = state.handle();
        let render_finished = state.handle();
        let command_buffer = state.handle();
        state.fences.insert(fence, FenceState::Signaled);
        state.recordings.insert(command_buffer, Recording::default());
        state.live_slots += 1;
        Ok(FrameSlot { fence, image_available, render_finished, command_buffer })
    }

    fn wait_for_fence(&self, fence: u64, _timeout: u64) -> Result<()> {
        self.log(Event::WaitFence(fence));
        if self.lose_device.get() {
            return Err(Error::DeviceLost("wait_for_fence".to_string()));
        }
        let mut state = self.state.borrow_mut();
        match state.fences.get(&fence).copied() {
            Some(FenceState::Signaled) => Ok(()),
            Some(FenceState::Pending) => {
                if let Some(index) = state.pending.iter().position(|s| s.fence == fence) {
                    self.execute(&mut state, index);
                }
                Ok(())
            }
            Some(FenceState::Unsignaled) => Err(Error::InvalidState(format!(
                "Deadlock: fence {} is unsignaled and nothing will signal it", fence
            ))),
            None => Err(Error::InvalidState(format!("Unknown fence {}", fence))),
        }
    }

    fn reset_fence(&self, fence: u64) -> Result<()> {
        self.log(Event::ResetFence(fence));
        let mut state = self.state.borrow_mut();
        if state.fences.get(&fence) == Some(&FenceState::Pending) {
            state.violations.push(format!("fence {} reset while in use", fence));
        }
        state.fences.insert(fence, FenceState::Unsignaled);
        Ok(())
    }

    fn begin_commands(&self, command_buffer: u64) -> Result<()> {
        self.log(Event::Begin(command_buffer));
        let mut state = self.state.borrow_mut();
        if state.pending.iter().any(|s| s.command_buffer == command_buffer) {
            state.violations.push(format!(
                "command buffer {} reset while its submission is pending", command_buffer
            ));
        }
        let recording = state.recordings.entry(command_buffer).or_default();
        recording.open = true;
        recording.draws.clear();
        Ok(())
    }

    fn end_commands(&self, command_buffer: u64) -> Result<()> {
        self.log(Event::End(command_buffer));
        let mut state = self.state.borrow_mut();
        match state.recordings.get_mut(&command_buffer) {
            Some(recording) if recording.open => {
                recording.open = false;
                Ok(())
            }
            _ => Err(Error::InvalidState(format!("Command buffer {} not recording", command_buffer))),
        }
    }

    fn submit(&self, command_buffer: u64, wait: u64, signal: u64, fence: u64) -> Result<()> {
        self.log(Event::Submit { command_buffer, wait, signal, fence });
        let mut state = self.state.borrow_mut();
        if state.fences.get(&fence) != Some(&FenceState::Unsignaled) {
            state.violations.push(format!("fence {} submitted while not reset", fence));
        }
        let recorded = state.recordings
            .get(&command_buffer)
            .filter(|recording| !recording.open)
            .map(|recording| recording.draws.clone());
        let draws = match recorded {
            Some(draws) => draws,
            None => {
                state.violations.push(format!("command buffer {} submitted while recording", command_buffer));
                Vec::new()
            }
        };
        state.fences.insert(fence, FenceState::Pending);
        state.pending.push(Submission { fence, command_buffer, draws });
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.log(Event::WaitIdle);
        let mut state = self.state.borrow_mut();
        while !state.pending.is_empty() {
            self.execute(&mut state, 0);
        }
        Ok(())
    }

    fn destroy_slot(&self, slot: DeviceSlot<Self>) {
        self.log(Event::DestroySlot);
        let mut state = self.state.borrow_mut();
        if state.fences.get(&slot.fence) == Some(&FenceState::Pending) {
            state.violations.push(format!("slot with fence {} destroyed while in flight", slot.fence));
        }
        state.fences.remove(&slot.fence);
        state.recordings.remove(&slot.command_buffer);
        state.live_slots -= 1;
    }
}

/// Mock presentation engine
///
/// The chain goes stale whenever the shared surface size differs from the
/// extent it was configured with, the way a resized window behaves.
pub struct MockPresentation {
    surface: Rc<Cell<Extent2D>>,
    events: EventLog,
    extent: Extent2D,
    image_count: usize,
    next_image: u32,
    configured: bool,
    /// Report the next present as stale
    pub stale_next_present: Cell<bool>,
    /// Report the next acquire as suboptimal
    pub suboptimal_next_acquire: Cell<bool>,
}

impl MockPresentation {
    pub fn new(surface: Rc<Cell<Extent2D>>, events: EventLog, image_count: usize) -> Self {
        Self {
            surface,
            events,
            extent: Extent2D::default(),
            image_count,
            next_image: 0,
            configured: false,
            stale_next_present: Cell::new(false),
            suboptimal_next_acquire: Cell::new(false),
        }
    }

    fn is_stale(&self) -> bool {
        self.extent != self.surface.get()
    }
}

impl PresentationEngine for MockPresentation {
    type Semaphore = u64;
    type Target = u32;

    fn configure(&mut self, width: u32, height: u32, _vsync: bool) -> Result<Extent2D> {
        self.events.borrow_mut().push(Event::Configure { width, height });
        // Like a platform surface with a defined current extent
        self.extent = self.surface.get();
        self.next_image = 0;
        self.configured = !self.extent.is_zero();
        Ok(self.extent)
    }

    fn acquire_next(&mut self, ready_signal: u64, _timeout: u64) -> Result<AcquireOutcome> {
        if !self.configured || self.extent.is_zero() {
            return Err(Error::InvalidState("Acquire on an unconfigured chain".to_string()));
        }
        if self.is_stale() {
            self.events.borrow_mut().push(Event::Acquire { semaphore: ready_signal, image_index: None });
            return Ok(AcquireOutcome::Stale);
        }
        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % self.image_count as u32;
        self.events.borrow_mut().push(Event::Acquire { semaphore: ready_signal, image_index: Some(image_index) });
        Ok(AcquireOutcome::Acquired {
            image_index,
            suboptimal: self.suboptimal_next_acquire.replace(false),
        })
    }

    fn present(&mut self, image_index: u32, wait_signal: u64) -> Result<PresentOutcome> {
        if !self.configured {
            return Err(Error::InvalidState("Present on an unconfigured chain".to_string()));
        }
        let stale = self.stale_next_present.replace(false) || self.is_stale();
        self.events.borrow_mut().push(Event::Present { image_index, semaphore: wait_signal, stale });
        Ok(if stale { PresentOutcome::Stale } else { PresentOutcome::Presented })
    }

    fn teardown(&mut self) {
        self.events.borrow_mut().push(Event::Teardown);
        self.configured = false;
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn image_count(&self) -> usize {
        self.image_count
    }

    fn target(&self, image_index: u32) -> Result<u32> {
        if image_index as usize >= self.image_count {
            return Err(Error::InvalidState(format!("No image {}", image_index)));
        }
        Ok(image_index)
    }
}

/// Writes `frame_index + 1` into the slot's mapped memory and records one draw
pub struct MockStrategy {
    events: EventLog,
    mapped: MappedMemory,
    /// (frame_index, value written for it)
    pub writes: Vec<(u64, u64)>,
    pub extents: Vec<Extent2D>,
    pub fail_prepare: bool,
}

impl MockStrategy {
    pub fn new(events: EventLog, mapped: MappedMemory) -> Self {
        Self { events, mapped, writes: Vec::new(), extents: Vec::new(), fail_prepare: false }
    }
}

impl DrawStrategy<MockDevice, MockPresentation> for MockStrategy {
    fn configure_features(&self, features: &mut MockFeatures) -> Result<()> {
        features.dynamic_rendering = true;
        features.synchronization2 = true;
        Ok(())
    }

    fn prepare(&mut self, _device: &MockDevice, _presentation: &MockPresentation, slot_count: usize) -> Result<()> {
        self.events.borrow_mut().push(Event::Prepare { slot_count });
        if self.fail_prepare {
            return Err(Error::AssetLoadFailed("triangle.vert.spv".to_string()));
        }
        *self.mapped.borrow_mut() = vec![0; slot_count];
        Ok(())
    }

    fn record_draw(&mut self, device: &MockDevice, frame: &DeviceFrameContext<MockDevice, MockPresentation>) -> Result<()> {
        self.events.borrow_mut().push(Event::Record {
            slot_index: frame.slot_index,
            frame_index: frame.frame_index,
            image_index: frame.image_index,
        });
        let value = frame.frame_index + 1;
        self.mapped.borrow_mut()[frame.slot_index] = value;
        self.writes.push((frame.frame_index, value));
        self.extents.push(frame.extent);
        device.cmd_draw(frame.command_buffer, frame.slot_index, frame.frame_index)
    }

    fn destroy(&mut self, _device: &MockDevice) {
        self.events.borrow_mut().push(Event::StrategyDestroy);
    }
}

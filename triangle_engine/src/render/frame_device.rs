/// Frame device trait - slot-level GPU operations used by the frame loop

use crate::error::Result;

/// One in-flight frame context
///
/// All four objects belong to the ring and are released together at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot<F, S, C> {
    /// Signaled by the GPU when this slot's last submission finished
    pub fence: F,
    /// Signaled when the acquired image is ready for writes
    pub image_available: S,
    /// Signaled when rendering finished; presentation waits on it
    pub render_finished: S,
    /// Re-recorded every time the slot is used
    pub command_buffer: C,
}

/// Frame slot for a given device
pub type DeviceSlot<D> = FrameSlot<
    <D as FrameDevice>::Fence,
    <D as FrameDevice>::Semaphore,
    <D as FrameDevice>::CommandBuffer,
>;

/// GPU operations the submission protocol drives
pub trait FrameDevice {
    type Fence: Copy;
    type Semaphore: Copy;
    type CommandBuffer: Copy;
    /// Device feature set a draw strategy may extend before device creation
    type Features;

    /// Create one slot. The fence must start signaled so the first wait
    /// on a fresh slot returns immediately.
    fn create_slot(&self) -> Result<DeviceSlot<Self>>
    where
        Self: Sized;

    /// Block until `fence` is signaled or `timeout` nanoseconds elapse
    fn wait_for_fence(&self, fence: Self::Fence, timeout: u64) -> Result<()>;

    /// Return `fence` to the unsignaled state
    fn reset_fence(&self, fence: Self::Fence) -> Result<()>;

    /// Reset and begin recording `command_buffer`
    fn begin_commands(&self, command_buffer: Self::CommandBuffer) -> Result<()>;

    /// Finish recording `command_buffer`
    fn end_commands(&self, command_buffer: Self::CommandBuffer) -> Result<()>;

    /// Submit `command_buffer`
    ///
    /// Execution waits on `wait` at the color-output stage only; `signal`
    /// and `fence` are signaled on completion.
    fn submit(
        &self,
        command_buffer: Self::CommandBuffer,
        wait: Self::Semaphore,
        signal: Self::Semaphore,
        fence: Self::Fence,
    ) -> Result<()>;

    /// Block until all submitted work has completed
    fn wait_idle(&self) -> Result<()>;

    /// Destroy a slot. The device must be idle.
    fn destroy_slot(&self, slot: DeviceSlot<Self>)
    where
        Self: Sized;
}

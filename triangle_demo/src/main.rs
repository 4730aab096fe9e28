//! Basic indexed triangle
//!
//! Renders one colored triangle with the Vulkan backend, two frames in
//! flight, rebuilding the swapchain whenever the window changes size.
//!
//! # Usage
//!
//! ```bash
//! triangle_demo --shaders triangle_demo/shaders
//! triangle_demo -v --validation-log
//! triangle_demo --vsync --frames 600
//! triangle_demo --list-gpus
//! ```
//!
//! # Keyboard Shortcuts
//!
//! - ESC: Quit
//! - P: Pause/Resume the animation timer

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use triangle_engine::triangle::frame::{FrameStatus, FrameTimer};
use triangle_engine::triangle::log::LogSeverity;
use triangle_engine::triangle::{Config, DebugOutput, DebugSeverity, Engine, Error};
use triangle_engine::{engine_error, engine_info, engine_warn};
use triangle_engine_renderer_vulkan::triangle::{GpuContext, VulkanRenderer};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowId};

const SOURCE: &str = "triangle::Demo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LogSeverity {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LogSeverity::Trace,
            LogLevel::Debug => LogSeverity::Debug,
            LogLevel::Info => LogSeverity::Info,
            LogLevel::Warn => LogSeverity::Warn,
            LogLevel::Error => LogSeverity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ValidationSeverity {
    Errors,
    Warnings,
    All,
}

impl From<ValidationSeverity> for DebugSeverity {
    fn from(severity: ValidationSeverity) -> Self {
        match severity {
            ValidationSeverity::Errors => DebugSeverity::ErrorsOnly,
            ValidationSeverity::Warnings => DebugSeverity::ErrorsAndWarnings,
            ValidationSeverity::All => DebugSeverity::All,
        }
    }
}

#[derive(Parser)]
#[command(name = "triangle_demo")]
#[command(author, version, about = "Vulkan Example - Basic indexed triangle")]
struct Args {
    /// Enable VK_LAYER_KHRONOS_validation
    #[arg(long, short = 'v')]
    validation: bool,

    /// Also write validation messages to a file (implies --validation)
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "validation.txt")]
    validation_log: Option<PathBuf>,

    /// Lowest validation severity reported
    #[arg(long, value_enum, default_value = "warnings")]
    validation_severity: ValidationSeverity,

    /// Wait for vertical blank (FIFO presentation)
    #[arg(long)]
    vsync: bool,

    /// Start in borderless fullscreen
    #[arg(long, short = 'f')]
    fullscreen: bool,

    /// Window width
    #[arg(long, short = 'w', default_value = "1280")]
    width: u32,

    /// Window height
    #[arg(long, short = 'H', default_value = "720")]
    height: u32,

    /// Directory containing triangle.vert.spv and triangle.frag.spv
    #[arg(long, short = 's', value_name = "DIR", default_value = "shaders")]
    shaders: PathBuf,

    /// Index of the GPU to use (see --list-gpus)
    #[arg(long, short = 'g', default_value = "0")]
    gpu: usize,

    /// Print available GPUs and exit
    #[arg(long)]
    list_gpus: bool,

    /// Render this many frames, then exit
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Minimum engine log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

impl Args {
    fn to_config(&self) -> Config {
        let debug_output = match &self.validation_log {
            Some(path) => DebugOutput::Both(path.clone()),
            None => DebugOutput::Console,
        };
        Config {
            width: self.width,
            height: self.height,
            vsync: self.vsync,
            fullscreen: self.fullscreen,
            enable_validation: self.validation || self.validation_log.is_some(),
            debug_severity: self.validation_severity.into(),
            debug_output,
            gpu_index: self.gpu,
            shader_dir: self.shaders.clone(),
            max_frames: self.frames,
            log_severity: self.log_level.into(),
            ..Config::default()
        }
    }
}

struct App {
    config: Config,
    /// Declared before `window` so the surface goes before the window
    renderer: Option<VulkanRenderer>,
    window: Option<Window>,
    timer: FrameTimer,
    presented_frames: u64,
    failed: bool,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            timer: FrameTimer::new(),
            presented_frames: 0,
            failed: false,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Error> {
        let mut attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
        if self.config.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = event_loop
            .create_window(attributes)
            .map_err(|e| Error::InitializationFailed(format!("Failed to create window: {}", e)))?;

        // The surface is created at the window's actual pixel size
        let size = window.inner_size();
        let config = Config {
            width: size.width,
            height: size.height,
            ..self.config.clone()
        };
        let renderer = VulkanRenderer::new(&window, &config)?;
        engine_info!(SOURCE, "Rendering at {}x{}", size.width, size.height);

        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        engine_error!(SOURCE, "Fatal: {}", error);
        self.failed = true;
        self.shutdown();
        event_loop.exit();
    }

    fn shutdown(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.on_close_requested();
            if let Err(e) = renderer.shutdown() {
                engine_warn!(SOURCE, "Shutdown failed: {}", e);
            }
            renderer.print_validation_report();
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown();
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        self.timer.frame_start();
        renderer.set_animation_time(self.timer.timer());
        match renderer.render_frame() {
            Ok(FrameStatus::Presented) => self.presented_frames += 1,
            Ok(FrameStatus::Skipped | FrameStatus::Stale) => {}
            Err(e) => {
                self.fail(event_loop, e);
                return;
            }
        }

        if self.timer.frame_stop() {
            if let Some(window) = &self.window {
                window.set_title(&format!("{} - {} fps", self.config.title, self.timer.fps()));
            }
        }

        if let Some(max_frames) = self.config.max_frames {
            if self.presented_frames >= max_frames {
                engine_info!(SOURCE, "Rendered {} frames, exiting", self.presented_frames);
                self.close(event_loop);
            }
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => self.close(event_loop),
            PhysicalKey::Code(KeyCode::KeyP) => {
                self.timer.toggle_pause();
                engine_info!(SOURCE, "Timer {}", if self.timer.is_paused() { "paused" } else { "resumed" });
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.failed {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close(event_loop),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.on_resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let (Some(window), Some(_)) = (&self.window, &self.renderer) {
            window.request_redraw();
        }
    }
}

fn list_gpus() -> ExitCode {
    match GpuContext::list_gpus() {
        Ok(gpus) if gpus.is_empty() => {
            println!("No Vulkan-capable GPU found");
            ExitCode::FAILURE
        }
        Ok(gpus) => {
            for gpu in gpus {
                println!("{}", gpu);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            engine_error!(SOURCE, "Could not enumerate GPUs: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = args.to_config();
    Engine::set_min_severity(config.log_severity);

    if args.list_gpus {
        return list_gpus();
    }
    if let Err(e) = config.validate() {
        engine_error!(SOURCE, "{}", e);
        return ExitCode::FAILURE;
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            engine_error!(SOURCE, "Failed to create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        engine_error!(SOURCE, "Event loop error: {}", e);
        return ExitCode::FAILURE;
    }
    // Covers platforms where run_app returns without a close event
    app.shutdown();

    if app.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

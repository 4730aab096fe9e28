/// Vulkan Debug Messenger - Handles validation layer messages with colored output
///
/// The messenger state (filters, counters, repeat tracking) is owned by the
/// GPU context and handed to the driver as the callback's user-data pointer,
/// so nothing here is global.

use ash::vk;
use colored::*;
use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use triangle_engine::triangle::{Config, DebugMessageFilter, DebugOutput, DebugSeverity};

/// Filters and destinations for validation messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugConfig {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    pub enable_stats: bool,
}

impl DebugConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            severity: config.debug_severity,
            output: config.debug_output.clone(),
            message_filter: config.message_filter,
            enable_stats: config.enable_validation_stats,
        }
    }
}

/// Validation message counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Thread-safe validation statistics tracker
#[derive(Default)]
struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    fn increment(&self, level: MessageLevel) {
        let counter = match level {
            MessageLevel::Error => &self.errors,
            MessageLevel::Warning => &self.warnings,
            MessageLevel::Info => &self.info,
            MessageLevel::Verbose => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

impl MessageLevel {
    fn from_flags(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Self::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Self::Warning
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Self::Info
        } else {
            Self::Verbose
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Verbose => "VERBOSE",
        }
    }

    fn colored_label(self) -> ColoredString {
        match self {
            Self::Error => self.label().red().bold(),
            Self::Warning => self.label().yellow().bold(),
            Self::Info => self.label().cyan(),
            Self::Verbose => self.label().bright_black(),
        }
    }
}

fn type_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Severity flags the messenger subscribes to
pub fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Messenger state shared with the driver through `p_user_data`
pub struct DebugState {
    config: DebugConfig,
    stats: ValidationStatsTracker,
    messages: Mutex<HashMap<String, u32>>,
    error_ids: Mutex<HashMap<String, u32>>,
}

impl DebugState {
    pub fn new(config: DebugConfig) -> Self {
        Self {
            config,
            stats: ValidationStatsTracker::default(),
            messages: Mutex::new(HashMap::new()),
            error_ids: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &DebugConfig {
        &self.config
    }

    pub fn stats(&self) -> ValidationStats {
        self.stats.get_stats()
    }

    /// Number of distinct messages seen more than once
    pub fn repeated_messages(&self) -> usize {
        let messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        messages.values().filter(|&&count| count > 1).count()
    }

    /// Message IDs reported at error severity, with their counts, sorted by ID
    pub fn error_ids(&self) -> Vec<(String, u32)> {
        let error_ids = self.error_ids.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<(String, u32)> = error_ids.iter().map(|(id, count)| (id.clone(), *count)).collect();
        ids.sort();
        ids
    }

    /// Whether a message passes the severity and category filters
    pub fn accepts(
        &self,
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    ) -> bool {
        if !severity_flags(self.config.severity).intersects(severity) {
            return false;
        }
        let filter = &self.config.message_filter;
        if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
            filter.show_validation
        } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
            filter.show_performance
        } else {
            filter.show_general
        }
    }

    /// Count the message and return how many times it has been seen
    fn record(&self, level: MessageLevel, message_id_name: &str, message: &str) -> u32 {
        if !self.config.enable_stats {
            return 1;
        }
        self.stats.increment(level);
        if level == MessageLevel::Error {
            let mut error_ids = self.error_ids.lock().unwrap_or_else(PoisonError::into_inner);
            *error_ids.entry(message_id_name.to_string()).or_insert(0) += 1;
        }
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        let count = messages.entry(message.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Filter, count and emit one message
    pub fn handle_message(
        &self,
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT,
        message_id_name: &str,
        message: &str,
    ) {
        if !self.accepts(severity, message_type) {
            return;
        }
        let level = MessageLevel::from_flags(severity);
        let occurrence = self.record(level, message_id_name, message);

        match &self.config.output {
            DebugOutput::Console => {
                eprint!("{}", format_console_message(level, message_type, occurrence, message_id_name, message));
            }
            DebugOutput::File(path) => {
                write_to_file(path, &format_file_message(level, message_type, occurrence, message_id_name, message));
            }
            DebugOutput::Both(path) => {
                eprint!("{}", format_console_message(level, message_type, occurrence, message_id_name, message));
                write_to_file(path, &format_file_message(level, message_type, occurrence, message_id_name, message));
            }
        }
    }

    /// Print validation statistics report
    pub fn print_report(&self) {
        let stats = self.stats();

        if stats.total() == 0 {
            println!("\n{}", "No validation messages".green().bold());
            return;
        }

        println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
        if stats.errors > 0 {
            println!("  {} {}", "Errors:".red().bold(), stats.errors);
        }
        if stats.warnings > 0 {
            println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
        }
        if stats.info > 0 {
            println!("  {} {}", "Info:".cyan(), stats.info);
        }
        if stats.verbose > 0 {
            println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
        }
        println!("  {} {}", "Total:".white().bold(), stats.total());

        for (id, count) in self.error_ids() {
            println!("  {} {} ({}x)", "-".red(), id, count);
        }

        let repeated = self.repeated_messages();
        if repeated > 0 {
            println!("\n  {} message(s) appeared multiple times", repeated);
        }
        println!("{}\n", "====================================".bright_blue().bold());
    }
}

fn repeat_indicator(occurrence: u32) -> String {
    if occurrence > 1 {
        format!(" [x{}]", occurrence)
    } else {
        String::new()
    }
}

fn format_console_message(
    level: MessageLevel,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    occurrence: u32,
    message_id_name: &str,
    message: &str,
) -> String {
    format!(
        "{} {} [{}]{}\n  ├─ {}: {}\n  └─ {}\n",
        "[VULKAN".bright_blue().bold(),
        format!("{}]", level.colored_label()).bright_blue().bold(),
        type_label(message_type).bright_black(),
        repeat_indicator(occurrence).yellow(),
        "Message ID".bright_black(),
        message_id_name.white(),
        message.white()
    )
}

fn format_file_message(
    level: MessageLevel,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    occurrence: u32,
    message_id_name: &str,
    message: &str,
) -> String {
    format!(
        "[VULKAN {}] [{}]{}\n  ├─ Message ID: {}\n  └─ {}\n",
        level.label(),
        type_label(message_type),
        repeat_indicator(occurrence),
        message_id_name,
        message
    )
}

/// Append message to log file
fn write_to_file(path: &Path, message: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", message);
    }
}

/// Messenger create info pointing the callback at `state`
///
/// `state` must outlive the messenger created from this info.
pub(crate) fn messenger_create_info(state: &DebugState) -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(severity_flags(state.config.severity))
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
        .user_data(state as *const DebugState as *mut c_void)
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> &'a str {
    if ptr.is_null() {
        fallback
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("Invalid UTF-8")
    }
}

/// Vulkan debug messenger callback
///
/// `user_data` is the [`DebugState`] registered in [`messenger_create_info`].
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if user_data.is_null() || p_callback_data.is_null() {
        return vk::FALSE;
    }
    let state = unsafe { &*(user_data as *const DebugState) };
    let callback_data = unsafe { *p_callback_data };
    let message_id_name = unsafe { c_str_or(callback_data.p_message_id_name, "Unknown") };
    let message = unsafe { c_str_or(callback_data.p_message, "No message") };

    state.handle_message(message_severity, message_type, message_id_name, message);

    // Never abort the Vulkan call that triggered the message
    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn state_with(severity: DebugSeverity, output: DebugOutput) -> DebugState {
        DebugState::new(DebugConfig {
            severity,
            output,
            message_filter: DebugMessageFilter::default(),
            enable_stats: true,
        })
    }

    fn temp_log(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("triangle_{}_{}.txt", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    const ERROR: vk::DebugUtilsMessageSeverityFlagsEXT = vk::DebugUtilsMessageSeverityFlagsEXT::ERROR;
    const WARNING: vk::DebugUtilsMessageSeverityFlagsEXT = vk::DebugUtilsMessageSeverityFlagsEXT::WARNING;
    const INFO: vk::DebugUtilsMessageSeverityFlagsEXT = vk::DebugUtilsMessageSeverityFlagsEXT::INFO;
    const VALIDATION: vk::DebugUtilsMessageTypeFlagsEXT = vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION;
    const PERFORMANCE: vk::DebugUtilsMessageTypeFlagsEXT = vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE;
    const GENERAL: vk::DebugUtilsMessageTypeFlagsEXT = vk::DebugUtilsMessageTypeFlagsEXT::GENERAL;

    #[test]
    fn test_severity_filter() {
        let errors_only = state_with(DebugSeverity::ErrorsOnly, DebugOutput::Console);
        assert!(errors_only.accepts(ERROR, VALIDATION));
        assert!(!errors_only.accepts(WARNING, VALIDATION));

        let default = state_with(DebugSeverity::ErrorsAndWarnings, DebugOutput::Console);
        assert!(default.accepts(WARNING, VALIDATION));
        assert!(!default.accepts(INFO, VALIDATION));

        let all = state_with(DebugSeverity::All, DebugOutput::Console);
        assert!(all.accepts(INFO, GENERAL));
        assert!(all.accepts(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE, GENERAL));
    }

    #[test]
    fn test_category_filter() {
        let state = DebugState::new(DebugConfig {
            severity: DebugSeverity::All,
            output: DebugOutput::Console,
            message_filter: DebugMessageFilter {
                show_general: true,
                show_validation: false,
                show_performance: true,
            },
            enable_stats: true,
        });
        assert!(!state.accepts(ERROR, VALIDATION));
        assert!(state.accepts(ERROR, PERFORMANCE));
        assert!(state.accepts(ERROR, GENERAL));
    }

    #[test]
    fn test_stats_and_repeats_counted() {
        let path = temp_log("stats");
        let state = state_with(DebugSeverity::All, DebugOutput::File(path.clone()));
        state.handle_message(ERROR, VALIDATION, "VUID-1", "bad thing");
        state.handle_message(ERROR, VALIDATION, "VUID-1", "bad thing");
        state.handle_message(WARNING, PERFORMANCE, "PERF-1", "slow thing");
        state.handle_message(INFO, GENERAL, "INFO-1", "fine thing");

        let stats = state.stats();
        assert_eq!(stats, ValidationStats { errors: 2, warnings: 1, info: 1, verbose: 0 });
        assert_eq!(stats.total(), 4);
        assert_eq!(state.repeated_messages(), 1);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[VULKAN ERROR] [Validation]\n"));
        assert!(written.contains("[VULKAN ERROR] [Validation] [x2]"));
        assert!(written.contains("[VULKAN WARNING] [Performance]"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_error_ids_grouped() {
        let state = state_with(DebugSeverity::All, DebugOutput::File(temp_log("error_ids")));
        state.handle_message(ERROR, VALIDATION, "VUID-b", "second");
        state.handle_message(ERROR, VALIDATION, "VUID-a", "first");
        state.handle_message(ERROR, VALIDATION, "VUID-b", "second again");
        state.handle_message(WARNING, VALIDATION, "VUID-c", "only a warning");

        assert_eq!(state.error_ids(), vec![("VUID-a".to_string(), 1), ("VUID-b".to_string(), 2)]);
        assert_eq!(state.stats().errors, 3);
    }

    #[test]
    fn test_filtered_messages_not_counted() {
        let state = state_with(DebugSeverity::ErrorsOnly, DebugOutput::File(temp_log("filtered")));
        state.handle_message(WARNING, VALIDATION, "VUID-2", "ignored");
        assert_eq!(state.stats().total(), 0);
    }

    #[test]
    fn test_stats_disabled() {
        let mut config = DebugConfig::from_config(&Config::default());
        config.enable_stats = false;
        config.output = DebugOutput::File(temp_log("disabled"));
        let state = DebugState::new(config);
        state.handle_message(ERROR, VALIDATION, "VUID-3", "not counted");
        assert_eq!(state.stats().total(), 0);
        assert!(state.error_ids().is_empty());
    }

    #[test]
    fn test_callback_reads_user_data() {
        let path = temp_log("callback");
        let state = state_with(DebugSeverity::All, DebugOutput::File(path.clone()));
        let id = CString::new("VUID-callback").unwrap();
        let text = CString::new("from the driver").unwrap();
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default()
            .message_id_name(&id)
            .message(&text);

        let result = unsafe {
            vulkan_debug_callback(ERROR, VALIDATION, &data, &state as *const DebugState as *mut c_void)
        };
        assert_eq!(result, vk::FALSE);
        assert_eq!(state.stats().errors, 1);
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Message ID: VUID-callback"));
        assert!(written.contains("from the driver"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_callback_without_user_data_is_ignored() {
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default();
        let result = unsafe { vulkan_debug_callback(ERROR, VALIDATION, &data, std::ptr::null_mut()) };
        assert_eq!(result, vk::FALSE);
    }

    #[test]
    fn test_messenger_info_carries_state_pointer() {
        let state = state_with(DebugSeverity::ErrorsOnly, DebugOutput::Console);
        let info = messenger_create_info(&state);
        assert_eq!(info.p_user_data as *const DebugState, &state as *const DebugState);
        assert_eq!(info.message_severity, vk::DebugUtilsMessageSeverityFlagsEXT::ERROR);
        assert!(info.pfn_user_callback.is_some());
    }
}

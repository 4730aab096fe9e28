/// Vulkan result code mapping

use ash::vk;
use std::panic::Location;
use triangle_engine::triangle::{Engine, Error};
use triangle_engine::triangle::log::LogSeverity;

pub(crate) const SOURCE: &str = "triangle::vulkan";

/// Log a failed Vulkan call at the caller's file:line and turn it into an engine error
///
/// `ERROR_DEVICE_LOST` becomes [`Error::DeviceLost`]; every other code becomes
/// [`Error::Backend`] carrying the raw `VkResult` value.
#[track_caller]
pub(crate) fn vk_err(operation: &str, result: vk::Result) -> Error {
    let location = Location::caller();
    Engine::log_detailed(
        LogSeverity::Error,
        SOURCE,
        format!("{} failed: {:?} ({})", operation, result, result.as_raw()),
        location.file(),
        location.line(),
    );
    match result {
        vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost(operation.to_string()),
        _ => Error::backend(operation, result.as_raw()),
    }
}

/// Log a bootstrap failure at the caller's file:line and wrap it
#[track_caller]
pub(crate) fn init_failed(message: impl Into<String>) -> Error {
    let message = message.into();
    let location = Location::caller();
    Engine::log_detailed(LogSeverity::Error, SOURCE, message.clone(), location.file(), location.line());
    Error::InitializationFailed(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_lost_maps_to_device_lost() {
        let err = vk_err("vkQueueSubmit", vk::Result::ERROR_DEVICE_LOST);
        assert_eq!(err, Error::DeviceLost("vkQueueSubmit".to_string()));
    }

    #[test]
    fn test_other_codes_keep_operation_and_raw_code() {
        let err = vk_err("vkCreateSwapchainKHR", vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        match err {
            Error::Backend { operation, code } => {
                assert_eq!(operation, "vkCreateSwapchainKHR");
                assert_eq!(code, -2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_init_failed_keeps_message() {
        let err = init_failed(format!("GPU index {} out of range", 3));
        assert_eq!(err, Error::InitializationFailed("GPU index 3 out of range".to_string()));
    }
}

//! Unit tests for device bootstrap helpers
//!
//! Queue family selection and feature negotiation run on plain query
//! results, no GPU required.

use ash::vk;
use triangle_engine::triangle::Error;

use crate::vulkan_context::*;

fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

// ============================================================================
// QUEUE FAMILY
// ============================================================================

#[test]
fn test_picks_first_graphics_family_with_present() {
    let families = [
        family(vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        family(vk::QueueFlags::GRAPHICS),
    ];
    assert_eq!(select_queue_family(&families, |_| true).unwrap(), 1);
}

#[test]
fn test_skips_graphics_family_without_present() {
    let families = [family(vk::QueueFlags::GRAPHICS), family(vk::QueueFlags::GRAPHICS)];
    assert_eq!(select_queue_family(&families, |index| index == 1).unwrap(), 1);
}

#[test]
fn test_separate_present_family_rejected() {
    // Graphics on 0, present only on the compute family 1
    let families = [family(vk::QueueFlags::GRAPHICS), family(vk::QueueFlags::COMPUTE)];
    let result = select_queue_family(&families, |index| index == 1);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_no_graphics_family() {
    let families = [family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER)];
    assert_eq!(
        select_queue_family(&families, |_| true),
        Err(Error::InitializationFailed("No graphics queue family found".to_string()))
    );
}

#[test]
fn test_empty_family_ignored() {
    let mut empty = family(vk::QueueFlags::GRAPHICS);
    empty.queue_count = 0;
    let families = [empty, family(vk::QueueFlags::GRAPHICS)];
    assert_eq!(select_queue_family(&families, |_| true).unwrap(), 1);
}

// ============================================================================
// FEATURES
// ============================================================================

const ALL_FEATURES: FeatureSet = FeatureSet {
    dynamic_rendering: true,
    synchronization2: true,
};

#[test]
fn test_api_version_comparison() {
    let features = DeviceFeatures::new(vk::make_api_version(0, 1, 3, 250), ALL_FEATURES);
    assert!(features.supports_api(1, 3));
    assert!(features.supports_api(1, 2));
    assert!(!features.supports_api(1, 4));

    let old = DeviceFeatures::new(vk::API_VERSION_1_2, FeatureSet::default());
    assert!(!old.supports_api(1, 3));
}

#[test]
fn test_nothing_enabled_by_default() {
    let features = DeviceFeatures::new(vk::API_VERSION_1_3, ALL_FEATURES);
    assert_eq!(features.enabled, FeatureSet::default());
    assert!(features.validate().is_ok());
}

#[test]
fn test_enabling_unsupported_feature_fails() {
    let supported = FeatureSet {
        dynamic_rendering: true,
        ..FeatureSet::default()
    };
    let mut features = DeviceFeatures::new(vk::API_VERSION_1_3, supported);
    features.enabled.dynamic_rendering = true;
    features.enabled.synchronization2 = true;

    assert_eq!(features.enabled.missing_from(&features.supported), vec!["synchronization2"]);
    assert_eq!(
        features.validate(),
        Err(Error::InitializationFailed("Selected GPU does not support: synchronization2".to_string()))
    );
}

// ============================================================================
// GPU INFO
// ============================================================================

#[test]
fn test_gpu_info_display() {
    let gpu = GpuInfo {
        index: 1,
        name: "Test Adapter".to_string(),
        device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
        api_version: vk::make_api_version(0, 1, 3, 275),
    };
    assert_eq!(gpu.to_string(), "[1] Test Adapter (Discrete GPU, Vulkan 1.3.275)");
}

#[test]
fn test_device_type_names() {
    assert_eq!(device_type_name(vk::PhysicalDeviceType::INTEGRATED_GPU), "Integrated GPU");
    assert_eq!(device_type_name(vk::PhysicalDeviceType::CPU), "CPU");
    assert_eq!(device_type_name(vk::PhysicalDeviceType::OTHER), "Other");
}

//! Default audio device resolution

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::{CaptureError, PlaybackError};

/// Get the default input device, verifying it reports a usable config
pub fn default_input_device() -> Result<cpal::Device, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::DeviceNotFound("no default input device".to_string()))?;

    // A device that cannot report a default config is effectively absent
    device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceNotFound(e.to_string()))?;

    Ok(device)
}

/// Get the default output device, verifying it reports a usable config
pub fn default_output_device() -> Result<cpal::Device, PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::DeviceNotFound("no default output device".to_string()))?;

    device
        .default_output_config()
        .map_err(|e| PlaybackError::DeviceNotFound(e.to_string()))?;

    Ok(device)
}

/// Human-readable device name for logging
pub fn device_name(device: &cpal::Device) -> String {
    device.name().unwrap_or_else(|_| "Unknown".to_string())
}

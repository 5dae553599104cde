//! Static environment capture
//!
//! Immutable facts about the device and build, collected once before any
//! task runs: firmware image name, kernel version, device name, renderer
//! strings, window size, and a timestamp. Missing platform files degrade
//! to "Unknown" with a warning, since developer hosts lack them.

use chrono::Local;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use sysinfo::System;
use tracing::{debug, warn};

use crate::config::RunSettings;
use crate::display::DisplayContext;

const VERSION_FILE: &str = "/version.txt";
const DEVICE_PROPERTIES_FILE: &str = "/etc/device.properties";
const UNKNOWN: &str = "Unknown";

/// Collect the environment section of the report.
pub fn collect(display: &dyn DisplayContext, settings: &RunSettings) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();

    env.insert(
        "Image name".to_string(),
        read_keyed_value(Path::new(VERSION_FILE), parse_image_name),
    );
    env.insert(
        "Device name".to_string(),
        read_keyed_value(Path::new(DEVICE_PROPERTIES_FILE), parse_device_name),
    );
    env.insert(
        "Kernel version".to_string(),
        System::kernel_version().unwrap_or_else(|| UNKNOWN.to_string()),
    );
    env.insert(
        "OS".to_string(),
        match (System::name(), System::os_version()) {
            (Some(name), Some(version)) => format!("{name} {version}"),
            (Some(name), None) => name,
            _ => UNKNOWN.to_string(),
        },
    );

    for (key, value) in display.driver_info() {
        env.insert(key, value);
    }

    env.insert(
        "Window size".to_string(),
        format!("{}x{}", display.width(), display.height()),
    );
    env.insert(
        "Target frame rate".to_string(),
        settings.target_frame_rate.to_string(),
    );
    env.insert(
        "Timestamp".to_string(),
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    );

    debug!(entries = env.len(), "static environment collected");
    env
}

fn read_keyed_value(path: &Path, parse: fn(&str) -> Option<String>) -> String {
    match fs::read_to_string(path) {
        Ok(content) => parse(&content).unwrap_or_else(|| {
            warn!(path = %path.display(), "expected key not found");
            UNKNOWN.to_string()
        }),
        Err(err) => {
            warn!(path = %path.display(), %err, "could not read environment file");
            UNKNOWN.to_string()
        }
    }
}

/// `/version.txt` carries the firmware build as `imagename:<value>`.
fn parse_image_name(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.split_once("imagename:")
            .map(|(_, value)| value.trim().to_string())
    })
}

/// `/etc/device.properties` is `KEY=value` pairs; the device model is
/// `DEVICE_NAME`.
fn parse_device_name(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        if key.trim() == "DEVICE_NAME" {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

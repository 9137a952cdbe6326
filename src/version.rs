// src/version.rs
use std::env::consts::{ARCH, OS};

// Release builds inject these through the environment at compile time.
const TAG: &str = match option_env!("KCTXSYNC_BUILD_TAG") {
    Some(tag) => tag,
    None => env!("CARGO_PKG_VERSION"),
};
const DATE: &str = match option_env!("KCTXSYNC_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};
const COMMIT: &str = match option_env!("KCTXSYNC_BUILD_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

pub fn version_line() -> String {
    format!("kctxsync version {} {}/{} {} {}", TAG, OS, ARCH, DATE, COMMIT)
}

//! Image Capture Library
//!
//! Produces decoded image frames from device-agnostic origins:
//! - In-memory byte buffers (file uploads)
//! - Live camera feeds polled for frames
//!
//! A [`FeedSource`] is the device backend; [`open_live_feed`] performs the
//! permission/device acquisition and hands back a [`LiveFeed`] that releases
//! the backend when dropped.

pub mod feed;
pub mod frame;

pub use feed::{open_live_feed, FakeFeed, FakeFeedHandle, FeedSource, LiveFeed};
pub use frame::ImageHandle;

use thiserror::Error;

/// Capture error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Feed has not produced a frame yet")]
    FeedNotReady,
}

//! Live feed acquisition
//!
//! A [`FeedSource`] is the device backend behind a live feed: a camera
//! driver, a browser media stream, or a test double. Acquiring the device
//! is external and non-deterministic (permission prompts, missing
//! hardware), so callers go through [`open_live_feed`] and get back a
//! [`LiveFeed`] handle that guarantees release of the backend even when
//! capture is aborted.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::{CaptureError, ImageHandle};

/// Device backend polled for frames
pub trait FeedSource: Send {
    /// Source name used in logs
    fn name(&self) -> &str;

    /// Acquire the device. Called exactly once by [`open_live_feed`].
    fn open(&mut self) -> Result<(), CaptureError>;

    /// Return the next available frame, or `None` while the source has not
    /// produced one yet.
    fn poll_frame(&mut self) -> Result<Option<ImageHandle>, CaptureError>;

    /// Release the device. Must be safe to call more than once.
    fn close(&mut self);
}

/// Handle to an open live feed
///
/// Releases the underlying device on drop.
pub struct LiveFeed {
    source: Box<dyn FeedSource>,
    released: bool,
}

/// Open a live feed by acquiring the given device backend.
///
/// Fails with [`CaptureError::DeviceUnavailable`] when the device cannot be
/// acquired (no permission, no hardware).
pub fn open_live_feed(mut source: Box<dyn FeedSource>) -> Result<LiveFeed, CaptureError> {
    source.open()?;
    info!("Live feed opened: {}", source.name());
    Ok(LiveFeed {
        source,
        released: false,
    })
}

impl std::fmt::Debug for LiveFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveFeed")
            .field("source", &self.source.name())
            .field("released", &self.released)
            .finish()
    }
}

impl LiveFeed {
    /// Snapshot the current frame from the feed.
    ///
    /// Fails with [`CaptureError::FeedNotReady`] while the feed has not
    /// produced a frame yet.
    pub fn capture_frame(&mut self) -> Result<ImageHandle, CaptureError> {
        match self.source.poll_frame()? {
            Some(frame) => {
                debug!(
                    "Captured {}x{} frame from {}",
                    frame.width(),
                    frame.height(),
                    self.source.name()
                );
                Ok(frame)
            }
            None => Err(CaptureError::FeedNotReady),
        }
    }

    /// Release the underlying device explicitly
    pub fn release(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if !self.released {
            self.released = true;
            self.source.close();
            info!("Live feed released: {}", self.source.name());
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.close_once();
    }
}

struct FakeFeedShared {
    frames: VecDeque<ImageHandle>,
    open: bool,
}

/// Control handle for a [`FakeFeed`], kept by the test
#[derive(Clone)]
pub struct FakeFeedHandle {
    shared: Arc<Mutex<FakeFeedShared>>,
}

impl FakeFeedHandle {
    /// Queue a frame for the feed to serve
    pub fn push_frame(&self, frame: ImageHandle) {
        self.shared
            .lock()
            .expect("fake feed lock poisoned")
            .frames
            .push_back(frame);
    }

    /// Whether the device is currently held open
    pub fn is_open(&self) -> bool {
        self.shared.lock().expect("fake feed lock poisoned").open
    }
}

/// In-memory feed source for tests and development
///
/// Frames pushed through the [`FakeFeedHandle`] are served in order, one
/// per `capture_frame` call.
pub struct FakeFeed {
    available: bool,
    shared: Arc<Mutex<FakeFeedShared>>,
}

impl FakeFeed {
    /// Feed whose device can be acquired
    pub fn available() -> (Self, FakeFeedHandle) {
        let shared = Arc::new(Mutex::new(FakeFeedShared {
            frames: VecDeque::new(),
            open: false,
        }));
        let handle = FakeFeedHandle {
            shared: shared.clone(),
        };
        (
            Self {
                available: true,
                shared,
            },
            handle,
        )
    }

    /// Feed whose device acquisition always fails
    pub fn unavailable() -> Self {
        Self {
            available: false,
            shared: Arc::new(Mutex::new(FakeFeedShared {
                frames: VecDeque::new(),
                open: false,
            })),
        }
    }
}

impl FeedSource for FakeFeed {
    fn name(&self) -> &str {
        "fake-feed"
    }

    fn open(&mut self) -> Result<(), CaptureError> {
        if !self.available {
            return Err(CaptureError::DeviceUnavailable(
                "no capture device or permission denied".to_string(),
            ));
        }
        self.shared.lock().expect("fake feed lock poisoned").open = true;
        Ok(())
    }

    fn poll_frame(&mut self) -> Result<Option<ImageHandle>, CaptureError> {
        Ok(self
            .shared
            .lock()
            .expect("fake feed lock poisoned")
            .frames
            .pop_front())
    }

    fn close(&mut self) {
        self.shared.lock().expect("fake feed lock poisoned").open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: u8) -> ImageHandle {
        ImageHandle::from_rgb8(vec![value; 12], 2, 2).unwrap()
    }

    #[test]
    fn unavailable_device_fails_to_open() {
        let err = open_live_feed(Box::new(FakeFeed::unavailable())).unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[test]
    fn capture_before_first_frame_is_not_ready() {
        let (feed, _handle) = FakeFeed::available();
        let mut live = open_live_feed(Box::new(feed)).unwrap();
        let err = live.capture_frame().unwrap_err();
        assert!(matches!(err, CaptureError::FeedNotReady));
    }

    #[test]
    fn frames_are_served_in_order() {
        let (feed, handle) = FakeFeed::available();
        let mut live = open_live_feed(Box::new(feed)).unwrap();

        handle.push_frame(frame(1));
        handle.push_frame(frame(2));

        assert_eq!(live.capture_frame().unwrap(), frame(1));
        assert_eq!(live.capture_frame().unwrap(), frame(2));
        assert!(matches!(
            live.capture_frame().unwrap_err(),
            CaptureError::FeedNotReady
        ));
    }

    #[test]
    fn drop_releases_the_device() {
        let (feed, handle) = FakeFeed::available();
        let live = open_live_feed(Box::new(feed)).unwrap();
        assert!(handle.is_open());
        drop(live);
        assert!(!handle.is_open());
    }

    #[test]
    fn explicit_release_closes_the_device() {
        let (feed, handle) = FakeFeed::available();
        let live = open_live_feed(Box::new(feed)).unwrap();
        live.release();
        assert!(!handle.is_open());
    }
}

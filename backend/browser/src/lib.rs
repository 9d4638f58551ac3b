//! Headless browser capture for menu web pages.
//!
//! Launches Chromium, drives it over the Chrome DevTools Protocol and takes
//! full-page screenshots.

pub mod cdp_client;
pub mod element_query;
pub mod launcher;
pub mod page_control;
pub mod screenshot;
pub mod task;

pub use cdp_client::{CdpClient, CdpEvent};
pub use element_query::{ElementQuery, COOKIE_ACCEPT_LABELS};
pub use launcher::{BrowserLauncher, BrowserProcess};
pub use page_control::PageControl;
pub use screenshot::{CaptureOptions, ChromeCapturer, ImageFormat, PageCapturer};
pub use task::screenshot_task;

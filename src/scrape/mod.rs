// Scrape module: pulls the current showings out of the embedded activity log.
//
// The extractor drives a browser through the traits in traits.rs. Behind the
// "browser" feature, chromium.rs provides the real implementation over the
// Chrome DevTools Protocol.

#[cfg(feature = "browser")]
pub mod chromium;
pub mod diagnostics;
pub mod extractor;
pub mod network;
pub mod rows;
pub mod selector;
pub mod session_state;
pub mod traits;

pub use extractor::{ScrapeSettings, ShowingsScraper};
pub use traits::{BrowserLauncher, BrowserSession, FrameRef, ShowingSource, TableSnapshot};

//! Live preview plumbing.
//!
//! - [`PreviewSync`]: sequence numbers so only the newest render is shown
//! - [`PreviewWorker`]: renders on a background thread, skipping superseded requests
//! - [`PreviewSurface`]: where accepted HTML goes

mod surface;
mod sync;
mod worker;

pub use surface::{HtmlFileSurface, PreviewSurface, StdoutSurface};
pub use sync::{PreviewSync, RenderDone, RenderRequest};
pub use worker::PreviewWorker;

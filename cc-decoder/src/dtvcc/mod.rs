//! CEA-708 digital television closed captions.

pub mod charset;
pub mod demux;
pub mod interp;
pub mod render;
pub mod service;
pub mod styles;
pub mod window;

pub use demux::DtvccDecoder;
pub use render::{render_service, window_to_page};
pub use service::Service;
pub use window::{Pen, Window, WindowStyle};

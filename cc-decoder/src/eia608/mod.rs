//! EIA-608 line-21 closed captions.

pub mod channel;
pub mod charset;
pub mod decoder;
pub mod format;

pub use channel::{Channel, Mode};
pub use decoder::Eia608Decoder;
pub use format::{format_row, render_channel};

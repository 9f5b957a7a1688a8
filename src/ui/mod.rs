//! Terminal output helpers (colors, spinner, download bar).

mod progress;
mod spinner;
mod style;

pub use progress::DownloadBar;
pub use spinner::Spinner;
pub use style::Style;

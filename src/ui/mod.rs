pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, highlight, info, path, section, status, success, warn};
pub use progress::{IndexProgress, Spinner};
pub use progress_message::{ProgressMessage, ProgressPhase};
pub use table::{render_rows, stats_table};
pub use theme::{theme, Theme};

pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    header, human_bytes, info, phase, section, status, success, summary_row, transcript_line,
    warn,
};
pub use progress::{ProgressManager, Spinner};
pub use table::{
    interfaces_table, inventory_table, neighbors_table, orphans_table, relationships_table, routes_table,
    stats_table, TableBuilder,
};
pub use theme::{theme, Theme};

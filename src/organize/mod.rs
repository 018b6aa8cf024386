//! Folder organisation: plans, moves, logs and profile scaffolds

pub mod executor;
pub mod lister;
pub mod placement;
pub mod planner;
pub mod profiles;

pub use executor::{execute, ExecuteOptions, ExecuteReport};
pub use lister::{list, load_log, ListFilter};
pub use placement::{apply_plan, build_plan, expand_sources, Placement};
pub use planner::{plan, Category, OrganizePlan, PlannedFile, SortBy};
pub use profiles::{scaffold, ScaffoldOptions, ScaffoldReport};

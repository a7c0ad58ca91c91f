//! Resource placement and year sorting for Markdown vaults.

pub mod errors;
pub mod graph;
pub mod identity;
pub mod locator;
pub mod models;
pub mod mover;
pub mod optimizer;
pub mod parser;
pub mod paths;
pub mod year_sort;

pub use vault_tidy_core::LayoutSettings;
pub use errors::{TidyError, TidyResult};
pub use identity::Fingerprint;
pub use models::{
    ConflictSet, ErrorKind, MoveOutcome, NoteSortEntry, NoteSortOutcome, NoteUpdate,
    NoteUpdateStatus, OptimizeReport, OptimizeStats, PlacementDecision, RelocationResult,
    ReportedError, Resolution, ResourceReference, RunMode, YearSortReport, YearSortStats,
};
pub use optimizer::ResourceOptimizer;
pub use parser::{LinkParser, ResourceLink, extract_date_year, year_for};
pub use year_sort::YearSorter;

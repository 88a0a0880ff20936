pub mod coordinator;
pub mod state;
pub mod types;

pub use coordinator::BatchCoordinator;
pub use state::{ItemProgress, ItemState};
pub use types::{
    BatchReport, Deliverable, EntryStatus, ItemReport, ProcessingResult, ReportEntry,
};

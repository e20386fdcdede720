pub mod extraction_phase;
pub mod finalize;
pub mod locate;
pub mod order_start;
pub mod regenerate;

pub use extraction_phase::{EluteStage, ExtractionPath, SplitStage, DNA_PATH, RNA_PATH};
pub use finalize::FinalizeOrder;
pub use locate::LocateAndGate;
pub use order_start::BuildAndStartOrder;
pub use regenerate::RegenerateSources;

pub mod context;
pub mod executor;
pub mod trait_step;

pub use context::{RunContext, StageRecord};
pub use executor::StageExecutor;
pub use trait_step::ProtocolStage;

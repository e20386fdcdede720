//! extraction-workflow: protocolo de co-extracción manual DNA + RNA
//!
//! Orquesta, contra un servicio de inventario (`lims::LimsClient`), la
//! secuencia de etapas que parte un conjunto de tubos en columnas de unión,
//! eluye los extractos DNA, regenera los tubos de partida a partir de los
//! subproductos y repite la fase para RNA.
//!
//! ```
//! use extraction_workflow::{WorkflowConfig, WorkflowEngine};
//! use lims::InMemoryLimsClient;
//! use std::sync::Arc;
//!
//! let client = Arc::new(InMemoryLimsClient::new());
//! client.seed_extraction_order(&["BC1", "BC2"]).unwrap();
//! let engine = WorkflowEngine::new(client.clone(), WorkflowConfig::default());
//! let summary = engine.run(&["BC1".to_string(), "BC2".to_string()]).unwrap();
//! assert_eq!(summary.dna_outputs().len(), 2);
//! assert_eq!(summary.rna_outputs().len(), 2);
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod flows;
pub mod registry;
pub mod step;
pub mod transfer;

pub use config::WorkflowConfig;
pub use engine::{RunSummary, WorkflowEngine};
pub use errors::WorkflowError;
pub use registry::{IdentityRegistry, RegistryError, TrackedItem};
pub use step::{ProtocolStage, RunContext, StageExecutor, StageRecord};
pub use transfer::{plan, PairingError, TransferSet};

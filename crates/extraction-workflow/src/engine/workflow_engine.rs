use crate::config::WorkflowConfig;
use crate::errors::WorkflowError;
use crate::flows::protocol;
use crate::step::{ProtocolStage, RunContext, StageExecutor, StageRecord};
use indexmap::IndexMap;
use lims::{AliquotType, BatchId, ItemId, LimsClient, OrderId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resultado de una ejecución completa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub order: OrderId,
    pub batch: BatchId,
    /// Tubos de partida, en el orden de los códigos recibidos.
    pub source_items: Vec<ItemId>,
    /// Tubos extraídos por tipo, en el orden de las fuentes.
    pub outputs: IndexMap<AliquotType, Vec<ItemId>>,
    pub stages: Vec<StageRecord>,
}

impl RunSummary {
    pub fn dna_outputs(&self) -> &[ItemId] {
        self.outputs.get(&AliquotType::Dna).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn rna_outputs(&self) -> &[ItemId] {
        self.outputs.get(&AliquotType::Rna).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Motor que ejecuta el protocolo de extracción contra un `LimsClient`.
///
/// Las etapas se ejecutan en secuencia fija y cualquier error detiene la
/// ejecución en la etapa donde ocurre. No hay reintentos ni compensación:
/// lo ya aplicado en el servicio queda aplicado.
pub struct WorkflowEngine {
    client: Arc<dyn LimsClient>,
    config: WorkflowConfig,
    stages: Vec<Box<dyn ProtocolStage>>,
}

impl WorkflowEngine {
    pub fn new(client: Arc<dyn LimsClient>, config: WorkflowConfig) -> Self {
        let stages = protocol(&config);
        Self { client, config, stages }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Nombres de las etapas en orden de ejecución.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Ejecuta el protocolo completo sobre los tubos identificados por
    /// `barcodes`.
    pub fn run(&self, barcodes: &[String]) -> Result<RunSummary, WorkflowError> {
        if barcodes.is_empty() {
            return Err(WorkflowError::Validation("no se indicó ningún código de barras".into()));
        }
        self.config.validate()?;

        let mut ctx = RunContext::new(barcodes);
        let total = self.stages.len();
        for (i, stage) in self.stages.iter().enumerate() {
            log::info!("[{}/{}] {}: {}", i + 1, total, stage.name(), stage.description());
            if let Err(e) = self.run_stage(stage.as_ref(), i + 1, &mut ctx) {
                log::error!("etapa {} ({}) falló: {}", i + 1, stage.name(), e);
                return Err(e);
            }
        }

        let summary = RunSummary { order: ctx.order()?,
                                   batch: ctx.batch()?,
                                   source_items: ctx.source_items,
                                   outputs: ctx.outputs,
                                   stages: ctx.journal };
        log::info!("orden {} completada: {} DNA, {} RNA",
                   summary.order,
                   summary.dna_outputs().len(),
                   summary.rna_outputs().len());
        Ok(summary)
    }

    fn run_stage(&self, stage: &dyn ProtocolStage, index: usize, ctx: &mut RunContext) -> Result<(), WorkflowError> {
        stage.validate(ctx)?;
        let mut exec = StageExecutor::new(self.client.as_ref(), ctx);
        stage.execute(&mut exec)?;
        let record = exec.finish(index, stage.name());
        log::debug!("{:?}", record);
        ctx.journal.push(record);
        Ok(())
    }
}

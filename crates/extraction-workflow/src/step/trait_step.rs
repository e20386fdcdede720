use crate::errors::WorkflowError;
use crate::step::context::RunContext;
use crate::step::executor::StageExecutor;

/// Trait que representa una etapa del protocolo.
pub trait ProtocolStage: Send + Sync {
    /// Nombre o identificador de la etapa
    fn name(&self) -> &str;

    /// Descripcion legible que se anuncia antes de ejecutarla.
    fn description(&self) -> &str;

    /// Validacion previa a la ejecucion sobre el estado local del contexto.
    /// No debe llamar al servicio.
    fn validate(&self, _ctx: &RunContext) -> Result<(), WorkflowError> {
        Ok(())
    }

    /// Ejecuta la etapa. Cualquier error del servicio se propaga sin cambios.
    fn execute(&self, exec: &mut StageExecutor<'_>) -> Result<(), WorkflowError>;
}

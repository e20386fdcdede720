use crate::errors::WorkflowError;
use crate::step::{ProtocolStage, RunContext, StageExecutor};
use lims::OrderEvent;

/// Pasa la orden de borrador a en curso (`build` y luego `start`).
pub struct BuildAndStartOrder;

impl ProtocolStage for BuildAndStartOrder {
  fn name(&self) -> &str {
    "build_and_start_order"
  }

  fn description(&self) -> &str {
    "Construir e iniciar la orden"
  }

  fn validate(&self, ctx: &RunContext) -> Result<(), WorkflowError> {
    ctx.order().map(|_| ())
  }

  fn execute(&self, exec: &mut StageExecutor<'_>) -> Result<(), WorkflowError> {
    exec.order_event(OrderEvent::Build)?;
    let order = exec.order_event(OrderEvent::Start)?;
    log::debug!("orden {} en estado {:?}", order.id, order.status);
    Ok(())
  }
}

use crate::errors::WorkflowError;
use crate::step::{ProtocolStage, RunContext, StageExecutor};
use lims::OrderEvent;

pub struct FinalizeOrder;

impl ProtocolStage for FinalizeOrder {
  fn name(&self) -> &str {
    "finalize_order"
  }

  fn description(&self) -> &str {
    "Completar la orden"
  }

  fn validate(&self, ctx: &RunContext) -> Result<(), WorkflowError> {
    ctx.order().map(|_| ())
  }

  fn execute(&self, exec: &mut StageExecutor<'_>) -> Result<(), WorkflowError> {
    exec.order_event(OrderEvent::Complete)?;
    Ok(())
  }
}

use crate::errors::WorkflowError;
use crate::step::executor::{NewItems, StatusChange};
use crate::step::{ProtocolStage, RunContext, StageExecutor};
use crate::transfer::TransferSet;
use lims::{ContainerKind, Fraction, ItemEvent, Role};

/// Vuelca cada subproducto de la ruta DNA en un tubo nuevo que pasa a ser
/// el material de partida de la ruta RNA.
pub struct RegenerateSources;

impl ProtocolStage for RegenerateSources {
  fn name(&self) -> &str {
    "regenerate_sources"
  }

  fn description(&self) -> &str {
    "Regenerar tubos de partida a partir de los subproductos"
  }

  fn validate(&self, ctx: &RunContext) -> Result<(), WorkflowError> {
    ctx.batch().map(|_| ())
  }

  fn execute(&self, exec: &mut StageExecutor<'_>) -> Result<(), WorkflowError> {
    let batch = exec.ctx().batch()?;
    let by_products = exec.registry().lookup_by_role(Role::ByProductTube);
    if by_products.len() != exec.count() {
      return Err(WorkflowError::Validation(format!("se esperaban {} subproducto(s) y hay {}",
                                                   exec.count(),
                                                   by_products.len())));
    }

    let fresh = exec.create_items(ContainerKind::Tube)?;
    exec.add_items(&[NewItems { role: Role::TubeToBeExtracted, kind: ContainerKind::Tube, items: &fresh }],
                   Some(ItemEvent::Start),
                   Some(batch))?;

    let mut set = TransferSet::new();
    set.push_plan(&by_products, &fresh, Fraction::WHOLE, None)?;
    exec.transfer(set)?;

    exec.advance(&[StatusChange { role: Role::TubeToBeExtracted, items: &fresh, event: ItemEvent::Complete },
                   StatusChange { role: Role::ByProductTube, items: &by_products, event: ItemEvent::Unuse }])
  }
}

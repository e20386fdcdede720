use crate::config::WorkflowConfig;
use crate::errors::WorkflowError;
use crate::step::{ProtocolStage, RunContext, StageExecutor};
use lims::{ContainerKind, ItemId, ItemStatus, Order, Resource, Role, SearchCriteria};
use std::collections::HashSet;

/// Localiza los tubos por código de barras y la orden que los contiene, y
/// aborta si alguno ya tiene lote. Si la comprobación pasa crea el lote de
/// la ejecución y lo asocia a los tubos de partida.
pub struct LocateAndGate {
  config: WorkflowConfig,
}

impl LocateAndGate {
  pub fn new(config: WorkflowConfig) -> Self {
    Self { config }
  }

  fn locate_items(&self, exec: &mut StageExecutor<'_>) -> Result<Vec<ItemId>, WorkflowError> {
    let criteria = SearchCriteria::ItemsByBarcode { position: self.config.barcode_position.clone(),
                                                    barcode_type: self.config.barcode_type.clone(),
                                                    values: exec.ctx().barcodes.clone() };
    let items: Vec<ItemId> = exec.search(&criteria)?
                                 .into_iter()
                                 .filter_map(|r| match r {
                                   Resource::Item(rec) => Some(rec.id),
                                   Resource::Order(_) => None,
                                 })
                                 .collect();
    if let Some(dup) = items.iter().enumerate().find(|(i, id)| items[..*i].contains(id)).map(|(_, id)| id) {
      return Err(WorkflowError::Validation(format!("el tubo {} aparece más de una vez en la búsqueda", dup)));
    }
    if items.len() != exec.count() {
      return Err(WorkflowError::Validation(format!("se esperaban {} tubo(s) y se localizaron {}",
                                                   exec.count(),
                                                   items.len())));
    }
    Ok(items)
  }

  fn locate_order(&self, exec: &mut StageExecutor<'_>, first: ItemId) -> Result<Order, WorkflowError> {
    let criteria = SearchCriteria::OrderByItem { item: first, role: Role::TubeToBeExtracted };
    let mut orders = exec.search(&criteria)?
                         .into_iter()
                         .filter_map(|r| match r {
                           Resource::Order(o) => Some(o),
                           Resource::Item(_) => None,
                         });
    let order = orders.next()
                      .ok_or_else(|| WorkflowError::Validation(format!("ninguna orden contiene {} bajo {}",
                                                                       first,
                                                                       Role::TubeToBeExtracted)))?;
    if orders.next().is_some() {
      log::warn!("varias órdenes contienen {}; se usa {}", first, order.id);
    }
    Ok(order)
  }
}

impl ProtocolStage for LocateAndGate {
  fn name(&self) -> &str {
    "locate_and_gate"
  }

  fn description(&self) -> &str {
    "Localizar tubos y orden; comprobar que no tienen lote"
  }

  fn validate(&self, ctx: &RunContext) -> Result<(), WorkflowError> {
    let mut seen = HashSet::new();
    match ctx.barcodes.iter().find(|code| !seen.insert(code.as_str())) {
      Some(dup) => Err(WorkflowError::Validation(format!("código de barras repetido: {}", dup))),
      None => Ok(()),
    }
  }

  fn execute(&self, exec: &mut StageExecutor<'_>) -> Result<(), WorkflowError> {
    let sources = self.locate_items(exec)?;
    let first = *sources.first()
                        .ok_or_else(|| WorkflowError::Validation("no se localizó ningún tubo".into()))?;
    let order = self.locate_order(exec, first)?;

    let role = Role::TubeToBeExtracted;
    if let Some(missing) = sources.iter().find(|id| !order.holds(role, id)) {
      return Err(WorkflowError::Validation(format!("la orden {} no contiene {} bajo {}", order.id, missing, role)));
    }

    let batched: Vec<ItemId> = order.items_under(role).iter().filter(|e| e.batch.is_some()).map(|e| e.item).collect();
    if !batched.is_empty() {
      log::warn!("orden {}: {} item(s) bajo {} ya tienen lote", order.id, batched.len(), role);
      return Err(WorkflowError::PreconditionViolation { role, items: batched });
    }

    log::info!("orden {} con {} tubo(s) de partida", order.id, sources.len());
    {
      let ctx = exec.ctx_mut();
      ctx.order_id = Some(order.id);
      ctx.source_items = sources.clone();
      // orden de localización: la primera división empareja sobre él
      for id in &sources {
        let status = order.items_under(role)
                          .iter()
                          .find(|e| &e.item == id)
                          .map(|e| e.status)
                          .unwrap_or(ItemStatus::Pending);
        ctx.registry.register(std::slice::from_ref(id), ContainerKind::Tube, role, status, None)?;
      }
    }

    let batch = exec.create_batch()?;
    exec.ctx_mut().batch_id = Some(batch);
    exec.assign(role, &sources, None, Some(batch))
  }
}

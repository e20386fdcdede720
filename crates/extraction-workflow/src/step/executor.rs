use crate::errors::WorkflowError;
use crate::registry::IdentityRegistry;
use crate::step::context::{RunContext, StageRecord};
use crate::transfer::TransferSet;
use chrono::{DateTime, Utc};
use lims::{
  BatchId, ContainerKind, ItemEvent, ItemId, ItemStatus, ItemUpdate, ItemsPatch, LimsClient, Order, OrderEvent,
  OrderId, OrderPatch, Resource, ResourceKind, Role, SearchCriteria,
};

/// Grupo de items nuevos que entran en la orden bajo un rol.
pub struct NewItems<'i> {
  pub role: Role,
  pub kind: ContainerKind,
  pub items: &'i [ItemId],
}

/// Cambio de estado pedido para los items de un rol.
pub struct StatusChange<'i> {
  pub role: Role,
  pub items: &'i [ItemId],
  pub event: ItemEvent,
}

/// Aplica una etapa del protocolo contra el servicio.
///
/// Cada operación emite exactamente una llamada al servicio (salvo
/// `create_items`, que emite una por contenedor) y refleja el resultado en el
/// `IdentityRegistry` del contexto. Las cardinalidades salen siempre de
/// `RunContext::initial_count`; de las respuestas sólo se extraen los
/// identificadores nuevos.
pub struct StageExecutor<'a> {
  client: &'a dyn LimsClient,
  ctx: &'a mut RunContext,
  created: usize,
  updates: usize,
  transfers: usize,
  started_at: DateTime<Utc>,
}

impl<'a> StageExecutor<'a> {
  pub fn new(client: &'a dyn LimsClient, ctx: &'a mut RunContext) -> Self {
    Self { client, ctx, created: 0, updates: 0, transfers: 0, started_at: Utc::now() }
  }

  pub fn ctx(&self) -> &RunContext {
    &*self.ctx
  }

  pub fn ctx_mut(&mut self) -> &mut RunContext {
    &mut *self.ctx
  }

  pub fn registry(&self) -> &IdentityRegistry {
    &self.ctx.registry
  }

  /// Número de contenedores por generación.
  pub fn count(&self) -> usize {
    self.ctx.initial_count
  }

  /// Busca y resuelve en una sola operación.
  pub fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Resource>, WorkflowError> {
    log::debug!("{} (model={}) {:?}", criteria.description(), criteria.model(), criteria);
    let search = self.client.search(criteria)?;
    Ok(self.client.resolve(&search)?)
  }

  pub fn create_batch(&mut self) -> Result<BatchId, WorkflowError> {
    let id = BatchId(self.client.create(ResourceKind::Batch)?);
    log::debug!("lote creado {}", id);
    Ok(id)
  }

  /// Crea una generación de `count()` contenedores de tipo `kind`. El orden
  /// del resultado es el orden de creación.
  pub fn create_items(&mut self, kind: ContainerKind) -> Result<Vec<ItemId>, WorkflowError> {
    let n = self.count();
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
      out.push(ItemId(self.client.create(kind.into())?));
    }
    self.created += out.len();
    log::debug!("{} contenedor(es) {:?} creados", out.len(), kind);
    Ok(out)
  }

  /// Añade grupos de items nuevos a la orden en una sola actualización y
  /// los registra con el estado que resulta de `event`.
  pub fn add_items(&mut self,
                   groups: &[NewItems<'_>],
                   event: Option<ItemEvent>,
                   batch: Option<BatchId>)
                   -> Result<(), WorkflowError> {
    let update = ItemUpdate::new(event, batch);
    let patch = groups.iter()
                      .fold(ItemsPatch::new(), |p, g| p.with_role(g.role, g.items, update));
    self.update_items(patch)?;
    let status = status_after(ItemStatus::Pending, event)?;
    for g in groups {
      self.ctx.registry.register(g.items, g.kind, g.role, status, batch)?;
    }
    Ok(())
  }

  /// Reetiqueta items existentes bajo `to` (mismo identificador, mismo orden) y
  /// aplica `event`/`batch` a la nueva entrada.
  pub fn relabel(&mut self,
                 items: &[ItemId],
                 to: Role,
                 event: Option<ItemEvent>,
                 batch: Option<BatchId>)
                 -> Result<(), WorkflowError> {
    let patch = ItemsPatch::new().with_role(to, items, ItemUpdate::new(event, batch));
    self.update_items(patch)?;
    self.ctx.registry.relabel(items, to)?;
    // la entrada bajo el rol nuevo nace en `pending`
    let status = status_after(ItemStatus::Pending, event)?;
    self.ctx.registry.set_status(items, status)?;
    if let Some(b) = batch {
      self.ctx.registry.set_batch(items, b)?;
    }
    Ok(())
  }

  /// Actualiza items ya presentes bajo `role` (evento y/o lote) en una sola
  /// llamada.
  pub fn assign(&mut self,
                role: Role,
                items: &[ItemId],
                event: Option<ItemEvent>,
                batch: Option<BatchId>)
                -> Result<(), WorkflowError> {
    let patch = ItemsPatch::new().with_role(role, items, ItemUpdate::new(event, batch));
    self.update_items(patch)?;
    self.mirror(role, items, event)?;
    if let Some(b) = batch {
      self.ctx.registry.set_batch(items, b)?;
    }
    Ok(())
  }

  /// Aplica varios cambios de estado en una sola actualización.
  ///
  /// El registro sólo refleja el cambio en los items cuyo rol actual es el
  /// del cambio: marcar `unuse` el rol de origen de un reetiquetado no toca
  /// el estado de la entrada nueva.
  pub fn advance(&mut self, changes: &[StatusChange<'_>]) -> Result<(), WorkflowError> {
    let patch = changes.iter()
                       .fold(ItemsPatch::new(), |p, c| p.with_role(c.role, c.items, ItemUpdate::event(c.event)));
    self.update_items(patch)?;
    for c in changes {
      self.mirror(c.role, c.items, Some(c.event))?;
    }
    Ok(())
  }

  /// Envía un conjunto de transferencias en una sola llamada.
  pub fn transfer(&mut self, set: TransferSet) -> Result<(), WorkflowError> {
    if set.is_empty() {
      return Ok(());
    }
    let transfers = set.into_inner();
    log::debug!("transfer: {} arista(s)", transfers.len());
    self.client.transfer(&transfers)?;
    self.transfers += transfers.len();
    Ok(())
  }

  /// Como `transfer`, pero exige que cada fuente reparta exactamente todo su
  /// contenido (etapas de división).
  pub fn transfer_conserved(&mut self, set: TransferSet) -> Result<(), WorkflowError> {
    if let Err((source, total)) = set.ensure_conserved() {
      return Err(WorkflowError::Validation(format!("la fuente {} reparte {} de su contenido en lugar de 1", source, total)));
    }
    self.transfer(set)
  }

  pub fn order_event(&mut self, event: OrderEvent) -> Result<Order, WorkflowError> {
    let order = self.order()?;
    log::debug!("orden {} evento {:?}", order, event);
    let updated = self.client.update(&order, &OrderPatch::from(event))?;
    self.updates += 1;
    Ok(updated)
  }

  /// Cierra la etapa y devuelve su resumen.
  pub fn finish(self, index: usize, name: &str) -> StageRecord {
    StageRecord { index,
                  name: name.to_string(),
                  created: self.created,
                  updates: self.updates,
                  transfers: self.transfers,
                  started_at: self.started_at,
                  finished_at: Utc::now() }
  }

  /// Refleja `event` en el registro para los items cuyo rol actual es `role`.
  fn mirror(&mut self, role: Role, items: &[ItemId], event: Option<ItemEvent>) -> Result<(), WorkflowError> {
    let Some(event) = event else { return Ok(()) };
    for id in items {
      let Some(from) = self.ctx.registry.get(id).filter(|t| t.role == role).map(|t| t.status) else {
        continue;
      };
      self.ctx.registry.set_status(std::slice::from_ref(id), status_after(from, Some(event))?)?;
    }
    Ok(())
  }

  fn order(&self) -> Result<OrderId, WorkflowError> {
    self.ctx.order()
  }

  fn update_items(&mut self, patch: ItemsPatch) -> Result<Order, WorkflowError> {
    let order = self.order()?;
    log::debug!("orden {} parche de {} entrada(s)", order, patch.len());
    let updated = self.client.update(&order, &OrderPatch::Items(patch))?;
    self.updates += 1;
    Ok(updated)
  }
}

fn status_after(status: ItemStatus, event: Option<ItemEvent>) -> Result<ItemStatus, WorkflowError> {
  match event {
    Some(e) => status.apply(e).map_err(|err| WorkflowError::Validation(err.to_string())),
    None => Ok(status),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use lims::InMemoryLimsClient;

  fn started_context(client: &InMemoryLimsClient) -> RunContext {
    let (order, tubes) = client.seed_extraction_order(&["U1", "U2"]).unwrap();
    let mut ctx = RunContext::new(&["U1".to_string(), "U2".to_string()]);
    ctx.order_id = Some(order);
    ctx.source_items = tubes.clone();
    ctx.registry
       .register(&tubes, ContainerKind::Tube, Role::TubeToBeExtracted, ItemStatus::Pending, None)
       .unwrap();
    ctx
  }

  #[test]
  fn relabel_keeps_ids_and_old_role_unuse_does_not_touch_new_entry() {
    let client = InMemoryLimsClient::new();
    let mut ctx = started_context(&client);
    let mut exec = StageExecutor::new(&client, &mut ctx);

    let cols = exec.create_items(ContainerKind::SpinColumn).unwrap();
    exec.add_items(&[NewItems { role: Role::BindingSpinColumnDna, kind: ContainerKind::SpinColumn, items: &cols }],
                   Some(ItemEvent::Start),
                   None)
        .unwrap();
    exec.advance(&[StatusChange { role: Role::BindingSpinColumnDna, items: &cols, event: ItemEvent::Complete }])
        .unwrap();
    exec.relabel(&cols, Role::ElutionSpinColumnDna, Some(ItemEvent::Start), None).unwrap();
    exec.advance(&[StatusChange { role: Role::BindingSpinColumnDna, items: &cols, event: ItemEvent::Unuse }])
        .unwrap();

    assert_eq!(exec.registry().lookup_by_role(Role::ElutionSpinColumnDna), cols);
    assert!(exec.registry().lookup_by_role(Role::BindingSpinColumnDna).is_empty());
    let tracked = exec.registry().get(&cols[0]).unwrap();
    assert_eq!(tracked.status, ItemStatus::Started);
    assert_eq!(tracked.previous_roles, vec![Role::BindingSpinColumnDna]);

    let record = exec.finish(1, "relabel");
    assert_eq!((record.created, record.updates, record.transfers), (2, 4, 0));
  }

  #[test]
  fn assign_sets_batch_without_event() {
    let client = InMemoryLimsClient::new();
    let mut ctx = started_context(&client);
    let tubes = ctx.source_items.clone();
    let mut exec = StageExecutor::new(&client, &mut ctx);

    let batch = exec.create_batch().unwrap();
    exec.assign(Role::TubeToBeExtracted, &tubes, None, Some(batch)).unwrap();

    assert_eq!(exec.registry().batch_of(&tubes[1]), Some(batch));
    assert_eq!(exec.registry().get(&tubes[1]).map(|t| t.status), Some(ItemStatus::Pending));
    let order = client.order(&exec.ctx().order().unwrap()).unwrap();
    assert!(order.items_under(Role::TubeToBeExtracted).iter().all(|e| e.batch == Some(batch)));
  }

  #[test]
  fn unconserved_split_is_refused_before_calling_the_service() {
    let client = InMemoryLimsClient::new();
    let mut ctx = started_context(&client);
    let tubes = ctx.source_items.clone();
    let mut exec = StageExecutor::new(&client, &mut ctx);
    let cols = exec.create_items(ContainerKind::SpinColumn).unwrap();

    let mut set = TransferSet::new();
    set.push_plan(&tubes, &cols, lims::Fraction::HALF, None).unwrap();
    let err = exec.transfer_conserved(set).unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
    assert_eq!(client.count(lims::CallKind::Transfer), 0);
  }

  #[test]
  fn failed_update_is_not_counted() {
    let client = InMemoryLimsClient::new();
    let mut ctx = started_context(&client);
    let tubes = ctx.source_items.clone();
    client.fail_on(lims::CallKind::Update, 1).unwrap();
    let mut exec = StageExecutor::new(&client, &mut ctx);

    assert!(exec.advance(&[StatusChange { role: Role::TubeToBeExtracted, items: &tubes, event: ItemEvent::Start }])
                .is_err());
    assert!(exec.order_event(OrderEvent::Build).is_ok());
    assert_eq!(exec.registry().get(&tubes[0]).map(|t| t.status), Some(ItemStatus::Pending));

    let record = exec.finish(1, "fallo");
    assert_eq!(record.updates, 1);
  }
}

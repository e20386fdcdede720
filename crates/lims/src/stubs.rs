// Archivo: stubs.rs
// Propósito: implementación en memoria del servicio de gestión de muestras
// para pruebas y demos.
//
// `InMemoryLimsClient` valida transiciones de estado, controla el contenido
// de cada contenedor al transferir, registra un diario de llamadas y permite
// inyectar fallos. No es durable.
use crate::client::LimsClient;
use crate::domain::{
    AliquotType, BatchId, ContainerKind, ItemId, ItemRecord, Order, OrderId, OrderItem, OrderStatus, Resource,
    ResourceKind, Role, SearchCriteria, SearchId,
};
use crate::errors::{LimsError, Result};
use crate::patch::{transfer_payload, ItemsPatch, OrderPatch, TransferRequest};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const EPSILON: f64 = 1e-9;

/// Tipo de llamada al servicio (para el diario y la inyección de fallos).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Search,
    Resolve,
    Create,
    Update,
    Transfer,
}

/// Llamada aceptada por el servicio en memoria.
#[derive(Debug, Clone, PartialEq)]
pub enum CallRecord {
    Search { criteria: SearchCriteria, at: DateTime<Utc> },
    Resolve { search: SearchId, at: DateTime<Utc> },
    Create { kind: ResourceKind, id: Uuid, at: DateTime<Utc> },
    Update { order: OrderId, patch: OrderPatch, at: DateTime<Utc> },
    Transfer { transfers: Vec<TransferRequest>, at: DateTime<Utc> },
}

impl CallRecord {
    pub fn kind(&self) -> CallKind {
        match self {
            CallRecord::Search { .. } => CallKind::Search,
            CallRecord::Resolve { .. } => CallKind::Resolve,
            CallRecord::Create { .. } => CallKind::Create,
            CallRecord::Update { .. } => CallKind::Update,
            CallRecord::Transfer { .. } => CallKind::Transfer,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredItem {
    record: ItemRecord,
    content: f64,
    aliquots: Vec<AliquotType>,
}

#[derive(Default)]
struct State {
    items: HashMap<ItemId, StoredItem>,
    barcodes: HashMap<String, ItemId>,
    orders: IndexMap<OrderId, Order>,
    batches: HashSet<BatchId>,
    searches: HashMap<SearchId, SearchCriteria>,
    journal: Vec<CallRecord>,
    counters: HashMap<CallKind, usize>,
    failures: HashSet<(CallKind, usize)>,
}

impl State {
    /// Cuenta la llamada y devuelve `Injected` si se pidió que fallara.
    fn tick(&mut self, kind: CallKind) -> Result<()> {
        let n = self.counters.entry(kind).or_insert(0);
        *n += 1;
        if self.failures.contains(&(kind, *n)) {
            return Err(LimsError::Injected(format!("{:?} #{}", kind, n)));
        }
        Ok(())
    }

    fn item(&self, id: &ItemId) -> Result<&StoredItem> {
        self.items.get(id).ok_or_else(|| LimsError::NotFound(format!("item {}", id)))
    }

    fn apply_items(&self, order: &mut Order, patch: &ItemsPatch) -> Result<()> {
        for (role, entries) in &patch.items {
            for (item, update) in entries {
                self.item(item)?;
                if let Some(batch) = &update.batch {
                    if !self.batches.contains(batch) {
                        return Err(LimsError::NotFound(format!("batch {}", batch)));
                    }
                }
                let list = order.items.entry(*role).or_default();
                let idx = match list.iter().position(|e| &e.item == item) {
                    Some(i) => i,
                    None => {
                        list.push(OrderItem::new(*item));
                        list.len() - 1
                    }
                };
                let entry = &mut list[idx];
                if let Some(batch) = update.batch {
                    entry.batch = Some(batch);
                }
                if let Some(event) = update.event {
                    entry.status = entry.status.apply(event)?;
                }
            }
        }
        Ok(())
    }
}

/// Servicio de gestión de muestras en memoria (no durable).
pub struct InMemoryLimsClient {
    state: Mutex<State>,
}

impl InMemoryLimsClient {
    /// Crea una nueva instancia vacía.
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()) }
    }

    /// Helper para mapear `Mutex::lock()` en un `Result` con
    /// `LimsError::Storage`.
    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|e| LimsError::Storage(format!("mutex poisoned: {:?}", e)))
    }

    /// Registra tubos etiquetados con `barcodes`, cada uno con una unidad de
    /// contenido. Devuelve los ids en el mismo orden.
    pub fn seed_tubes(&self, barcodes: &[&str]) -> Result<Vec<ItemId>> {
        let mut st = self.lock()?;
        let mut out = Vec::with_capacity(barcodes.len());
        for code in barcodes {
            if st.barcodes.contains_key(*code) {
                return Err(LimsError::Rejected(format!("barcode duplicado: {}", code)));
            }
            let id = ItemId::generate();
            let record = ItemRecord { id, kind: ContainerKind::Tube, barcode: Some(code.to_string()) };
            st.items.insert(id, StoredItem { record, content: 1.0, aliquots: Vec::new() });
            st.barcodes.insert(code.to_string(), id);
            out.push(id);
        }
        Ok(out)
    }

    /// Crea una orden en estado `draft` con `items` bajo `role`.
    pub fn seed_order(&self, role: Role, items: &[ItemId]) -> Result<OrderId> {
        let mut st = self.lock()?;
        for item in items {
            st.item(item)?;
        }
        let id = OrderId::generate();
        let mut map = IndexMap::new();
        map.insert(role, items.iter().map(|i| OrderItem::new(*i)).collect());
        st.orders.insert(id, Order { id, status: OrderStatus::Draft, items: map });
        Ok(id)
    }

    /// Atajo: tubos etiquetados + orden de extracción que los contiene bajo
    /// `tube_to_be_extracted`.
    pub fn seed_extraction_order(&self, barcodes: &[&str]) -> Result<(OrderId, Vec<ItemId>)> {
        let items = self.seed_tubes(barcodes)?;
        let order = self.seed_order(Role::TubeToBeExtracted, &items)?;
        Ok((order, items))
    }

    /// Asocia un lote nuevo a `item` bajo `role` sin pasar por el diario.
    /// Sirve para preparar órdenes que ya fueron procesadas.
    pub fn preassign_batch(&self, order: &OrderId, role: Role, item: &ItemId) -> Result<BatchId> {
        let mut st = self.lock()?;
        let batch = BatchId::generate();
        st.batches.insert(batch);
        let o = st.orders.get_mut(order).ok_or_else(|| LimsError::NotFound(format!("order {}", order)))?;
        let entry = o.items
                     .get_mut(&role)
                     .and_then(|l| l.iter_mut().find(|e| &e.item == item))
                     .ok_or_else(|| LimsError::NotFound(format!("item {} bajo {}", item, role)))?;
        entry.batch = Some(batch);
        Ok(batch)
    }

    /// La llamada número `nth` (desde 1) de tipo `kind` fallará con
    /// `LimsError::Injected`.
    pub fn fail_on(&self, kind: CallKind, nth: usize) -> Result<()> {
        self.lock()?.failures.insert((kind, nth));
        Ok(())
    }

    /// Copia de la orden.
    pub fn order(&self, id: &OrderId) -> Result<Order> {
        let st = self.lock()?;
        st.orders.get(id).cloned().ok_or_else(|| LimsError::NotFound(format!("order {}", id)))
    }

    pub fn item(&self, id: &ItemId) -> Result<ItemRecord> {
        Ok(self.lock()?.item(id)?.record.clone())
    }

    /// Contenido actual de un contenedor (unidades arbitrarias).
    pub fn content_of(&self, id: &ItemId) -> Result<f64> {
        Ok(self.lock()?.item(id)?.content)
    }

    /// Tipos de alícuota recibidos por un contenedor, en orden de llegada.
    pub fn aliquots_of(&self, id: &ItemId) -> Result<Vec<AliquotType>> {
        Ok(self.lock()?.item(id)?.aliquots.clone())
    }

    /// Diario de llamadas aceptadas.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).journal.clone()
    }

    /// Número de llamadas aceptadas de tipo `kind`.
    pub fn count(&self, kind: CallKind) -> usize {
        self.calls().iter().filter(|c| c.kind() == kind).count()
    }
}

impl Default for InMemoryLimsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LimsClient for InMemoryLimsClient {
    fn search(&self, criteria: &SearchCriteria) -> Result<SearchId> {
        let mut st = self.lock()?;
        st.tick(CallKind::Search)?;
        let id = SearchId::generate();
        st.searches.insert(id, criteria.clone());
        st.journal.push(CallRecord::Search { criteria: criteria.clone(), at: Utc::now() });
        Ok(id)
    }

    /// Evalúa la búsqueda en el momento de resolverla. Los tubos se devuelven
    /// en el orden de los códigos pedidos; los códigos desconocidos se omiten.
    fn resolve(&self, search: &SearchId) -> Result<Vec<Resource>> {
        let mut st = self.lock()?;
        st.tick(CallKind::Resolve)?;
        let criteria = st.searches
                         .get(search)
                         .cloned()
                         .ok_or_else(|| LimsError::NotFound(format!("search {}", search)))?;
        let found = match &criteria {
            SearchCriteria::ItemsByBarcode { values, .. } => values.iter()
                                                                   .filter_map(|v| st.barcodes.get(v))
                                                                   .filter_map(|id| st.items.get(id))
                                                                   .map(|s| Resource::Item(s.record.clone()))
                                                                   .collect(),
            SearchCriteria::OrderByItem { item, role } => st.orders
                                                            .values()
                                                            .filter(|o| o.holds(*role, item))
                                                            .map(|o| Resource::Order(o.clone()))
                                                            .collect(),
        };
        st.journal.push(CallRecord::Resolve { search: *search, at: Utc::now() });
        Ok(found)
    }

    fn create(&self, kind: ResourceKind) -> Result<Uuid> {
        let mut st = self.lock()?;
        st.tick(CallKind::Create)?;
        let id = Uuid::new_v4();
        match kind {
            ResourceKind::Batch => {
                st.batches.insert(BatchId(id));
            }
            ResourceKind::Tube | ResourceKind::SpinColumn => {
                let container = if kind == ResourceKind::Tube { ContainerKind::Tube } else { ContainerKind::SpinColumn };
                let record = ItemRecord { id: ItemId(id), kind: container, barcode: None };
                st.items.insert(ItemId(id), StoredItem { record, content: 0.0, aliquots: Vec::new() });
            }
        }
        st.journal.push(CallRecord::Create { kind, id, at: Utc::now() });
        Ok(id)
    }

    /// Aplica el parche sobre una copia de la orden y sólo la guarda si todo
    /// el parche es válido.
    fn update(&self, order: &OrderId, patch: &OrderPatch) -> Result<Order> {
        let mut st = self.lock()?;
        st.tick(CallKind::Update)?;
        let mut next = st.orders
                         .get(order)
                         .cloned()
                         .ok_or_else(|| LimsError::NotFound(format!("order {}", order)))?;
        match patch {
            OrderPatch::Items(items) => st.apply_items(&mut next, items)?,
            OrderPatch::Event { event } => next.status = next.status.apply(*event)?,
        }
        log::debug!("orden {} actualizada ({:?})", order, next.status);
        st.orders.insert(*order, next.clone());
        st.journal.push(CallRecord::Update { order: *order, patch: patch.clone(), at: Utc::now() });
        Ok(next)
    }

    /// Las fracciones se calculan sobre el contenido previo a la llamada;
    /// la suma por fuente dentro de una llamada no puede exceder 1.
    fn transfer(&self, transfers: &[TransferRequest]) -> Result<()> {
        let mut st = self.lock()?;
        st.tick(CallKind::Transfer)?;
        log::debug!("transfer {}", transfer_payload(transfers));
        let mut per_source: HashMap<ItemId, f64> = HashMap::new();
        for t in transfers {
            st.item(&t.source)?;
            st.item(&t.target)?;
            if t.source == t.target {
                return Err(LimsError::Rejected(format!("transferencia sobre sí mismo: {}", t.source)));
            }
            *per_source.entry(t.source).or_insert(0.0) += t.fraction.value();
        }
        if let Some((src, total)) = per_source.iter().find(|(_, total)| **total > 1.0 + EPSILON) {
            log::warn!("transferencia rechazada: {} reparte {:.3}", src, total);
            return Err(LimsError::Rejected(format!("fuente {} transferiría {:.3} de su contenido", src, total)));
        }
        let before: HashMap<ItemId, f64> = per_source.keys()
                                                     .filter_map(|id| st.items.get(id).map(|s| (*id, s.content)))
                                                     .collect();
        for t in transfers {
            let moved = before.get(&t.source).copied().unwrap_or(0.0) * t.fraction.value();
            if let Some(src) = st.items.get_mut(&t.source) {
                src.content -= moved;
            }
            if let Some(dst) = st.items.get_mut(&t.target) {
                dst.content += moved;
                if let Some(tag) = t.aliquot_type {
                    dst.aliquots.push(tag);
                }
            }
        }
        st.journal.push(CallRecord::Transfer { transfers: transfers.to_vec(), at: Utc::now() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Fraction, ItemEvent, ItemStatus};
    use crate::patch::ItemUpdate;

    #[test]
    fn mutex_poisoning_returns_error() {
        let client = std::sync::Arc::new(InMemoryLimsClient::new());
        let c2 = client.clone();
        let handle = std::thread::spawn(move || {
            let _g = c2.state.lock().unwrap();
            panic!("force poison");
        });
        let _ = handle.join();

        match client.create(ResourceKind::Tube) {
            Err(LimsError::Storage(_)) => (),
            other => panic!("expected Storage, got {:?}", other),
        }
    }

    #[test]
    fn invalid_patch_leaves_order_untouched() -> Result<()> {
        let client = InMemoryLimsClient::new();
        let (order, items) = client.seed_extraction_order(&["A1", "A2"])?;
        // complete sin start previo: el segundo item invalida todo el parche
        let patch = ItemsPatch::new().with_role(Role::TubeToBeExtracted, &items[..1], ItemUpdate::event(ItemEvent::Start))
                                     .with_role(Role::ExtractedTube, &items[1..], ItemUpdate::event(ItemEvent::Complete));
        assert!(client.update(&order, &patch.into()).is_err());
        let o = client.order(&order)?;
        assert!(o.items_under(Role::TubeToBeExtracted).iter().all(|e| e.status == ItemStatus::Pending));
        assert!(o.items_under(Role::ExtractedTube).is_empty());
        Ok(())
    }

    #[test]
    fn over_committed_source_is_rejected() -> Result<()> {
        let client = InMemoryLimsClient::new();
        let src = client.seed_tubes(&["S"])?[0];
        let a = ItemId(client.create(ResourceKind::Tube)?);
        let b = ItemId(client.create(ResourceKind::Tube)?);
        let t = |target, f| TransferRequest { source: src, target, fraction: Fraction::new(f).unwrap(), aliquot_type: None };
        assert!(client.transfer(&[t(a, 0.6), t(b, 0.6)]).is_err());
        client.transfer(&[t(a, 0.5), t(b, 0.5)])?;
        assert!((client.content_of(&a)? - 0.5).abs() < EPSILON);
        assert!(client.content_of(&src)?.abs() < EPSILON);
        Ok(())
    }

    #[test]
    fn injected_failure_hits_only_the_nth_call() -> Result<()> {
        let client = InMemoryLimsClient::new();
        client.fail_on(CallKind::Create, 2)?;
        client.create(ResourceKind::Batch)?;
        assert!(matches!(client.create(ResourceKind::Tube), Err(LimsError::Injected(_))));
        client.create(ResourceKind::Tube)?;
        assert_eq!(client.count(CallKind::Create), 2);
        Ok(())
    }
}

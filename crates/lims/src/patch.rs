// Archivo: patch.rs
// Propósito: tipos explícitos de petición hacia el servicio: parches de
// asignación de roles, eventos de orden y lotes de transferencias. Se
// serializan con la forma JSON que espera el servicio.
use crate::domain::{AliquotType, BatchId, Fraction, ItemEvent, ItemId, OrderEvent, Role};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Cambio pedido para un item concreto bajo un rol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<ItemEvent>,
    #[serde(rename = "batch_uuid", default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchId>,
}

impl ItemUpdate {
    pub fn new(event: Option<ItemEvent>, batch: Option<BatchId>) -> Self {
        Self { event, batch }
    }

    pub fn event(event: ItemEvent) -> Self {
        Self { event: Some(event), batch: None }
    }
}

/// Parche de asignación: rol → (item → cambio). Conserva el orden de
/// inserción tanto de roles como de items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemsPatch {
    pub items: IndexMap<Role, IndexMap<ItemId, ItemUpdate>>,
}

impl ItemsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Añade `items` bajo `role` aplicando a todos el mismo cambio.
    pub fn with_role(mut self, role: Role, items: &[ItemId], update: ItemUpdate) -> Self {
        let entry = self.items.entry(role).or_default();
        for item in items {
            entry.insert(*item, update);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.values().all(|m| m.is_empty())
    }

    /// Número total de pares (rol, item) del parche.
    pub fn len(&self) -> usize {
        self.items.values().map(|m| m.len()).sum()
    }
}

/// Parche aplicable a una orden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderPatch {
    /// Asignación de roles / eventos / lote por item.
    Items(ItemsPatch),
    /// Evento de estado de la orden.
    Event { event: OrderEvent },
}

impl From<ItemsPatch> for OrderPatch {
    fn from(p: ItemsPatch) -> Self {
        OrderPatch::Items(p)
    }
}

impl From<OrderEvent> for OrderPatch {
    fn from(event: OrderEvent) -> Self {
        OrderPatch::Event { event }
    }
}

/// Arista dirigida de transferencia entre dos contenedores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    #[serde(rename = "source_uuid")]
    pub source: ItemId,
    #[serde(rename = "target_uuid")]
    pub target: ItemId,
    pub fraction: Fraction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliquot_type: Option<AliquotType>,
}

/// Cuerpo de la acción `transfer_tubes_to_tubes` para una lista de
/// transferencias.
pub fn transfer_payload(transfers: &[TransferRequest]) -> JsonValue {
    json!({ "transfer_tubes_to_tubes": { "transfers": transfers } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn items_patch_serializes_in_service_shape() {
        let a = ItemId(Uuid::new_v4());
        let b = BatchId(Uuid::new_v4());
        let patch = ItemsPatch::new().with_role(Role::ByProductTube,
                                                &[a],
                                                ItemUpdate::new(Some(ItemEvent::Start), Some(b)));
        let v = serde_json::to_value(OrderPatch::from(patch)).unwrap();
        let entry = &v["items"]["by_product_tube"][a.to_string()];
        assert_eq!(entry["event"], "start");
        assert_eq!(entry["batch_uuid"], b.to_string());
    }

    #[test]
    fn order_event_patch_is_flat() {
        let v = serde_json::to_value(OrderPatch::from(OrderEvent::Build)).unwrap();
        assert_eq!(v, json!({"event": "build"}));
    }

    #[test]
    fn untagged_transfer_omits_aliquot_type() {
        let t = TransferRequest { source: ItemId(Uuid::new_v4()),
                                  target: ItemId(Uuid::new_v4()),
                                  fraction: Fraction::WHOLE,
                                  aliquot_type: None };
        let v = transfer_payload(&[t]);
        let first = &v["transfer_tubes_to_tubes"]["transfers"][0];
        assert_eq!(first["fraction"], 1.0);
        assert!(first.get("aliquot_type").is_none());
    }
}

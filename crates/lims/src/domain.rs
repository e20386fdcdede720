// Archivo: domain.rs
// Propósito: tipos de dominio compartidos con el servicio de gestión de
// muestras: identificadores, roles, estados de items y órdenes, fracciones
// de transferencia y los recursos que devuelven las búsquedas.
use crate::errors::{LimsError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declara un identificador opaco asignado por el servicio.
macro_rules! service_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Genera un identificador nuevo (sólo lo usan las implementaciones
            /// del servicio, nunca el orquestador).
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

service_id!(
    /// Identificador de un contenedor físico (tubo o columna).
    ItemId
);
service_id!(
    /// Identificador de una orden.
    OrderId
);
service_id!(
    /// Identificador de un lote (batch).
    BatchId
);
service_id!(
    /// Referencia a un resultado de búsqueda.
    SearchId
);

/// Slot lógico que ocupa un item dentro de una orden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    TubeToBeExtracted,
    BindingSpinColumnDna,
    BindingSpinColumnRna,
    ByProductTube,
    ElutionSpinColumnDna,
    ElutionSpinColumnRna,
    ExtractedTube,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::TubeToBeExtracted => "tube_to_be_extracted",
            Role::BindingSpinColumnDna => "binding_spin_column_dna",
            Role::BindingSpinColumnRna => "binding_spin_column_rna",
            Role::ByProductTube => "by_product_tube",
            Role::ElutionSpinColumnDna => "elution_spin_column_dna",
            Role::ElutionSpinColumnRna => "elution_spin_column_rna",
            Role::ExtractedTube => "extracted_tube",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tipo de contenedor físico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Tube,
    SpinColumn,
}

/// Tipo de recurso que se puede crear en el servicio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Batch,
    Tube,
    SpinColumn,
}

impl From<ContainerKind> for ResourceKind {
    fn from(k: ContainerKind) -> Self {
        match k {
            ContainerKind::Tube => ResourceKind::Tube,
            ContainerKind::SpinColumn => ResourceKind::SpinColumn,
        }
    }
}

/// Estado de un item dentro de un rol de la orden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Started,
    Done,
    Unused,
}

/// Eventos que hacen avanzar el estado de un item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemEvent {
    Start,
    Complete,
    Unuse,
}

impl ItemStatus {
    /// Estado resultante de aplicar `event`.
    ///
    /// `start`: pending → started; `complete`: started → done; `unuse`:
    /// cualquier estado salvo `unused` → unused.
    pub fn apply(self, event: ItemEvent) -> Result<ItemStatus> {
        match (self, event) {
            (ItemStatus::Pending, ItemEvent::Start) => Ok(ItemStatus::Started),
            (ItemStatus::Started, ItemEvent::Complete) => Ok(ItemStatus::Done),
            (s, ItemEvent::Unuse) if s != ItemStatus::Unused => Ok(ItemStatus::Unused),
            (s, e) => Err(LimsError::InvalidTransition(format!("item {:?} no admite {:?}", s, e))),
        }
    }
}

/// Estado del ciclo de vida de una orden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Pending,
    InProgress,
    Completed,
}

/// Eventos de nivel orden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    Build,
    Start,
    Complete,
}

impl OrderStatus {
    /// Estado resultante de aplicar `event` a la orden.
    pub fn apply(self, event: OrderEvent) -> Result<OrderStatus> {
        match (self, event) {
            (OrderStatus::Draft, OrderEvent::Build) => Ok(OrderStatus::Pending),
            (OrderStatus::Pending, OrderEvent::Start) => Ok(OrderStatus::InProgress),
            (OrderStatus::InProgress, OrderEvent::Complete) => Ok(OrderStatus::Completed),
            (s, e) => Err(LimsError::InvalidTransition(format!("orden {:?} no admite {:?}", s, e))),
        }
    }
}

/// Etiqueta del tipo de alícuota que recibe el destino de una transferencia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AliquotType {
    #[serde(rename = "DNA")]
    Dna,
    #[serde(rename = "RNA")]
    Rna,
    /// Precursor de RNA que queda en el subproducto de la ruta de DNA.
    #[serde(rename = "RNA+P")]
    RnaPrecursor,
}

impl AliquotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AliquotType::Dna => "DNA",
            AliquotType::Rna => "RNA",
            AliquotType::RnaPrecursor => "RNA+P",
        }
    }
}

impl fmt::Display for AliquotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fracción del contenido de la fuente que se transfiere, en `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Fraction(f64);

impl Fraction {
    pub const HALF: Fraction = Fraction(0.5);
    pub const WHOLE: Fraction = Fraction(1.0);

    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(LimsError::Rejected(format!("fracción fuera de (0, 1]: {}", value)))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Fraction {
    type Error = LimsError;

    fn try_from(value: f64) -> Result<Self> {
        Fraction::new(value)
    }
}

impl From<Fraction> for f64 {
    fn from(f: Fraction) -> f64 {
        f.0
    }
}

/// Entrada de la orden: un item bajo un rol, con su estado y lote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(rename = "uuid")]
    pub item: ItemId,
    pub status: ItemStatus,
    #[serde(rename = "batch_uuid", default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchId>,
}

impl OrderItem {
    pub fn new(item: ItemId) -> Self {
        Self { item, status: ItemStatus::Pending, batch: None }
    }
}

/// Agregado orden: posee el mapeo item → rol y el estado del ciclo de vida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "uuid")]
    pub id: OrderId,
    pub status: OrderStatus,
    pub items: IndexMap<Role, Vec<OrderItem>>,
}

impl Order {
    /// Entradas bajo `role`, en orden de inserción. Vacío si el rol no existe.
    pub fn items_under(&self, role: Role) -> &[OrderItem] {
        self.items.get(&role).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Verdadero si `item` figura bajo `role`.
    pub fn holds(&self, role: Role, item: &ItemId) -> bool {
        self.items_under(role).iter().any(|e| &e.item == item)
    }
}

/// Contenedor físico tal y como lo devuelve una búsqueda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(rename = "uuid")]
    pub id: ItemId,
    pub kind: ContainerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

/// Entidad devuelta al resolver una búsqueda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Item(ItemRecord),
    Order(Order),
}

/// Criterios de búsqueda soportados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchCriteria {
    /// Tubos cuya etiqueta en `position` (de tipo `barcode_type`) coincide con
    /// alguno de `values`.
    ItemsByBarcode { position: String, barcode_type: String, values: Vec<String> },
    /// Órdenes que contienen `item` bajo `role`.
    OrderByItem { item: ItemId, role: Role },
}

impl SearchCriteria {
    /// Modelo sobre el que opera la búsqueda (`tube` u `order`).
    pub fn model(&self) -> &'static str {
        match self {
            SearchCriteria::ItemsByBarcode { .. } => "tube",
            SearchCriteria::OrderByItem { .. } => "order",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SearchCriteria::ItemsByBarcode { .. } => "search for barcoded tube",
            SearchCriteria::OrderByItem { .. } => "search for order",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_status_transitions() {
        assert_eq!(ItemStatus::Pending.apply(ItemEvent::Start).unwrap(), ItemStatus::Started);
        assert_eq!(ItemStatus::Started.apply(ItemEvent::Complete).unwrap(), ItemStatus::Done);
        assert_eq!(ItemStatus::Done.apply(ItemEvent::Unuse).unwrap(), ItemStatus::Unused);
        assert_eq!(ItemStatus::Pending.apply(ItemEvent::Unuse).unwrap(), ItemStatus::Unused);
        assert!(ItemStatus::Pending.apply(ItemEvent::Complete).is_err());
        assert!(ItemStatus::Unused.apply(ItemEvent::Unuse).is_err());
    }

    #[test]
    fn order_lifecycle() {
        let s = OrderStatus::Draft.apply(OrderEvent::Build).unwrap();
        let s = s.apply(OrderEvent::Start).unwrap();
        assert_eq!(s.apply(OrderEvent::Complete).unwrap(), OrderStatus::Completed);
        assert!(OrderStatus::Draft.apply(OrderEvent::Complete).is_err());
    }

    #[test]
    fn fraction_bounds() {
        assert!(Fraction::new(0.0).is_err());
        assert!(Fraction::new(1.5).is_err());
        assert!(Fraction::new(f64::NAN).is_err());
        assert_eq!(Fraction::new(1.0).unwrap(), Fraction::WHOLE);
        let parsed: std::result::Result<Fraction, _> = serde_json::from_str("-0.2");
        assert!(parsed.is_err());
    }

    #[test]
    fn aliquot_and_role_names() {
        assert_eq!(serde_json::to_value(AliquotType::RnaPrecursor).unwrap(), serde_json::json!("RNA+P"));
        assert_eq!(serde_json::to_value(Role::ElutionSpinColumnRna).unwrap(),
                   serde_json::json!(Role::ElutionSpinColumnRna.as_str()));
    }
}

// Archivo: client.rs
// Propósito: definir el trait `LimsClient`, el contrato mínimo que el
// orquestador consume del servicio de gestión de muestras. Las
// implementaciones (HTTP, en memoria, etc.) viven fuera del núcleo.
use crate::domain::{Order, OrderId, Resource, ResourceKind, SearchCriteria, SearchId};
use crate::errors::Result;
use crate::patch::{OrderPatch, TransferRequest};
use uuid::Uuid;

/// Contrato del servicio de gestión de muestras.
///
/// Todas las llamadas son síncronas (petición/respuesta). La política de
/// timeouts y cancelación es responsabilidad de cada implementación; el
/// orquestador no reintenta ni compensa fallos.
pub trait LimsClient: Send + Sync {
    /// Registra una búsqueda y devuelve la referencia a su resultado.
    fn search(&self, criteria: &SearchCriteria) -> Result<SearchId>;

    /// Resuelve una búsqueda previa: entidades coincidentes, en orden.
    fn resolve(&self, search: &SearchId) -> Result<Vec<Resource>>;

    /// Crea un lote, tubo o columna y devuelve el identificador asignado.
    fn create(&self, kind: ResourceKind) -> Result<Uuid>;

    /// Aplica un parche (asignación de roles o evento) a la orden y devuelve
    /// la orden resultante.
    fn update(&self, order: &OrderId, patch: &OrderPatch) -> Result<Order>;

    /// Envía un lote de transferencias. Se consumen una sola vez.
    fn transfer(&self, transfers: &[TransferRequest]) -> Result<()>;
}

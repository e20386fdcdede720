use crate::errors::WorkflowError;
use crate::registry::IdentityRegistry;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use lims::{AliquotType, BatchId, ItemId, OrderId};
use serde::{Deserialize, Serialize};

/// Resumen de lo que hizo una etapa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
  /// Posición de la etapa en la secuencia (desde 1).
  pub index: usize,
  pub name: String,
  /// Contenedores creados durante la etapa (sin contar lotes).
  pub created: usize,
  /// Llamadas `update` emitidas.
  pub updates: usize,
  /// Transferencias enviadas (suma de todas las llamadas `transfer`).
  pub transfers: usize,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

/// Estado de una ejecución del protocolo.
///
/// Se crea al iniciar `run` y se descarta al terminar (con éxito o no). Cada
/// ejecución tiene su propio contexto, así que ejecuciones sucesivas no
/// comparten estado.
#[derive(Debug)]
pub struct RunContext {
  /// Códigos de barras de partida, en el orden recibido.
  pub barcodes: Vec<String>,
  /// Número de contenedores de partida; fija la cardinalidad de todas las
  /// etapas.
  pub initial_count: usize,
  /// Tubos localizados a partir de los códigos.
  pub source_items: Vec<ItemId>,
  pub order_id: Option<OrderId>,
  pub batch_id: Option<BatchId>,
  pub registry: IdentityRegistry,
  /// Tubos de salida por tipo de extracción.
  pub outputs: IndexMap<AliquotType, Vec<ItemId>>,
  pub journal: Vec<StageRecord>,
}

impl RunContext {
  pub fn new(barcodes: &[String]) -> Self {
    Self { barcodes: barcodes.to_vec(),
           initial_count: barcodes.len(),
           source_items: Vec::new(),
           order_id: None,
           batch_id: None,
           registry: IdentityRegistry::new(),
           outputs: IndexMap::new(),
           journal: Vec::new() }
  }

  /// Orden localizada en la primera etapa.
  pub fn order(&self) -> Result<OrderId, WorkflowError> {
    self.order_id.ok_or_else(|| WorkflowError::Validation("la orden todavía no se ha localizado".into()))
  }

  /// Lote creado en la primera etapa.
  pub fn batch(&self) -> Result<BatchId, WorkflowError> {
    self.batch_id.ok_or_else(|| WorkflowError::Validation("el lote todavía no se ha creado".into()))
  }
}

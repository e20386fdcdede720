use crate::errors::WorkflowError;
use serde::{Deserialize, Serialize};

/// Configuracion del motor de extracción.
///
/// Sólo afecta a cómo se localizan los tubos de partida; fracciones, roles y
/// secuencia de etapas son fijos del protocolo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
  /// Posición de la etiqueta que contiene el código de barras.
  pub barcode_position: String,
  /// Tipo de código de barras a buscar.
  pub barcode_type: String,
}

impl Default for WorkflowConfig {
  fn default() -> Self {
    WorkflowConfig { barcode_position: "barcode".to_string(), barcode_type: "sanger-barcode".to_string() }
  }
}

impl WorkflowConfig {
  /// Carga la configuracion desde el entorno (y `.env` si existe).
  ///
  /// - `EXTRACTION_BARCODE_POSITION` (por defecto `barcode`)
  /// - `EXTRACTION_BARCODE_TYPE` (por defecto `sanger-barcode`)
  pub fn from_env() -> Result<Self, WorkflowError> {
    dotenvy::dotenv().ok();
    let defaults = WorkflowConfig::default();
    let cfg = WorkflowConfig { barcode_position: std::env::var("EXTRACTION_BARCODE_POSITION").unwrap_or(defaults.barcode_position),
                               barcode_type: std::env::var("EXTRACTION_BARCODE_TYPE").unwrap_or(defaults.barcode_type) };
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> Result<(), WorkflowError> {
    if self.barcode_position.trim().is_empty() {
      return Err(WorkflowError::Configuration("EXTRACTION_BARCODE_POSITION no puede estar vacío".into()));
    }
    if self.barcode_type.trim().is_empty() {
      return Err(WorkflowError::Configuration("EXTRACTION_BARCODE_TYPE no puede estar vacío".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_sanger_labels() {
    let cfg = WorkflowConfig::default();
    assert_eq!(cfg.barcode_position, "barcode");
    assert_eq!(cfg.barcode_type, "sanger-barcode");
    assert!(cfg.validate().is_ok());
  }

  #[test]
  fn blank_values_are_rejected() {
    let cfg = WorkflowConfig { barcode_position: " ".into(), ..WorkflowConfig::default() };
    assert!(matches!(cfg.validate(), Err(WorkflowError::Configuration(_))));
  }
}

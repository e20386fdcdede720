use crate::registry::RegistryError;
use crate::transfer::PairingError;
use lims::{ItemId, Role};
use thiserror::Error;

// Errores del motor de extracción.
//
// Ningún error se recupera localmente: cualquiera detiene la ejecución. Sólo
// `PreconditionViolation` garantiza que no se hizo ninguna mutación.
#[derive(Error, Debug)]
pub enum WorkflowError {
  /// Algún item bajo el rol inicial ya tiene lote asignado. Se detecta antes
  /// de mutar nada.
  #[error("Precondición violada: {} item(s) bajo {role} ya tienen lote", items.len())]
  PreconditionViolation { role: Role, items: Vec<ItemId> },

  /// Fallo reportado por el servicio externo, sin modificar.
  #[error("Error del servicio: {0}")]
  Collaborator(#[from] lims::LimsError),

  /// Fuentes y destinos con distinta longitud al planificar transferencias.
  #[error("Error de emparejamiento: {0}")]
  Pairing(#[from] PairingError),

  /// Inconsistencia en el registro local de identidades.
  #[error("Error de registro: {0}")]
  Registry(#[from] RegistryError),

  /// Entrada o respuesta inválida (sin códigos, orden inexistente, etc.).
  #[error("Error de validacion: {0}")]
  Validation(String),

  /// Configuración inválida.
  #[error("Error de configuracion: {0}")]
  Configuration(String),
}

impl WorkflowError {
  /// Verdadero si la ejecución se abortó limpiamente por la precondición
  /// de lote.
  pub fn is_precondition(&self) -> bool {
    matches!(self, WorkflowError::PreconditionViolation { .. })
  }

  /// Verdadero si el fallo vino del servicio externo.
  pub fn is_collaborator(&self) -> bool {
    matches!(self, WorkflowError::Collaborator(_))
  }
}

// Archivo: errors.rs
// Propósito: definir los errores que devuelve el servicio de gestión de
// muestras y el alias Result<T> usado por las APIs del crate.
use thiserror::Error;

/// Errores reportados por el colaborador externo (LIMS).
///
/// - `NotFound`: recurso (item, orden, búsqueda) inexistente.
/// - `InvalidTransition`: evento de estado no permitido.
/// - `Rejected`: petición mal formada o rechazada por el servicio.
/// - `Storage`: error al acceder al almacenamiento del servicio.
/// - `Injected`: fallo provocado en pruebas (ver `InMemoryLimsClient::fail_on`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LimsError {
    /// Recurso no encontrado (item, orden, búsqueda).
    #[error("No encontrado: {0}")]
    NotFound(String),
    /// Transición de estado inválida para un item o una orden.
    #[error("Transición inválida: {0}")]
    InvalidTransition(String),
    /// El servicio rechazó la petición.
    #[error("Petición rechazada: {0}")]
    Rejected(String),
    /// Error genérico de almacenamiento.
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
    /// Fallo inyectado.
    #[error("Fallo inyectado en {0}")]
    Injected(String),
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, LimsError>;

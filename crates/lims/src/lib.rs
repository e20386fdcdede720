//! Crate `lims`: contrato con el servicio externo de gestión de muestras
//!
//! Este crate define los tipos de dominio (`Order`, `Role`, `ItemStatus`,
//! identificadores), los tipos explícitos de petición (`ItemsPatch`,
//! `OrderPatch`, `TransferRequest`), el contrato `LimsClient` que consume el
//! orquestador y una implementación en memoria útil para pruebas
//! (`InMemoryLimsClient`).
//!
//! Diseño resumido:
//! - Llamadas síncronas petición/respuesta; cualquier fallo se devuelve como
//!   `LimsError` y el llamador decide (el orquestador nunca reintenta).
//! - Los identificadores los asigna el servicio y nunca se reutilizan.
//! - Los parches conservan el orden de inserción (`IndexMap`) para que el
//!   emparejamiento posicional sea reproducible.
//!
//! Ejemplo rápido:
//! ```rust
//! use lims::stubs::InMemoryLimsClient;
//! let client = InMemoryLimsClient::new();
//! let (order, tubes) = client.seed_extraction_order(&["BC-1", "BC-2"]).unwrap();
//! assert_eq!(tubes.len(), 2);
//! assert!(client.order(&order).is_ok());
//! ```
pub mod client;
pub mod domain;
pub mod errors;
pub mod patch;
pub mod stubs;

pub use client::*;
pub use domain::*;
pub use errors::*;
pub use patch::*;
pub use stubs::*;

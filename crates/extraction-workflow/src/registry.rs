use lims::{BatchId, ContainerKind, ItemId, ItemStatus, Role};
use std::collections::HashMap;
use thiserror::Error;

/// Errores de contabilidad local del registro.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
  #[error("el item {0} ya estaba registrado")]
  AlreadyRegistered(ItemId),
  #[error("item desconocido: {0}")]
  Unknown(ItemId),
}

/// Estado local de un contenedor durante la ejecución.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedItem {
  pub id: ItemId,
  pub kind: ContainerKind,
  pub role: Role,
  pub status: ItemStatus,
  pub batch: Option<BatchId>,
  /// Roles anteriores, del más antiguo al más reciente.
  pub previous_roles: Vec<Role>,
}

/// Caché local del mapeo item → rol de la orden.
///
/// Permite razonar sobre identificadores entre etapas sin volver a consultar
/// el servicio. Las secuencias se devuelven en orden de registro: cuando una
/// generación nueva replica a otra (una columna de elución por columna de
/// unión) el emparejamiento posicional depende de ese orden.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
  items: HashMap<ItemId, TrackedItem>,
  /// Ids bajo cada rol, en orden de llegada al rol.
  by_role: HashMap<Role, Vec<ItemId>>,
}

impl IdentityRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registra contenedores nuevos (o recién localizados) bajo `role`.
  ///
  /// Falla sin registrar nada si alguno de los ids ya se conocía.
  pub fn register(&mut self,
                  items: &[ItemId],
                  kind: ContainerKind,
                  role: Role,
                  status: ItemStatus,
                  batch: Option<BatchId>)
                  -> Result<(), RegistryError> {
    if let Some(dup) = items.iter().find(|id| self.items.contains_key(*id)) {
      return Err(RegistryError::AlreadyRegistered(*dup));
    }
    for (i, id) in items.iter().enumerate() {
      if items[..i].contains(id) {
        return Err(RegistryError::AlreadyRegistered(*id));
      }
    }
    for id in items {
      self.items.insert(*id,
                        TrackedItem { id: *id, kind, role, status, batch, previous_roles: Vec::new() });
    }
    self.by_role.entry(role).or_default().extend_from_slice(items);
    Ok(())
  }

  /// Reinterpreta items existentes bajo `new_role`. Mismo identificador,
  /// mismo orden; el rol anterior queda en `previous_roles`.
  pub fn relabel(&mut self, items: &[ItemId], new_role: Role) -> Result<(), RegistryError> {
    self.ensure_known(items)?;
    for id in items {
      if let Some(tracked) = self.items.get_mut(id) {
        let old = tracked.role;
        if let Some(list) = self.by_role.get_mut(&old) {
          list.retain(|x| x != id);
        }
        tracked.previous_roles.push(old);
        tracked.role = new_role;
      }
    }
    self.by_role.entry(new_role).or_default().extend_from_slice(items);
    Ok(())
  }

  pub fn set_status(&mut self, items: &[ItemId], status: ItemStatus) -> Result<(), RegistryError> {
    self.ensure_known(items)?;
    for id in items {
      if let Some(tracked) = self.items.get_mut(id) {
        tracked.status = status;
      }
    }
    Ok(())
  }

  pub fn set_batch(&mut self, items: &[ItemId], batch: BatchId) -> Result<(), RegistryError> {
    self.ensure_known(items)?;
    for id in items {
      if let Some(tracked) = self.items.get_mut(id) {
        tracked.batch = Some(batch);
      }
    }
    Ok(())
  }

  /// Items vigentes bajo `role` (excluye los retirados con `unused`), en
  /// orden de registro.
  pub fn lookup_by_role(&self, role: Role) -> Vec<ItemId> {
    self.by_role
        .get(&role)
        .map(|ids| {
          ids.iter()
             .filter(|id| self.items.get(*id).is_some_and(|t| t.status != ItemStatus::Unused))
             .copied()
             .collect()
        })
        .unwrap_or_default()
  }

  /// Todos los items que han estado bajo `role` como rol actual, incluidos
  /// los retirados.
  pub fn all_by_role(&self, role: Role) -> Vec<ItemId> {
    self.by_role.get(&role).cloned().unwrap_or_default()
  }

  pub fn get(&self, id: &ItemId) -> Option<&TrackedItem> {
    self.items.get(id)
  }

  pub fn batch_of(&self, id: &ItemId) -> Option<BatchId> {
    self.items.get(id).and_then(|t| t.batch)
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  fn ensure_known(&self, items: &[ItemId]) -> Result<(), RegistryError> {
    match items.iter().find(|id| !self.items.contains_key(*id)) {
      Some(id) => Err(RegistryError::Unknown(*id)),
      None => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ids(n: usize) -> Vec<ItemId> {
    (0..n).map(|_| ItemId::generate()).collect()
  }

  #[test]
  fn lookup_keeps_registration_order() {
    let mut reg = IdentityRegistry::new();
    let cols = ids(5);
    reg.register(&cols, ContainerKind::SpinColumn, Role::BindingSpinColumnDna, ItemStatus::Started, None).unwrap();
    assert_eq!(reg.lookup_by_role(Role::BindingSpinColumnDna), cols);
  }

  #[test]
  fn relabel_preserves_identity_and_order() {
    let mut reg = IdentityRegistry::new();
    let cols = ids(3);
    reg.register(&cols, ContainerKind::SpinColumn, Role::BindingSpinColumnRna, ItemStatus::Done, None).unwrap();
    reg.relabel(&cols, Role::ElutionSpinColumnRna).unwrap();
    assert_eq!(reg.lookup_by_role(Role::ElutionSpinColumnRna), cols);
    assert!(reg.lookup_by_role(Role::BindingSpinColumnRna).is_empty());
    assert_eq!(reg.get(&cols[1]).unwrap().previous_roles, vec![Role::BindingSpinColumnRna]);
    assert_eq!(reg.len(), 3);
  }

  #[test]
  fn retired_generation_drops_out_of_lookup() {
    let mut reg = IdentityRegistry::new();
    let (old, new) = (ids(2), ids(2));
    reg.register(&old, ContainerKind::Tube, Role::ByProductTube, ItemStatus::Done, None).unwrap();
    reg.set_status(&old, ItemStatus::Unused).unwrap();
    reg.register(&new, ContainerKind::Tube, Role::ByProductTube, ItemStatus::Started, None).unwrap();
    assert_eq!(reg.lookup_by_role(Role::ByProductTube), new);
    assert_eq!(reg.all_by_role(Role::ByProductTube).len(), 4);
  }

  #[test]
  fn identifiers_are_never_reused() {
    let mut reg = IdentityRegistry::new();
    let a = ids(1);
    reg.register(&a, ContainerKind::Tube, Role::TubeToBeExtracted, ItemStatus::Pending, None).unwrap();
    let err = reg.register(&a, ContainerKind::Tube, Role::ExtractedTube, ItemStatus::Pending, None).unwrap_err();
    assert_eq!(err, RegistryError::AlreadyRegistered(a[0]));
    assert!(matches!(reg.relabel(&ids(1), Role::ExtractedTube), Err(RegistryError::Unknown(_))));
  }
}

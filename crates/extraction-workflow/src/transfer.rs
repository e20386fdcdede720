use lims::{AliquotType, Fraction, ItemId, TransferRequest};
use indexmap::IndexMap;
use thiserror::Error;

/// Tolerancia al comparar sumas de fracciones.
const FRACTION_TOLERANCE: f64 = 1e-9;

/// Longitudes distintas entre fuentes y destinos.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{sources} fuente(s) para {targets} destino(s)")]
pub struct PairingError {
  pub sources: usize,
  pub targets: usize,
}

/// Empareja `sources[i]` con `targets[i]`, todas con la misma fracción y
/// etiqueta.
///
/// Las dos secuencias se generan por separado y sólo se correlacionan por
/// orden de creación, así que el emparejamiento es estrictamente posicional.
/// No comprueba que las fracciones de varias llamadas sobre la misma fuente
/// sumen 1 (ver `TransferSet::ensure_conserved`).
pub fn plan(sources: &[ItemId],
            targets: &[ItemId],
            fraction: Fraction,
            aliquot_type: Option<AliquotType>)
            -> Result<Vec<TransferRequest>, PairingError> {
  if sources.len() != targets.len() {
    return Err(PairingError { sources: sources.len(), targets: targets.len() });
  }
  Ok(sources.iter()
            .zip(targets)
            .map(|(source, target)| TransferRequest { source: *source, target: *target, fraction, aliquot_type })
            .collect())
}

/// Conjunto de transferencias que se envía en una sola llamada.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferSet {
  transfers: Vec<TransferRequest>,
}

impl TransferSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Planifica y acumula un tramo posicional.
  pub fn push_plan(&mut self,
                   sources: &[ItemId],
                   targets: &[ItemId],
                   fraction: Fraction,
                   aliquot_type: Option<AliquotType>)
                   -> Result<&mut Self, PairingError> {
    self.transfers.extend(plan(sources, targets, fraction, aliquot_type)?);
    Ok(self)
  }

  pub fn transfers(&self) -> &[TransferRequest] {
    &self.transfers
  }

  pub fn len(&self) -> usize {
    self.transfers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.transfers.is_empty()
  }

  /// Suma de fracciones por fuente, en orden de primera aparición.
  pub fn fraction_by_source(&self) -> IndexMap<ItemId, f64> {
    let mut out: IndexMap<ItemId, f64> = IndexMap::new();
    for t in &self.transfers {
      *out.entry(t.source).or_insert(0.0) += t.fraction.value();
    }
    out
  }

  /// Devuelve la primera fuente cuya suma no es exactamente 1, si la hay.
  pub fn ensure_conserved(&self) -> Result<(), (ItemId, f64)> {
    match self.fraction_by_source()
              .into_iter()
              .find(|(_, total)| (total - 1.0).abs() > FRACTION_TOLERANCE)
    {
      Some(bad) => Err(bad),
      None => Ok(()),
    }
  }

  pub fn into_inner(self) -> Vec<TransferRequest> {
    self.transfers
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ids(n: usize) -> Vec<ItemId> {
    (0..n).map(|_| ItemId::generate()).collect()
  }

  #[test]
  fn mismatched_lengths_fail() {
    let err = plan(&ids(3), &ids(2), Fraction::WHOLE, None).unwrap_err();
    assert_eq!(err, PairingError { sources: 3, targets: 2 });
    assert!(plan(&[], &ids(1), Fraction::HALF, None).is_err());
  }

  #[test]
  fn pairing_is_positional() {
    let (s, t) = (ids(4), ids(4));
    let planned = plan(&s, &t, Fraction::HALF, Some(AliquotType::Dna)).unwrap();
    assert_eq!(planned.len(), 4);
    for (i, tr) in planned.iter().enumerate() {
      assert_eq!(tr.source, s[i]);
      assert_eq!(tr.target, t[i]);
      assert_eq!(tr.fraction, Fraction::HALF);
      assert_eq!(tr.aliquot_type, Some(AliquotType::Dna));
    }
  }

  #[test]
  fn split_set_is_conserved_only_when_complete() {
    let (s, a, b) = (ids(2), ids(2), ids(2));
    let mut set = TransferSet::new();
    set.push_plan(&s, &a, Fraction::HALF, Some(AliquotType::Dna)).unwrap();
    let (src, total) = set.ensure_conserved().unwrap_err();
    assert_eq!(src, s[0]);
    assert!((total - 0.5).abs() < 1e-12);
    set.push_plan(&s, &b, Fraction::HALF, Some(AliquotType::RnaPrecursor)).unwrap();
    assert!(set.ensure_conserved().is_ok());
    assert_eq!(set.len(), 4);
  }
}

// dna_rna/mod.rs
//
// Protocolo de co-extracción manual DNA + RNA. La secuencia es fija: las
// rutas DNA y RNA son la misma fase de extracción (división + elución)
// instanciada con roles y etiquetas distintas.
pub mod stages;

use crate::config::WorkflowConfig;
use crate::step::ProtocolStage;
pub use stages::{ExtractionPath, DNA_PATH, RNA_PATH};
use stages::{BuildAndStartOrder, EluteStage, FinalizeOrder, LocateAndGate, RegenerateSources, SplitStage};

/// Las ocho etapas del protocolo, en orden de ejecución.
pub fn protocol(config: &WorkflowConfig) -> Vec<Box<dyn ProtocolStage>> {
  let mut stages: Vec<Box<dyn ProtocolStage>> =
    vec![Box::new(LocateAndGate::new(config.clone())), Box::new(BuildAndStartOrder)];
  stages.extend(extraction_phase(DNA_PATH));
  stages.push(Box::new(RegenerateSources));
  stages.extend(extraction_phase(RNA_PATH));
  stages.push(Box::new(FinalizeOrder));
  stages
}

/// División + elución para una ruta.
fn extraction_phase(path: ExtractionPath) -> [Box<dyn ProtocolStage>; 2] {
  [Box::new(SplitStage::new(path)), Box::new(EluteStage::new(path))]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn protocol_has_eight_stages_in_order() {
    let names: Vec<String> = protocol(&WorkflowConfig::default()).iter().map(|s| s.name().to_string()).collect();
    assert_eq!(names,
               vec!["locate_and_gate",
                    "build_and_start_order",
                    "split_dna",
                    "elute_dna",
                    "regenerate_sources",
                    "split_rna",
                    "elute_rna",
                    "finalize_order"]);
  }
}

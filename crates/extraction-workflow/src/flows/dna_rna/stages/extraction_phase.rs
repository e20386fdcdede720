use crate::errors::WorkflowError;
use crate::step::executor::{NewItems, StatusChange};
use crate::step::{ProtocolStage, RunContext, StageExecutor};
use crate::transfer::TransferSet;
use lims::{AliquotType, ContainerKind, Fraction, ItemEvent, ItemId, Role};

/// Parámetros de una ruta de extracción. DNA y RNA comparten la fase y sólo
/// cambian roles y etiquetas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionPath {
  pub name: &'static str,
  pub binding_role: Role,
  pub elution_role: Role,
  /// Etiqueta de lo que va a la columna (y del producto final).
  pub binding_tag: AliquotType,
  /// Etiqueta de la mitad que va al subproducto. `None` en la ruta RNA.
  pub by_product_tag: Option<AliquotType>,
}

pub const DNA_PATH: ExtractionPath = ExtractionPath { name: "dna",
                                                      binding_role: Role::BindingSpinColumnDna,
                                                      elution_role: Role::ElutionSpinColumnDna,
                                                      binding_tag: AliquotType::Dna,
                                                      by_product_tag: Some(AliquotType::RnaPrecursor) };

pub const RNA_PATH: ExtractionPath = ExtractionPath { name: "rna",
                                                      binding_role: Role::BindingSpinColumnRna,
                                                      elution_role: Role::ElutionSpinColumnRna,
                                                      binding_tag: AliquotType::Rna,
                                                      by_product_tag: None };

fn expect_generation(exec: &StageExecutor<'_>, role: Role, items: &[ItemId]) -> Result<(), WorkflowError> {
  if items.len() != exec.count() {
    return Err(WorkflowError::Validation(format!("se esperaban {} item(s) activos bajo {} y hay {}",
                                                 exec.count(),
                                                 role,
                                                 items.len())));
  }
  Ok(())
}

/// Reparte cada tubo de partida a partes iguales entre una columna de unión
/// y un tubo de subproducto.
pub struct SplitStage {
  path: ExtractionPath,
  name: String,
  description: String,
}

impl SplitStage {
  pub fn new(path: ExtractionPath) -> Self {
    Self { path,
           name: format!("split_{}", path.name),
           description: format!("Dividir los tubos de partida ({} / subproducto)", path.binding_tag) }
  }
}

impl ProtocolStage for SplitStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    &self.description
  }

  fn validate(&self, ctx: &RunContext) -> Result<(), WorkflowError> {
    ctx.batch().map(|_| ())
  }

  fn execute(&self, exec: &mut StageExecutor<'_>) -> Result<(), WorkflowError> {
    let p = self.path;
    let batch = exec.ctx().batch()?;
    let sources = exec.registry().lookup_by_role(Role::TubeToBeExtracted);
    expect_generation(exec, Role::TubeToBeExtracted, &sources)?;

    let columns = exec.create_items(ContainerKind::SpinColumn)?;
    let by_products = exec.create_items(ContainerKind::Tube)?;
    exec.add_items(&[NewItems { role: p.binding_role, kind: ContainerKind::SpinColumn, items: &columns },
                     NewItems { role: Role::ByProductTube, kind: ContainerKind::Tube, items: &by_products }],
                   Some(ItemEvent::Start),
                   Some(batch))?;

    let mut set = TransferSet::new();
    set.push_plan(&sources, &columns, Fraction::HALF, Some(p.binding_tag))?
       .push_plan(&sources, &by_products, Fraction::HALF, p.by_product_tag)?;
    exec.transfer_conserved(set)?;

    exec.advance(&[StatusChange { role: p.binding_role, items: &columns, event: ItemEvent::Complete },
                   StatusChange { role: Role::ByProductTube, items: &by_products, event: ItemEvent::Complete },
                   StatusChange { role: Role::TubeToBeExtracted, items: &sources, event: ItemEvent::Unuse }])
  }
}

/// Reetiqueta las columnas de unión como columnas de elución y eluye cada
/// una en un tubo de extracción nuevo.
pub struct EluteStage {
  path: ExtractionPath,
  name: String,
  description: String,
}

impl EluteStage {
  pub fn new(path: ExtractionPath) -> Self {
    Self { path,
           name: format!("elute_{}", path.name),
           description: format!("Eluir las columnas {} en tubos de extracción", path.binding_tag) }
  }
}

impl ProtocolStage for EluteStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    &self.description
  }

  fn validate(&self, ctx: &RunContext) -> Result<(), WorkflowError> {
    ctx.batch().map(|_| ())
  }

  fn execute(&self, exec: &mut StageExecutor<'_>) -> Result<(), WorkflowError> {
    let p = self.path;
    let batch = exec.ctx().batch()?;
    let binding = exec.registry().lookup_by_role(p.binding_role);
    expect_generation(exec, p.binding_role, &binding)?;

    exec.relabel(&binding, p.elution_role, Some(ItemEvent::Start), Some(batch))?;
    let elution = exec.registry().lookup_by_role(p.elution_role);
    if elution != binding {
      return Err(WorkflowError::Validation(format!("el reetiquetado {} -> {} no conserva los identificadores",
                                                   p.binding_role,
                                                   p.elution_role)));
    }
    exec.advance(&[StatusChange { role: p.elution_role, items: &elution, event: ItemEvent::Complete },
                   StatusChange { role: p.binding_role, items: &binding, event: ItemEvent::Unuse }])?;

    let outputs = exec.create_items(ContainerKind::Tube)?;
    exec.add_items(&[NewItems { role: Role::ExtractedTube, kind: ContainerKind::Tube, items: &outputs }],
                   Some(ItemEvent::Start),
                   None)?;

    let mut set = TransferSet::new();
    set.push_plan(&elution, &outputs, Fraction::WHOLE, None)?;
    exec.transfer(set)?;

    exec.advance(&[StatusChange { role: Role::ExtractedTube, items: &outputs, event: ItemEvent::Complete },
                   StatusChange { role: p.elution_role, items: &elution, event: ItemEvent::Unuse }])?;

    log::info!("{} tubo(s) {} extraídos", outputs.len(), p.binding_tag);
    exec.ctx_mut().outputs.insert(p.binding_tag, outputs);
    Ok(())
  }
}

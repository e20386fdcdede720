pub mod dna_rna;

pub use dna_rna::{protocol, ExtractionPath, DNA_PATH, RNA_PATH};

use anyhow::{bail, Context};
use extraction_workflow::{WorkflowConfig, WorkflowEngine};
use lims::InMemoryLimsClient;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Demo del protocolo de extracción DNA + RNA sobre el servicio en memoria.
///
/// Los códigos de barras se toman de los argumentos; sin argumentos se piden
/// por consola (separados por espacios o comas). Se crea una orden de
/// extracción con esos tubos, se ejecuta el protocolo y se imprime el
/// resumen en JSON.
///
/// Variables de entorno (también desde `.env`):
/// - `RUST_LOG`: filtro de logs (por defecto `info`)
/// - `EXTRACTION_BARCODE_POSITION`, `EXTRACTION_BARCODE_TYPE`
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                             .init();

    let mut barcodes: Vec<String> = std::env::args().skip(1).collect();
    if barcodes.is_empty() {
        barcodes = split_codes(&prompt("Códigos de barras: ")?);
    }
    if barcodes.is_empty() {
        bail!("no se indicó ningún código de barras");
    }

    let config = WorkflowConfig::from_env().context("configuración inválida")?;
    let client = Arc::new(InMemoryLimsClient::new());
    let codes: Vec<&str> = barcodes.iter().map(|s| s.as_str()).collect();
    let (order, _) = client.seed_extraction_order(&codes).context("no se pudo preparar la orden de demo")?;
    log::info!("orden de demo {} con {} tubo(s)", order, codes.len());

    let engine = WorkflowEngine::new(client.clone(), config);
    log::info!("búsqueda por etiqueta {} ({})",
               engine.config().barcode_position,
               engine.config().barcode_type);
    let summary = engine.run(&barcodes).context("la extracción falló")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

fn split_codes(line: &str) -> Vec<String> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::warn;

use metahunter::metadata::renderer::{
    render_batch_summary, render_metadata, render_progress,
};
use metahunter::{
    ExportArtifact, ExportError, ExportFormat, ExtractOptions, Extraction, FileHandle,
    FormatOptions, export_batch, export_result, parse_export_format, process_files,
};

/// Extrae y normaliza la metadata de imágenes, PDFs, documentos Office, audio y video.
#[derive(Parser, Debug)]
#[command(name = "metahunter", version, about)]
struct Cli {
    /// Archivos a analizar
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Formato de exportación (json, csv, txt); se puede repetir
    #[arg(long = "export", value_parser = parse_export_format)]
    exports: Vec<ExportFormat>,

    /// Directorio donde se guardan las exportaciones
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Segundos máximos por archivo; 0 desactiva el límite
    #[arg(long, default_value_t = metahunter::metadata::dispatch::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Usa coma como separador decimal
    #[arg(long)]
    decimal_comma: bool,

    /// No muestra la metadata en la terminal
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            format: FormatOptions {
                decimal_separator: if self.decimal_comma { ',' } else { '.' },
            },
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let options = cli.extract_options();

    let files: Vec<FileHandle> = cli
        .files
        .iter()
        .filter_map(|path| match FileHandle::from_path(path) {
            Ok(handle) => Some(handle),
            Err(error) => {
                eprintln!(
                    "{} {}: {error}",
                    style("✗").red().bold(),
                    path.display()
                );
                None
            }
        })
        .collect();

    if files.is_empty() {
        eprintln!("{}", style("No se pudo abrir ningún archivo.").red());
        return ExitCode::FAILURE;
    }

    if !cli.quiet {
        render_header();
    }

    let quiet = cli.quiet;
    let extraction = process_files(&files, &options, |progress| {
        if !quiet {
            eprintln!("{}", render_progress(&progress));
        }
    });

    let artifacts: Result<Vec<ExportArtifact>, ExportError> = match &extraction {
        Extraction::Single(result) => {
            if !cli.quiet {
                render_metadata(result);
            }
            cli.exports
                .iter()
                .map(|format| export_result(result, &result.file_info.name, *format))
                .collect()
        }
        Extraction::Batch(entries) => {
            if !cli.quiet {
                for entry in entries {
                    render_metadata(&entry.result);
                }
                println!("\n{}", render_batch_summary(entries));
            }
            cli.exports
                .iter()
                .map(|format| export_batch(entries, *format))
                .collect()
        }
    };

    match artifacts.and_then(|artifacts| save_artifacts(&artifacts, &cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            warn!(%error, "exportación fallida");
            eprintln!("{} {error}", style("✗").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn save_artifacts(artifacts: &[ExportArtifact], cli: &Cli) -> Result<(), ExportError> {
    for artifact in artifacts {
        let path = artifact.write_to(&cli.output_dir)?;
        if !cli.quiet {
            println!(
                "{} {}",
                style("✓ Exportado:").green().bold(),
                path.display()
            );
        }
    }
    Ok(())
}

fn render_header() {
    let width = 66;
    let border = "═".repeat(width - 2);
    println!("{}", style(format!("╔{}╗", border)).cyan().bold());
    println!(
        "{}",
        style(format!(
            "║ {:^inner_width$} ║",
            "MetaHunter | Extractor de metadata",
            inner_width = width - 4
        ))
        .cyan()
        .bold()
    );
    println!("{}", style(format!("╚{}╝", border)).cyan().bold());
}

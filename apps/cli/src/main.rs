use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use printstation_printing::{
    render_preview, run_batch, FileStatus, PaperId, PdfiumBackend, PdfiumRasterizer,
    PlatformAdapter, PrintConfig, SpoolerAdapter,
};
use printstation_settings::{
    LocalizationManager, LocalizationParams, StationConfig, LOCALE_DIR_VAR, LOCALE_VAR,
    PDFIUM_DIR_VAR,
};

#[derive(Parser)]
#[command(
    name = "printstation-cli",
    about = "Queue PDF and image files for a local printer",
    author,
    version
)]
struct Cli {
    /// 介面語系代碼。 / UI locale code (e.g. en-US, ru-RU).
    #[arg(long = "lang", global = true, value_name = "CODE", env = LOCALE_VAR)]
    locale: Option<String>,

    /// 額外語系包目錄。 / Directory with extra locale packs.
    #[arg(long, global = true, value_name = "DIR", env = LOCALE_DIR_VAR)]
    locale_dir: Option<PathBuf>,

    /// pdfium 函式庫目錄。 / Directory holding the pdfium library.
    #[arg(long, global = true, value_name = "DIR", env = PDFIUM_DIR_VAR)]
    pdfium_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出已安裝的印表機。 / List installed printers; the default is marked with '*'.
    Printers,
    /// 依序列印檔案。 / Print files one after another.
    Print(PrintArgs),
    /// 將預覽影像寫入 PNG。 / Write the preview bitmap of a file to a PNG.
    Preview(PreviewArgs),
    /// 列出可用語系。 / List available UI locales.
    Locales,
}

#[derive(Args)]
struct PrintArgs {
    /// 要列印的檔案（PDF、JPG、PNG、BMP）。 / Files to print (PDF, JPG, PNG, BMP).
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// 目標印表機；預設使用系統預設值。 / Target printer; the system default when omitted.
    #[arg(long, short = 'p')]
    printer: Option<String>,

    /// 份數。 / Copy count.
    #[arg(long, short = 'n', default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    copies: u32,

    /// 紙張大小。 / Media size (A4, Letter, A3, 10x15).
    #[arg(long, default_value = "A4", value_parser = parse_paper)]
    paper: PaperId,

    /// 不縮放 PDF 頁面以符合紙張。 / Do not shrink PDF pages to the printable area.
    #[arg(long)]
    no_fit: bool,
}

#[derive(Args)]
struct PreviewArgs {
    /// 要預覽的檔案。 / File to preview.
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// 輸出的 PNG 路徑。 / Output PNG path.
    #[arg(long, short = 'o', value_name = "PNG")]
    output: PathBuf,
}

fn parse_paper(value: &str) -> Result<PaperId, String> {
    value.parse().map_err(|err: printstation_printing::ConfigError| err.to_string())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let env_config = StationConfig::from_env();
    let config = StationConfig {
        locale: cli.locale.unwrap_or(env_config.locale),
        locale_dir: cli.locale_dir.or(env_config.locale_dir),
        pdfium_dir: cli.pdfium_dir.or(env_config.pdfium_dir),
    };
    let localization = load_localization(&config)?;
    let rasterizer = PdfiumRasterizer::new(PdfiumBackend::new(config.pdfium_dir.clone()));

    match cli.command {
        Commands::Printers => list_printers(&SpoolerAdapter::new()),
        Commands::Print(args) => {
            execute_print(args, &SpoolerAdapter::new(), &rasterizer, &localization)
        }
        Commands::Preview(args) => execute_preview(args, &rasterizer),
        Commands::Locales => {
            for summary in localization.locale_summaries() {
                let marker = if summary.code == localization.active_code() {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {}\t{}", summary.code, summary.display_name);
            }
            Ok(())
        }
    }
}

fn load_localization(config: &StationConfig) -> Result<LocalizationManager> {
    let mut manager = match &config.locale_dir {
        Some(dir) => LocalizationManager::load_from_dir(dir, &config.locale)
            .with_context(|| format!("failed to load locale packs from {}", dir.display()))?,
        None => LocalizationManager::builtin(),
    };
    if !manager.set_active_by_code(&config.locale) {
        log::warn!(
            "locale '{}' is not available, using {}",
            config.locale,
            manager.fallback_code()
        );
    }
    Ok(manager)
}

fn list_printers<A>(adapter: &A) -> Result<()>
where
    A: PlatformAdapter,
    A::Error: std::error::Error + Send + Sync + 'static,
{
    let printers = adapter
        .enumerate_printers()
        .context("failed to enumerate printers")?;
    for printer in printers {
        let marker = if printer.is_default { "*" } else { " " };
        println!("{marker} {}", printer.name);
    }
    Ok(())
}

fn execute_print<A>(
    args: PrintArgs,
    adapter: &A,
    rasterizer: &PdfiumRasterizer,
    localization: &LocalizationManager,
) -> Result<()>
where
    A: PlatformAdapter,
    A::Error: std::error::Error + Send + Sync + 'static,
{
    let printer = match args.printer {
        Some(name) => name,
        None => default_printer(adapter)?,
    };
    let config = PrintConfig::new(printer, args.copies)?
        .with_paper(args.paper)
        .with_fit_to_page(!args.no_fit);

    let report = run_batch(adapter, rasterizer, &args.files, &config);
    for outcome in &report.outcomes {
        let path = outcome.path.display();
        match &outcome.status {
            FileStatus::Printed { pages } => println!("printed  {path} ({pages} page(s))"),
            FileStatus::Skipped => println!("skipped  {path}"),
            FileStatus::Failed(reason) => println!("failed   {path}: {reason}"),
        }
    }

    println!(
        "{}",
        localization.text_with_params(
            "status.batch_done",
            &LocalizationParams::count_only(report.printed() as u64)
        )
    );
    if report.failed() > 0 {
        println!(
            "{}",
            localization.text_with_params(
                "status.batch_failed",
                &LocalizationParams::count_only(report.failed() as u64)
            )
        );
    }
    Ok(())
}

fn default_printer<A>(adapter: &A) -> Result<String>
where
    A: PlatformAdapter,
    A::Error: std::error::Error + Send + Sync + 'static,
{
    adapter
        .enumerate_printers()
        .context("failed to enumerate printers")?
        .into_iter()
        .find(|printer| printer.is_default)
        .map(|printer| printer.name)
        .ok_or_else(|| anyhow!("no default printer configured; pass --printer"))
}

fn execute_preview(args: PreviewArgs, rasterizer: &PdfiumRasterizer) -> Result<()> {
    if !args.input.exists() {
        bail!("input file '{}' does not exist", args.input.display());
    }
    let bitmap = render_preview(rasterizer, &args.input)
        .with_context(|| format!("failed to preview {}", args.input.display()))?;
    save_png(bitmap.image(), &args.output)?;
    println!(
        "Wrote {}x{} preview to {}",
        bitmap.width(),
        bitmap.height(),
        args.output.display()
    );
    Ok(())
}

fn save_png(image: &image::RgbImage, output: &Path) -> Result<()> {
    image
        .save_with_format(output, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", output.display()))
}

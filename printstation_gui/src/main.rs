use eframe::{egui, App, Frame, NativeOptions};
use egui::{vec2, Align, Color32, Layout, RichText, TextureHandle, TextureOptions};
use printstation_printing::{
    parse_copies, render_preview, BatchHandle, BatchReport, BatchWorker, ConfigError, PaperId,
    PdfiumBackend, PdfiumRasterizer, PlatformAdapter, PrintConfig, PrintQueue, PrinterInfo,
    SpoolerAdapter,
};
use printstation_settings::{LocalizationManager, LocalizationParams, StationConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const PREVIEW_TEXTURE: &str = "print_preview";
const ERROR_COLOR: Color32 = Color32::from_rgb(239, 68, 68);
const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "bmp"];

/// 預覽區狀態。 / What the preview pane currently shows.
enum PreviewState {
    Empty,
    Ready { name: String, texture: TextureHandle },
    Failed { name: String, message: String },
}

/// 狀態列內容，於每次繪製時依目前語系轉為文字。
/// Status bar content; rendered with the active locale on every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusLine {
    Ready,
    Finished { printed: usize, failed: usize },
    Error(String),
}

impl StatusLine {
    fn from_report(report: &BatchReport) -> Self {
        Self::Finished {
            printed: report.printed(),
            failed: report.failed(),
        }
    }

    fn render(&self, localization: &LocalizationManager) -> String {
        match self {
            StatusLine::Ready => localization.text("status.ready").into_owned(),
            StatusLine::Finished { printed, failed } => {
                let mut text = localization
                    .text_with_params(
                        "status.batch_done",
                        &LocalizationParams::count_only(*printed as u64),
                    )
                    .into_owned();
                if *failed > 0 {
                    text.push_str(" | ");
                    text.push_str(&localization.text_with_params(
                        "status.batch_failed",
                        &LocalizationParams::count_only(*failed as u64),
                    ));
                }
                text
            }
            StatusLine::Error(message) => {
                let values = [message.as_str()];
                localization
                    .text_with_params("status.error", &LocalizationParams::new(&values))
                    .into_owned()
            }
        }
    }
}

struct PrintStationApp {
    localization: LocalizationManager,
    selected_locale: usize,
    adapter: Arc<SpoolerAdapter>,
    rasterizer: Arc<PdfiumRasterizer>,
    queue: PrintQueue,
    printers: Vec<PrinterInfo>,
    selected_printer: usize,
    paper: PaperId,
    copies_text: String,
    fit_to_page: bool,
    preview: PreviewState,
    batch: Option<BatchHandle>,
    status: StatusLine,
    title_dirty: bool,
}

impl PrintStationApp {
    fn new(config: StationConfig) -> Self {
        let localization = load_localization(&config);
        let adapter = SpoolerAdapter::new();
        let printers = adapter.enumerate_printers().unwrap_or_else(|err| {
            log::warn!("failed to enumerate printers: {err}");
            Vec::new()
        });
        let selected_printer = printers
            .iter()
            .position(|printer| printer.is_default)
            .unwrap_or(0);

        Self {
            selected_locale: localization.active_index(),
            localization,
            adapter: Arc::new(adapter),
            rasterizer: Arc::new(PdfiumRasterizer::new(PdfiumBackend::new(config.pdfium_dir))),
            queue: PrintQueue::new(),
            printers,
            selected_printer,
            paper: PaperId::default(),
            copies_text: "1".to_string(),
            fit_to_page: true,
            preview: PreviewState::Empty,
            batch: None,
            status: StatusLine::Ready,
            title_dirty: false,
        }
    }

    fn text(&self, key: &str) -> String {
        self.localization.text(key).into_owned()
    }

    fn format_indexed(&self, key: &str, values: &[&str]) -> String {
        self.localization
            .text_with_params(key, &LocalizationParams::new(values))
            .into_owned()
    }

    fn apply_locale_change(&mut self, index: usize) {
        if self.localization.set_active_by_index(index) {
            self.selected_locale = index;
            self.title_dirty = true;
        }
    }

    fn add_files(&mut self, ctx: &egui::Context, paths: impl IntoIterator<Item = PathBuf>) {
        for path in paths {
            log::debug!("queued {}", path.display());
            if self.queue.add(path) {
                self.load_preview(ctx, self.queue.len() - 1);
            }
        }
    }

    fn load_preview(&mut self, ctx: &egui::Context, index: usize) {
        let Some(file) = self.queue.get(index) else {
            return;
        };
        let name = file.display_name();
        self.preview = match render_preview(self.rasterizer.as_ref(), &file.path) {
            Ok(bitmap) => {
                let size = [bitmap.width() as usize, bitmap.height() as usize];
                let image = egui::ColorImage::from_rgb(size, bitmap.image().as_raw());
                let texture = ctx.load_texture(PREVIEW_TEXTURE, image, TextureOptions::LINEAR);
                PreviewState::Ready { name, texture }
            }
            Err(err) => {
                log::warn!("preview of {} failed: {err}", file.path.display());
                PreviewState::Failed {
                    name,
                    message: err.to_string(),
                }
            }
        };
    }

    fn start_batch(&mut self, ctx: &egui::Context) {
        let printer = self.printers.get(self.selected_printer);
        let request =
            prepare_batch(&self.queue, printer, &self.copies_text, self.paper, self.fit_to_page);
        let (files, config) = match request {
            Ok(Some(request)) => request,
            Ok(None) => {
                log::debug!("no active files in the queue, nothing to print");
                return;
            }
            Err(err) => {
                self.status = StatusLine::Error(err.to_string());
                return;
            }
        };
        log::info!(
            "printing {} file(s) on '{}' ({} x {})",
            files.len(),
            config.printer,
            config.copies,
            config.paper
        );
        let repaint = ctx.clone();
        let spawned = BatchWorker::spawn(
            Arc::clone(&self.adapter),
            Arc::clone(&self.rasterizer),
            files,
            config,
            move |_report| repaint.request_repaint(),
        );
        match spawned {
            Ok(handle) => self.batch = Some(handle),
            Err(err) => {
                self.status = StatusLine::Error(format!("failed to start print worker: {err}"))
            }
        }
    }

    fn poll_batch(&mut self, ctx: &egui::Context) {
        let finished = match &self.batch {
            Some(handle) => handle.is_finished(),
            None => return,
        };
        if !finished {
            // the completion callback can fire just before the thread exits
            ctx.request_repaint_after(Duration::from_millis(200));
            return;
        }
        if let Some(handle) = self.batch.take() {
            self.status = match handle.join() {
                Some(report) => StatusLine::from_report(&report),
                None => StatusLine::Error("print worker panicked".to_string()),
            };
        }
    }

    fn accept_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|input| {
            input
                .raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.add_files(ctx, dropped);
        }
    }

    fn show_queue_panel(&mut self, ctx: &egui::Context) {
        let mut preview_request = None;
        let mut remove_request = None;
        let mut add_clicked = false;

        egui::SidePanel::left("queue_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                ui.heading(self.text("queue.title"));
                ui.horizontal(|ui| {
                    ui.label(format!("{}:", self.text("language.label")));
                    let summaries = self.localization.locale_summaries();
                    let mut locale_index = self.selected_locale;
                    let current = summaries
                        .get(locale_index)
                        .map(|summary| summary.display_name.clone())
                        .unwrap_or_default();
                    egui::ComboBox::from_id_source("locale_selector")
                        .width(140.0)
                        .selected_text(current)
                        .show_ui(ui, |ui| {
                            for (idx, summary) in summaries.iter().enumerate() {
                                ui.selectable_value(&mut locale_index, idx, &summary.display_name);
                            }
                        });
                    if locale_index != self.selected_locale {
                        self.apply_locale_change(locale_index);
                    }
                });
                ui.separator();

                let drop_hint = self.text("queue.drop_hint");
                let remove_label = self.text("queue.remove");
                egui::ScrollArea::vertical()
                    .max_height(ui.available_height() - 40.0)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        if self.queue.is_empty() {
                            ui.label(RichText::new(drop_hint).italics().weak());
                        }
                        for (index, file) in self.queue.iter_mut().enumerate() {
                            ui.horizontal(|ui| {
                                ui.checkbox(&mut file.active, "");
                                let name = ui
                                    .selectable_label(false, file.display_name())
                                    .on_hover_text(file.path.display().to_string());
                                if name.clicked() {
                                    preview_request = Some(index);
                                }
                                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                    if ui.small_button(remove_label.as_str()).clicked() {
                                        remove_request = Some(index);
                                    }
                                });
                            });
                        }
                    });

                ui.separator();
                if ui
                    .add_sized(
                        vec2(ui.available_width(), 28.0),
                        egui::Button::new(RichText::new(self.text("queue.add")).strong()),
                    )
                    .clicked()
                {
                    add_clicked = true;
                }
            });

        if let Some(index) = remove_request {
            self.queue.remove(index);
        } else if let Some(index) = preview_request {
            self.load_preview(ctx, index);
        }
        if add_clicked {
            if let Some(paths) = rfd::FileDialog::new()
                .add_filter("PDF / Images", ACCEPTED_EXTENSIONS)
                .pick_files()
            {
                self.add_files(ctx, paths);
            }
        }
    }

    fn show_parameters_panel(&mut self, ctx: &egui::Context) {
        let mut execute = false;

        egui::SidePanel::right("parameters_panel")
            .default_width(240.0)
            .resizable(false)
            .show(ctx, |ui| {
                ui.heading(self.text("params.title"));
                ui.separator();

                ui.label(self.text("params.printer"));
                if self.printers.is_empty() {
                    ui.label(RichText::new(self.text("params.no_printers")).color(ERROR_COLOR));
                } else {
                    let mut selected = self.selected_printer;
                    let current = self
                        .printers
                        .get(selected)
                        .map(|printer| printer.name.clone())
                        .unwrap_or_default();
                    egui::ComboBox::from_id_source("printer_selector")
                        .width(220.0)
                        .selected_text(current)
                        .show_ui(ui, |ui| {
                            for (idx, printer) in self.printers.iter().enumerate() {
                                ui.selectable_value(&mut selected, idx, &printer.name);
                            }
                        });
                    self.selected_printer = selected;
                }
                ui.add_space(8.0);

                ui.label(self.text("params.paper"));
                egui::ComboBox::from_id_source("paper_selector")
                    .width(220.0)
                    .selected_text(self.paper.label())
                    .show_ui(ui, |ui| {
                        for paper in PaperId::ALL {
                            ui.selectable_value(&mut self.paper, paper, paper.label());
                        }
                    });
                ui.add_space(8.0);

                ui.label(self.text("params.copies"));
                ui.add(egui::TextEdit::singleline(&mut self.copies_text).desired_width(80.0));
                ui.add_space(8.0);

                let fit_label = self.text("params.fit");
                ui.checkbox(&mut self.fit_to_page, fit_label);
                ui.add_space(16.0);

                let busy = self.batch.is_some();
                let label = if busy {
                    self.text("print.busy")
                } else {
                    self.text("print.execute")
                };
                let button = egui::Button::new(RichText::new(label).strong())
                    .min_size(vec2(ui.available_width(), 40.0));
                if ui.add_enabled(!busy, button).clicked() {
                    execute = true;
                }
            });

        if execute {
            self.start_batch(ctx);
        }
    }

    fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                    let text = self.status.render(&self.localization);
                    match self.status {
                        StatusLine::Error(_) => ui.label(RichText::new(text).color(ERROR_COLOR)),
                        _ => ui.label(text),
                    };
                });
            });
    }

    fn show_preview_area(&self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let title = match &self.preview {
                PreviewState::Empty => self.text("preview.title"),
                PreviewState::Ready { name, .. } | PreviewState::Failed { name, .. } => {
                    self.format_indexed("preview.title_with_file", &[name.as_str()])
                }
            };
            ui.heading(title);
            ui.separator();
            ui.vertical_centered(|ui| match &self.preview {
                PreviewState::Empty => {
                    ui.label(RichText::new(self.text("preview.empty")).weak());
                }
                PreviewState::Ready { texture, .. } => {
                    ui.image((texture.id(), texture.size_vec2()));
                }
                PreviewState::Failed { message, .. } => {
                    ui.label(
                        RichText::new(self.format_indexed("preview.error", &[message.as_str()]))
                            .color(ERROR_COLOR),
                    );
                }
            });
        });
    }
}

impl App for PrintStationApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        if self.title_dirty {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(self.text("app.title")));
            self.title_dirty = false;
        }
        self.poll_batch(ctx);
        self.accept_dropped_files(ctx);

        self.show_queue_panel(ctx);
        self.show_parameters_panel(ctx);
        self.show_status_bar(ctx);
        self.show_preview_area(ctx);
    }
}

/// Active files and validated settings for the next batch; `Ok(None)` when
/// no queued file is active.
fn prepare_batch(
    queue: &PrintQueue,
    printer: Option<&PrinterInfo>,
    copies: &str,
    paper: PaperId,
    fit_to_page: bool,
) -> Result<Option<(Vec<PathBuf>, PrintConfig)>, ConfigError> {
    let files = queue.active_paths();
    if files.is_empty() {
        return Ok(None);
    }
    let printer = printer.map(|printer| printer.name.clone()).unwrap_or_default();
    let config = PrintConfig::new(printer, parse_copies(copies)?)?
        .with_paper(paper)
        .with_fit_to_page(fit_to_page);
    Ok(Some((files, config)))
}

fn load_localization(config: &StationConfig) -> LocalizationManager {
    let mut localization = match &config.locale_dir {
        Some(dir) => {
            LocalizationManager::load_from_dir(dir, &config.locale).unwrap_or_else(|err| {
                log::warn!("failed to load locale packs from {}: {err}", dir.display());
                LocalizationManager::builtin()
            })
        }
        None => LocalizationManager::builtin(),
    };
    if !localization.set_active_by_code(&config.locale) {
        log::warn!(
            "locale '{}' is not available, using {}",
            config.locale,
            localization.fallback_code()
        );
    }
    localization
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let app = PrintStationApp::new(StationConfig::from_env());
    let title = app.text("app.title");
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(&title, options, Box::new(move |_cc| Box::new(app)))
}

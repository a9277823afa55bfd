// src/gui.rs
use anyhow::Result;
use eframe::egui;
use egui::{Color32, RichText, ScrollArea, Stroke, Ui, Vec2};
use log::{error, info, warn};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

#[cfg(feature = "clipboard")]
use arboard::Clipboard;

use crate::ai::prompts::Feature;
use crate::assist::{Assistant, Outcome};
use crate::error::StartupError;
use crate::session::Session;
use crate::speech::{AudioArtifact, AudioPlayer};
use crate::upload::{UploadedImage, ACCEPTED_EXTENSIONS};

const SIDEBAR_WIDTH: f32 = 260.0;
const DEFAULT_WINDOW_WIDTH: f32 = 980.0;
const DEFAULT_WINDOW_HEIGHT: f32 = 820.0;
const ERROR_COLOR: Color32 = Color32::from_rgb(235, 90, 90);
const ACCENT: Color32 = Color32::from_rgb(42, 90, 170);

const TITLE: &str = "Vision for the Future: AI Solutions Empowering the Visually Impaired 👁🤖💡";

/// Handoff slot between the worker thread and the UI thread
struct ThreadSafeState {
    pending: Option<Outcome>,
}

enum Mode {
    /// Startup failed; only the reason is shown.
    Halted(String),
    Ready(Box<Workspace>),
}

struct Workspace {
    assistant: Arc<Assistant>,
    player: AudioPlayer,
    session: Session,
    state: Arc<Mutex<ThreadSafeState>>,
    texture: Option<egui::TextureHandle>,
    notice: Option<String>,
}

pub struct VisionVoiceApp {
    mode: Mode,
    was_style_initialized: bool,
}

impl VisionVoiceApp {
    pub fn new(startup: Result<(Assistant, AudioPlayer), StartupError>) -> Self {
        let mode = match startup {
            Ok((assistant, player)) => Mode::Ready(Box::new(Workspace {
                assistant: Arc::new(assistant),
                player,
                session: Session::new(),
                state: Arc::new(Mutex::new(ThreadSafeState { pending: None })),
                texture: None,
                notice: None,
            })),
            Err(e) => {
                error!("Startup halted: {}", e);
                Mode::Halted(e.to_string())
            }
        };
        Self {
            mode,
            was_style_initialized: false,
        }
    }

    /// Whether the upload control is reachable at all
    pub fn upload_available(&self) -> bool {
        matches!(self.mode, Mode::Ready(_))
    }
}

impl eframe::App for VisionVoiceApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.was_style_initialized {
            let mut style = (*ctx.style()).clone();
            style.visuals.selection.bg_fill = ACCENT;
            style.visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);
            style.visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);
            style.visuals.widgets.active.rounding = egui::Rounding::same(6.0);
            style.text_styles.insert(
                egui::TextStyle::Body,
                egui::FontId::new(16.0, egui::FontFamily::Proportional),
            );
            style.text_styles.insert(
                egui::TextStyle::Button,
                egui::FontId::new(16.0, egui::FontFamily::Proportional),
            );
            style.text_styles.insert(
                egui::TextStyle::Heading,
                egui::FontId::new(24.0, egui::FontFamily::Proportional),
            );
            ctx.set_style(style);
            self.was_style_initialized = true;
        }

        match &mut self.mode {
            Mode::Halted(reason) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.add_space(12.0);
                    ui.heading(TITLE);
                    ui.add_space(12.0);
                    egui::Frame::none()
                        .fill(Color32::from_rgb(60, 25, 25))
                        .stroke(Stroke::new(1.0, ERROR_COLOR))
                        .rounding(8.0)
                        .inner_margin(12.0)
                        .show(ui, |ui| {
                            ui.label(RichText::new(reason.as_str()).color(ERROR_COLOR).size(16.0));
                        });
                });
            }
            Mode::Ready(workspace) => workspace.update(ctx),
        }
    }
}

impl Workspace {
    fn update(&mut self, ctx: &egui::Context) {
        self.collect_finished_work();
        self.accept_dropped_files(ctx);

        egui::SidePanel::left("feature_panel")
            .resizable(false)
            .exact_width(SIDEBAR_WIDTH)
            .show(ctx, |ui| self.draw_sidebar(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| self.draw_main(ui, ctx));
        });

        if self.session.is_processing() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn collect_finished_work(&mut self) {
        let finished = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .take();
        if let Some(outcome) = finished {
            info!("{} finished in {:?}", outcome.feature, outcome.elapsed);
            if let Err(e) = self.session.finish(outcome) {
                warn!("Dropping result: {}", e);
            }
        }
    }

    fn accept_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        if let Some(path) = &file.path {
            self.load_from_path(path);
        } else if let Some(bytes) = &file.bytes {
            self.load_image(UploadedImage::from_bytes(file.name.clone(), bytes.to_vec()));
        }
    }

    fn draw_sidebar(&mut self, ui: &mut Ui) {
        ui.add_space(10.0);
        ui.heading(RichText::new("Select a functionality 🔧").size(18.0));
        ui.separator();
        ui.add_space(6.0);

        let busy = self.session.is_processing();
        let mut selected = self.session.feature();
        ui.add_enabled_ui(!busy, |ui| {
            for feature in Feature::ALL {
                ui.radio_value(&mut selected, feature, feature.label());
                ui.add_space(4.0);
            }
        });
        if selected != self.session.feature() {
            if let Err(e) = self.session.select_feature(selected) {
                self.notice = Some(e.to_string());
            }
        }

        ui.add_space(16.0);
        ui.separator();
        ui.label(RichText::new(format!("Status: {}", self.session.phase().label())).small());
        ui.label(
            RichText::new(format!("Model: {}", self.assistant.model_name()))
                .small()
                .color(Color32::GRAY),
        );
    }

    fn draw_main(&mut self, ui: &mut Ui, ctx: &egui::Context) {
        ui.add_space(8.0);
        ui.heading(TITLE);
        ui.add_space(10.0);

        let busy = self.session.is_processing();
        if ui
            .add_enabled(
                !busy,
                egui::Button::new(RichText::new("📤 Upload an image").size(15.0)).rounding(8.0),
            )
            .on_hover_text("JPEG or PNG")
            .clicked()
        {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("Images", &ACCEPTED_EXTENSIONS)
                .pick_file()
            {
                self.load_from_path(&path);
            }
        }

        if let Some(notice) = &self.notice {
            ui.add_space(4.0);
            ui.colored_label(ERROR_COLOR, notice);
        }
        ui.add_space(8.0);

        let Some(image) = self.session.image().cloned() else {
            egui::Frame::none()
                .fill(Color32::from_rgb(30, 45, 70))
                .rounding(8.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.label("Please Upload Image to Proceed...!");
                });
            return;
        };

        let texture = self.texture.get_or_insert_with(|| {
            let size = [image.decoded.width() as usize, image.decoded.height() as usize];
            let color_image = egui::ColorImage::from_rgba_unmultiplied(
                size,
                image.decoded.to_rgba8().as_flat_samples().as_slice(),
            );
            ctx.load_texture("uploaded_image", color_image, egui::TextureOptions::LINEAR)
        });
        let available_width = ui.available_width();
        let aspect_ratio = texture.size_vec2().x / texture.size_vec2().y;
        let image_height = if aspect_ratio > 0.0 { available_width / aspect_ratio } else { available_width };
        ui.image((texture.id(), Vec2::new(available_width, image_height)));
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("Uploaded Image").italics().color(Color32::GRAY));
            ui.label(
                RichText::new(format!(
                    "{} · {:?} · {} KB",
                    image.name,
                    image.format,
                    image.bytes.len() / 1024
                ))
                .small()
                .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);

        let feature = self.session.feature();
        ui.horizontal(|ui| {
            let clicked = ui
                .add_enabled(
                    !busy,
                    egui::Button::new(RichText::new(feature.button_label()).size(15.0))
                        .fill(ACCENT)
                        .rounding(8.0),
                )
                .clicked();
            if busy {
                ui.spinner();
                ui.label(feature.busy_message());
            }
            if clicked {
                self.start(ctx);
            }
        });
        ui.add_space(10.0);

        self.draw_result(ui);
    }

    fn draw_result(&mut self, ui: &mut Ui) {
        let Some(outcome) = self.session.result() else {
            return;
        };

        ui.separator();
        ui.horizontal(|ui| {
            ui.label(RichText::new(outcome.feature.label()).strong());
            ui.label(
                RichText::new(outcome.finished_at.format("%H:%M:%S").to_string())
                    .small()
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(6.0);

        if let Some(message) = outcome.error_message() {
            ui.colored_label(ERROR_COLOR, message);
            return;
        }

        let text = outcome.text().unwrap_or_default().to_string();
        if text.trim().is_empty() {
            ui.label(RichText::new("No text was found in the image.").italics());
        } else {
            egui::Frame::none()
                .fill(Color32::from_rgb(40, 40, 40))
                .rounding(8.0)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.add(egui::Label::new(text.as_str()).wrap(true));
                });
        }
        ui.add_space(8.0);

        let audio = outcome.audio().cloned();
        if let Some(message) = outcome.audio_error() {
            ui.colored_label(ERROR_COLOR, message);
        }

        let mut action: Option<Action> = None;
        ui.horizontal(|ui| {
            if let Some(artifact) = &audio {
                if ui.button("▶ Play narration").clicked() {
                    action = Some(Action::Play(artifact.clone()));
                }
                if ui.button("💾 Save audio").clicked() {
                    action = Some(Action::SaveAudio(artifact.clone()));
                }
                ui.label(
                    RichText::new(format!(
                        "{} · {} KB · {} chars",
                        artifact.mime_type,
                        artifact.bytes / 1024,
                        artifact.spoken_chars
                    ))
                        .small()
                        .color(Color32::GRAY),
                );
            }
            if !text.trim().is_empty() && ui.button("📋 Copy text").clicked() {
                action = Some(Action::Copy(text.clone()));
            }
        });

        match action {
            Some(Action::Play(artifact)) => {
                if let Err(e) = self.player.play(&artifact) {
                    error!("Failed to start {}: {}", self.player.command(), e);
                    self.notice = Some(format!("Could not play audio with {}: {}", self.player.command(), e));
                }
            }
            Some(Action::SaveAudio(artifact)) => self.save_audio(&artifact),
            Some(Action::Copy(text)) => self.copy_text_to_clipboard(ui.ctx(), text),
            None => {}
        }
    }

    fn load_from_path(&mut self, path: &Path) {
        self.load_image(UploadedImage::from_path(path));
    }

    fn load_image(&mut self, upload: Result<UploadedImage, crate::error::ImageError>) {
        match upload {
            Ok(image) => match self.session.load_image(image) {
                Ok(()) => {
                    self.texture = None;
                    self.notice = None;
                }
                Err(e) => self.notice = Some(e.to_string()),
            },
            Err(e) => {
                warn!("Upload rejected: {}", e);
                self.notice = Some(e.to_string());
            }
        }
    }

    fn start(&mut self, ctx: &egui::Context) {
        let (feature, image) = match self.session.confirm() {
            Ok(job) => job,
            Err(e) => {
                self.notice = Some(e.to_string());
                return;
            }
        };
        self.notice = None;

        let assistant = Arc::clone(&self.assistant);
        let state = Arc::clone(&self.state);
        let ctx = ctx.clone();
        info!("Starting {} for {}", feature, image.name);
        thread::spawn(move || {
            let outcome = assistant.run_guarded(feature, &image);
            state.lock().unwrap_or_else(PoisonError::into_inner).pending = Some(outcome);
            ctx.request_repaint();
        });
    }

    fn save_audio(&mut self, artifact: &AudioArtifact) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("WAV audio", &["wav"])
            .set_file_name("narration.wav")
            .save_file()
        else {
            return;
        };
        if let Err(e) = copy_artifact(artifact, &path) {
            error!("Failed to save audio: {}", e);
            self.notice = Some(format!("Failed to save audio: {}", e));
        } else {
            info!("Audio saved to: {}", path.display());
        }
    }

    fn copy_text_to_clipboard(&mut self, ctx: &egui::Context, text: String) {
        #[cfg(feature = "clipboard")]
        {
            let _ = ctx;
            match Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
                Ok(()) => info!("Result text copied to clipboard"),
                Err(e) => {
                    error!("Failed to copy text to clipboard: {}", e);
                    self.notice = Some(format!("Failed to copy text: {}", e));
                }
            }
        }
        #[cfg(not(feature = "clipboard"))]
        {
            ctx.output_mut(|o| o.copied_text = text);
        }
    }
}

enum Action {
    Play(AudioArtifact),
    SaveAudio(AudioArtifact),
    Copy(String),
}

fn copy_artifact(artifact: &AudioArtifact, destination: &Path) -> std::io::Result<u64> {
    std::fs::copy(&artifact.path, destination)
}

pub fn run_gui(startup: Result<(Assistant, AudioPlayer), StartupError>) -> Result<()> {
    info!("VisionVoice GUI starting up...");

    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT)),
        min_window_size: Some(egui::vec2(640.0, 480.0)),
        drag_and_drop_support: true,
        ..eframe::NativeOptions::default()
    };

    eframe::run_native(
        "VisionVoice",
        native_options,
        Box::new(move |_cc| Box::new(VisionVoiceApp::new(startup))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start GUI: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assist::tests::{assistant, Calls, FakeOcr, FakeSpeech, PanickingVision};
    use crate::config::API_KEY_VAR;

    #[test]
    fn missing_credential_hides_upload() {
        let app = VisionVoiceApp::new(Err(StartupError::MissingCredential(API_KEY_VAR)));
        assert!(!app.upload_available());
        match &app.mode {
            Mode::Halted(reason) => assert!(reason.contains(API_KEY_VAR)),
            Mode::Ready(_) => panic!("app should be halted"),
        }
    }

    #[test]
    fn valid_startup_offers_upload() {
        let calls = Arc::new(Calls::default());
        let app = VisionVoiceApp::new(Ok((
            assistant(&calls, Ok("ok"), "", false),
            AudioPlayer::new("true"),
        )));
        assert!(app.upload_available());
    }

    #[test]
    fn rejected_upload_leaves_notice_and_no_image() {
        let calls = Arc::new(Calls::default());
        let mut app = VisionVoiceApp::new(Ok((
            assistant(&calls, Ok("ok"), "", false),
            AudioPlayer::new("true"),
        )));
        let Mode::Ready(workspace) = &mut app.mode else {
            panic!("app should be ready");
        };
        workspace.load_image(UploadedImage::from_bytes("notes.txt", b"plain text".to_vec()));
        assert!(workspace.notice.is_some());
        assert!(workspace.session.image().is_none());
    }

    #[test]
    fn worker_result_reaches_session() {
        let calls = Arc::new(Calls::default());
        let mut app = VisionVoiceApp::new(Ok((
            assistant(&calls, Ok("A doorway with a step."), "", false),
            AudioPlayer::new("true"),
        )));
        let Mode::Ready(workspace) = &mut app.mode else {
            panic!("app should be ready");
        };
        workspace.load_image(Ok(crate::assist::tests::image()));
        let (feature, image) = workspace.session.confirm().unwrap();
        let outcome = workspace.assistant.run(feature, &image);
        workspace.state.lock().unwrap().pending = Some(outcome);

        workspace.collect_finished_work();

        let result = workspace.session.result().unwrap();
        assert_eq!(result.text(), Some("A doorway with a step."));
        assert!(!workspace.session.is_processing());
    }

    #[test]
    fn crashed_worker_still_ends_processing() {
        let calls = Arc::new(Calls::default());
        let assistant = Assistant::new(
            Box::new(PanickingVision),
            Box::new(FakeOcr { calls: calls.clone(), text: "" }),
            Box::new(FakeSpeech { calls: calls.clone(), fail: false }),
        );
        let mut app = VisionVoiceApp::new(Ok((assistant, AudioPlayer::new("true"))));
        let Mode::Ready(workspace) = &mut app.mode else {
            panic!("app should be ready");
        };
        workspace.load_image(Ok(crate::assist::tests::image()));

        workspace.start(&egui::Context::default());
        assert!(workspace.session.is_processing());

        for _ in 0..200 {
            workspace.collect_finished_work();
            if !workspace.session.is_processing() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert!(!workspace.session.is_processing());
        let message = workspace.session.result().unwrap().error_message().unwrap();
        assert!(message.contains("processing stopped unexpectedly"));
    }
}

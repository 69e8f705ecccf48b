//! The viewer's widgets: the parameter panel, file pickers, the message
//! modal and the log window.
//!
//! Widgets never act on the viewer directly. Anything that needs more than a
//! field edit comes back as a [`PanelAction`].

use std::path::PathBuf;

use meshview_core::dialog::{DialogId, DialogManager, LogBuffer, MessageQueue};
use meshview_core::scene::DrawParams;

use crate::render::scene::DrawStats;

#[derive(Clone, Debug, PartialEq)]
pub enum PanelAction {
    /// Open one of the file picker dialogs.
    Browse(DialogId),
    OpenMesh(PathBuf),
    LoadVertexShader(PathBuf),
    LoadFragmentShader(PathBuf),
    ReloadShaders,
    CopyText(String),
}

/// Everything the parameter panel edits.
#[derive(Clone, Debug)]
pub struct ViewSettings {
    pub params: DrawParams,
    pub offscreen: bool,
    /// Shade by normal instead of by material.
    pub normals: bool,
    pub show_log: bool,
    pub log_filter: String,
}

impl ViewSettings {
    pub fn new(params: DrawParams, offscreen: bool) -> Self {
        Self {
            params,
            offscreen,
            normals: false,
            show_log: false,
            log_filter: String::new(),
        }
    }
}

/// Left side panel with the scene parameters.
pub fn parameter_panel(
    ctx: &egui::Context,
    width: f32,
    settings: &mut ViewSettings,
    stats: DrawStats,
    actions: &mut Vec<PanelAction>,
) {
    egui::SidePanel::left("parameters")
        .resizable(true)
        .default_width(width)
        .show(ctx, |ui| {
            ui.heading("meshview");
            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("Open mesh…").clicked() {
                    actions.push(PanelAction::Browse(DialogId::OpenMesh));
                }
                if ui.button("Reload shaders").clicked() {
                    actions.push(PanelAction::ReloadShaders);
                }
            });
            ui.horizontal(|ui| {
                if ui.button("Vertex shader…").clicked() {
                    actions.push(PanelAction::Browse(DialogId::OpenVertexShader));
                }
                if ui.button("Fragment shader…").clicked() {
                    actions.push(PanelAction::Browse(DialogId::OpenFragmentShader));
                }
            });
            ui.separator();

            let params = &mut settings.params;
            ui.add(egui::Slider::new(&mut params.exposure, -10.0..=10.0).text("exposure"));
            ui.add(egui::Slider::new(&mut params.gamma, 0.1..=4.0).text("gamma"));

            // HDR, so plain drag values instead of a clamped color picker.
            ui.horizontal(|ui| {
                ui.label("background");
                for channel in 0..3 {
                    ui.add(
                        egui::DragValue::new(&mut params.background[channel])
                            .speed(0.01)
                            .range(0.0..=f32::MAX),
                    );
                }
            });

            ui.checkbox(&mut params.eyelight, "eyelight");
            ui.checkbox(&mut params.wireframe, "wireframe");
            ui.checkbox(&mut params.double_sided, "double sided");
            ui.checkbox(&mut settings.offscreen, "offscreen");
            ui.checkbox(&mut settings.normals, "shade normals");
            ui.checkbox(&mut settings.show_log, "log");
            ui.separator();

            ui.label(format!("drawn: {}  skipped: {}", stats.drawn, stats.skipped));
            ui.separator();
            ui.small("left drag: rotate, shift+left: pan, right drag: dolly");
            ui.small("W/A/S/D: fly, F: wireframe, R: reload shaders, Esc: quit");
        });
}

/// Draws the file picker for `id` if it is open. Returns the chosen path
/// once the user confirms; the dialog closes on Ok or Cancel.
pub fn file_dialog(
    ctx: &egui::Context,
    dialogs: &mut DialogManager,
    id: DialogId,
) -> Option<PathBuf> {
    if !dialogs.is_open(id) {
        return None;
    }
    let state = dialogs.file_mut(id)?;
    let mut chosen = None;
    let mut close = false;

    egui::Window::new(id.title())
        .collapsible(false)
        .resizable(true)
        .default_width(420.0)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Up").clicked() {
                    state.go_up();
                }
                ui.label(state.dirname().display().to_string());
            });

            let mut filter = state.filter().to_string();
            ui.horizontal(|ui| {
                ui.label("filter");
                if ui.text_edit_singleline(&mut filter).lost_focus() {
                    state.set_filter(&filter);
                    state.refresh();
                }
            });

            let mut selected = None;
            egui::ScrollArea::vertical()
                .max_height(240.0)
                .show(ui, |ui| {
                    for (index, entry) in state.entries().iter().enumerate() {
                        let label = if entry.is_dir {
                            format!("{}/", entry.name)
                        } else {
                            entry.name.clone()
                        };
                        let current = !entry.is_dir && entry.name == state.filename();
                        if ui.selectable_label(current, label).clicked() {
                            selected = Some(index);
                        }
                    }
                });
            if let Some(index) = selected {
                state.select_entry(index);
            }

            let mut filename = state.filename().to_string();
            ui.horizontal(|ui| {
                ui.label("file");
                if ui.text_edit_singleline(&mut filename).changed() {
                    state.set_filename(&filename);
                }
            });

            ui.horizontal(|ui| {
                let path = state.path();
                if ui
                    .add_enabled(path.is_some(), egui::Button::new("Ok"))
                    .clicked()
                {
                    chosen = path;
                    close = true;
                }
                if ui.button("Cancel").clicked() {
                    close = true;
                }
            });
        });

    if close {
        dialogs.close(id);
    }
    chosen
}

/// Shows the oldest pending message until the user acknowledges it.
pub fn message_modal(ctx: &egui::Context, dialogs: &mut DialogManager, messages: &MessageQueue) {
    let Some(message) = messages.front() else {
        dialogs.close(DialogId::Message);
        return;
    };
    dialogs.open(DialogId::Message);
    egui::Window::new(DialogId::Message.title())
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(message);
            if ui.button("Ok").clicked() {
                messages.pop();
            }
        });
}

pub fn log_window(
    ctx: &egui::Context,
    settings: &mut ViewSettings,
    log: &LogBuffer,
    actions: &mut Vec<PanelAction>,
) {
    let mut open = settings.show_log;
    egui::Window::new("Log")
        .open(&mut open)
        .default_size([480.0, 260.0])
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Clear").clicked() {
                    log.clear();
                }
                if ui.button("Copy").clicked() {
                    actions.push(PanelAction::CopyText(log.to_text(&settings.log_filter)));
                }
                ui.label("filter");
                ui.text_edit_singleline(&mut settings.log_filter);
            });
            ui.separator();
            let scroll = log.take_scroll_request();
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for line in log.lines(&settings.log_filter) {
                        ui.monospace(line);
                    }
                    if scroll {
                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                    }
                });
        });
    settings.show_log = open;
}

#[cfg(test)]
mod tests {
    use std::fs;

    use meshview_core::dialog::FileDialogState;

    use super::*;

    fn run(mut build: impl FnMut(&egui::Context)) {
        let ctx = egui::Context::default();
        // The first pass only lays out; run twice so windows are placed.
        for _ in 0..2 {
            let _ = ctx.run(egui::RawInput::default(), |ctx| build(ctx));
        }
    }

    #[test]
    fn closed_dialogs_draw_nothing() {
        let mut dialogs = DialogManager::new();
        run(|ctx| {
            assert_eq!(file_dialog(ctx, &mut dialogs, DialogId::OpenMesh), None);
        });
        assert!(!dialogs.any_open());
    }

    #[test]
    fn open_dialog_stays_open_until_answered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bunny.obj"), "v 0 0 0\n").unwrap();
        let mut dialogs = DialogManager::new();
        dialogs.open_file(
            DialogId::OpenMesh,
            FileDialogState::new(dir.path(), "", false, "*.obj"),
        );
        run(|ctx| {
            assert_eq!(file_dialog(ctx, &mut dialogs, DialogId::OpenMesh), None);
        });
        assert!(dialogs.is_open(DialogId::OpenMesh));
        let state = dialogs.file_mut(DialogId::OpenMesh).unwrap();
        assert_eq!(state.entries().len(), 1);
    }

    #[test]
    fn message_modal_tracks_the_queue() {
        let mut dialogs = DialogManager::new();
        let messages = MessageQueue::new();
        messages.push("cannot open bunny.obj");
        run(|ctx| message_modal(ctx, &mut dialogs, &messages));
        assert!(dialogs.is_open(DialogId::Message));
        assert_eq!(messages.len(), 1);

        messages.pop();
        run(|ctx| message_modal(ctx, &mut dialogs, &messages));
        assert!(!dialogs.is_open(DialogId::Message));
    }

    #[test]
    fn panels_leave_settings_alone_without_input() {
        let mut settings = ViewSettings::new(DrawParams::default(), true);
        settings.show_log = true;
        let log = LogBuffer::default();
        log.info("loaded bunny.obj");
        let mut actions = Vec::new();
        run(|ctx| {
            parameter_panel(ctx, 320.0, &mut settings, DrawStats::default(), &mut actions);
            log_window(ctx, &mut settings, &log, &mut actions);
        });
        assert!(actions.is_empty());
        assert!(settings.show_log);
        assert_eq!(settings.params, DrawParams::default());
    }
}

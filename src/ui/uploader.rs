// src/ui/uploader.rs
use eframe::egui;
use rfd::FileDialog;

use crate::file::{self, ACCEPTED_EXTENSIONS};
use crate::state::AppState;

pub fn show_uploader_view(ui: &mut egui::Ui, state: &mut AppState) {
    ui.group(|ui| {
        ui.set_width(ui.available_width());
        ui.heading("Upload Document");
        ui.label("Select a text document to analyze.");
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            let picker = ui.add_enabled(!state.is_loading, egui::Button::new("Choose File..."));
            if picker.clicked() {
                pick_document(state);
            }
            if let Some(doc) = &state.document {
                ui.label(format!("{} ({} bytes)", doc.name, doc.size_bytes));
            }
        });

        if let Some(doc) = &state.document {
            ui.add_space(8.0);
            egui::ScrollArea::vertical()
                .id_source("document_preview")
                .max_height(150.0)
                .show(ui, |ui| {
                    ui.monospace(doc.preview());
                });
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let can_submit = state.document.is_some() && !state.is_loading;
            let label = if state.is_loading {
                "Analyzing..."
            } else {
                "Analyze Document"
            };
            if ui.add_enabled(can_submit, egui::Button::new(label)).clicked() {
                let ctx = ui.ctx().clone();
                state.start_analysis(&ctx);
            }
            if state.is_loading {
                ui.add(egui::Spinner::new());
            }
        });
    });
}

fn pick_document(state: &mut AppState) {
    let dialog = FileDialog::new()
        .add_filter("Text documents", &ACCEPTED_EXTENSIONS)
        .set_title("Select Document");

    if let Some(path) = dialog.pick_file() {
        match file::load_document(&path) {
            Ok(doc) => {
                state.document = Some(doc);
            }
            Err(e) => {
                state.error_message = Some(e.to_string());
            }
        }
    }
}

// src/ui/login.rs
use eframe::egui;

use crate::state::AppState;

pub fn show_login_view(ui: &mut egui::Ui, state: &mut AppState) {
    ui.group(|ui| {
        ui.set_width(ui.available_width());
        ui.heading("Please sign in to use the Document Analyzer");
        ui.add_space(8.0);

        if state.signing_in {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.label("Waiting for sign-in to complete...");
            });
            if let Some(prompt) = &state.login_prompt {
                ui.add_space(8.0);
                ui.label(&prompt.message);
                ui.horizontal(|ui| {
                    ui.label("Code:");
                    ui.monospace(&prompt.user_code);
                });
                ui.hyperlink(&prompt.verification_uri);
            }
        } else if ui.button("Sign In").clicked() {
            let ctx = ui.ctx().clone();
            state.start_login(&ctx);
        }
    });
}

// src/ui/header.rs
use eframe::egui;

use crate::state::AppState;

pub fn show_header(ui: &mut egui::Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.heading("Document Analyzer");

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            match state.auth.current_identity() {
                Some(account) => {
                    if ui.button("Logout").clicked() {
                        state.logout();
                    }
                    ui.label(format!("Welcome, {}", account.display_name()));
                }
                None => {
                    ui.label("Please sign in.");
                }
            }
        });
    });
}

// src/ui/results.rs
use eframe::egui;

use crate::analysis::{ResultView, Sentiment};
use crate::state::{AppState, ResultTab};

pub fn show_results_view(ui: &mut egui::Ui, state: &mut AppState) {
    let (view, raw_pretty) = match &state.result {
        Some(raw) => (
            ResultView::from_raw(raw),
            serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string()),
        ),
        None => return,
    };

    ui.group(|ui| {
        ui.set_width(ui.available_width());
        ui.heading("Document Analysis Results");
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            ui.label(format!("Analysis ID: {}", view.id));
            ui.add_space(16.0);
            ui.colored_label(sentiment_color(view.sentiment), view.sentiment.label());
        });

        ui.separator();

        let tabs = [
            (ResultTab::Summary, "Summary"),
            (ResultTab::Entities, "Entities"),
            (ResultTab::Topics, "Topics"),
            (ResultTab::Raw, "Raw Results"),
        ];
        ui.horizontal(|ui| {
            for (tab, label) in tabs {
                if ui.selectable_label(state.result_tab == tab, label).clicked() {
                    state.result_tab = tab;
                }
            }
        });
        ui.add_space(8.0);

        match state.result_tab {
            ResultTab::Summary => {
                ui.strong("Summary");
                if view.summary.is_empty() {
                    ui.label("No summary available.");
                } else {
                    ui.label(&view.summary);
                }
            }
            ResultTab::Entities => {
                ui.strong("Entities");
                if view.entities.is_empty() {
                    ui.label("No entities detected.");
                } else {
                    for entity in &view.entities {
                        ui.label(format!("• {entity}"));
                    }
                }
            }
            ResultTab::Topics => {
                ui.strong("Topics");
                if view.topics.is_empty() {
                    ui.label("No topics detected.");
                } else {
                    ui.horizontal_wrapped(|ui| {
                        for topic in &view.topics {
                            let _ = ui.selectable_label(false, topic);
                        }
                    });
                }
            }
            ResultTab::Raw => {
                ui.strong("Raw Analysis Data");
                egui::ScrollArea::vertical()
                    .id_source("raw_result_scroll")
                    .max_height(300.0)
                    .show(ui, |ui| {
                        ui.monospace(&raw_pretty);
                    });
            }
        }
    });
}

fn sentiment_color(sentiment: Sentiment) -> egui::Color32 {
    match sentiment {
        Sentiment::Positive => egui::Color32::from_rgb(46, 125, 50),
        Sentiment::Negative => egui::Color32::from_rgb(198, 40, 40),
        Sentiment::Neutral => egui::Color32::GRAY,
    }
}

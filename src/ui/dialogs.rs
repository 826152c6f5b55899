use egui::{Context, RichText, Ui, Window};

use teamworks_gantt::controller::LoadState;

use crate::ui::theme;

/// Placeholder shown until the project has loaded. Returns `true` when the
/// user asked to retry.
pub fn show_load_screen(state: &LoadState, ui: &mut Ui) -> bool {
    let mut retry = false;
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() * 0.35);
        match state {
            LoadState::Loading | LoadState::Ready => {
                ui.spinner();
                ui.add_space(6.0);
                ui.label(RichText::new("Loading project…").color(theme::TEXT_SECONDARY));
            }
            LoadState::Failed(message) => {
                ui.label(
                    RichText::new(egui_phosphor::regular::WARNING)
                        .size(28.0)
                        .color(theme::TODAY_LINE),
                );
                ui.add_space(6.0);
                ui.label(RichText::new(message).size(13.0).color(theme::TEXT_PRIMARY));
                ui.add_space(10.0);
                if ui.add_sized([100.0, 28.0], egui::Button::new("Retry")).clicked() {
                    retry = true;
                }
            }
        }
    });
    retry
}

pub fn show_about_dialog(open: &mut bool, ctx: &Context) {
    let mut should_close = false;
    Window::new("About")
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([300.0, 170.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(12.0);
                ui.heading(RichText::new("Teamworks Gantt").strong());
                ui.add_space(2.0);
                ui.label(
                    RichText::new(format!("Version {}", env!("CARGO_PKG_VERSION")))
                        .color(theme::TEXT_SECONDARY),
                );
                ui.add_space(10.0);
                ui.label("Drag bars to reschedule, Shift+drag to link.");
                ui.label("Double-click the timeline to add a task.");
                ui.add_space(14.0);
                if ui.add_sized([100.0, 28.0], egui::Button::new("Close")).clicked() {
                    should_close = true;
                }
            });
        });
    if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        *open = false;
    }
}

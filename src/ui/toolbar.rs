use egui::{menu, RichText, Ui};

use teamworks_gantt::controller::Banner;
use teamworks_gantt::model::TimelineScale;
use teamworks_gantt::projection::{self, StatusFilter, TimelineFilter};
use teamworks_gantt::{Action, ViewState};

use crate::app::GanttApp;
use crate::ui::theme;

fn status_filter_label(filter: &StatusFilter) -> String {
    match filter {
        StatusFilter::All => "All statuses".to_string(),
        StatusFilter::Is(status) => status.label().to_string(),
    }
}

/// Render the top toolbar / menu bar.
pub fn show_toolbar(app: &mut GanttApp, view: &ViewState, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  Project  ").font(theme::font_header()), |ui| {
            let editable = !view.read_only;
            if ui
                .add_enabled(editable, egui::Button::new("  New Task"))
                .clicked()
            {
                app.add_draft();
                ui.close_menu();
            }
            if ui.button("  Reload").clicked() {
                app.send(Action::Load);
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font_header()), |ui| {
            if ui.button("  Zoom In        Ctrl+Scroll ↑").clicked() {
                app.viewport.zoom_in();
                ui.close_menu();
            }
            if ui.button("  Zoom Out      Ctrl+Scroll ↓").clicked() {
                app.viewport.zoom_out();
                ui.close_menu();
            }
            if ui.button("  Fit to Tasks").clicked() {
                app.fit_to_tasks(view);
                ui.close_menu();
            }
            if ui.button("  Go to Today").clicked() {
                app.scroll_to_today();
                ui.close_menu();
            }
            ui.separator();
            ui.label(RichText::new("Timeline Scale").small().weak());
            for scale in TimelineScale::all() {
                if ui
                    .radio(app.viewport.scale == *scale, scale.label())
                    .clicked()
                {
                    app.set_scale(*scale);
                    ui.close_menu();
                }
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font_header()), |ui| {
            if ui.button("About").clicked() {
                app.show_about = true;
                ui.close_menu();
            }
        });

        ui.separator();
        show_filters(app, view, ui);

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if view.read_only {
                ui.label(
                    RichText::new(format!("{} Read-only", egui_phosphor::regular::LOCK))
                        .size(11.0)
                        .color(theme::TEXT_DIM),
                );
            }
            ui.label(
                RichText::new(&view.project_name)
                    .size(11.0)
                    .weak(),
            );
            ui.label(
                RichText::new(view.projection.range_label())
                    .size(11.0)
                    .color(theme::TEXT_SECONDARY),
            );
        });
    });
}

fn show_filters(app: &mut GanttApp, view: &ViewState, ui: &mut Ui) {
    let mut filter: TimelineFilter = view.filter.clone();

    egui::ComboBox::from_id_salt("status-filter")
        .selected_text(RichText::new(status_filter_label(&filter.status)).size(11.0))
        .width(120.0)
        .show_ui(ui, |ui| {
            for option in projection::status_options(&view.tasks) {
                let label = status_filter_label(&option);
                ui.selectable_value(&mut filter.status, option, label);
            }
        });

    let assignees = projection::assignee_options(&view.tasks, &view.members);
    let current = assignees
        .iter()
        .find(|(option, _)| option == &filter.assignee)
        .map(|(_, label)| label.clone())
        .unwrap_or_else(|| "All assignees".to_string());
    egui::ComboBox::from_id_salt("assignee-filter")
        .selected_text(RichText::new(current).size(11.0))
        .width(140.0)
        .show_ui(ui, |ui| {
            for (option, label) in assignees {
                ui.selectable_value(&mut filter.assignee, option, label);
            }
        });

    ui.separator();
    for scale in TimelineScale::all() {
        if ui
            .selectable_label(app.viewport.scale == *scale, scale.label())
            .clicked()
            && app.viewport.scale != *scale
        {
            app.set_scale(*scale);
        }
    }

    if filter != view.filter {
        app.send(Action::SetFilter(filter));
    }
}

/// Render the banner strip. Returns `true` when the user dismissed it.
pub fn show_banner(banner: &Banner, ui: &mut Ui) -> bool {
    let mut dismissed = false;
    ui.horizontal(|ui| {
        let icon = if banner.is_error() {
            egui_phosphor::regular::WARNING
        } else {
            egui_phosphor::regular::CHECK_CIRCLE
        };
        ui.label(
            RichText::new(format!("{icon}  {}", banner.message))
                .size(12.0)
                .color(theme::TEXT_PRIMARY),
        );
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let close = ui.add(
                egui::Button::new(
                    RichText::new(egui_phosphor::regular::X)
                        .size(11.0)
                        .color(theme::TEXT_PRIMARY),
                )
                .frame(false),
            );
            if close.on_hover_text("Dismiss").clicked() {
                dismissed = true;
            }
        });
    });
    dismissed
}

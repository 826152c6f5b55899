use egui::{Color32, RichText, Ui};

use teamworks_gantt::model::{Schedule, TaskId};
use teamworks_gantt::ViewState;

use crate::ui::theme;

/// Actions that the task table can request.
pub enum TaskTableAction {
    None,
    Select(TaskId),
    Delete(TaskId),
    Add,
}

/// Render the task list. Every task is listed, including those the chart
/// cannot plot and those the filters hide.
pub fn show_task_table(view: &ViewState, ui: &mut Ui) -> TaskTableAction {
    let mut action = TaskTableAction::None;
    let selected = view.edit_state.task_id();
    let editable = !view.read_only;

    // Header area
    ui.add_space(2.0);
    ui.horizontal(|ui| {
        ui.label(
            RichText::new("Tasks")
                .strong()
                .size(15.0)
                .color(theme::TEXT_PRIMARY),
        );
        ui.add_space(4.0);
        ui.label(
            RichText::new(format!("({})", view.tasks.len()))
                .size(11.0)
                .color(theme::TEXT_DIM),
        );
    });
    ui.add_space(4.0);

    let btn = egui::Button::new(
        RichText::new(format!("{}  Add Task", egui_phosphor::regular::PLUS))
            .color(Color32::WHITE)
            .size(12.0),
    )
    .fill(theme::ACCENT)
    .rounding(egui::Rounding::same(5.0));
    if ui
        .add_enabled_ui(editable, |ui| ui.add_sized([ui.available_width(), 30.0], btn))
        .inner
        .clicked()
    {
        action = TaskTableAction::Add;
    }

    ui.add_space(6.0);
    ui.separator();
    ui.add_space(2.0);

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for (i, task) in view.tasks.iter().enumerate() {
                let is_selected = selected == Some(&task.id);
                let visible = view.filter.matches(task);

                let row_bg = if is_selected {
                    theme::BG_SELECTED
                } else if i % 2 == 0 {
                    theme::BG_PANEL
                } else {
                    theme::BG_DARK
                };

                let frame = egui::Frame {
                    fill: row_bg,
                    rounding: egui::Rounding::same(4.0),
                    inner_margin: egui::Margin::symmetric(6.0, 4.0),
                    outer_margin: egui::Margin::ZERO,
                    stroke: egui::Stroke::NONE,
                    shadow: egui::epaint::Shadow::NONE,
                };

                let frame_resp = frame.show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.spacing_mut().item_spacing.x = 6.0;

                        // Status dot
                        let (dot_rect, _) =
                            ui.allocate_exact_size(egui::vec2(6.0, 6.0), egui::Sense::hover());
                        let dot = if view.is_draft(&task.id) {
                            theme::DRAFT_BAR
                        } else {
                            theme::status_color(&task.status)
                        };
                        ui.painter().circle_filled(dot_rect.center(), 3.0, dot);

                        let color = if is_selected {
                            Color32::WHITE
                        } else if visible {
                            theme::TEXT_PRIMARY
                        } else {
                            theme::TEXT_DIM
                        };
                        ui.add(egui::Label::new(RichText::new(&task.title).size(12.0).color(color)).truncate());

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.spacing_mut().item_spacing.x = 4.0;

                            if editable {
                                let del_btn = ui.add(
                                    egui::Button::new(
                                        RichText::new(egui_phosphor::regular::X)
                                            .size(10.0)
                                            .color(theme::TEXT_DIM),
                                    )
                                    .frame(false),
                                );
                                if del_btn.on_hover_text("Delete task").clicked() {
                                    action = TaskTableAction::Delete(task.id.clone());
                                }
                            }

                            let pbar = egui::ProgressBar::new(f32::from(task.progress) / 100.0)
                                .desired_width(48.0)
                                .fill(theme::status_color(&task.status))
                                .rounding(egui::Rounding::same(3.0));
                            ui.add(pbar);

                            match task.schedule {
                                Schedule::Scheduled { start, due } => {
                                    ui.label(
                                        RichText::new(due.format("%m/%d").to_string())
                                            .size(10.0)
                                            .color(theme::TEXT_SECONDARY),
                                    );
                                    ui.label(RichText::new("→").size(9.0).color(theme::TEXT_DIM));
                                    ui.label(
                                        RichText::new(start.format("%m/%d").to_string())
                                            .size(10.0)
                                            .color(theme::TEXT_SECONDARY),
                                    );
                                }
                                Schedule::Unscheduled => {
                                    ui.label(
                                        RichText::new("no dates")
                                            .size(10.0)
                                            .italics()
                                            .color(theme::TEXT_DIM),
                                    );
                                }
                            }
                        });
                    });
                });

                // Make entire row clickable
                let row_click = ui.interact(
                    frame_resp.response.rect,
                    egui::Id::new(("task-row", &task.id)),
                    egui::Sense::click(),
                );
                if row_click.clicked() && !is_selected {
                    action = TaskTableAction::Select(task.id.clone());
                }

                ui.add_space(1.0);
            }
        });

    action
}

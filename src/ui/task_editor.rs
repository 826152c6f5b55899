use egui::{Color32, Context, Id, RichText, Ui, Window};

use teamworks_gantt::controller::EditorForm;
use teamworks_gantt::model::{dates, Schedule, Task, TaskId, TaskPriority, TaskStatus};
use teamworks_gantt::{Action, ViewState};

use crate::ui::theme;

/// What the editor window asks the app to do.
pub enum EditorAction {
    None,
    Save,
    Cancel,
    Delete(TaskId),
}

/// Persistent state for the "add dependency" picker.
#[derive(Clone, Default)]
struct DepPickerState {
    target_id: Option<TaskId>,
}

fn field_label(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).size(10.0).color(theme::TEXT_DIM).strong());
}

fn schedule_label(task: &Task) -> String {
    match task.schedule {
        Schedule::Scheduled { start, due } => format!(
            "{} {} {}",
            start.format("%Y-%m-%d"),
            egui_phosphor::regular::ARROW_RIGHT,
            due.format("%Y-%m-%d")
        ),
        Schedule::Unscheduled => "No dates".to_string(),
    }
}

/// Summary of the selected task: progress, links and the dependency picker.
pub fn show_task_details(task: &Task, view: &ViewState, ui: &mut Ui) -> Vec<Action> {
    let mut actions = Vec::new();
    let editable = !view.read_only;
    let is_draft = view.is_draft(&task.id);

    ui.add_space(6.0);
    ui.horizontal(|ui| {
        ui.label(
            RichText::new(&task.title)
                .strong()
                .size(13.0)
                .color(theme::TEXT_PRIMARY),
        );
        if is_draft {
            ui.label(RichText::new("(unsaved)").size(10.0).color(theme::EDGE_PENDING));
        }
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let edit = ui.add_enabled(
                editable,
                egui::Button::new(RichText::new(egui_phosphor::regular::PENCIL_SIMPLE).size(12.0))
                    .frame(false),
            );
            if edit.on_hover_text("Edit task").clicked() {
                actions.push(Action::OpenEditor);
            }
        });
    });
    ui.add_space(4.0);

    let frame = egui::Frame {
        fill: theme::BG_DARK,
        rounding: egui::Rounding::same(4.0),
        inner_margin: egui::Margin::same(8.0),
        outer_margin: egui::Margin::ZERO,
        stroke: egui::Stroke::new(1.0, theme::BORDER_SUBTLE),
        shadow: egui::epaint::Shadow::NONE,
    };

    frame.show(ui, |ui| {
        ui.spacing_mut().item_spacing.y = 6.0;

        egui::Grid::new(("task-details", &task.id))
            .num_columns(2)
            .spacing([10.0, 4.0])
            .show(ui, |ui| {
                field_label(ui, "Dates");
                ui.label(RichText::new(schedule_label(task)).size(11.0).color(theme::TEXT_SECONDARY));
                ui.end_row();

                field_label(ui, "Status");
                ui.label(
                    RichText::new(task.status.label())
                        .size(11.0)
                        .color(theme::status_color(&task.status)),
                );
                ui.end_row();

                field_label(ui, "Priority");
                ui.label(
                    RichText::new(task.priority.label())
                        .size(11.0)
                        .color(theme::priority_color(task.priority)),
                );
                ui.end_row();

                field_label(ui, "Assignee");
                let assignee = task
                    .assigned_to
                    .as_deref()
                    .map_or("Unassigned", |id| view.members.display_name(id));
                ui.label(RichText::new(assignee).size(11.0).color(theme::TEXT_SECONDARY));
                ui.end_row();
            });

        if !task.description.trim().is_empty() {
            ui.label(
                RichText::new(task.description.trim())
                    .size(11.0)
                    .color(theme::TEXT_SECONDARY),
            );
        }

        // ── Progress ──────────────────────────────────────────────────
        // Committed when the slider is released, not on every step.
        field_label(ui, "Progress");
        let progress_id = Id::new(("progress-edit", &task.id));
        let mut progress = ui
            .ctx()
            .data_mut(|d| d.get_temp::<u8>(progress_id))
            .unwrap_or(task.progress);
        let resp = ui.add_enabled(
            editable,
            egui::Slider::new(&mut progress, 0..=100).custom_formatter(|v, _| format!("{v:.0}%")),
        );
        if resp.changed() {
            ui.ctx().data_mut(|d| d.insert_temp(progress_id, progress));
        }
        if resp.drag_stopped() || (resp.changed() && !resp.dragged()) {
            ui.ctx().data_mut(|d| d.remove::<u8>(progress_id));
            actions.push(Action::SetProgress {
                id: task.id.clone(),
                progress,
            });
        }

        // ── Dependencies ─────────────────────────────────────────────
        ui.separator();
        field_label(ui, "Depends on");
        if task.dependencies.is_empty() {
            ui.label(RichText::new("No dependencies yet").size(9.5).color(theme::TEXT_DIM));
        }
        for dep in &task.dependencies {
            let name = view.task(dep).map_or(dep.as_str(), |t| t.title.as_str());
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(format!("{} {name}", egui_phosphor::regular::ARROW_LEFT))
                        .size(11.0)
                        .color(theme::TEXT_SECONDARY),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let del = ui.add_enabled(
                        editable,
                        egui::Button::new(
                            RichText::new(egui_phosphor::regular::X)
                                .size(9.0)
                                .color(theme::TEXT_DIM),
                        )
                        .frame(false),
                    );
                    if del.on_hover_text("Remove dependency").clicked() {
                        actions.push(Action::RemoveDependency {
                            from: dep.clone(),
                            to: task.id.clone(),
                        });
                    }
                });
            });
        }

        let successors: Vec<&Task> = view.tasks.iter().filter(|t| t.depends_on(&task.id)).collect();
        if !successors.is_empty() {
            field_label(ui, "Blocks");
            for next in successors {
                ui.label(
                    RichText::new(format!("{} {}", egui_phosphor::regular::ARROW_RIGHT, next.title))
                        .size(11.0)
                        .color(theme::TEXT_SECONDARY),
                );
            }
        }

        if !editable {
            return;
        }

        // ── Add dependency picker ─────────────────────────────────────
        let candidates = view.dependency_candidates();
        if candidates.is_empty() {
            ui.label(
                RichText::new("Shift+drag between bars to link tasks")
                    .size(9.5)
                    .color(theme::TEXT_DIM),
            );
            return;
        }

        let picker_id = Id::new(("dep-picker", &task.id));
        let mut state: DepPickerState = ui
            .ctx()
            .data_mut(|d| d.get_temp(picker_id).unwrap_or_default());
        if state
            .target_id
            .as_ref()
            .is_some_and(|id| !candidates.iter().any(|c| &c.id == id))
        {
            state.target_id = None;
        }
        let target_label = state
            .target_id
            .as_ref()
            .and_then(|id| candidates.iter().find(|c| &c.id == id))
            .map(|c| c.title.clone())
            .unwrap_or_else(|| "— pick task —".to_string());

        field_label(ui, "Add dependency");
        ui.horizontal(|ui| {
            // Fixed width so long titles don't stretch the panel
            let combo_w = (ui.available_width() - 30.0).clamp(60.0, 220.0);
            egui::ComboBox::from_id_salt("new-dep-target")
                .selected_text(RichText::new(&target_label).size(11.0))
                .width(combo_w)
                .show_ui(ui, |ui| {
                    for candidate in &candidates {
                        let picked = state.target_id.as_ref() == Some(&candidate.id);
                        if ui.selectable_label(picked, candidate.title.as_str()).clicked() {
                            state.target_id = Some(candidate.id.clone());
                        }
                    }
                });

            let can_add = state.target_id.is_some();
            let btn = egui::Button::new(RichText::new("＋").size(13.0).color(Color32::WHITE))
                .fill(if can_add { theme::ACCENT } else { theme::BG_HEADER })
                .rounding(egui::Rounding::same(4.0));
            if ui.add_enabled(can_add, btn).clicked() {
                if let Some(from) = state.target_id.take() {
                    actions.push(Action::AddDependency {
                        from,
                        to: task.id.clone(),
                    });
                }
            }
        });
        ui.ctx().data_mut(|d| d.insert_temp(picker_id, state));

        ui.label(
            RichText::new("Or Shift+drag between bars")
                .size(9.0)
                .color(theme::TEXT_DIM),
        );
    });

    actions
}

/// Modal-style editor for the task in `form`. Edits stay in `form` until
/// saved.
pub fn show_editor_window(form: &mut EditorForm, view: &ViewState, ctx: &Context) -> EditorAction {
    let mut action = EditorAction::None;
    let mut open = true;
    let title = if form.is_draft { "New Task" } else { "Edit Task" };

    Window::new(RichText::new(title).strong().size(14.0))
        .id(Id::new("task-editor"))
        .open(&mut open)
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([340.0, 0.0])
        .show(ctx, |ui| {
            ui.visuals_mut().extreme_bg_color = Color32::from_rgb(20, 20, 28);
            ui.spacing_mut().item_spacing.y = 6.0;

            field_label(ui, "Title");
            ui.add_sized(
                [ui.available_width(), 24.0],
                egui::TextEdit::singleline(&mut form.title)
                    .hint_text("Task title...")
                    .font(egui::FontId::proportional(12.0))
                    .text_color(theme::TEXT_PRIMARY),
            );

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    field_label(ui, "Status");
                    egui::ComboBox::from_id_salt("status_combo")
                        .selected_text(RichText::new(form.status.label()).size(11.0))
                        .width(150.0)
                        .show_ui(ui, |ui| {
                            let mut choices: Vec<TaskStatus> = TaskStatus::all().to_vec();
                            if !choices.contains(&form.status) {
                                choices.push(form.status.clone());
                            }
                            for status in choices {
                                let label = status.label().to_string();
                                ui.selectable_value(&mut form.status, status, label);
                            }
                        });
                });
                ui.vertical(|ui| {
                    field_label(ui, "Priority");
                    egui::ComboBox::from_id_salt("priority_combo")
                        .selected_text(RichText::new(form.priority.label()).size(11.0))
                        .width(150.0)
                        .show_ui(ui, |ui| {
                            for p in TaskPriority::all() {
                                ui.selectable_value(&mut form.priority, *p, p.label());
                            }
                        });
                });
            });

            field_label(ui, "Assignee");
            let assignee_label = form
                .assignee
                .as_deref()
                .map_or("— pick member —", |id| view.members.display_name(id))
                .to_string();
            egui::ComboBox::from_id_salt("assignee_combo")
                .selected_text(RichText::new(assignee_label).size(11.0))
                .width(ui.available_width())
                .show_ui(ui, |ui| {
                    for member in view.members.members() {
                        ui.selectable_value(
                            &mut form.assignee,
                            Some(member.id.clone()),
                            member.display_name.as_str(),
                        );
                    }
                    if view.members.is_empty() {
                        if let Some(user) = &view.current_user {
                            ui.selectable_value(&mut form.assignee, Some(user.clone()), "Me");
                        }
                    }
                });

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    field_label(ui, "Start");
                    let mut start = form.start.unwrap_or_else(dates::today);
                    let resp = ui.add(egui_extras::DatePickerButton::new(&mut start).id_salt("dp_start"));
                    if resp.changed() || form.start.is_none() {
                        form.start = Some(start);
                    }
                });
                ui.add_space(8.0);
                ui.vertical(|ui| {
                    field_label(ui, "Due");
                    let mut due = form.due.unwrap_or_else(dates::today);
                    let resp = ui.add(egui_extras::DatePickerButton::new(&mut due).id_salt("dp_due"));
                    if resp.changed() || form.due.is_none() {
                        form.due = Some(due);
                    }
                });
            });
            if let (Some(start), Some(due)) = (form.start, form.due) {
                if start <= due {
                    let days = dates::duration_days(start, due);
                    ui.label(
                        RichText::new(format!("{days} day{}", if days == 1 { "" } else { "s" }))
                            .size(10.0)
                            .color(theme::TEXT_DIM),
                    );
                }
            }

            field_label(ui, "Progress");
            ui.add_sized(
                [ui.available_width(), 20.0],
                egui::Slider::new(&mut form.progress, 0..=100)
                    .custom_formatter(|v, _| format!("{v:.0}%")),
            );

            field_label(ui, "Notes");
            ui.add_sized(
                [ui.available_width(), 60.0],
                egui::TextEdit::multiline(&mut form.description)
                    .font(egui::FontId::proportional(11.0))
                    .text_color(theme::TEXT_SECONDARY)
                    .hint_text("Add notes or description..."),
            );

            if let Some(error) = &view.inline_error {
                ui.label(RichText::new(error).size(11.0).color(theme::TODAY_LINE));
            }

            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let save = egui::Button::new(RichText::new("Save").color(Color32::WHITE))
                    .fill(theme::ACCENT)
                    .rounding(egui::Rounding::same(4.0));
                if ui.add(save).clicked() {
                    action = EditorAction::Save;
                }
                if ui.button("Cancel").clicked() {
                    action = EditorAction::Cancel;
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let label = if form.is_draft { "Discard" } else { "Delete" };
                    let delete = ui.add(egui::Button::new(
                        RichText::new(format!("{} {label}", egui_phosphor::regular::TRASH))
                            .color(theme::TEXT_SECONDARY),
                    ));
                    if delete.clicked() {
                        action = EditorAction::Delete(form.task_id.clone());
                    }
                });
            });
        });

    if !open {
        action = EditorAction::Cancel;
    }
    action
}

use std::time::{Duration, Instant};

use tokio::runtime::Runtime;
use tracing::warn;

use teamworks_gantt::config::Settings;
use teamworks_gantt::controller::{self, ControllerHandle, EditState, EditorForm, LoadState};
use teamworks_gantt::model::{dates, TimelineScale, TimelineViewport};
use teamworks_gantt::{Action, EditController, ViewState};

use crate::ui;

/// Main application state. Task data lives in the controller task; the app
/// only keeps what is purely visual.
pub struct GanttApp {
    // Keeps the controller's executor alive for the lifetime of the window.
    _runtime: Runtime,
    handle: ControllerHandle,
    pub viewport: TimelineViewport,
    /// Working copy of the open editor form.
    pub form: Option<EditorForm>,
    /// Controller's form as last seen, to spot changes made outside the window.
    form_seed: Option<EditorForm>,
    pub banner_ttl: Duration,
    pub show_about: bool,
    fitted: bool,
}

impl GanttApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        runtime: Runtime,
        controller: EditController,
        settings: &Settings,
    ) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        ui::theme::apply_theme(&cc.egui_ctx);

        let ctx = cc.egui_ctx.clone();
        let (handle, _task) = {
            let _guard = runtime.enter();
            controller::spawn(controller, move || ctx.request_repaint())
        };
        handle.send(Action::Load);

        Self {
            _runtime: runtime,
            handle,
            viewport: TimelineViewport::around_today(settings.default_scale),
            form: None,
            form_seed: None,
            banner_ttl: settings.banner_ttl(),
            show_about: false,
            fitted: false,
        }
    }

    pub fn send(&self, action: Action) {
        if !self.handle.send(action) {
            warn!("controller is gone, action dropped");
        }
    }

    pub fn set_scale(&mut self, scale: TimelineScale) {
        self.viewport.set_scale(scale);
        self.send(Action::SetScale(scale));
    }

    pub fn fit_to_tasks(&mut self, view: &ViewState) {
        self.viewport.fit(view.projection.bounds);
    }

    pub fn scroll_to_today(&mut self) {
        self.viewport.show_date(dates::today());
    }

    /// Add a week-long draft starting today.
    pub fn add_draft(&self) {
        let today = dates::today();
        self.send(Action::CreateDraft {
            title: String::new(),
            start: today,
            due: dates::add_days(today, 6),
        });
    }

    /// Keep the local form in step with the controller: open when it opens,
    /// dropped when it closes, and carrying over drags and progress changes
    /// made while it is open.
    fn sync_form(&mut self, view: &ViewState) {
        match &view.editor {
            Some(editor) => {
                if self.form_seed.as_ref() == Some(editor) {
                    return;
                }
                let seed = self.form_seed.replace(editor.clone());
                match (self.form.as_mut(), seed) {
                    (Some(form), Some(seed)) if form.task_id == editor.task_id => {
                        form.rebase(&seed, editor);
                    }
                    _ => self.form = Some(editor.clone()),
                }
            }
            None => {
                self.form = None;
                self.form_seed = None;
            }
        }
    }

    fn handle_shortcuts(&self, ctx: &egui::Context, view: &ViewState) {
        let typing = ctx.memory(|m| m.focused().is_some());
        let (escape, delete) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::Delete),
            )
        });
        if escape {
            match view.edit_state {
                EditState::Editing(_) => self.send(Action::Cancel),
                EditState::Selected(_) => self.send(Action::Deselect),
                EditState::Idle => {}
            }
        }
        if delete && !typing && !view.read_only {
            if let EditState::Selected(id) = &view.edit_state {
                self.send(Action::Delete(id.clone()));
            }
        }
    }

    fn expire_banner(&self, ctx: &egui::Context, view: &ViewState) {
        if let Some(banner) = &view.banner {
            if banner.is_expired(self.banner_ttl, Instant::now()) {
                self.send(Action::DismissBanner);
            } else {
                ctx.request_repaint_after(self.banner_ttl);
            }
        }
    }

    fn show_task_panel(&self, ctx: &egui::Context, view: &ViewState) {
        egui::SidePanel::left("task_panel")
            .default_width(ui::theme::SIDE_PANEL_WIDTH)
            .min_width(ui::theme::SIDE_PANEL_WIDTH * 0.75)
            .max_width(ui::theme::SIDE_PANEL_WIDTH * 2.0)
            .resizable(true)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_PANEL)
                    .inner_margin(egui::Margin::same(8.0))
                    .stroke(egui::Stroke::new(1.0, ui::theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                if let Some(task) = view.selected_task() {
                    for action in ui::task_editor::show_task_details(task, view, ui) {
                        self.send(action);
                    }
                    ui.add_space(4.0);
                    ui.separator();
                    ui.add_space(2.0);
                }

                match ui::task_table::show_task_table(view, ui) {
                    ui::task_table::TaskTableAction::Select(id) => self.send(Action::Select(id)),
                    ui::task_table::TaskTableAction::Delete(id) => self.send(Action::Delete(id)),
                    ui::task_table::TaskTableAction::Add => self.add_draft(),
                    ui::task_table::TaskTableAction::None => {}
                }
            });
    }

    fn show_status_bar(&self, ctx: &egui::Context, view: &ViewState) {
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(22.0)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    let status = match (&view.load_state, view.read_only) {
                        (LoadState::Loading, _) => "Loading…".to_string(),
                        (LoadState::Failed(_), _) => "Not loaded".to_string(),
                        (LoadState::Ready, true) => "Read-only".to_string(),
                        (LoadState::Ready, false) => match &view.current_user {
                            Some(user) => format!("Editing as {}", view.members.display_name(user)),
                            None => "Ready".to_string(),
                        },
                    };
                    ui.label(
                        egui::RichText::new(status)
                            .size(10.5)
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            egui::RichText::new(format!(
                                "Tasks: {} · Plotted: {}",
                                view.tasks.len(),
                                view.projection.bars.len()
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                        ui.label(
                            egui::RichText::new(" · ")
                                .size(10.5)
                                .color(ui::theme::TEXT_DIM),
                        );
                        let default_ppd = self.viewport.scale.default_pixels_per_day();
                        ui.label(
                            egui::RichText::new(format!(
                                "Zoom: {:.0}%",
                                self.viewport.pixels_per_day / default_ppd * 100.0
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                    });
                });
            });
    }
}

impl eframe::App for GanttApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let view = self.handle.view();
        self.sync_form(&view);
        self.handle_shortcuts(ctx, &view);
        self.expire_banner(ctx, &view);

        if view.load_state == LoadState::Ready && !self.fitted {
            self.fit_to_tasks(&view);
            self.fitted = true;
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, &view, ui);
        });
        if let Some(banner) = &view.banner {
            egui::TopBottomPanel::top("banner")
                .frame(
                    egui::Frame::default()
                        .fill(if banner.is_error() {
                            ui::theme::BANNER_ERROR
                        } else {
                            ui::theme::BANNER_SUCCESS
                        })
                        .inner_margin(egui::Margin::symmetric(10.0, 4.0)),
                )
                .show(ctx, |ui| {
                    if ui::toolbar::show_banner(banner, ui) {
                        self.send(Action::DismissBanner);
                    }
                });
        }
        self.show_status_bar(ctx, &view);

        if view.load_state != LoadState::Ready {
            egui::CentralPanel::default().show(ctx, |ui| {
                if ui::dialogs::show_load_screen(&view.load_state, ui) {
                    self.send(Action::Load);
                }
            });
            return;
        }

        self.show_task_panel(ctx, &view);

        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        egui::CentralPanel::default().frame(chart_frame).show(ctx, |ui| {
            for action in ui::gantt_chart::show_gantt_chart(&view, &mut self.viewport, ui) {
                self.send(action);
            }
        });

        let editor_action = match self.form.as_mut() {
            Some(form) => ui::task_editor::show_editor_window(form, &view, ctx),
            None => ui::task_editor::EditorAction::None,
        };
        match editor_action {
            ui::task_editor::EditorAction::Save => {
                if let Some(form) = self.form.clone() {
                    self.send(Action::Save(form));
                }
            }
            ui::task_editor::EditorAction::Cancel => self.send(Action::Cancel),
            ui::task_editor::EditorAction::Delete(id) => self.send(Action::Delete(id)),
            ui::task_editor::EditorAction::None => {}
        }

        if self.show_about {
            ui::dialogs::show_about_dialog(&mut self.show_about, ctx);
        }
    }
}

use chrono::{Datelike, NaiveDate};
use egui::{Color32, Id, Pos2, Rect, Rounding, Sense, Shape, Stroke, Ui, Vec2};

use teamworks_gantt::controller::DragKind;
use teamworks_gantt::model::timeline::ScaleUnit;
use teamworks_gantt::model::{dates, TaskId, TimelineViewport};
use teamworks_gantt::projection::TimelineBar;
use teamworks_gantt::{Action, ViewState};

use crate::ui::theme;

const ROW_HEIGHT: f32 = theme::ROW_HEIGHT;
const ROW_PADDING: f32 = theme::ROW_GAP;
const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;
const HANDLE_WIDTH: f32 = theme::HANDLE_WIDTH;

/// A bar drag in progress. Dates are only committed on release.
#[derive(Debug, Clone, Copy)]
struct DragSnapshot {
    kind: DragKind,
    start_pointer_x: f32,
    last_pointer_x: f32,
}

impl DragSnapshot {
    fn day_delta(&self, viewport: &TimelineViewport) -> i64 {
        viewport.pixels_to_days(self.last_pointer_x - self.start_pointer_x)
    }
}

/// Shift+drag from one bar to another.
#[derive(Debug, Clone)]
struct LinkDrag {
    from: TaskId,
}

/// Drag across empty timeline to sketch a new task.
#[derive(Debug, Clone, Copy)]
struct SketchDrag {
    start: NaiveDate,
}

fn drag_id(task_id: &TaskId) -> Id {
    Id::new(("drag", task_id))
}

fn link_id() -> Id {
    Id::new("link-drag")
}

fn sketch_id() -> Id {
    Id::new("sketch-drag")
}

fn row_top(origin: Pos2, row: usize) -> f32 {
    origin.y + HEADER_HEIGHT + row as f32 * (ROW_HEIGHT + ROW_PADDING)
}

/// Same clamping the controller applies, so the preview matches the result.
fn preview_dates(start: NaiveDate, end: NaiveDate, kind: DragKind, delta: i64) -> (NaiveDate, NaiveDate) {
    match kind {
        DragKind::Move => (dates::add_days(start, delta), dates::add_days(end, delta)),
        DragKind::ResizeStart => (dates::add_days(start, delta).min(end), end),
        DragKind::ResizeEnd => (start, dates::add_days(end, delta).max(start)),
    }
}

/// Render the Gantt chart area. Returns the actions the user triggered.
pub fn show_gantt_chart(view: &ViewState, viewport: &mut TimelineViewport, ui: &mut Ui) -> Vec<Action> {
    let mut actions = Vec::new();
    let bars = &view.projection.bars;
    let selected = view.edit_state.task_id();
    let editable = !view.read_only;

    let available = ui.available_size();
    let chart_width = viewport.total_width().max(available.x);
    let chart_height = HEADER_HEIGHT + (bars.len() as f32 * (ROW_HEIGHT + ROW_PADDING)) + 40.0;

    // Handle zoom with scroll wheel
    let scroll_delta = ui.input(|i| i.smooth_scroll_delta);
    if ui.rect_contains_pointer(ui.max_rect()) && ui.input(|i| i.modifiers.ctrl) {
        if scroll_delta.y > 0.0 {
            viewport.zoom_in();
        } else if scroll_delta.y < 0.0 {
            viewport.zoom_out();
        }
    }

    egui::ScrollArea::both()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(
                Vec2::new(chart_width, chart_height.max(available.y)),
                Sense::click_and_drag(),
            );
            let origin = response.rect.min;
            let bottom = response.rect.bottom();
            let mut consumed_click = false;

            painter.rect_filled(response.rect, 0.0, theme::BG_DARK);

            for (i, bar) in bars.iter().enumerate() {
                let y = row_top(origin, i);
                let row_bg = if selected == Some(&bar.id) {
                    theme::BG_SELECTED
                } else if i % 2 == 0 {
                    theme::BG_PANEL
                } else {
                    theme::BG_DARK
                };
                painter.rect_filled(
                    Rect::from_min_size(
                        Pos2::new(origin.x, y),
                        Vec2::new(chart_width, ROW_HEIGHT + ROW_PADDING),
                    ),
                    0.0,
                    row_bg,
                );
                painter.line_segment(
                    [
                        Pos2::new(origin.x, y + ROW_HEIGHT + ROW_PADDING),
                        Pos2::new(origin.x + chart_width, y + ROW_HEIGHT + ROW_PADDING),
                    ],
                    Stroke::new(0.5, theme::BORDER_SUBTLE),
                );
            }

            draw_timeline_header(&painter, origin, viewport, chart_width, bottom);
            draw_today_line(&painter, origin, viewport, bottom - origin.y);

            if bars.is_empty() {
                let hint = if editable {
                    "No dated tasks yet. Double-click or drag on the timeline to add one."
                } else {
                    "No dated tasks yet."
                };
                painter.text(
                    Pos2::new(origin.x + available.x / 2.0, origin.y + HEADER_HEIGHT + 40.0),
                    egui::Align2::CENTER_CENTER,
                    hint,
                    theme::font_bar(),
                    theme::TEXT_DIM,
                );
            }

            // Edges go under the bars but need the bar geometry first.
            let edge_layer = painter.add(Shape::Noop);
            let link = ui.ctx().data_mut(|d| d.get_temp::<LinkDrag>(link_id()));
            let mut link_release: Option<(TaskId, Pos2)> = None;
            let mut rects: Vec<(TaskId, Rect)> = Vec::with_capacity(bars.len());

            for (i, bar) in bars.iter().enumerate() {
                let y = row_top(origin, i) + ROW_PADDING;
                let is_selected = selected == Some(&bar.id);
                let is_draft = view.is_draft(&bar.id);

                let snapshot = ui
                    .ctx()
                    .data_mut(|d| d.get_temp::<DragSnapshot>(drag_id(&bar.id)));
                let (start, end) = match snapshot {
                    Some(snap) => preview_dates(bar.start, bar.end, snap.kind, snap.day_delta(viewport)),
                    None => (bar.start, bar.end),
                };
                let bar_rect = draw_task_bar(
                    &painter,
                    origin,
                    viewport,
                    bar,
                    (start, end),
                    y,
                    is_selected,
                    is_draft,
                );
                rects.push((bar.id.clone(), bar_rect));

                let bar_sense = if editable {
                    Sense::click_and_drag()
                } else {
                    Sense::click()
                };
                let bar_response = ui.interact(
                    bar_rect,
                    ui.make_persistent_id(("task-bar", &bar.id)),
                    bar_sense,
                );

                let mut handle_hovered = false;
                if editable {
                    let left_handle_rect = Rect::from_min_max(
                        Pos2::new(bar_rect.left() - HANDLE_WIDTH * 0.5, bar_rect.top()),
                        Pos2::new(bar_rect.left() + HANDLE_WIDTH * 0.5, bar_rect.bottom()),
                    );
                    let right_handle_rect = Rect::from_min_max(
                        Pos2::new(bar_rect.right() - HANDLE_WIDTH * 0.5, bar_rect.top()),
                        Pos2::new(bar_rect.right() + HANDLE_WIDTH * 0.5, bar_rect.bottom()),
                    );
                    let left_response = ui.interact(
                        left_handle_rect.expand(4.0),
                        ui.make_persistent_id(("task-resize-left", &bar.id)),
                        Sense::drag(),
                    );
                    let right_response = ui.interact(
                        right_handle_rect.expand(4.0),
                        ui.make_persistent_id(("task-resize-right", &bar.id)),
                        Sense::drag(),
                    );

                    begin_drag(ui, &left_response, &bar.id, DragKind::ResizeStart);
                    begin_drag(ui, &right_response, &bar.id, DragKind::ResizeEnd);
                    if bar_response.drag_started() {
                        if ui.input(|i| i.modifiers.shift) {
                            ui.ctx().data_mut(|d| {
                                d.insert_temp(link_id(), LinkDrag { from: bar.id.clone() })
                            });
                        } else {
                            begin_drag(ui, &bar_response, &bar.id, DragKind::Move);
                        }
                    }

                    for response in [&left_response, &right_response] {
                        follow_drag(ui, response, &bar.id, egui::CursorIcon::ResizeHorizontal);
                        if let Some(action) = finish_drag(ui, response, &bar.id, viewport) {
                            actions.push(action);
                        }
                    }
                    follow_drag(ui, &bar_response, &bar.id, egui::CursorIcon::Grab);
                    if let Some(action) = finish_drag(ui, &bar_response, &bar.id, viewport) {
                        actions.push(action);
                    }
                    if bar_response.drag_stopped()
                        && link.as_ref().is_some_and(|l| l.from == bar.id)
                    {
                        if let Some(pos) = ui.ctx().input(|i| i.pointer.latest_pos()) {
                            link_release = Some((bar.id.clone(), pos));
                        }
                    }

                    handle_hovered = left_response.hovered() || right_response.hovered();
                    if is_selected || handle_hovered {
                        if handle_hovered {
                            ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
                        } else if bar_response.hovered() {
                            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                        }
                        // Rounded pill handles
                        let handle_h = bar_rect.height() * 0.55;
                        let handle_y = bar_rect.center().y - handle_h / 2.0;
                        let lh = Rect::from_min_size(
                            Pos2::new(bar_rect.left() - 1.5, handle_y),
                            Vec2::new(4.0, handle_h),
                        );
                        let rh = Rect::from_min_size(
                            Pos2::new(bar_rect.right() - 2.5, handle_y),
                            Vec2::new(4.0, handle_h),
                        );
                        painter.rect_filled(lh, Rounding::same(2.0), theme::HANDLE_COLOR);
                        painter.rect_filled(rh, Rounding::same(2.0), theme::HANDLE_COLOR);
                    }
                }

                if bar_response.clicked() {
                    if !is_selected {
                        actions.push(Action::Select(bar.id.clone()));
                    }
                    consumed_click = true;
                }
                if bar_response.double_clicked() && editable {
                    actions.push(Action::Select(bar.id.clone()));
                    actions.push(Action::OpenEditor);
                    consumed_click = true;
                }

                if (bar_response.hovered() || handle_hovered) && snapshot.is_none() && link.is_none() {
                    egui::show_tooltip_at_pointer(
                        ui.ctx(),
                        ui.layer_id(),
                        Id::new(("task-tip", &bar.id)),
                        |ui| show_bar_tooltip(view, bar, ui),
                    );
                }

                bar_response.context_menu(|ui| {
                    show_bar_menu(view, bar, editable, &mut actions, ui);
                });
            }

            let mut edge_shapes = Vec::with_capacity(view.projection.edges.len() * 2);
            for edge in &view.projection.edges {
                let from = rects.iter().find(|(id, _)| id == &edge.from);
                let to = rects.iter().find(|(id, _)| id == &edge.to);
                if let (Some((_, from)), Some((_, to))) = (from, to) {
                    let pending = view.is_draft(&edge.from) || view.is_draft(&edge.to);
                    let color = if pending {
                        theme::EDGE_PENDING
                    } else {
                        theme::EDGE_LINE
                    };
                    push_edge(&mut edge_shapes, *from, *to, color);
                }
            }
            painter.set(edge_layer, Shape::Vec(edge_shapes));

            if let Some(link) = &link {
                let from = rects.iter().find(|(id, _)| id == &link.from);
                let pointer = ui.ctx().input(|i| i.pointer.latest_pos());
                if let (Some((_, from)), Some(pointer)) = (from, pointer) {
                    let stroke = Stroke::new(1.5, theme::ACCENT);
                    painter.line_segment([from.right_center(), pointer], stroke);
                    painter.circle_filled(from.right_center(), theme::CONNECTOR_RADIUS, theme::ACCENT);
                    painter.circle_stroke(pointer, theme::CONNECTOR_RADIUS, stroke);
                }
            }
            if let Some((from, pos)) = link_release {
                ui.ctx().data_mut(|d| d.remove::<LinkDrag>(link_id()));
                let target = rects
                    .iter()
                    .find(|(_, r)| r.expand2(Vec2::new(0.0, ROW_PADDING + theme::BAR_INSET)).contains(pos));
                if let Some((to, _)) = target {
                    if to != &from {
                        actions.push(Action::AddDependency {
                            from,
                            to: to.clone(),
                        });
                    }
                }
            } else if link.is_some() && !ui.ctx().input(|i| i.pointer.any_down()) {
                // Released outside any bar.
                ui.ctx().data_mut(|d| d.remove::<LinkDrag>(link_id()));
            }

            let timeline_x = |pos: Pos2| viewport.x_to_date(pos.x - origin.x);
            let on_timeline = |pos: Pos2| pos.y > origin.y + HEADER_HEIGHT;

            if editable {
                if response.drag_started() {
                    if let Some(pos) = response.interact_pointer_pos().filter(|p| on_timeline(*p)) {
                        let start = timeline_x(pos);
                        ui.ctx().data_mut(|d| d.insert_temp(sketch_id(), SketchDrag { start }));
                    }
                }
                let sketch = ui.ctx().data_mut(|d| d.get_temp::<SketchDrag>(sketch_id()));
                if let Some(sketch) = sketch {
                    let pointer = ui.ctx().input(|i| i.pointer.latest_pos());
                    let span = pointer.map(|pos| {
                        let here = timeline_x(pos);
                        (sketch.start.min(here), sketch.start.max(here))
                    });
                    if let Some((start, end)) = span {
                        let x0 = origin.x + viewport.date_to_x(start);
                        let x1 = origin.x + viewport.date_to_x(dates::add_days(end, 1));
                        let y = row_top(origin, bars.len()) + ROW_PADDING + theme::BAR_INSET;
                        let ghost = Rect::from_min_size(
                            Pos2::new(x0, y),
                            Vec2::new((x1 - x0).max(6.0), ROW_HEIGHT - theme::BAR_INSET * 2.0),
                        );
                        painter.rect_filled(ghost, Rounding::same(theme::BAR_ROUNDING), theme::BG_SELECTED);
                        painter.rect_stroke(
                            ghost,
                            Rounding::same(theme::BAR_ROUNDING),
                            Stroke::new(1.0, theme::BORDER_ACCENT),
                        );
                    }
                    if response.drag_stopped() || !ui.ctx().input(|i| i.pointer.any_down()) {
                        ui.ctx().data_mut(|d| d.remove::<SketchDrag>(sketch_id()));
                        if let Some((start, end)) = span {
                            actions.push(Action::CreateDraft {
                                title: String::new(),
                                start,
                                due: end,
                            });
                        }
                    }
                }

                if response.double_clicked() && !consumed_click {
                    if let Some(pos) = response.interact_pointer_pos().filter(|p| on_timeline(*p)) {
                        let day = timeline_x(pos);
                        actions.push(Action::CreateDraft {
                            title: String::new(),
                            start: day,
                            due: day,
                        });
                        consumed_click = true;
                    }
                }
            }

            // Empty click on background clears selection
            if response.clicked() && !consumed_click && selected.is_some() {
                actions.push(Action::Deselect);
            }
        });

    actions
}

fn begin_drag(ui: &Ui, response: &egui::Response, id: &TaskId, kind: DragKind) {
    if !response.drag_started() {
        return;
    }
    if let Some(pos) = response.interact_pointer_pos() {
        ui.ctx().data_mut(|d| {
            d.insert_temp(
                drag_id(id),
                DragSnapshot {
                    kind,
                    start_pointer_x: pos.x,
                    last_pointer_x: pos.x,
                },
            )
        });
    }
}

fn follow_drag(ui: &Ui, response: &egui::Response, id: &TaskId, cursor: egui::CursorIcon) {
    if !response.dragged() {
        return;
    }
    let Some(pos) = response.interact_pointer_pos() else {
        return;
    };
    ui.ctx().data_mut(|d| {
        if let Some(mut snap) = d.get_temp::<DragSnapshot>(drag_id(id)) {
            snap.last_pointer_x = pos.x;
            d.insert_temp(drag_id(id), snap);
        }
    });
    ui.ctx().set_cursor_icon(cursor);
}

fn finish_drag(ui: &Ui, response: &egui::Response, id: &TaskId, viewport: &TimelineViewport) -> Option<Action> {
    if !response.drag_stopped() {
        return None;
    }
    let snapshot = ui.ctx().data_mut(|d| {
        let snap = d.get_temp::<DragSnapshot>(drag_id(id));
        d.remove::<DragSnapshot>(drag_id(id));
        snap
    })?;
    let day_delta = snapshot.day_delta(viewport);
    (day_delta != 0).then(|| Action::Drag {
        id: id.clone(),
        kind: snapshot.kind,
        day_delta,
    })
}

fn show_bar_tooltip(view: &ViewState, bar: &TimelineBar, ui: &mut Ui) {
    ui.strong(&bar.label);
    ui.label(format!(
        "{} → {}  ({} day{})",
        bar.start.format("%d/%m/%Y"),
        bar.end.format("%d/%m/%Y"),
        bar.duration_days,
        if bar.duration_days == 1 { "" } else { "s" },
    ));
    ui.label(format!("Progress: {}%", (bar.progress * 100.0).round() as i32));
    ui.label(format!("Status: {}  ·  Priority: {}", bar.status, bar.priority.label()));
    if let Some(assignee) = view.task(&bar.id).and_then(|t| t.assigned_to.as_deref()) {
        ui.label(format!("Assigned to {}", view.members.display_name(assignee)));
    }
    if view.is_draft(&bar.id) {
        ui.label(egui::RichText::new("Not saved yet").italics().color(theme::TEXT_DIM));
    }
}

fn show_bar_menu(view: &ViewState, bar: &TimelineBar, editable: bool, actions: &mut Vec<Action>, ui: &mut Ui) {
    if !editable {
        ui.label(egui::RichText::new("Read-only").weak());
        return;
    }
    if ui.button("Edit…").clicked() {
        actions.push(Action::Select(bar.id.clone()));
        actions.push(Action::OpenEditor);
        ui.close_menu();
    }
    if ui.button("Delete").clicked() {
        actions.push(Action::Delete(bar.id.clone()));
        ui.close_menu();
    }
    let Some(task) = view.task(&bar.id) else {
        return;
    };
    if task.dependencies.is_empty() {
        return;
    }
    ui.separator();
    for dep in &task.dependencies {
        let name = view.task(dep).map_or(dep.as_str(), |t| t.title.as_str());
        if ui.button(format!("Remove link from {name}")).clicked() {
            actions.push(Action::RemoveDependency {
                from: dep.clone(),
                to: bar.id.clone(),
            });
            ui.close_menu();
        }
    }
}

/// Elbow connector from the end of `from` to the start of `to`, with an
/// arrow head.
fn push_edge(shapes: &mut Vec<Shape>, from: Rect, to: Rect, color: Color32) {
    let start = from.right_center();
    let end = to.left_center();
    let stroke = Stroke::new(1.2, color);
    let points = if end.x - start.x >= 16.0 {
        let mid_x = start.x + 8.0;
        vec![start, Pos2::new(mid_x, start.y), Pos2::new(mid_x, end.y), end]
    } else {
        let between = (start.y + end.y) / 2.0;
        vec![
            start,
            Pos2::new(start.x + 8.0, start.y),
            Pos2::new(start.x + 8.0, between),
            Pos2::new(end.x - 8.0, between),
            Pos2::new(end.x - 8.0, end.y),
            end,
        ]
    };
    shapes.push(Shape::line(points, stroke));
    shapes.push(Shape::convex_polygon(
        vec![end, end + Vec2::new(-6.0, -4.0), end + Vec2::new(-6.0, 4.0)],
        color,
        Stroke::NONE,
    ));
}

fn draw_timeline_header(
    painter: &egui::Painter,
    origin: Pos2,
    viewport: &TimelineViewport,
    width: f32,
    bottom: f32,
) {
    // Background for header
    painter.rect_filled(
        Rect::from_min_size(origin, Vec2::new(width, HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );

    // Bottom border of header
    painter.line_segment(
        [
            Pos2::new(origin.x, origin.y + HEADER_HEIGHT),
            Pos2::new(origin.x + width, origin.y + HEADER_HEIGHT),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let [major, minor] = viewport.scale.tiers();

    let mut date = minor.floor(viewport.start);
    while date <= viewport.end {
        let next = minor.next(date);
        let x = origin.x + viewport.date_to_x(date);
        let cell = viewport.date_to_x(next) - viewport.date_to_x(date);

        painter.line_segment(
            [
                Pos2::new(x, origin.y + HEADER_HEIGHT),
                Pos2::new(x, bottom),
            ],
            Stroke::new(0.5, theme::GRID_LINE),
        );

        if cell >= 18.0 {
            let is_weekend =
                minor.unit == ScaleUnit::Day && date.weekday().num_days_from_monday() >= 5;
            let color = if is_weekend {
                theme::TEXT_DIM
            } else {
                theme::TEXT_SECONDARY
            };
            painter.text(
                Pos2::new(x + 3.0, origin.y + 30.0),
                egui::Align2::LEFT_CENTER,
                minor.format(date),
                theme::font_sub(),
                color,
            );
        }
        date = next;
    }

    let mut date = major.floor(viewport.start);
    while date <= viewport.end {
        let x = origin.x + viewport.date_to_x(date).max(0.0);
        painter.line_segment(
            [Pos2::new(x, origin.y), Pos2::new(x, origin.y + 20.0)],
            Stroke::new(1.0, theme::BORDER_SUBTLE),
        );
        painter.text(
            Pos2::new(x + 5.0, origin.y + 11.0),
            egui::Align2::LEFT_CENTER,
            major.format(date),
            theme::font_header(),
            theme::TEXT_PRIMARY,
        );
        date = major.next(date);
    }
}

fn draw_today_line(painter: &egui::Painter, origin: Pos2, viewport: &TimelineViewport, height: f32) {
    let today = dates::today();
    if today < viewport.start || today > viewport.end {
        return;
    }
    let x = origin.x + viewport.date_to_x(today);

    painter.line_segment(
        [
            Pos2::new(x, origin.y + HEADER_HEIGHT),
            Pos2::new(x, origin.y + height),
        ],
        Stroke::new(1.5, theme::TODAY_LINE),
    );

    // Top badge
    let badge_w = 42.0;
    let badge_rect = Rect::from_min_size(
        Pos2::new(x - badge_w / 2.0, origin.y + HEADER_HEIGHT - 1.0),
        Vec2::new(badge_w, 14.0),
    );
    painter.rect_filled(badge_rect, Rounding::same(3.0), theme::TODAY_LINE);
    painter.text(
        badge_rect.center(),
        egui::Align2::CENTER_CENTER,
        "Today",
        theme::font_small(),
        Color32::WHITE,
    );
}

#[allow(clippy::too_many_arguments)]
fn draw_task_bar(
    painter: &egui::Painter,
    origin: Pos2,
    viewport: &TimelineViewport,
    bar: &TimelineBar,
    (start, end): (NaiveDate, NaiveDate),
    y: f32,
    is_selected: bool,
    is_draft: bool,
) -> Rect {
    let x_start = origin.x + viewport.date_to_x(start);
    // `end` is inclusive
    let x_end = origin.x + viewport.date_to_x(dates::add_days(end, 1));
    let bar_width = (x_end - x_start).max(6.0);
    let inset = theme::BAR_INSET;

    let bar_rect = Rect::from_min_size(
        Pos2::new(x_start, y + inset),
        Vec2::new(bar_width, ROW_HEIGHT - inset * 2.0),
    );
    let rounding = Rounding::same(theme::BAR_ROUNDING);
    let color = if is_draft {
        theme::DRAFT_BAR
    } else {
        theme::status_color(&bar.status)
    };

    // Soft shadow
    let shadow_rect = bar_rect.translate(Vec2::new(1.0, 2.0));
    painter.rect_filled(shadow_rect, rounding, Color32::from_black_alpha(35));

    painter.rect_filled(bar_rect, rounding, color);
    // Lighter top highlight
    let highlight_rect = Rect::from_min_size(
        bar_rect.min,
        Vec2::new(bar_width, (bar_rect.height() * 0.45).max(4.0)),
    );
    painter.rect_filled(
        highlight_rect,
        Rounding {
            nw: theme::BAR_ROUNDING,
            ne: theme::BAR_ROUNDING,
            sw: 0.0,
            se: 0.0,
        },
        Color32::from_white_alpha(25),
    );

    // Priority stripe
    let stripe = Rect::from_min_size(
        Pos2::new(bar_rect.left(), bar_rect.bottom() - 3.0),
        Vec2::new(bar_width, 3.0),
    );
    painter.rect_filled(
        stripe,
        Rounding {
            nw: 0.0,
            ne: 0.0,
            sw: theme::BAR_ROUNDING,
            se: theme::BAR_ROUNDING,
        },
        theme::priority_color(bar.priority),
    );

    // Progress fill (darkened overlay)
    if bar.progress > 0.0 {
        let progress_width = bar_width * bar.progress.clamp(0.0, 1.0);
        let progress_rect = Rect::from_min_size(
            bar_rect.min,
            Vec2::new(progress_width, bar_rect.height()),
        );
        painter.rect_filled(progress_rect, rounding, theme::PROGRESS_OVERLAY);

        if bar.progress < 0.98 {
            let tick_x = bar_rect.left() + progress_width;
            painter.line_segment(
                [
                    Pos2::new(tick_x, bar_rect.top() + 2.0),
                    Pos2::new(tick_x, bar_rect.bottom() - 2.0),
                ],
                Stroke::new(1.0, Color32::from_white_alpha(60)),
            );
        }
    }

    if is_draft {
        let r = bar_rect.expand(1.0);
        let outline = [
            r.left_top(),
            r.right_top(),
            r.right_bottom(),
            r.left_bottom(),
            r.left_top(),
        ];
        painter.extend(Shape::dashed_line(
            &outline,
            Stroke::new(1.0, theme::EDGE_PENDING),
            4.0,
            3.0,
        ));
    }

    // Selection glow
    if is_selected {
        painter.rect_stroke(
            bar_rect.expand(1.5),
            Rounding::same(theme::BAR_ROUNDING + 1.5),
            Stroke::new(2.0, theme::BORDER_ACCENT),
        );
    }

    // Label on the bar when it fits, beside it otherwise
    let galley = painter.layout_no_wrap(bar.label.clone(), theme::font_bar(), theme::TEXT_ON_BAR);
    let text_y = y + inset + (bar_rect.height() - galley.size().y) / 2.0;
    if bar_width > galley.size().x + 12.0 || bar_width > 120.0 {
        let clipped = painter.with_clip_rect(bar_rect);
        clipped.galley(
            Pos2::new(bar_rect.left() + 6.0, text_y),
            galley,
            Color32::TRANSPARENT,
        );
    } else {
        painter.text(
            Pos2::new(bar_rect.right() + 8.0, bar_rect.center().y),
            egui::Align2::LEFT_CENTER,
            &bar.label,
            theme::font_bar(),
            theme::TEXT_SECONDARY,
        );
    }

    bar_rect
}

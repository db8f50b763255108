//! Side panel for `ViewerApp`: batch selector, inspector readout and the
//! scalar plot.

use eframe::egui;

use simview::widgets::{Inspector, ScalarPlot};

use super::ViewerApp;
use crate::ui;

impl ViewerApp {
    pub fn draw_side_panel(&mut self, ui: &mut egui::Ui) {
        self.draw_batch_selector(ui);
        ui.separator();
        self.draw_plot(ui);
        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| {
            draw_inspector(ui, &self.widgets.inspector);
        });
    }

    fn draw_batch_selector(&mut self, ui: &mut egui::Ui) {
        let Some(layout) = self.session.layout().cloned() else {
            ui.weak("No batches");
            return;
        };
        ui.horizontal(|ui| {
            ui.strong("Batch");
            let active = self.session.active_batch();
            let color = layout.color(active).map(ui::color32).unwrap_or(egui::Color32::GRAY);
            ui::swatch(ui, color);
            let mut selected = active;
            egui::ComboBox::from_id_salt("active_batch")
                .selected_text(format!("{} of {}", active, layout.sim_batches()))
                .show_ui(ui, |ui| {
                    for b in 0..layout.sim_batches() {
                        let (row, col) = layout.row_col(b).unwrap_or((0, 0));
                        ui.selectable_value(&mut selected, b, format!("{}  (row {}, col {})", b, row, col));
                    }
                });
            if selected != active {
                self.session.set_active_batch(selected);
            }
        });
        ui.weak("Shift + arrows move between batches");
    }

    fn draw_plot(&mut self, ui: &mut egui::Ui) {
        let plot = &mut self.widgets.plot;
        if plot.scalar_names.is_empty() {
            ui.weak("No scalars");
            return;
        }
        let mut chosen = plot.selected.clone().unwrap_or_default();
        egui::ComboBox::from_id_salt("scalar")
            .selected_text(chosen.as_str())
            .show_ui(ui, |ui| {
                for name in &plot.scalar_names {
                    ui.selectable_value(&mut chosen, name.clone(), name.as_str());
                }
            });
        if plot.selected.as_deref() != Some(chosen.as_str()) {
            plot.select(&chosen);
            self.session.request_redraw();
        }
        paint_plot(ui, &self.widgets.plot);
    }
}

fn paint_plot(ui: &mut egui::Ui, plot: &ScalarPlot) {
    let size = egui::vec2(ui.available_width(), 160.0);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let rect = response.rect.shrink(4.0);
    painter.rect_filled(response.rect, 2.0, ui.visuals().extreme_bg_color);

    let t_max = plot
        .series
        .iter()
        .filter_map(|s| s.points.last().map(|p| p.0))
        .fold(0.0_f64, f64::max)
        .max(1e-9);
    let (lo, hi) = plot.value_range;
    let span = if hi > lo { hi - lo } else { 1.0 };
    let to_screen = |t: f64, v: f32| {
        egui::pos2(
            rect.left() + (t / t_max) as f32 * rect.width(),
            rect.bottom() - (v - lo) / span * rect.height(),
        )
    };

    // inactive batches first so the active one stays on top
    let mut series: Vec<_> = plot.series.iter().collect();
    series.sort_by_key(|s| s.batch == plot.active_batch);
    for s in series {
        let active = s.batch == plot.active_batch;
        let color = ui::color32(s.color);
        let color = if active { color } else { color.gamma_multiply(0.45) };
        let points: Vec<egui::Pos2> = s.points.iter().map(|&(t, v)| to_screen(t, v)).collect();
        let width = if active { 2.0 } else { 1.0 };
        painter.add(egui::Shape::line(points, egui::Stroke::new(width, color)));
    }

    let x = to_screen(plot.cursor_time, lo).x;
    painter.line_segment(
        [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
        egui::Stroke::new(1.0, ui.visuals().text_color()),
    );
    painter.text(
        rect.left_top(),
        egui::Align2::LEFT_TOP,
        format!("{:.3}", hi),
        egui::FontId::monospace(10.0),
        ui.visuals().weak_text_color(),
    );
    painter.text(
        rect.left_bottom(),
        egui::Align2::LEFT_BOTTOM,
        format!("{:.3}", lo),
        egui::FontId::monospace(10.0),
        ui.visuals().weak_text_color(),
    );
}

fn draw_inspector(ui: &mut egui::Ui, inspector: &Inspector) {
    ui.strong(format!("Batch {} at {}", inspector.batch, ui::format_time(inspector.time)));

    if !inspector.scalars.is_empty() {
        egui::Grid::new("scalars").striped(true).show(ui, |ui| {
            for (name, value) in &inspector.scalars {
                ui.label(name.as_str());
                ui.monospace(format!("{:.4}", value));
                ui.end_row();
            }
        });
    }

    for body in &inspector.bodies {
        ui.add_space(6.0);
        egui::CollapsingHeader::new(body.name.as_str())
            .default_open(true)
            .show(ui, |ui| {
                egui::Grid::new(format!("body_{}", body.name)).show(ui, |ui| {
                    ui.label("position");
                    ui.monospace(ui::format_vec3(body.position));
                    ui.end_row();
                    ui.label("rpy (deg)");
                    ui.monospace(ui::format_vec3(body.euler_deg));
                    ui.end_row();
                    let [w, x, y, z] = body.orientation_wxyz;
                    ui.label("quat (wxyz)");
                    ui.monospace(format!("{:.3} {:.3} {:.3} {:.3}", w, x, y, z));
                    ui.end_row();
                    for (attr, v) in &body.vectors {
                        ui.label(attr.to_string());
                        ui.monospace(ui::format_vec3(*v));
                        ui.end_row();
                    }
                    if let Some(n) = body.active_contacts {
                        ui.label("contacts");
                        ui.monospace(format!("{} active", n));
                        ui.end_row();
                    }
                });
            });
    }
}

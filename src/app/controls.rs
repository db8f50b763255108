//! Playback bar and keyboard shortcuts for `ViewerApp`.

use eframe::egui;

use simview::layout::Direction;

use super::ViewerApp;
use crate::ui;

const FORMATS: [&str; 3] = ["png", "jpeg", "gif"];

impl ViewerApp {
    /// Space toggles play; arrows step while paused; shift + arrows move the
    /// active batch; `C` re-frames the camera.
    pub fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (space, left, right, up, down, shift, frame) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::ArrowLeft),
                i.key_pressed(egui::Key::ArrowRight),
                i.key_pressed(egui::Key::ArrowUp),
                i.key_pressed(egui::Key::ArrowDown),
                i.modifiers.shift,
                i.key_pressed(egui::Key::C),
            )
        });

        if space {
            self.session.toggle_play();
        }
        if shift {
            for (pressed, dir) in [
                (left, Direction::Left),
                (right, Direction::Right),
                (up, Direction::Up),
                (down, Direction::Down),
            ] {
                if pressed {
                    self.session.move_active_batch(dir);
                }
            }
        } else {
            if right {
                self.session.step_forward();
            }
            if left {
                self.session.step_backward();
            }
        }
        if frame {
            self.renderer.reset_camera();
            self.scheduler.request_render();
        }
    }

    /// Render the top playback strip.
    pub fn draw_playback_bar(&mut self, ui: &mut egui::Ui) {
        let bar = self.widgets.playback_bar.clone();
        let has_states = bar.len > 0;

        ui.horizontal(|ui| {
            ui.add_space(4.0);

            if ui
                .add_enabled(has_states && !bar.playing, egui::Button::new("\u{23EE}"))
                .on_hover_text("Step back")
                .clicked()
            {
                self.session.step_backward();
            }
            let play_label = if bar.playing { "\u{23F8}" } else { "\u{25B6}" };
            if ui
                .add_enabled(has_states, egui::Button::new(play_label).min_size(egui::vec2(32.0, 24.0)))
                .clicked()
            {
                self.session.toggle_play();
            }
            if ui
                .add_enabled(has_states && !bar.playing, egui::Button::new("\u{23ED}"))
                .on_hover_text("Step forward")
                .clicked()
            {
                self.session.step_forward();
            }

            // Time slider
            let mut t = bar.current_time;
            let slider = egui::Slider::new(&mut t, 0.0..=bar.total_time.max(0.0))
                .show_value(false);
            let response = ui.add_enabled(has_states, slider);
            if response.changed() {
                self.session.go_to_time(t);
            }
            ui.monospace(format!(
                "{} / {}  [{}/{}]",
                ui::format_time(bar.current_time),
                ui::format_time(bar.total_time),
                bar.index,
                bar.len.saturating_sub(1)
            ));

            ui.separator();

            let mut speed = if bar.speed > 0.0 { bar.speed } else { self.session.config().playback_speed };
            let speed_edit = egui::DragValue::new(&mut speed)
                .speed(0.05)
                .range(0.05..=16.0)
                .suffix("x");
            if ui.add(speed_edit).changed() {
                self.session.set_speed(speed);
                self.session.request_redraw();
            }

            ui.separator();

            let mut format = self.session.config().recording_format.clone();
            egui::ComboBox::from_id_salt("record_format")
                .selected_text(format.as_str())
                .width(60.0)
                .show_ui(ui, |ui| {
                    for f in FORMATS {
                        ui.selectable_value(&mut format, f.to_string(), f);
                    }
                });
            if format != self.session.config().recording_format {
                self.session.set_recording_format(&format);
            }

            if bar.recording {
                let label = format!("\u{23F9} {} frames", bar.recorded_frames);
                if ui.button(egui::RichText::new(label).color(egui::Color32::RED)).clicked() {
                    if let Some(recording) = self.session.stop_recording() {
                        self.save_recording(recording);
                    }
                    self.session.request_redraw();
                }
            } else if ui.add_enabled(has_states, egui::Button::new("\u{23FA} Record")).clicked() {
                if let Err(e) = self.session.start_recording() {
                    self.status = Some(e.to_string());
                }
            }

            ui.separator();
            if ui.button("\u{21BB}").on_hover_text("Reload").clicked() {
                self.reload();
            }
            if self.loading {
                ui.spinner();
            }
            if let Some(status) = &self.status {
                ui.colored_label(egui::Color32::from_rgb(200, 90, 40), status.as_str());
            }
        });
    }
}

//! Main viewport for `ViewerApp`: shows the rendered frame and turns drags
//! and scrolls into camera moves.

use eframe::egui;

use simview::render::FrameRenderer;

use super::ViewerApp;

/// Frame buffer size for a panel, at least one pixel each way.
fn buffer_size(rect: egui::Rect) -> (usize, usize) {
    (rect.width().max(1.0) as usize, rect.height().max(1.0) as usize)
}

impl ViewerApp {
    pub fn draw_viewport(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let size = ui.available_size();
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let rect = response.rect;

        // Follow the panel size; the new buffer is filled on the next tick.
        let (w, h) = buffer_size(rect);
        let frame = self.renderer.frame();
        if frame.width() != w || frame.height() != h {
            self.renderer.resize(w, h);
            self.scheduler.request_render();
            ctx.request_repaint();
        }

        // Drag to orbit
        if response.dragged() {
            let delta = response.drag_delta();
            self.renderer.camera_mut().orbit(-delta.x * 0.008, delta.y * 0.008);
            self.scheduler.request_render();
            ctx.request_repaint();
        }

        // Scroll to dolly in/out
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll.abs() > 0.1 {
                self.renderer.camera_mut().zoom(1.0 - scroll * 0.003);
                self.scheduler.request_render();
                ctx.request_repaint();
            }
        }

        if response.double_clicked() {
            self.renderer.reset_camera();
            self.scheduler.request_render();
            ctx.request_repaint();
        }

        if self.texture_stale {
            let frame = self.renderer.frame();
            let image = egui::ColorImage::from_rgba_unmultiplied([frame.width(), frame.height()], frame.pixels());
            match &mut self.texture {
                Some(tex) => tex.set(image, egui::TextureOptions::LINEAR),
                None => {
                    self.texture = Some(ctx.load_texture("scene_view", image, egui::TextureOptions::LINEAR));
                }
            }
            self.texture_stale = false;
        }

        if let Some(tex) = &self.texture {
            painter.image(
                tex.id(),
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        if self.session.scene().is_none() {
            let text = if self.loading { "Waiting for model\u{2026}" } else { "No model loaded" };
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                text,
                egui::FontId::proportional(18.0),
                egui::Color32::DARK_GRAY,
            );
        }
    }
}

//! Small egui helpers shared by the viewer panels.

use eframe::egui;

use simview::layout::Rgba;

pub fn color32(c: Rgba) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

/// Filled square in `color`, sized to the current text line.
pub fn swatch(ui: &mut egui::Ui, color: egui::Color32) {
    let h = ui.text_style_height(&egui::TextStyle::Body);
    let (rect, _) = ui.allocate_exact_size(egui::vec2(h, h), egui::Sense::hover());
    ui.painter().rect_filled(rect, 2.0, color);
}

/// `m:ss.mmm`, or `s.mmm s` under a minute.
pub fn format_time(t: f64) -> String {
    let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
    let minutes = (t / 60.0).floor();
    let secs = t - minutes * 60.0;
    if minutes > 0.0 {
        format!("{}:{:06.3}", minutes as u64, secs)
    } else {
        format!("{:.3} s", secs)
    }
}

pub fn format_vec3(v: [f32; 3]) -> String {
    format!("{:+.3} {:+.3} {:+.3}", v[0], v[1], v[2])
}

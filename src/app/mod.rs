//! `ViewerApp`: the top-level egui application state.
//!
//! This module declares the `ViewerApp` struct and its `eframe::App` impl.
//! Drawing is split across the sibling sub-modules:
//!
//! - `controls`: playback bar and keyboard shortcuts
//! - `viewport`: frame texture upload and camera interaction
//! - `panels`: batch selector, inspector and scalar plot

pub mod controls;
pub mod panels;
pub mod viewport;

use std::sync::Arc;
use std::time::Duration;

use eframe::egui;

use simview::net::transport::Waker;
use simview::net::{Connection, SimulationSource};
use simview::playback::Recording;
use simview::render::SoftwareRenderer;
use simview::scheduler::FrameScheduler;
use simview::session::Applied;
use simview::widgets::Widgets;
use simview::{Session, ViewerConfig};

// ─── Application state ───────────────────────────────────────────────────────

pub struct ViewerApp {
    pub session: Session,
    pub connection: Connection,
    pub scheduler: FrameScheduler,
    pub renderer: SoftwareRenderer,
    pub widgets: Widgets,
    pub texture: Option<egui::TextureHandle>,
    /// The frame buffer holds pixels the texture has not seen yet.
    pub texture_stale: bool,
    pub status: Option<String>,
    pub loading: bool,
}

impl ViewerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: ViewerConfig,
        source: SimulationSource,
        timeout: Duration,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        let waker: Waker = Arc::new(move || ctx.request_repaint());
        log::info!("Opening {}", source);
        let connection = Connection::open(source, timeout, Some(waker));

        let renderer = SoftwareRenderer::new(config.frame_width, config.frame_height, config.terrain_stride);
        let scheduler = FrameScheduler::new(&config);
        Self {
            session: Session::new(config),
            connection,
            scheduler,
            renderer,
            widgets: Widgets::default(),
            texture: None,
            texture_stale: true,
            status: None,
            loading: true,
        }
    }

    /// Drain the transport channel into the session.
    fn poll_transport(&mut self) {
        for event in self.connection.poll() {
            match self.session.apply(event) {
                Ok(Applied::ModelLoaded) => {
                    self.status = None;
                    self.scheduler.request_render();
                }
                Ok(Applied::StatesLoaded) => {
                    self.loading = false;
                }
                Ok(Applied::StatesDropped) => {}
                Ok(Applied::TransportFailed(msg)) => {
                    self.loading = false;
                    self.status = Some(msg);
                }
                Err(e) => {
                    log::warn!("Load failed: {}", e);
                    self.loading = false;
                    self.status = Some(e.to_string());
                }
            }
        }
    }

    /// Throw the current scene away and fetch the source again.
    pub fn reload(&mut self) {
        self.session.clear();
        self.connection.reconnect();
        self.loading = true;
        self.status = None;
    }

    pub fn save_recording(&mut self, recording: Recording) {
        if recording.is_empty() {
            self.status = Some("Recording captured no frames".to_string());
            return;
        }
        let dir = self.session.config().recording_dir.clone();
        match recording.save(&dir) {
            Ok(files) => {
                log::info!("Wrote {} file(s) to {}", files.len(), dir.display());
                self.status = Some(format!("Saved {} file(s) to {}", files.len(), dir.display()));
            }
            Err(e) => {
                log::warn!("Saving recording failed: {}", e);
                self.status = Some(format!("Saving recording failed: {}", e));
            }
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_transport();
        self.handle_keys(ctx);

        let now = ctx.input(|i| i.time);
        let report = self.scheduler.tick(
            now,
            &mut self.session,
            &mut self.renderer,
            &mut self.widgets.all_mut(),
        );
        if report.rendered {
            self.texture_stale = true;
        }
        if let Some(recording) = report.events.finished_recording {
            self.save_recording(recording);
        }

        egui::TopBottomPanel::top("playback").show(ctx, |ui| {
            self.draw_playback_bar(ui);
        });
        egui::SidePanel::right("inspector")
            .default_width(320.0)
            .show(ctx, |ui| {
                self.draw_side_panel(ui);
            });
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.draw_viewport(ui, ctx);
            });

        let playing = self.session.controller().is_some_and(|c| c.is_playing());
        if playing {
            ctx.request_repaint();
        }
    }
}

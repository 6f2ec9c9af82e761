use crate::collectors::Collector;
use crate::config::Config;
use crate::display::{format_snapshot, window_origin, Ticker};
use crate::state::{Command, CommandSender, DisplayState, Effect, Position};
use crate::tray::{self, TrayHandle};
use eframe::egui::{
    self, Color32, Margin, PointerButton, RichText, Sense, Stroke, Vec2, ViewportBuilder,
    ViewportCommand,
};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const WINDOW_TITLE: &str = "System Stats";
const PANEL_FILL: [u8; 3] = [240, 240, 240];
const BORDER_GRAY: u8 = 100;

struct Style {
    window: Vec2,
    margin: f32,
    opacity: f32,
    text: Color32,
    font_size: f32,
}

impl Style {
    fn from_config(cfg: &Config) -> Self {
        let [r, g, b] = cfg.text_rgb();
        Self {
            window: Vec2::new(cfg.window_width, cfg.window_height),
            margin: cfg.margin_px,
            opacity: cfg.opacity,
            text: Color32::from_rgb(r, g, b),
            font_size: cfg.font_size,
        }
    }

    fn frame(&self) -> egui::Frame {
        let [r, g, b] = PANEL_FILL;
        let alpha = (self.opacity * 255.0).round() as u8;
        egui::Frame::none()
            .fill(Color32::from_rgba_unmultiplied(r, g, b, alpha))
            .stroke(Stroke::new(1.0, Color32::from_gray(BORDER_GRAY)))
            .outer_margin(Margin::same(2.0))
            .inner_margin(Margin::same(5.0))
    }
}

/// Runs the overlay until it is quit from the tray, by Ctrl+C, or by the
/// window being closed. Blocks the calling (main) thread.
pub fn run(cfg: Config, position: Position, with_tray: bool) -> eframe::Result<()> {
    let style = Style::from_config(&cfg);
    let options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(style.window)
            .with_decorations(false)
            .with_resizable(false)
            .with_transparent(true)
            .with_always_on_top()
            .with_taskbar(false),
        ..Default::default()
    };

    info!(
        %position,
        interval_ms = cfg.interval_ms,
        tray = with_tray,
        "starting overlay"
    );

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| {
            let (tx, rx) = mpsc::channel();
            let ctx = cc.egui_ctx.clone();
            let commands = CommandSender::new(tx, move || ctx.request_repaint());

            spawn_interrupt_watcher(commands.clone());

            // Must happen here: native trays need the running event loop.
            let tray = if with_tray {
                match tray::spawn(commands) {
                    Ok(handle) => Some(handle),
                    Err(err) => {
                        error!(error = %err, "tray unavailable, continuing without it");
                        None
                    }
                }
            } else {
                None
            };

            Ok(Box::new(OverlayApp::new(&cfg, position, style, rx, tray)))
        }),
    )
}

struct OverlayApp {
    collector: Collector,
    state: DisplayState,
    commands: Receiver<Command>,
    ticker: Ticker,
    text: String,
    placed: bool,
    style: Style,
    tray: Option<TrayHandle>,
}

impl OverlayApp {
    fn new(
        cfg: &Config,
        position: Position,
        style: Style,
        commands: Receiver<Command>,
        tray: Option<TrayHandle>,
    ) -> Self {
        Self {
            collector: Collector::new(&cfg.gpu),
            state: DisplayState::new(position),
            commands,
            ticker: Ticker::new(Duration::from_millis(cfg.interval_ms)),
            text: "Loading stats...".to_string(),
            placed: false,
            style,
            tray,
        }
    }

    fn drain_commands(&mut self, ctx: &egui::Context) {
        let screen = ctx.input(|i| i.viewport().monitor_size);
        let pending: Vec<Command> = self.commands.try_iter().collect();
        for command in pending {
            for viewport_command in self.handle(command, screen) {
                ctx.send_viewport_cmd(viewport_command);
            }
            if self.ticker.is_cancelled() {
                break;
            }
        }
    }

    /// Hiding keeps the window mapped: an unmapped window may stop getting
    /// frames, and frames are the only place commands are drained.
    fn handle(&mut self, command: Command, screen: Option<Vec2>) -> Vec<ViewportCommand> {
        match self.state.apply(command) {
            Effect::SetVisible(visible) => {
                info!(visible, "overlay visibility changed");
                vec![ViewportCommand::MousePassthrough(!visible)]
            }
            Effect::Reposition(position) => {
                info!(%position, "overlay moved");
                self.place(screen).into_iter().collect()
            }
            Effect::Quit => {
                info!("quit requested, shutting down");
                self.ticker.cancel();
                self.tray = None;
                vec![ViewportCommand::Close]
            }
        }
    }

    /// `None` until the monitor size is known; the next tick retries.
    fn place(&mut self, screen: Option<Vec2>) -> Option<ViewportCommand> {
        let origin = window_origin(
            Some(self.state.position),
            screen?,
            self.style.window,
            self.style.margin,
        );
        self.placed = true;
        Some(ViewportCommand::OuterPosition(origin))
    }

    fn tick(&mut self, ctx: &egui::Context) {
        let snapshot = self.collector.collect();
        self.text = format_snapshot(&snapshot);
        if !self.placed {
            if let Some(command) = self.place(ctx.input(|i| i.viewport().monitor_size)) {
                ctx.send_viewport_cmd(command);
            }
        }
    }

    fn draw(&self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(self.style.frame())
            .show(ctx, |ui| {
                let text = RichText::new(&self.text)
                    .monospace()
                    .size(self.style.font_size)
                    .color(self.style.text);
                let label = egui::Label::new(text).selectable(false).sense(Sense::drag());
                if ui.add(label).drag_started_by(PointerButton::Primary) {
                    ctx.send_viewport_cmd(ViewportCommand::StartDrag);
                }
            });
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_commands(ctx);
        if self.ticker.is_cancelled() {
            return;
        }

        if self.ticker.poll(Instant::now()) {
            self.tick(ctx);
        }

        // Hidden means nothing is painted over the transparent clear colour.
        if self.state.visible {
            self.draw(ctx);
        }

        if let Some(wait) = self.ticker.until_next(Instant::now()) {
            ctx.request_repaint_after(wait);
        }
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }
}

/// Turns Ctrl+C into a regular quit so the window and tray close the same
/// way as from the menu.
fn spawn_interrupt_watcher(commands: CommandSender) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(err) => {
                    warn!(error = %err, "cannot start signal runtime, Ctrl+C will not quit");
                    return;
                }
            };
            runtime.block_on(async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    error!(error = %err, "failed to wait for Ctrl+C");
                    return;
                }
                info!("received Ctrl+C");
                commands.dispatch(Command::Quit);
            });
        });

    if let Err(err) = spawned {
        warn!(error = %err, "cannot spawn Ctrl+C watcher");
    }
}

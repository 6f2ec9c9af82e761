use super::icon::{render_rgba, rgba_to_argb, ICON_SIZE};
use super::{Backend, TrayError, EXIT_LABEL, POSITION_LABEL, TOGGLE_LABEL, TOOLTIP};
use crate::state::{Command, CommandSender, Position};
use ksni::menu::{StandardItem, SubMenu};
use ksni::{MenuItem, Tray, TrayService};
use std::thread;
use tracing::{debug, warn};

struct OverlayTray {
    commands: CommandSender,
}

impl OverlayTray {
    fn item(label: &str, command: Command) -> MenuItem<Self> {
        StandardItem {
            label: label.to_string(),
            activate: Box::new(move |tray: &mut Self| tray.commands.dispatch(command)),
            ..Default::default()
        }
        .into()
    }
}

impl Tray for OverlayTray {
    fn id(&self) -> String {
        env!("CARGO_PKG_NAME").to_string()
    }

    fn title(&self) -> String {
        TOOLTIP.to_string()
    }

    fn icon_pixmap(&self) -> Vec<ksni::Icon> {
        vec![ksni::Icon {
            width: ICON_SIZE as i32,
            height: ICON_SIZE as i32,
            data: rgba_to_argb(&render_rgba()),
        }]
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        ksni::ToolTip {
            title: TOOLTIP.to_string(),
            ..Default::default()
        }
    }

    fn activate(&mut self, _x: i32, _y: i32) {
        self.commands.dispatch(Command::Toggle);
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        let corners = Position::ALL
            .into_iter()
            .map(|position| Self::item(position.label(), Command::Move(position)))
            .collect();

        vec![
            Self::item(TOGGLE_LABEL, Command::Toggle),
            MenuItem::Separator,
            SubMenu {
                label: POSITION_LABEL.to_string(),
                submenu: corners,
                ..Default::default()
            }
            .into(),
            MenuItem::Separator,
            Self::item(EXIT_LABEL, Command::Quit),
        ]
    }
}

pub struct LinuxTray {
    handle: ksni::Handle<OverlayTray>,
    stopped: bool,
}

impl LinuxTray {
    pub fn spawn(commands: CommandSender) -> Result<Self, TrayError> {
        let service = TrayService::new(OverlayTray { commands });
        let handle = service.handle();

        thread::Builder::new()
            .name("tray".to_string())
            .spawn(move || {
                if let Err(err) = service.run() {
                    warn!(error = %err, "tray service stopped with an error");
                }
                debug!("tray worker finished");
            })?;

        Ok(Self {
            handle,
            stopped: false,
        })
    }
}

impl Backend for LinuxTray {
    fn shutdown(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.handle.shutdown();
        }
    }
}

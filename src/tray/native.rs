use super::icon::{render_rgba, ICON_SIZE};
use super::{Backend, TrayError, EXIT_LABEL, POSITION_LABEL, TOGGLE_LABEL, TOOLTIP};
use crate::state::{Command, CommandSender, Position};
use tray_icon::menu::{
    IsMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem, Submenu,
};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

pub struct NativeTray {
    icon: Option<TrayIcon>,
}

impl NativeTray {
    pub fn spawn(commands: CommandSender) -> Result<Self, TrayError> {
        let toggle = MenuItem::new(TOGGLE_LABEL, true, None);
        let exit = MenuItem::new(EXIT_LABEL, true, None);
        let corners: Vec<(MenuItem, Position)> = Position::ALL
            .into_iter()
            .map(|position| (MenuItem::new(position.label(), true, None), position))
            .collect();

        let corner_items: Vec<&dyn IsMenuItem> = corners
            .iter()
            .map(|(item, _)| item as &dyn IsMenuItem)
            .collect();
        let positions = Submenu::with_items(POSITION_LABEL, true, &corner_items)?;
        let first_separator = PredefinedMenuItem::separator();
        let second_separator = PredefinedMenuItem::separator();
        let menu = Menu::with_items(&[
            &toggle as &dyn IsMenuItem,
            &first_separator as &dyn IsMenuItem,
            &positions as &dyn IsMenuItem,
            &second_separator as &dyn IsMenuItem,
            &exit as &dyn IsMenuItem,
        ])?;

        let mut routes: Vec<(MenuId, Command)> = vec![
            (toggle.id().clone(), Command::Toggle),
            (exit.id().clone(), Command::Quit),
        ];
        routes.extend(
            corners
                .iter()
                .map(|(item, position)| (item.id().clone(), Command::Move(*position))),
        );

        // Runs on the GUI thread's event loop; it only queues the command.
        MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
            if let Some((_, command)) = routes.iter().find(|(id, _)| *id == event.id) {
                commands.dispatch(*command);
            }
        }));

        let icon = Icon::from_rgba(render_rgba(), ICON_SIZE, ICON_SIZE)?;
        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip(TOOLTIP)
            .with_icon(icon)
            .build()?;

        Ok(Self { icon: Some(tray) })
    }
}

impl Backend for NativeTray {
    fn shutdown(&mut self) {
        if self.icon.take().is_some() {
            MenuEvent::set_event_handler(None::<fn(MenuEvent)>);
        }
    }
}

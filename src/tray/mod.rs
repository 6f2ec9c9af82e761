//! System tray entry: toggle the overlay, move it to a corner, or exit.
//!
//! Linux publishes a StatusNotifierItem from its own worker thread. Other
//! platforms need the tray on the GUI thread, so it is created there and its
//! menu callback only forwards commands. Either way nothing here touches the
//! window directly.

mod icon;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod native;

use crate::state::CommandSender;
use thiserror::Error;

pub const TOOLTIP: &str = "System Stats Monitor";
pub const TOGGLE_LABEL: &str = "System Stats";
pub const POSITION_LABEL: &str = "Position";
pub const EXIT_LABEL: &str = "Exit";

#[derive(Debug, Error)]
pub enum TrayError {
    #[error("failed to start tray worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[cfg(not(target_os = "linux"))]
    #[error("tray icon: {0}")]
    Icon(#[from] tray_icon::Error),
    #[cfg(not(target_os = "linux"))]
    #[error("tray menu: {0}")]
    Menu(#[from] tray_icon::menu::Error),
    #[cfg(not(target_os = "linux"))]
    #[error("tray bitmap: {0}")]
    Bitmap(#[from] tray_icon::BadIcon),
}

/// A running tray implementation.
pub(crate) trait Backend {
    fn shutdown(&mut self);
}

/// Owns the running tray. Dropping it stops the tray.
pub struct TrayHandle {
    backend: Box<dyn Backend>,
}

pub fn spawn(commands: CommandSender) -> Result<TrayHandle, TrayError> {
    #[cfg(target_os = "linux")]
    let backend = linux::LinuxTray::spawn(commands)?;
    #[cfg(not(target_os = "linux"))]
    let backend = native::NativeTray::spawn(commands)?;

    Ok(TrayHandle::new(backend))
}

impl TrayHandle {
    pub(crate) fn new(backend: impl Backend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn shutdown(&mut self) {
        self.backend.shutdown();
    }
}

impl Drop for TrayHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counting(Rc<Cell<usize>>);

    impl Backend for Counting {
        fn shutdown(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn dropping_the_handle_stops_the_backend() {
        let stops = Rc::new(Cell::new(0));
        let handle = TrayHandle::new(Counting(stops.clone()));
        assert_eq!(stops.get(), 0);

        drop(handle);
        assert_eq!(stops.get(), 1);
    }
}

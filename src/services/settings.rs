use std::sync::atomic::{AtomicBool, Ordering};

/// Switches the operator flips by text message.
#[derive(Debug)]
pub struct RuntimeSettings {
    receive_faxes: AtomicBool,
    notify: AtomicBool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            receive_faxes: AtomicBool::new(false),
            notify: AtomicBool::new(true),
        }
    }
}

impl RuntimeSettings {
    pub fn receive_faxes(&self) -> bool {
        self.receive_faxes.load(Ordering::Relaxed)
    }

    pub fn set_receive_faxes(&self, on: bool) {
        self.receive_faxes.store(on, Ordering::Relaxed);
    }

    pub fn notify(&self) -> bool {
        self.notify.load(Ordering::Relaxed)
    }

    pub fn set_notify(&self, on: bool) {
        self.notify.store(on, Ordering::Relaxed);
    }

    /// One `key = value` line per setting.
    pub fn describe(&self) -> String {
        format!(
            "fax = {}\nnotify = {}",
            if self.receive_faxes() { "enable" } else { "disable" },
            if self.notify() { "on" } else { "off" },
        )
    }
}

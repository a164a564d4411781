//! Operator-visible console.
//!
//! Lines are mirrored to the `log` facade and queued for whatever presentation
//! layer wants to show them. Script-binding failures end up here instead of
//! being propagated as errors.

use crossbeam_channel::{Receiver, Sender};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleLevel {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub text: String,
}

pub struct Console {
    sender: Sender<ConsoleLine>,
    receiver: Receiver<ConsoleLine>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn print(&self, text: impl Into<String>) {
        let text = text.into();
        log::info!(target: "console", "{text}");
        self.push(ConsoleLevel::Info, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        let text = text.into();
        log::error!(target: "console", "{text}");
        self.push(ConsoleLevel::Error, format!("ERROR: {text}"));
    }

    /// Drain every line queued since the last call.
    pub fn drain(&self) -> Vec<ConsoleLine> {
        self.receiver.try_iter().collect()
    }

    fn push(&self, level: ConsoleLevel, text: String) {
        // The receiver lives as long as `self`, so the send cannot fail.
        let _ = self.sender.send(ConsoleLine { level, text });
    }
}

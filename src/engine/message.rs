#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// Control messages a host thread can send to an engine living inside an
/// audio callback. Drained in FIFO order, so invocation order is
/// preserved across the thread boundary.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Start(String),
    Stop(String),
    SetLayerVolume(String, f32),
    SetMasterVolume(f32),
    SetMute(bool),
    ApplyCombination(String),
    StopAll,
    PlayChime(f32),
    Resume,
}

/// Anything the engine can drain commands from.
pub trait CommandReceiver {
    fn pop(&mut self) -> Option<EngineCommand>;
}

#[cfg(feature = "rtrb")]
impl CommandReceiver for Consumer<EngineCommand> {
    fn pop(&mut self) -> Option<EngineCommand> {
        Consumer::pop(self).ok()
    }
}

impl CommandReceiver for std::collections::VecDeque<EngineCommand> {
    fn pop(&mut self) -> Option<EngineCommand> {
        self.pop_front()
    }
}

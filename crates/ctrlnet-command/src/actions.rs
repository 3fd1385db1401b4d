use std::thread;
use std::time::Duration;

use tracing::info;

use crate::dispatch::CommandHandler;

/// Default time a soft reset or scene switch takes to settle.
pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_millis(500);

/// Handler that reports every action through the log.
#[derive(Debug, Clone)]
pub struct ConsoleActions {
    settle: Duration,
    running: bool,
    debug: bool,
    scene: Option<i32>,
}

impl ConsoleActions {
    pub fn new() -> Self {
        Self::with_settle_time(DEFAULT_SETTLE_TIME)
    }

    pub fn with_settle_time(settle: Duration) -> Self {
        Self {
            settle,
            running: false,
            debug: false,
            scene: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn debug_mode(&self) -> bool {
        self.debug
    }

    /// Scene most recently switched to.
    pub fn scene(&self) -> Option<i32> {
        self.scene
    }

    fn settle(&self) {
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
    }
}

impl Default for ConsoleActions {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandler for ConsoleActions {
    fn start(&mut self) {
        self.running = true;
        info!("started");
    }

    fn stop(&mut self) {
        self.running = false;
        info!("stopped");
    }

    fn soft_reset(&mut self) {
        info!("soft resetting");
        self.settle();
        info!("soft reset complete");
    }

    fn debug_on(&mut self) {
        self.debug = true;
        info!("debug mode on");
    }

    fn debug_off(&mut self) {
        self.debug = false;
        info!("debug mode off");
    }

    fn get_content(&mut self) {
        info!("getting content");
    }

    fn show_scene(&mut self, scene: i32) {
        info!(scene, "scene command received, switching");
        self.settle();
        self.scene = Some(scene);
        info!(scene, "scene switched");
    }
}

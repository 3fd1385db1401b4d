use tracing::dispatcher;
use tracing::{debug, warn, Dispatch};

use crate::command::Command;

/// Side effects for each command in the vocabulary.
pub trait CommandHandler {
    fn start(&mut self);
    fn stop(&mut self);
    fn soft_reset(&mut self);
    fn debug_on(&mut self);
    fn debug_off(&mut self);
    fn get_content(&mut self);
    fn show_scene(&mut self, scene: i32);
}

/// Routes popped messages to a [`CommandHandler`].
///
/// Unrecognized messages are ignored. Malformed arguments are logged at
/// warn level and the message is not acted upon. Dispatch and the handler
/// log to the subscriber the dispatcher was built with.
#[derive(Debug)]
pub struct Dispatcher<H> {
    handler: H,
    dispatch: Dispatch,
}

impl<H: CommandHandler> Dispatcher<H> {
    /// Log to the subscriber current at construction.
    pub fn new(handler: H) -> Self {
        Self::with_dispatch(handler, dispatcher::get_default(Dispatch::clone))
    }

    pub fn with_dispatch(handler: H, dispatch: Dispatch) -> Self {
        Self { handler, dispatch }
    }

    /// Interpret `message` and invoke the matching handler method.
    ///
    /// Returns the command that was executed, if any.
    pub fn dispatch(&mut self, message: &[u8]) -> Option<Command> {
        let _logging = dispatcher::set_default(&self.dispatch);
        let text = String::from_utf8_lossy(message);
        debug!(msg = %text, "received message");

        let command = match Command::parse(message) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!(msg = %text, "ignoring unrecognized message");
                return None;
            }
            Err(err) => {
                warn!(msg = %text, error = %err, "dropping malformed command");
                return None;
            }
        };

        match command {
            Command::Start => self.handler.start(),
            Command::Stop => self.handler.stop(),
            Command::SoftReset => self.handler.soft_reset(),
            Command::DebugOn => self.handler.debug_on(),
            Command::DebugOff => self.handler.debug_off(),
            Command::GetContent => self.handler.get_content(),
            Command::ShowScene(scene) => self.handler.show_scene(scene),
        }
        Some(command)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_inner(self) -> H {
        self.handler
    }
}

use std::fmt;

use crate::error::{CommandError, Result};

pub const START: &str = "Start";
pub const STOP: &str = "Stop";
pub const SOFT_RESET: &str = "SoftReset";
pub const DEBUG_ON: &str = "DebugOn";
pub const DEBUG_OFF: &str = "DebugOff";
pub const GET_CONTENT: &str = "GetContent";
/// Scene switches are `ShowScene,<int>`.
pub const SHOW_SCENE: &str = "ShowScene";

/// A recognized control-system command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    SoftReset,
    DebugOn,
    DebugOff,
    GetContent,
    ShowScene(i32),
}

impl Command {
    /// Interpret one message as a command.
    ///
    /// Plain commands must match exactly. Any message containing
    /// `ShowScene` is treated as a scene switch and must have the form
    /// `ShowScene,<int>`. Returns `Ok(None)` for unrecognized text.
    pub fn parse(message: &[u8]) -> Result<Option<Command>> {
        let text = String::from_utf8_lossy(message);
        let command = match text.as_ref() {
            START => Command::Start,
            STOP => Command::Stop,
            SOFT_RESET => Command::SoftReset,
            DEBUG_ON => Command::DebugOn,
            DEBUG_OFF => Command::DebugOff,
            GET_CONTENT => Command::GetContent,
            other if other.contains(SHOW_SCENE) => Command::ShowScene(parse_scene(other)?),
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => START,
            Command::Stop => STOP,
            Command::SoftReset => SOFT_RESET,
            Command::DebugOn => DEBUG_ON,
            Command::DebugOff => DEBUG_OFF,
            Command::GetContent => GET_CONTENT,
            Command::ShowScene(_) => SHOW_SCENE,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::ShowScene(scene) => write!(f, "{SHOW_SCENE},{scene}"),
            other => f.write_str(other.name()),
        }
    }
}

fn parse_scene(text: &str) -> Result<i32> {
    let malformed = || CommandError::MalformedArgument {
        command: SHOW_SCENE,
        message: text.to_string(),
    };

    let parts: Vec<&str> = text.split(',').collect();
    match parts.as_slice() {
        [_, argument] => argument.trim().parse().map_err(|_| malformed()),
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_vocabulary() {
        let cases = [
            ("Start", Command::Start),
            ("Stop", Command::Stop),
            ("SoftReset", Command::SoftReset),
            ("DebugOn", Command::DebugOn),
            ("DebugOff", Command::DebugOff),
            ("GetContent", Command::GetContent),
        ];
        for (text, expected) in cases {
            assert_eq!(Command::parse(text.as_bytes()).unwrap(), Some(expected));
        }
    }

    #[test]
    fn plain_commands_require_exact_match() {
        assert_eq!(Command::parse(b"start").unwrap(), None);
        assert_eq!(Command::parse(b"Start ").unwrap(), None);
        assert_eq!(Command::parse(b"StopNow").unwrap(), None);
        assert_eq!(Command::parse(b"").unwrap(), None);
    }

    #[test]
    fn parses_show_scene_argument() {
        assert_eq!(
            Command::parse(b"ShowScene,7").unwrap(),
            Some(Command::ShowScene(7))
        );
        assert_eq!(
            Command::parse(b"ShowScene,-2").unwrap(),
            Some(Command::ShowScene(-2))
        );
        assert_eq!(
            Command::parse(b"ShowScene, 12 ").unwrap(),
            Some(Command::ShowScene(12))
        );
    }

    #[test]
    fn show_scene_matches_by_containment() {
        assert_eq!(
            Command::parse(b"xShowScene,4").unwrap(),
            Some(Command::ShowScene(4))
        );
    }

    #[test]
    fn malformed_show_scene_is_an_error() {
        for text in ["ShowScene,abc", "ShowScene", "ShowScene,1,2", "ShowScene,"] {
            let err = Command::parse(text.as_bytes()).unwrap_err();
            assert!(matches!(
                err,
                CommandError::MalformedArgument {
                    command: SHOW_SCENE,
                    ..
                }
            ));
        }
    }

    #[test]
    fn display_round_trips_text_form() {
        assert_eq!(Command::ShowScene(7).to_string(), "ShowScene,7");
        assert_eq!(Command::DebugOff.to_string(), "DebugOff");
    }
}

//! Line-oriented input for the terminal front end.

pub const HELP_TEXT: &str = "\
Type a message and press Enter to send it.
  /mic     start or stop a voice recording
  /play    play the latest voice message
  /status  check the connection to the chat service
  /help    show this help
  /quit    leave the chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Anything that is not a known command is sent as-is.
    Send(String),
    ToggleRecording,
    PlayAudio,
    CheckConnectivity,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_lowercase().as_str() {
            "/mic" | "/record" => Command::ToggleRecording,
            "/play" => Command::PlayAudio,
            "/status" => Command::CheckConnectivity,
            "/help" | "/?" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Send(line.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/mic"), Command::ToggleRecording);
        assert_eq!(Command::parse("  /RECORD "), Command::ToggleRecording);
        assert_eq!(Command::parse("/play"), Command::PlayAudio);
        assert_eq!(Command::parse("/status"), Command::CheckConnectivity);
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
    }

    #[test]
    fn test_plain_and_unknown_lines_are_sent() {
        assert_eq!(
            Command::parse("  hello world "),
            Command::Send("  hello world ".to_string())
        );
        assert_eq!(
            Command::parse("/shrug"),
            Command::Send("/shrug".to_string())
        );
        assert_eq!(Command::parse(""), Command::Send(String::new()));
    }
}

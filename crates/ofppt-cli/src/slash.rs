/// Result of processing a line typed in the chat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// Display a message to the user.
    Message(String),
    /// Reset the conversation to the greeting.
    Clear,
    /// Print the transcript.
    History,
    /// Delete the turn with this timestamp.
    Delete(i64),
    /// Quit the chat loop.
    Quit,
    /// Not a command - send as a chat message.
    NotACommand,
}

pub fn handle_command(input: &str) -> SlashCommand {
    if !input.starts_with('/') {
        return SlashCommand::NotACommand;
    }

    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/help" | "/h" => SlashCommand::Message(help_text().to_string()),
        "/exit" | "/quit" | "/q" => SlashCommand::Quit,
        "/clear" => SlashCommand::Clear,
        "/history" => SlashCommand::History,
        "/delete" => match arg.parse::<i64>() {
            Ok(ts) => SlashCommand::Delete(ts),
            Err(_) => SlashCommand::Message("Usage: /delete <timestamp>".into()),
        },
        _ => SlashCommand::Message(format!("Unknown command: {}. Type /help.", cmd)),
    }
}

fn help_text() -> &'static str {
    "Commands:\n\
     \x20 /history           show the conversation\n\
     \x20 /delete <ts>       delete a message by timestamp\n\
     \x20 /clear             start over from the greeting\n\
     \x20 /quit              leave the chat"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(handle_command("Bonjour"), SlashCommand::NotACommand);
    }

    #[test]
    fn test_quit_aliases() {
        for cmd in ["/quit", "/exit", "/q"] {
            assert_eq!(handle_command(cmd), SlashCommand::Quit);
        }
    }

    #[test]
    fn test_delete_parses_timestamp() {
        assert_eq!(
            handle_command("/delete 1700000000000"),
            SlashCommand::Delete(1_700_000_000_000)
        );
        assert!(matches!(handle_command("/delete abc"), SlashCommand::Message(_)));
    }

    #[test]
    fn test_unknown_command() {
        match handle_command("/model x") {
            SlashCommand::Message(m) => assert!(m.contains("/model")),
            other => panic!("unexpected {:?}", other),
        }
    }
}

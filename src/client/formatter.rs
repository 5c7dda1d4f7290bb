//! Text rendering for console events

use super::console::{ConsoleEvent, Delivery};

/// Render an event as the text shown to the user
pub fn format_event(event: &ConsoleEvent) -> String {
    match event {
        ConsoleEvent::NamePrompt => "Enter your name: ".to_string(),
        ConsoleEvent::EmptyName => "Username cannot be empty".to_string(),
        ConsoleEvent::InvalidName(reason) => format!("Invalid username: {}", reason),
        ConsoleEvent::NameTaken(name) => format!(
            "Username '{}' is already taken. Please choose another one.",
            name
        ),
        ConsoleEvent::NameTakenAfterRetry(name) => format!(
            "Username '{}' is taken. An earlier registration attempt may still hold it. Please choose another one.",
            name
        ),
        ConsoleEvent::NameRejected { name, reason } => {
            format!("Username '{}' was rejected by the broker ({})", name, reason)
        }
        ConsoleEvent::Welcome(name) => format!(
            "\nWelcome to the chat, {}!\nType '@username message' for private messages or 'quit' to exit.\n",
            name
        ),
        ConsoleEvent::MessagePrompt => "Enter message: ".to_string(),
        ConsoleEvent::Sent { target, body } => format!("You to {}: {}", target, body),
        // Starts on a fresh line since the cursor usually sits on a prompt.
        ConsoleEvent::Delivery(delivery) => format!("\n{}", format_delivery(delivery)),
        ConsoleEvent::Goodbye => "Chat ended. Goodbye!".to_string(),
    }
}

/// Render a received message
pub fn format_delivery(delivery: &Delivery) -> String {
    match delivery {
        Delivery::Chat { from, body } => format!("{}: {}", from, body),
        Delivery::System(text) => format!("[System] {}", text),
    }
}

/// Prompts keep the cursor on the same line
pub fn ends_line(event: &ConsoleEvent) -> bool {
    !matches!(event, ConsoleEvent::NamePrompt | ConsoleEvent::MessagePrompt)
}

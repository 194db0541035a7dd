use owo_colors::OwoColorize;
use studychat_core::{AttachmentInfo, EchoState, Message, Role};

/// Speaker label for a transcript line
fn speaker(message: &Message) -> &'static str {
    match message.role {
        Role::User => "you",
        Role::Assistant => "tutor",
    }
}

fn human_size(bytes: usize) -> String {
    match bytes {
        b if b >= 1024 * 1024 => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
        b if b >= 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{} B", b),
    }
}

fn attachment_line(info: &AttachmentInfo) -> String {
    format!("[attached: {} ({}, {})]", info.file_name, info.kind.as_str(), human_size(info.size))
}

/// Body lines of a message without colour: text, image link, attachment
pub fn body_lines(message: &Message) -> Vec<String> {
    let mut lines = message.text().lines().map(str::to_string).collect::<Vec<_>>();
    if let Some(image) = message.image() {
        lines.push(format!("[image: {}]", image));
    }
    if let Some(info) = &message.attachment {
        lines.push(attachment_line(info));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Delivery marker shown after an echoed message
pub fn echo_marker(message: &Message) -> Option<&'static str> {
    match message.echo_state()? {
        EchoState::Pending => Some("sending..."),
        EchoState::Delivered => None,
        EchoState::Failed => Some("not delivered"),
    }
}

pub fn print_message(message: &Message) {
    let time = message.timestamp.as_ref().map(|t| t.as_datetime().format("%H:%M").to_string());
    let label = speaker(message);
    let prefix = match time {
        Some(time) => format!("[{}] {}>", time, label),
        None => format!("{}>", label),
    };

    let lines = body_lines(message);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            match message.role {
                Role::User => println!("{} {}", prefix.cyan().bold(), line),
                Role::Assistant if message.is_synthetic() => println!("{} {}", prefix.yellow().bold(), line.italic()),
                Role::Assistant => println!("{} {}", prefix.green().bold(), line),
            }
        } else {
            println!("{:width$} {}", "", line, width = prefix.len());
        }
    }

    if let Some(marker) = echo_marker(message) {
        println!("{:width$} {}", "", format!("({})", marker).red(), width = prefix.len());
    }
}

pub fn print_messages<'a>(messages: impl IntoIterator<Item = &'a Message>) {
    for message in messages {
        print_message(message);
    }
}

use sasha_slack::commands::{ActionDescriptor, ArgSource, CommandEntry};

use crate::commands::{offline_bot, CommandResult};

pub fn run() -> CommandResult {
    let offline = match offline_bot() {
        Ok(offline) => offline,
        Err(error) => {
            return CommandResult::failure("commands", "command_table", error.to_string(), 4);
        }
    };

    let table = offline.bot.table();
    let mut lines = vec![format!(
        "{} command table ({} entries, first match wins):",
        offline.bot.bot_name(),
        table.len()
    )];
    lines.extend(
        table.entries().iter().enumerate().map(|(index, entry)| render_entry(index, entry)),
    );

    CommandResult::text(lines.join("\n"))
}

fn render_entry(index: usize, entry: &CommandEntry) -> String {
    format!(
        "{:>2}. {} [{}] usage: {} -> {}",
        index + 1,
        entry.pattern_str(),
        entry.category,
        entry.usage,
        describe_action(&entry.action)
    )
}

fn describe_action(action: &ActionDescriptor) -> String {
    match action {
        ActionDescriptor::Literal(text) => format!("literal {text:?}"),
        ActionDescriptor::Blocks(template) => format!("blocks ({} blocks)", template.blocks.len()),
        ActionDescriptor::Invoke { handler, args } if args.is_empty() => format!("{handler}()"),
        ActionDescriptor::Invoke { handler, args } => {
            let tags: Vec<&str> = args.iter().map(ArgSource::tag).collect();
            format!("{handler}({})", tags.join(", "))
        }
    }
}

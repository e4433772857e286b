use sasha_slack::commands::Reply;
use sasha_slack::delivery::Delivered;
use sasha_slack::{strip_trigger, DispatchContext};
use serde_json::{json, Value};

use crate::commands::{offline_bot, CommandResult};

pub fn run(text: &str, user_id: &str, channel_id: &str) -> CommandResult {
    let offline = match offline_bot() {
        Ok(offline) => offline,
        Err(error) => {
            return CommandResult::failure("dispatch", "command_table", error.to_string(), 4);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "dispatch",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let ctx = DispatchContext::new(user_id, channel_id);
    let bot = &offline.bot;
    let reply = match runtime.block_on(bot.handle_message(text, &ctx)) {
        Ok(reply) => reply,
        Err(error) => return CommandResult::failure("dispatch", "routing", error.to_string(), 5),
    };

    let table = bot.table();
    let command = strip_trigger(text, &bot.settings().triggers);
    let matched = command
        .and_then(|command| table.find(command))
        .map(|found| found.entry.pattern_str().to_owned());
    let delivered: Vec<Value> = offline.delivery.delivered().iter().map(delivered_json).collect();

    let payload = json!({
        "command": "dispatch",
        "status": "ok",
        "config": offline.config_source,
        "addressed": command.is_some(),
        "matched_pattern": matched,
        "reply": reply.as_ref().map(reply_json),
        "delivered": delivered,
    });

    CommandResult::report("dispatch", &payload)
}

fn reply_json(reply: &Reply) -> Value {
    match reply {
        Reply::Text(text) => json!({ "kind": "text", "text": text }),
        Reply::Blocks(template) => json!({
            "kind": "blocks",
            "fallback_text": template.fallback_text,
            "blocks": template.blocks,
        }),
    }
}

fn delivered_json(delivered: &Delivered) -> Value {
    match delivered {
        Delivered::Message { channel_id, reply } => {
            json!({ "kind": "message", "channel_id": channel_id, "reply": reply_json(reply) })
        }
        Delivered::File { channel_id, filename, size } => json!({
            "kind": "file",
            "channel_id": channel_id,
            "filename": filename,
            "size": size,
        }),
    }
}

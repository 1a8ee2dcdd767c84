//! Wish lookup function tool.
//!
//! The conversation model calls this tool whenever the user asks what a
//! specific person wishes for. The handler looks the person up in the wish
//! file, asks the chat model for a festive reply in the user's language,
//! and hands the result back to the session.

use anyhow::Context;
use serde_json::{json, Value};

use crate::chat::ChatModel;
use crate::console;
use crate::prompts;
use crate::realtime::{RealtimeSession, ToolDefinition};
use crate::wishes;

/// Tool name advertised to the conversation model.
pub const WISH_TOOL_NAME: &str = "lookup_wishes";

/// Definition of the wish lookup tool.
pub fn wish_tool() -> ToolDefinition {
    ToolDefinition {
        name: WISH_TOOL_NAME.into(),
        description: "Used whenever the user asks for wishes for a specific person.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The name of the person to get the wishes from"
                },
                "language": {
                    "type": "string",
                    "description": "The current language of the request"
                }
            },
            "required": ["name", "language"],
            "additionalProperties": false
        }),
    }
}

/// Answer a finished wish tool invocation.
pub async fn handle_wish_tool(
    chat: &dyn ChatModel,
    session: &dyn RealtimeSession,
    call_id: &str,
    arguments: &str,
) -> anyhow::Result<()> {
    console::display_line(" <<< Wish tool invoked -- getting wishes!");

    let (name, language) = parse_wish_arguments(arguments)?;
    // The wish file stands in for a database and is re-read per invocation.
    let items = wishes::load_wish_items()?;
    let wishlist = wishes::wishlist_for(&items, &name);

    let reply = chat
        .complete(&prompts::wish_prompt(&name, &wishlist, &language))
        .await?;

    session.add_function_output(call_id, &reply).await?;
    session.start_response().await?;
    Ok(())
}

/// Extract `name` and `language` from the tool call arguments JSON.
/// Missing fields default to empty strings, matching the lenient service
/// side.
fn parse_wish_arguments(arguments: &str) -> anyhow::Result<(String, String)> {
    let parsed: Value =
        serde_json::from_str(arguments).context("parsing wish tool arguments")?;
    let field = |key: &str| {
        parsed
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Ok((field("name"), field("language")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definition_requires_name_and_language() {
        let tool = wish_tool();
        assert_eq!(tool.name, WISH_TOOL_NAME);
        assert_eq!(tool.parameters["type"], "object");
        assert_eq!(tool.parameters["required"][0], "name");
        assert_eq!(tool.parameters["required"][1], "language");
    }

    #[test]
    fn parses_name_and_language_from_arguments() {
        let (name, language) =
            parse_wish_arguments(r#"{"name": "Emma", "language": "German"}"#).unwrap();
        assert_eq!(name, "Emma");
        assert_eq!(language, "German");
    }

    #[test]
    fn missing_fields_default_to_empty_strings() {
        let (name, language) = parse_wish_arguments(r#"{"name": "Noah"}"#).unwrap();
        assert_eq!(name, "Noah");
        assert_eq!(language, "");
    }

    #[test]
    fn invalid_argument_json_is_an_error() {
        assert!(parse_wish_arguments("{not json").is_err());
    }
}

//! Host and model name constants for the conversation backends.

/// Display name for the Azure OpenAI host.
pub const AZURE_OPENAI: &str = "Azure OpenAI";

/// Display name for the OpenAI host.
pub const OPENAI: &str = "OpenAI";

/// Default realtime conversation model on the OpenAI host.
pub const OPENAI_REALTIME_MODEL: &str = "gpt-4o-realtime-preview";

pub const GPT_4O_MINI: &str = "gpt-4o-mini";
pub const GPT_4O: &str = "gpt-4o";
pub const GPT_4_TURBO: &str = "gpt-4-turbo";
pub const GPT_4: &str = "gpt-4";

/// Chat model choices offered on the OpenAI host.
pub const OPENAI_CHAT_MODELS: &[&str] = &[GPT_4O_MINI, GPT_4O, GPT_4_TURBO, GPT_4];

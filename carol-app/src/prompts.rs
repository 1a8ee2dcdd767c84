//! Prompt text used throughout the conversation session.

/// Persona instructions applied to the realtime session.
pub const GENERAL_PROMPT: &str = "You are Carol, a kind, jolly, and magical festive companion \
who spreads joy and cheer. Speak warmly, be generous in spirit, and share wisdom with a playful \
and festive tone. Emphasize kindness and holiday magic in all your responses.";

/// Build the chat prompt that answers a wish lookup.
pub fn wish_prompt(name: &str, wishlist: &str, language: &str) -> String {
    format!("Here are the wishes of {name}: {wishlist}. Kindly respond in {language}")
}

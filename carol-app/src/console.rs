//! Console prompts and display helpers.
//!
//! Prompting is built on `dialoguer`; the validators are plain functions so
//! they can be unit-tested without a terminal.

use std::io::Write;

use dialoguer::{Input, Select};
use url::Url;

/// Clear the screen and print the application header.
pub fn show_header() {
    // ANSI clear + cursor home.
    print!("\x1B[2J\x1B[1;1H");
    println!("=============================================");
    println!("   Carol - realtime festive voice chat");
    println!("=============================================");
    println!();
}

/// Prompt the user to pick one of `options`, returning the chosen value.
pub fn select_from_options(options: &[&str], prompt: &str) -> anyhow::Result<String> {
    show_header();
    let index = Select::new()
        .with_prompt(prompt)
        .items(options)
        .default(0)
        .interact()?;
    Ok(options[index].to_string())
}

/// Prompt for an HTTPS endpoint URL.
pub fn prompt_url(prompt: &str) -> anyhow::Result<String> {
    show_header();
    let value: String = Input::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| validate_url(input))
        .interact_text()?;
    Ok(value)
}

/// Prompt for a short free-text value (API keys, model names).
pub fn prompt_string(prompt: &str) -> anyhow::Result<String> {
    show_header();
    let value: String = Input::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| validate_text(input))
        .interact_text()?;
    Ok(value)
}

/// Print a message followed by a newline.
pub fn display_line(message: &str) {
    println!("{message}");
}

/// Print a streaming fragment without a newline.
pub fn display_inline(message: &str) {
    print!("{message}");
    let _ = std::io::stdout().flush();
}

/// Print an error message to stderr.
pub fn display_error(message: &str) {
    eprintln!("{message}");
}

fn validate_url(input: &str) -> Result<(), String> {
    if input.len() < 3 {
        return Err("URL too short".into());
    }
    if input.len() > 250 {
        return Err("URL too long".into());
    }
    match Url::parse(input) {
        Ok(url) if url.scheme() == "https" => Ok(()),
        _ => Err("No valid HTTPS URL".into()),
    }
}

fn validate_text(input: &str) -> Result<(), String> {
    if input.len() < 3 {
        return Err("Value too short".into());
    }
    if input.len() > 200 {
        return Err("Value too long".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_text, validate_url};

    #[test]
    fn accepts_https_urls_only() {
        assert!(validate_url("https://example.openai.azure.com").is_ok());
        assert!(validate_url("http://example.com").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn rejects_urls_outside_length_bounds() {
        assert!(validate_url("x").is_err());
        let long = format!("https://example.com/{}", "a".repeat(250));
        assert!(validate_url(&long).is_err());
    }

    #[test]
    fn text_length_bounds_are_enforced() {
        assert!(validate_text("ok").is_err());
        assert!(validate_text("sk-abc123").is_ok());
        assert!(validate_text(&"a".repeat(201)).is_err());
    }
}

use colored::*;
use terminal_size::{Width, Height, terminal_size};

pub fn print_header(model: &str, host: &str) {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    let width = (width.0 as usize).min(100);

    let line = "─".repeat(width);
    println!("{}", line.black().bold());

    let logo = "♫";
    let name = "spotify-tools".green().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();

    println!("  {} {} {}", logo, name, version);

    // Model + Ollama host
    let info = format!("  {}  •  {}", model, host).cyan();
    println!("{}", info);

    println!("{}", line.black().bold());
}

pub fn print_help() {
    println!("  {}", "Ask for anything Spotify can do: pause, skip, play a song, build a playlist.".dimmed());
    println!("  {}  {}", "/help".cyan(), "show this message");
    println!("  {}  {}", "/exit".cyan(), "leave (also /quit)");
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}

/// Key/value line used by `status`
pub fn print_field(key: &str, value: &str) {
    println!("  {:<18} {}", key.bold(), value);
}

//! CLI adapter - interactive and single-prompt command line interface.

use std::io::{self, BufRead, Write};

use crate::agent::{AgentLoop, Conversation, LlmClient};
use crate::ui;
use crate::Result;

/// What a line typed at the prompt asks for
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Empty,
    Exit,
    Help,
    Prompt(&'a str),
}

impl<'a> Input<'a> {
    pub fn parse(line: &'a str) -> Self {
        let input = line.trim();
        if input.is_empty() {
            return Input::Empty;
        }
        match input.to_lowercase().as_str() {
            "/exit" | "/quit" => Input::Exit,
            "/help" => Input::Help,
            _ => Input::Prompt(input),
        }
    }
}

/// CLI channel for interactive agent sessions.
pub struct CliChannel<C: LlmClient> {
    agent: AgentLoop<C>,
}

impl<C: LlmClient> CliChannel<C> {
    /// Create a new CLI channel.
    pub fn new(agent: AgentLoop<C>) -> Self {
        Self { agent }
    }

    /// Run a single prompt and return the conversation.
    pub async fn run_once(&self, prompt: &str) -> Result<Conversation> {
        self.agent.run(prompt).await
    }

    /// Run interactive REPL loop. Each prompt starts a fresh conversation.
    pub async fn run_interactive(&self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        ui::print_help();

        loop {
            // Print prompt
            print!("\nspotify-tools> ");
            stdout.flush()?;

            // Read input
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF
                break;
            }

            match Input::parse(&line) {
                Input::Empty => continue,
                Input::Exit => {
                    println!("Goodbye!");
                    break;
                }
                Input::Help => ui::print_help(),
                Input::Prompt(prompt) => match self.run_once(prompt).await {
                    Ok(conversation) => {
                        println!("\n{}", conversation.answer);
                    }
                    Err(e) => {
                        ui::print_error(&e.to_string());
                    }
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::FakeLlmClient;
    use crate::tools::ToolRegistry;
    use std::sync::Arc;

    #[test]
    fn test_input_parsing() {
        assert_eq!(Input::parse("   \n"), Input::Empty);
        assert_eq!(Input::parse("/exit\n"), Input::Exit);
        assert_eq!(Input::parse("/QUIT"), Input::Exit);
        assert_eq!(Input::parse("/help"), Input::Help);
        assert_eq!(Input::parse("  skip this song \n"), Input::Prompt("skip this song"));
        assert_eq!(Input::parse("exit"), Input::Prompt("exit"));
    }

    #[tokio::test]
    async fn test_run_once() {
        let agent = AgentLoop::new(FakeLlmClient::new(vec!["Done."]), Arc::new(ToolRegistry::new()), 5);
        let channel = CliChannel::new(agent);

        let conversation = channel.run_once("pause").await.unwrap();
        assert_eq!(conversation.answer, "Done.");
    }
}

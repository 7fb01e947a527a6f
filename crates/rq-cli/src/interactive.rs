//! Terminal prompts for the one-shot research flow.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub const QUERY_PROMPT: &str = "Enter your research query: ";
pub const SAVE_PROMPT: &str = "Do you want to save this as a file? (Yes/No): ";

pub struct Prompter {
    editor: DefaultEditor,
}

impl Prompter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }

    /// Ask for the research query. `None` on end of input or Ctrl-C.
    pub fn read_query(&mut self) -> Result<Option<String>> {
        self.read_line(QUERY_PROMPT)
    }

    /// Ask whether to save the report. End of input counts as "no".
    pub fn confirm_save(&mut self) -> Result<bool> {
        Ok(self
            .read_line(SAVE_PROMPT)?
            .map(|answer| parse_save_choice(&answer))
            .unwrap_or(false))
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// `yes` or `y` in any case, surrounding whitespace ignored.
pub fn parse_save_choice(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

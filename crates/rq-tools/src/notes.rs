//! `save_to_txt`: append research output to a local flat file.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use rq_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

pub const DEFAULT_FILENAME: &str = "research_output.txt";

pub struct SaveToTxtTool {
    dir: PathBuf,
}

impl SaveToTxtTool {
    /// Files are written inside `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf, Error> {
        let path = Path::new(filename);
        let mut components = path.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.dir.join(path)),
            _ => Err(Error::tool(
                "save_to_txt",
                format!("Invalid filename '{}': must be a plain file name", filename),
            )),
        }
    }
}

#[derive(Deserialize)]
struct SaveArgs {
    data: String,
    #[serde(default = "default_filename")]
    filename: String,
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

/// Entry appended for each save.
pub fn format_entry(data: &str, timestamp: &str) -> String {
    format!(
        "--- Research Output ---\nTimestamp: {}\n\n{}\n\n",
        timestamp, data
    )
}

#[async_trait]
impl Tool for SaveToTxtTool {
    fn name(&self) -> &str {
        "save_to_txt"
    }

    fn description(&self) -> &str {
        "Save text data to a local .txt file with a timestamp header."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new()
                .add_property("data", PropertySchema::string("Text to save"), true)
                .add_property(
                    "filename",
                    PropertySchema::string("File name to append to")
                        .with_default(serde_json::json!(DEFAULT_FILENAME)),
                    false,
                ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: SaveArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("save_to_txt", format!("Invalid arguments: {}", e)))?;

        let path = self.resolve(&args.filename)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::tool("save_to_txt", format!("Failed to create directory: {}", e)))?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Error::tool("save_to_txt", format!("Failed to open '{}': {}", args.filename, e)))?;
        file.write_all(format_entry(&args.data, &timestamp).as_bytes())
            .await
            .map_err(|e| Error::tool("save_to_txt", format!("Failed to write '{}': {}", args.filename, e)))?;
        file.flush()
            .await
            .map_err(|e| Error::tool("save_to_txt", format!("Failed to write '{}': {}", args.filename, e)))?;

        tracing::debug!(path = %path.display(), bytes = args.data.len(), "Saved research output");
        Ok(ToolOutput::success(format!(
            "Data successfully saved to {}",
            args.filename
        )))
    }
}

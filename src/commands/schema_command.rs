//! Output schema command
//!
//! Validates a pipeline configuration and prints the columns an extraction
//! would produce, without touching any data.

use crate::commands::command_traits::Command;
use crate::config::PipelineConfig;
use crate::errors::ExtractResult;

/// Command for printing the output schema
pub struct SchemaCommand {
    config: PipelineConfig,
}

impl SchemaCommand {
    pub fn new(config: PipelineConfig) -> Self {
        SchemaCommand { config }
    }
}

impl Command for SchemaCommand {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn execute(&self) -> ExtractResult<()> {
        let registry = self.config.to_registry()?;
        let schema = registry.schema();

        println!("{} source(s), {} field(s)", registry.len(), schema.len());
        for source in registry.sources() {
            println!("\n{} [{}] {} @ {}m, {:?}", source.name, source.kind.name(), source.dataset,
                     source.scale, source.policy);
            if let Some(temporal) = &source.temporal {
                println!("  window: {}", temporal.describe());
            }
            for field in schema.fields().iter().filter(|f| f.source == source.name) {
                println!("  {:<40} {}/{}", field.name, field.band, field.statistic);
            }
        }

        Ok(())
    }
}

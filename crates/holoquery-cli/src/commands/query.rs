//! Query command

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use holoquery_engine::assemble;

use crate::output::format_value;
use crate::{samples, AppContext};

#[derive(Args)]
pub struct QueryArgs {
    /// Query text (`-` reads stdin)
    #[arg(conflicts_with_all = ["file", "sample"])]
    pub text: Option<String>,

    /// Read the query from a file
    #[arg(long, conflicts_with = "sample")]
    pub file: Option<PathBuf>,

    /// Run a built-in sample query (see `holoquery samples`)
    #[arg(short, long)]
    pub sample: Option<String>,
}

impl QueryArgs {
    fn query_text(&self) -> anyhow::Result<String> {
        if let Some(ref name) = self.sample {
            let sample = samples::find(name).ok_or_else(|| {
                anyhow::anyhow!("Unknown sample: {} (run `holoquery samples`)", name)
            })?;
            return Ok(sample.text.to_string());
        }

        if let Some(ref path) = self.file {
            tracing::debug!("Reading query from {:?}", path);
            return Ok(std::fs::read_to_string(path)?);
        }

        match self.text.as_deref() {
            Some("-") => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                Ok(text)
            }
            Some(text) => Ok(text.to_string()),
            None => anyhow::bail!("Provide query text, --file or --sample"),
        }
    }
}

pub async fn run(args: &QueryArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let text = args.query_text()?;
    let tree = ctx.engine.parse(&text)?;
    let resolved = ctx.engine.resolve(&tree).await?;

    for root in &tree.roots {
        if let Some(node) = resolved.get(&root.field) {
            if node.is_empty() {
                tracing::info!("No {} records matched", root.field);
            } else {
                tracing::info!("Matched {} {} records", node.len(), root.field);
            }
        }
    }

    let result = assemble(&resolved);
    println!("{}", format_value(&result, ctx.format));
    Ok(())
}

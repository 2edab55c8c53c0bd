//! Browse command - raw records with a substring filter

use clap::Args;
use serde_json::Value;

use crate::output::format_value;
use crate::AppContext;
use holoquery_engine::browse::{RecordFilter, DEFAULT_LIMIT};

#[derive(Args)]
pub struct BrowseArgs {
    /// Entity type to browse
    pub entity: String,

    /// Case-insensitive text to search for
    pub search: Option<String>,

    /// Only search this field (can be used multiple times)
    #[arg(long)]
    pub field: Vec<String>,

    /// Limit results
    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Skip this many matches
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
}

impl BrowseArgs {
    fn filter(&self) -> RecordFilter {
        let mut filter = RecordFilter::new()
            .with_offset(self.offset)
            .with_limit(self.limit);
        if let Some(ref text) = self.search {
            filter = filter.with_text(text);
        }
        for field in &self.field {
            filter = filter.with_field(field);
        }
        filter
    }
}

pub fn run(args: &BrowseArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let records = ctx.store.records(&args.entity)?;
    let filter = args.filter();

    let page = filter.apply(records);
    tracing::info!(
        "Browse matched {} of {} {} records",
        filter.count(records),
        records.len(),
        args.entity
    );

    let value = Value::Array(page.iter().map(|r| Value::Object((**r).clone())).collect());
    println!("{}", format_value(&value, ctx.format));
    Ok(())
}

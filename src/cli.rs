use crate::spoonacular::DEFAULT_BATCH_SIZE;
use clap::{Parser, Subcommand};

/// Find recipes from the Spoonacular API.
#[derive(Parser, Debug)]
#[command(name = "recipe-finder", version, about)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty, global = true)]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search recipes by ingredient or dish name.
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        number: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Show a batch of random recipes.
    Random {
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        number: u32,
    },
    /// Show full information for one recipe.
    Details { id: u64 },
    /// Interactive page: type a query per line, `:retry` after an error, `:quit` to leave.
    Browse,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable compact lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

// cli.rs — Command-line surface

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "celestial-lens")]
#[command(version)]
#[command(about = "Compose destiny-chart reading prompts and stream multimodal analyses")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Custom template catalog (JSON), overrides the config value
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Model identifier override
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// API key for this session only; never saved
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List template categories
    Categories,

    /// List templates of a category
    Templates {
        /// Category title
        category: String,
    },

    /// List style modifiers
    Styles,

    /// List known models and whether they take a reasoning budget
    Models,

    /// Print the composed instruction without sending anything
    Compose(PromptArgs),

    /// Send chart screenshots with the composed instruction and stream the reading
    Analyze {
        #[command(flatten)]
        selection: PromptArgs,

        /// Chart screenshot (png, jpg, jpeg, webp); repeat for several, order is kept
        #[arg(long = "image", short = 'i')]
        images: Vec<PathBuf>,

        /// Hand-edited instruction replacing the composed one
        #[arg(long, conflicts_with = "prompt_file")]
        prompt: Option<String>,

        /// Read the hand-edited instruction from a file
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// Sampling temperature (0.0 - 1.0)
        #[arg(long, short = 't')]
        temperature: Option<f32>,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Print the config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PromptArgs {
    /// Category title (defaults to the first category)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Template label (defaults to the category's first template)
    #[arg(long = "template", short = 'T')]
    pub template: Option<String>,

    /// Current occupation
    #[arg(long)]
    pub job: Option<String>,

    /// First strength or interest
    #[arg(long)]
    pub strength_a: Option<String>,

    /// Second strength or interest
    #[arg(long)]
    pub strength_b: Option<String>,

    /// Style modifier label
    #[arg(long, short = 's')]
    pub style: Option<String>,
}

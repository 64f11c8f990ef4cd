use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use papernet::config::Config;
use papernet::paper::{PaperSize, Papercraft, import};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Unfolds an OBJ or STL model into a printable paper net, written as JSON
struct Cli {
    #[arg(value_name = "MODEL_FILE")]
    input: PathBuf,

    #[arg(short, long, value_name = "JSON_FILE", help = "Output file, defaults to the model name with .net.json")]
    output: Option<PathBuf>,

    #[arg(long, value_name = "CONFIG_FILE", help = "Configuration file instead of the user one")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    paper: Option<PaperSize>,

    #[arg(long, help = "Turns the paper to landscape")]
    landscape: bool,

    #[arg(long, help = "Paper millimeters per model unit")]
    scale: Option<f64>,

    #[arg(long, help = "Page margin, in millimeters")]
    margin: Option<f64>,

    #[arg(long, help = "Keeps every island small enough to fit a page")]
    limit_by_page: bool,

    #[arg(long, help = "Does not add glue stickers")]
    no_stickers: bool,

    #[arg(long, help = "Does not number the edges to glue")]
    no_numbers: bool,

    #[arg(long, help = "Always uses the slower, more tolerant overlap check")]
    robust_sweepline: bool,

    #[arg(long, help = "Saves these options into the configuration file")]
    save_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        let options = &mut config.options;
        if let Some(paper) = self.paper {
            options.set_paper_size(paper);
        }
        if self.landscape && options.page_size.0 < options.page_size.1 {
            options.page_size = (options.page_size.1, options.page_size.0);
        }
        if let Some(scale) = self.scale {
            options.scale = scale;
        }
        if let Some(margin) = self.margin {
            options.margin = margin;
        }
        if self.limit_by_page {
            options.limit_by_page = true;
        }
        if self.no_stickers {
            options.create_stickers = false;
        }
        if self.no_numbers {
            options.create_numbers = false;
        }
        if self.robust_sweepline {
            options.quick_sweepline = false;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = Config::load_or_default(cli.config.as_deref());
    cli.apply(&mut config);
    if cli.save_config {
        let saved = config.save(cli.config.as_deref())?;
        info!("configuration saved to {}", saved.display());
    }

    let mesh = import::import_model_file(&cli.input)?;
    let papercraft = Papercraft::unfold(mesh, config.options)
        .with_context(|| format!("Error unfolding {}", cli.input.display()))?;

    let output = cli.output.clone().unwrap_or_else(|| cli.input.with_extension("net.json"));
    let f = std::fs::File::create(&output)
        .with_context(|| format!("Error creating file {}", output.display()))?;
    let f = std::io::BufWriter::new(f);
    papercraft.save_json(f)
        .with_context(|| format!("Error writing file {}", output.display()))?;
    info!("{} pages written to {}", papercraft.pages().len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides() {
        let cli = Cli::parse_from(["papernet", "model.obj", "--paper", "a3", "--landscape", "--scale", "20", "--no-stickers", "--robust-sweepline"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.options.page_size, (420.0, 297.0));
        assert_eq!(config.options.scale, 20.0);
        assert!(!config.options.create_stickers);
        assert!(config.options.create_numbers);
        assert!(!config.options.quick_sweepline);
        assert_eq!(cli.input.with_extension("net.json"), PathBuf::from("model.net.json"));
    }
}

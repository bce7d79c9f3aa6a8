use crate::config::DEFAULT_CONFIG_PATH;
use crate::error::AppError;
use crate::query::{parse_queries, Query};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Download web images for one or more search queries into a dataset folder.
#[derive(Parser, Debug)]
#[command(name = "image_dataset", version, about)]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Search queries joined by the delimiter; prompted for when absent
    #[arg(long)]
    pub queries: Option<String>,

    /// Overrides the delimiter from the configuration file
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Images to download per query; prompted for when absent
    #[arg(long)]
    pub count: Option<usize>,

    /// Skip the crop stage even when the configuration enables it
    #[arg(long)]
    pub no_crop: bool,
}

#[derive(Debug, Clone)]
pub struct RunInput {
    pub queries: Vec<Query>,
    pub image_count: usize,
}

impl RunInput {
    /// Takes queries and count from the command line, asking on `reader` for
    /// whichever is missing.
    pub fn resolve<R: BufRead, W: Write>(
        cli: &Cli,
        delimiter: &str,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<Self, AppError> {
        let raw_queries = match &cli.queries {
            Some(q) => q.clone(),
            None => prompt(
                reader,
                writer,
                &format!("Enter search query or queries separated by {:?}: ", delimiter),
            )?,
        };
        let queries = parse_queries(&raw_queries, delimiter)?;

        let image_count = match cli.count {
            Some(n) => n,
            None => {
                let answer = prompt(reader, writer, "Enter number of images to download: ")?;
                answer
                    .trim()
                    .parse()
                    .map_err(|_| AppError::Input(format!("not a number: {:?}", answer.trim())))?
            }
        };
        if image_count == 0 {
            return Err(AppError::Input("image count must be greater than zero".into()));
        }

        Ok(Self {
            queries,
            image_count,
        })
    }
}

fn prompt<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, message: &str) -> Result<String, AppError> {
    write!(writer, "{}", message)?;
    writer.flush()?;
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(AppError::Input("no input provided".into()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

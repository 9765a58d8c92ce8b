use crate::config::{LayoutConfig, load_config};
use crate::layout::{OuterTarget, border, compute_layout, survey_outer_components};
use crate::layout_dump::layout_dump_json;
use crate::parser::{parse_outer_target, parse_pd_code};
use crate::render::{render_components, render_grid, render_survey, write_output};
use crate::skeleton::Skeleton;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pdlayout",
    version,
    about = "Lay out a knot or link PD code on an integer grid"
)]
pub struct Args {
    /// Input file holding a PD code, or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// What to print
    #[arg(short = 'm', long = "mode", value_enum, default_value = "diagram")]
    pub mode: Mode,

    /// Print empty cells as 0 in diagram mode
    #[arg(short = 'z', long = "with-zero")]
    pub with_zero: bool,

    /// Socket id whose component must reach the outer face, or 'max'
    #[arg(long = "outer", default_value = "max")]
    pub outer: String,

    /// First seed (overrides the config file)
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Attempt budget (overrides the config file)
    #[arg(long = "max-tries")]
    pub max_tries: Option<usize>,

    /// Log attempts and wiring progress to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The finished grid
    Diagram,
    /// 3D point/link skeleton
    Serial,
    /// Socket ids on the outer face of the finished grid
    Border,
    /// Strand components of the finished grid
    Components,
    /// Try every component on the outer face
    Survey,
    /// Full layout as JSON
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = effective_config(&args)?;
    let input = read_input(args.input.as_deref())?;
    let pd = parse_pd_code(&input)?;
    let target = parse_outer_target(&args.outer)?;
    let text = run_mode(args.mode, &pd, target, &config, args.with_zero)?;
    write_output(&text, args.output.as_deref())
}

fn effective_config(args: &Args) -> Result<LayoutConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(max_tries) = args.max_tries {
        config.max_tries = max_tries;
    }
    config.validate()?;
    Ok(config)
}

fn run_mode(
    mode: Mode,
    pd: &crate::ir::PdCode,
    target: OuterTarget,
    config: &LayoutConfig,
    with_zero: bool,
) -> Result<String> {
    let layout = || compute_layout(pd, target, config);
    let text = match mode {
        Mode::Diagram => render_grid(&layout()?.grid, with_zero),
        Mode::Serial => {
            let mut buf = Vec::new();
            Skeleton::from_layout(&layout()?).write_text(&mut buf)?;
            String::from_utf8(buf)?
        }
        Mode::Border => {
            let ids: Vec<String> = border::border_ids(&layout()?.grid)
                .iter()
                .map(|id| id.to_string())
                .collect();
            format!("{}\n", ids.join(" "))
        }
        Mode::Components => render_components(&border::diagram_components(&layout()?.grid)),
        Mode::Survey => render_survey(&survey_outer_components(pd, config)?),
        Mode::Json => {
            let mut json = layout_dump_json(&layout()?, pd)?;
            json.push('\n');
            json
        }
    };
    Ok(text)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from(["pdlayout", "--seed", "7", "--max-tries", "3", "-m", "border"]);
        assert_eq!(args.mode, Mode::Border);
        let config = effective_config(&args).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_tries, 3);
    }

    #[test]
    fn zero_tries_is_rejected() {
        let args = Args::parse_from(["pdlayout", "--max-tries", "0"]);
        assert!(effective_config(&args).is_err());
    }

    #[test]
    fn diagram_mode_prints_crossing_markers() {
        let pd = parse_pd_code("[[1,2,3,4],[2,1,4,3]]").unwrap();
        let text = run_mode(
            Mode::Diagram,
            &pd,
            OuterTarget::LargestId,
            &LayoutConfig::default(),
            true,
        )
        .unwrap();
        assert!(text.contains(" -1 ") || text.contains(" -2 "));
        let widths: Vec<usize> = text.lines().map(str::len).collect();
        assert!(widths.windows(2).all(|pair| pair[0] == pair[1]));
    }
}

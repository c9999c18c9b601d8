use anyhow::{bail, Context, Result};
use clap::Parser;
use gramsurface::{
    plot_formula, try_parse, Columns, Dataframe, FormulaSession, PlotMode, PlotOptions,
    PlottingSession,
};
use log::debug;
use serde_json::Value;
use std::fs;
use std::io::{self, Write};

#[derive(Parser, Debug)]
#[command(name = "gramsurface")]
#[command(about = "Turn CSV data or a formula into 3D plot geometry (JSON)", long_about = None)]
struct Args {
    /// Formula in x1 and x3 (e.g. 'sin(x1*6)*x3'). Without it CSV is read from stdin
    #[arg(short, long)]
    formula: Option<String>,

    /// Plot options as a JSON object, or @path to a JSON file
    #[arg(short, long)]
    options: Option<String>,

    /// scatterplot, lineplot, barchart or polygon
    #[arg(short, long)]
    mode: Option<String>,

    /// Axis columns as x1,x2,x3
    #[arg(short, long, value_delimiter = ',')]
    columns: Option<Vec<usize>>,

    /// Column holding colors, labels or values for a heat map
    #[arg(long)]
    color_column: Option<usize>,

    /// Treat the color column as labels
    #[arg(long)]
    labeled: bool,

    /// The first CSV line is a header
    #[arg(long)]
    header: bool,

    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let options = build_options(&args)?;
    debug!("options: {:?}", options);

    let output = match &args.formula {
        Some(text) => {
            let formula =
                try_parse(text).with_context(|| format!("Failed to parse formula '{}'", text))?;
            let mut session = FormulaSession::from_formula(formula, options.dimensions);
            plot_formula(&mut session, &options)
        }
        None => {
            if !args.delimiter.is_ascii() {
                bail!("Delimiter must be a single ASCII character");
            }
            let df = Dataframe::from_csv_reader(io::stdin().lock(), args.delimiter as u8, false)
                .context("Failed to read CSV from stdin")?;
            PlottingSession::new()
                .plot(&df, &options)
                .context("Failed to plot data")?
        }
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.pretty {
        serde_json::to_writer_pretty(&mut handle, &output)
    } else {
        serde_json::to_writer(&mut handle, &output)
    }
    .context("Failed to write JSON to stdout")?;
    writeln!(handle).context("Failed to write JSON to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

/// Options JSON first, then command line flags on top
fn build_options(args: &Args) -> Result<PlotOptions> {
    let mut options: PlotOptions = match &args.options {
        Some(raw) => {
            let text = match raw.strip_prefix('@') {
                Some(path) => fs::read_to_string(path)
                    .with_context(|| format!("Failed to read options file '{}'", path))?,
                None => raw.clone(),
            };
            serde_json::from_str(&text).context("Failed to parse plot options")?
        }
        None => PlotOptions::default(),
    };

    if let Some(mode) = &args.mode {
        options.mode = serde_json::from_value::<PlotMode>(Value::String(mode.clone()))
            .with_context(|| format!("Unknown plot mode '{}'", mode))?;
    }
    if let Some(columns) = &args.columns {
        let [x1, x2, x3] = columns.as_slice() else {
            bail!("Expected three axis columns, got {}", columns.len());
        };
        options.columns = Columns::new(*x1, *x2, *x3);
    }
    if args.color_column.is_some() {
        options.color_column = args.color_column;
    }
    options.labeled |= args.labeled;
    options.header |= args.header;

    // plain CSV input defaults to the first three columns
    if args.formula.is_none() && options.columns == Columns::default() {
        options.columns = Columns::new(0, 1, 2);
    }

    Ok(options)
}

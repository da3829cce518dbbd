use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use dockyard::backend::HeadlessBridge;
use dockyard::common::config::Config;
use dockyard::common::log;
use dockyard::layout_engine::serializer::write_snapshot;
use dockyard::layout_engine::{
    DockLayout, NodeConfig, SerializedNode, SerializerContainer, SnapshotFormat,
};
use dockyard::model::RenderableArea;

#[derive(Parser)]
#[command(version, about = "Inspect docking layouts and round-trip their snapshots")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved layout tree with the area of every node.
    Layout {
        /// Layout description (JSON, TOML or RON) or a snapshot.
        file: PathBuf,
        #[command(flatten)]
        size: Size,
    },
    /// Write a snapshot of the layout. A `.ron` output is written as RON,
    /// anything else as JSON.
    Snapshot {
        file: PathBuf,
        #[arg(short, long, value_name = "OUT")]
        output: PathBuf,
        #[command(flatten)]
        size: Size,
    },
    /// Check that restoring a snapshot of the layout reproduces it exactly.
    Check {
        file: PathBuf,
        #[command(flatten)]
        size: Size,
    },
}

#[derive(Args, Clone, Copy)]
struct Size {
    #[arg(long, default_value_t = 1280.0)]
    width: f64,
    #[arg(long, default_value_t = 800.0)]
    height: f64,
}

enum Input {
    Config(NodeConfig),
    Snapshot(SerializedNode),
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();
    log::init_logging();

    if let Err(err) = run(opt) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config = Config::load(opt.config.as_deref())?;
    let cx = SerializerContainer::default();

    match opt.command {
        Commands::Layout { file, size } => {
            let dock = open(&config, &cx, &file, size)?;
            print!("{}", dock.draw_tree());
        }
        Commands::Snapshot { file, output, size } => {
            let dock = open(&config, &cx, &file, size)?;
            let snapshot = cx.snapshot(&dock)?.context("layout is empty")?;
            write_snapshot(&output, &snapshot)?;
            println!(
                "Wrote {} snapshot to {}",
                SnapshotFormat::from_path(&output),
                output.display()
            );
        }
        Commands::Check { file, size } => {
            let dock = open(&config, &cx, &file, size)?;
            let first = cx.snapshot(&dock)?.context("layout is empty")?;

            let mut restored = DockLayout::new(config.clone(), HeadlessBridge);
            restored.set_bounds(dock.bounds());
            restored.restore(&cx, &first)?;
            let second = cx.snapshot(&restored)?.context("restored layout is empty")?;

            if first != second {
                let json = SnapshotFormat::Json;
                bail!(
                    "snapshot changed after restore\nbefore:\n{}\nafter:\n{}",
                    json.encode(&first)?,
                    json.encode(&second)?
                );
            }
            println!("Round trip passed");
        }
    }
    Ok(())
}

fn open(config: &Config, cx: &SerializerContainer, file: &Path, size: Size) -> anyhow::Result<DockLayout> {
    let mut dock = DockLayout::new(config.clone(), HeadlessBridge);
    dock.set_bounds(RenderableArea::from_size(0.0, 0.0, size.width, size.height));
    let built = match read_input(file)? {
        Input::Config(layout) => dock.load(&layout),
        Input::Snapshot(snapshot) => dock.restore(cx, &snapshot),
    };
    built.with_context(|| format!("building layout from {}", file.display()))?;
    Ok(dock)
}

/// Reads a layout description, falling back to a snapshot when the file is
/// not one.
fn read_input(path: &Path) -> anyhow::Result<Input> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "toml") {
        let layout = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        return Ok(Input::Config(layout));
    }

    let format = SnapshotFormat::from_path(path);
    let layout: anyhow::Result<NodeConfig> = match format {
        SnapshotFormat::Json => serde_json::from_str(&text).map_err(Into::into),
        SnapshotFormat::Ron => ron::from_str(&text).map_err(Into::into),
    };
    match layout {
        Ok(layout) => Ok(Input::Config(layout)),
        Err(err) => match format.decode(&text) {
            Ok(snapshot) => Ok(Input::Snapshot(snapshot)),
            Err(_) => Err(err.context(format!("parsing {}", path.display()))),
        },
    }
}

use crate::config::load_config;
use crate::host::{MessageChannel, MessageSink, RecordingHost, VisMessage};
use crate::interaction::{ConfigPatch, Gesture};
use crate::layout_dump::write_layout_dump;
use crate::render::{write_output_png, write_output_svg};
use crate::vis::{RenderRequest, SankeyVis, Surface};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sfr", version, about = "Stage funnel (sankey) renderer")]
pub struct Args {
    /// Render request JSON ({data, config, queryResponse}) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, layout and stage catalog overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Print posted messages and config requests to stderr as JSON lines
    #[arg(long = "messages")]
    pub messages: bool,

    /// Write the final frame's graph and layout as JSON
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,

    /// Gesture to play against the rendered chart, in order:
    /// hide | show-more | detail:<STAGE> | clear
    #[arg(short = 'g', long = "gesture", value_parser = parse_gesture)]
    pub gestures: Vec<CliGesture>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CliGesture {
    Chart(Gesture),
    /// Host broadcast of the clear-selection message.
    Clear,
}

fn parse_gesture(value: &str) -> Result<CliGesture, String> {
    match value {
        "hide" => Ok(CliGesture::Chart(Gesture::HideColumn)),
        "show-more" => Ok(CliGesture::Chart(Gesture::ShowMore)),
        "clear" => Ok(CliGesture::Clear),
        other => match other.strip_prefix("detail:") {
            Some(stage) if !stage.is_empty() => Ok(CliGesture::Chart(Gesture::ToggleDetail {
                stage: stage.to_string(),
            })),
            _ => Err(format!(
                "unknown gesture {other:?} (expected hide, show-more, detail:<STAGE> or clear)"
            )),
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let input = read_input(args.input.as_deref())?;
    let mut request = RenderRequest::from_json(&input)
        .map_err(|err| anyhow::anyhow!("invalid render request: {err}"))?;

    let host = Rc::new(RecordingHost::new());
    let channel = MessageChannel::new();
    let mut vis = SankeyVis::new(config.clone(), channel.clone());
    let mut surface = Surface::new(
        f64::from(config.render.width),
        f64::from(config.render.height),
    );
    vis.create(&mut surface, Some(host.clone() as Rc<dyn MessageSink>));
    vis.update_async(&request, &mut surface, Some(host.clone()), || {});

    let mut requested: Vec<ConfigPatch> = Vec::new();
    for gesture in &args.gestures {
        match gesture {
            CliGesture::Chart(gesture) => {
                if !vis.handle_gesture(gesture) {
                    warn!(?gesture, "gesture not available on the current render");
                }
            }
            CliGesture::Clear => {
                channel.broadcast(&VisMessage::ClearSelectedStage);
            }
        }
        let patches = host.take_patches();
        if patches.is_empty() {
            continue;
        }
        for patch in &patches {
            info!(patch = %patch.to_json(), "applying config request");
            request.config.apply(patch);
        }
        requested.extend(patches);
        vis.update_async(&request, &mut surface, Some(host.clone()), || {});
    }

    if args.messages {
        for message in host.messages() {
            eprintln!("{}", message.to_json());
        }
        for patch in &requested {
            eprintln!("{}", patch.to_json());
        }
    }

    if let (Some(path), Some(frame)) = (args.dump_layout.as_deref(), vis.last_frame()) {
        write_layout_dump(path, frame)?;
    }

    let svg = if surface.is_empty() {
        warn!("nothing to draw");
        empty_svg(surface.width, surface.height)
    } else {
        surface.content().to_string()
    };
    match args.output_format {
        OutputFormat::Svg => write_output_svg(&svg, args.output.as_deref())?,
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_output_png(&svg, &output, &config.render)?;
        }
    }
    Ok(())
}

fn empty_svg(width: f64, height: f64) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\"/>"
    )
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

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use mp4_encoder_host::{
    EncoderConfig, EncoderSession, FrameSource, ImageSequence, PipelineCoordinator, PipelineOpts,
    RadialSketch, ReferenceEngine, TransferMode, encode_with_pipeline, encode_with_session,
};

#[derive(Parser, Debug)]
#[command(name = "mp4enc", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode the animated radial test pattern.
    Synth(SynthArgs),
    /// Encode a directory of numbered PNG/JPEG frames.
    Sequence(SequenceArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Output file.
    #[arg(long)]
    out: PathBuf,

    /// JSON encoder settings (camelCase keys); frame size always comes from the source.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Encode on a separate thread through the capture/encode pipeline.
    #[arg(long)]
    threaded: bool,

    /// How frames reach the encode thread when `--threaded` is set.
    #[arg(long, value_enum, default_value_t = ModeChoice::Shared)]
    mode: ModeChoice,
}

#[derive(Parser, Debug)]
struct SynthArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Frame width.
    #[arg(long, default_value_t = 256)]
    width: u32,

    /// Frame height.
    #[arg(long, default_value_t = 256)]
    height: u32,

    /// Bytes per pixel (3 or 4).
    #[arg(long, default_value_t = 3)]
    stride: u32,

    /// Frames per second [default: 30, or `fps` from `--config`].
    #[arg(long)]
    fps: Option<u32>,

    /// Clip length in seconds.
    #[arg(long, default_value_t = 3.0)]
    seconds: f64,

    /// Darken the pattern towards the top of the frame.
    #[arg(long)]
    fade: bool,
}

#[derive(Parser, Debug)]
struct SequenceArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory holding `0.png`, `1.png`, ...
    #[arg(long)]
    dir: PathBuf,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Target output size in megabytes; sets the bitrate.
    #[arg(long, default_value_t = 10.0)]
    size_mb: f64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Shared,
    Owned,
}

impl From<ModeChoice> for TransferMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Shared => TransferMode::Shared,
            ModeChoice::Owned => TransferMode::Owned,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Synth(args) => cmd_synth(args),
        Command::Sequence(args) => cmd_sequence(args),
    }
}

fn cmd_synth(args: SynthArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.common)?;
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    let frames = (config.fps as f64 * args.seconds).round() as usize;
    let mut source = RadialSketch::new(args.width, args.height, args.stride, frames)?
        .with_vertical_fade(args.fade);

    apply_frame_size(&mut config, &source);
    encode(&args.common, config, &mut source)
}

fn cmd_sequence(args: SequenceArgs) -> anyhow::Result<()> {
    let mut source = ImageSequence::open(&args.dir)?;

    let mut config = load_config(&args.common)?;
    apply_frame_size(&mut config, &source);
    if args.common.config.is_none() {
        let seconds = source.len_frames() as f64 / args.fps as f64;
        config.fps = args.fps;
        config.kbps = (args.size_mb * 8000.0 / seconds).round() as u32;
        config.qp_min = 10;
        config.qp_max = 50;
        config.temporal_denoise = false;
        config.group_of_pictures = args.fps;
        config.speed = 0;
    }
    encode(&args.common, config, &mut source)
}

fn load_config(common: &CommonArgs) -> anyhow::Result<EncoderConfig> {
    Ok(match &common.config {
        Some(path) => EncoderConfig::from_path(path)?,
        None => EncoderConfig::default(),
    })
}

fn apply_frame_size(config: &mut EncoderConfig, source: &dyn FrameSource) {
    config.width = source.width();
    config.height = source.height();
    config.stride = source.channels();
}

fn encode(
    common: &CommonArgs,
    config: EncoderConfig,
    source: &mut dyn FrameSource,
) -> anyhow::Result<()> {
    let bytes = if common.threaded {
        let opts = PipelineOpts {
            mode: common.mode.into(),
            ..PipelineOpts::default()
        };
        let mut pipeline = PipelineCoordinator::spawn(|| Ok(ReferenceEngine::new()), opts)?;
        pipeline.start(config)?;
        encode_with_pipeline(&mut pipeline, source)?;
        pipeline.finish()?
    } else {
        let mut session = EncoderSession::create(ReferenceEngine::new(), config)?;
        encode_with_session(&mut session, source)?;
        session.end()?
    };

    write_output(&common.out, &bytes)?;
    eprintln!("wrote {} ({} bytes)", common.out.display(), bytes.len());
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write output '{}'", path.display()))
}

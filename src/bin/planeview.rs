use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use planeview::{Canvas, FrameDims, I420Reader, PlanarRenderer, Renderer};

#[derive(Parser, Debug)]
#[command(name = "planeview", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame of a raw I420 file as a PNG.
    Frame(FrameArgs),
    /// Render every frame of a raw I420 file to numbered PNGs.
    Frames(FramesArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Input raw I420 (.yuv) file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Luma width in pixels.
    #[arg(long)]
    width: u32,

    /// Luma height in pixels.
    #[arg(long)]
    height: u32,

    /// Backend to use.
    #[arg(long, value_enum, default_value_t = BackendChoice::Cpu)]
    backend: BackendChoice,

    /// Render settings JSON. Environment overrides still apply.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Frame index (0-based).
    #[arg(long, default_value_t = 0)]
    index: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct FramesArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output directory; frames are written as frame_00000.png, ...
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Cpu,
    #[cfg(feature = "gpu")]
    Gpu,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Frames(args) => cmd_frames(args),
    }
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<planeview::RenderSettings> {
    let settings = match path {
        Some(p) => planeview::RenderSettings::from_json_path(p)
            .with_context(|| format!("load settings '{}'", p.display()))?,
        None => planeview::RenderSettings::default(),
    };
    Ok(settings.with_env_overrides()?)
}

fn make_renderer<'c>(
    source: &SourceArgs,
    canvas: &'c mut Canvas,
) -> anyhow::Result<PlanarRenderer<&'c mut Canvas>> {
    let settings = load_settings(source.settings.as_deref())?;
    let kind = match source.backend {
        BackendChoice::Cpu => planeview::BackendKind::Cpu,
        #[cfg(feature = "gpu")]
        BackendChoice::Gpu => planeview::BackendKind::Gpu,
    };

    let mut renderer = planeview::create_renderer(kind, &settings);
    renderer
        .initialize(canvas, source.width, source.height)
        .with_context(|| format!("initialize {kind:?} renderer"))?;
    Ok(renderer)
}

fn open_source(
    source: &SourceArgs,
) -> anyhow::Result<I420Reader<std::io::BufReader<std::fs::File>>> {
    let dims = FrameDims::new(source.width, source.height)?;
    I420Reader::open(&source.in_path, dims)
        .with_context(|| format!("open input '{}'", source.in_path.display()))
}

fn write_png(canvas: &Canvas, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    canvas
        .to_image()?
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut reader = open_source(&args.source)?;
    let skipped = reader.skip_frames(args.index)?;
    if skipped < args.index {
        anyhow::bail!(
            "frame {} requested but '{}' holds only {skipped} frames",
            args.index,
            args.source.in_path.display()
        );
    }
    let frame = reader
        .next_frame()?
        .with_context(|| format!("frame {} is past the end of the input", args.index))?;

    let mut canvas = Canvas::new(args.source.width, args.source.height);
    {
        let mut renderer = make_renderer(&args.source, &mut canvas)?;
        renderer
            .render_frame(&frame.y, &frame.u, &frame.v)
            .with_context(|| format!("render frame {}", args.index))?;
    }

    write_png(&canvas, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let reader = open_source(&args.source)?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let mut canvas = Canvas::new(args.source.width, args.source.height);
    let mut renderer = make_renderer(&args.source, &mut canvas)?;

    let mut written = 0u64;
    for (idx, frame) in reader.enumerate() {
        let frame = frame.with_context(|| format!("read frame {idx}"))?;
        renderer
            .render_frame(&frame.y, &frame.u, &frame.v)
            .with_context(|| format!("render frame {idx}"))?;

        let canvas = renderer
            .surface()
            .context("renderer lost its surface after initialize (bug)")?;
        let path = args.out_dir.join(format!("frame_{idx:05}.png"));
        write_png(canvas, &path)?;
        written += 1;
    }

    eprintln!("wrote {written} frames to {}", args.out_dir.display());
    Ok(())
}

//! Runs full-search motion estimation over a y4m clip and prints the
//! per-pair motion fields as JSON.

use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    num::NonZeroUsize,
    path::PathBuf,
    time::Instant,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use console::style;
use interp_kernels::{
    CpuFeatureLevel,
    LumaFrame,
    MotionField,
    MotionSearchConfig,
    NativeBuffer,
    estimate_motion,
    pool::BufferPool,
};
use log::{LevelFilter, info};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "interp-kernels", version, about)]
struct CliOptions {
    /// Sets the input y4m file to use, or `-` for stdin
    input: String,

    /// Side of the square blocks used for motion search
    #[arg(long, short, default_value = "16")]
    block_size: NonZeroUsize,

    /// Largest displacement tried along each axis
    #[arg(long, short, default_value_t = 8)]
    range: u16,

    /// Stop after this many frames
    #[arg(long)]
    limit: Option<usize>,

    /// Force a kernel level (rust, sse2, avx2, neon)
    #[arg(long)]
    cpu: Option<CpuFeatureLevel>,

    /// File to write results in
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Log more; repeat for trace output
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct PairReport {
    frame: usize,
    mean_cost: f64,
    field: MotionField,
}

#[derive(Serialize)]
struct Report {
    frame_count: usize,
    block_size: usize,
    range: u16,
    cpu: String,
    pairs: Vec<PairReport>,
    speed: f64,
}

fn main() -> Result<()> {
    let opts = CliOptions::parse();
    init_logger(match opts.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    })?;

    let input = match opts.input.as_str() {
        "-" => Box::new(io::stdin()) as Box<dyn Read>,
        f => Box::new(File::open(f).with_context(|| format!("Could not open {}", f))?)
            as Box<dyn Read>,
    };
    let mut dec = y4m::Decoder::new(BufReader::new(input))
        .map_err(|e| anyhow::anyhow!("Could not read y4m header: {:?}", e))?;
    if dec.get_bit_depth() != 8 {
        bail!("Only 8-bit input is supported, got {}-bit", dec.get_bit_depth());
    }
    let (width, height) = (dec.get_width(), dec.get_height());

    let cfg = MotionSearchConfig {
        block_size: opts.block_size,
        search_range: opts.range,
        cpu: opts.cpu.unwrap_or_default(),
    };
    info!("{}x{} input, {} kernels", width, height, cfg.cpu.or_scalar());

    let pool = BufferPool::default();
    let mut prev: Option<NativeBuffer> = None;
    let mut pairs = Vec::new();
    let mut frame_count = 0;
    let start = Instant::now();

    loop {
        if opts.limit.is_some_and(|limit| frame_count >= limit) {
            break;
        }
        let frame = match dec.read_frame() {
            Ok(frame) => frame,
            Err(y4m::Error::EOF) => break,
            Err(e) => bail!("Could not decode frame {}: {:?}", frame_count, e),
        };
        let luma = frame.get_y_plane();
        let mut curr = pool
            .acquire(luma.len())
            .context("Could not map a frame buffer")?;
        curr.as_mut_slice()[..luma.len()].copy_from_slice(luma);

        if let Some(prev) = prev.take() {
            let field = estimate_motion(
                &LumaFrame::new(prev.as_slice(), width, height)?,
                &LumaFrame::new(curr.as_slice(), width, height)?,
                &cfg,
            )?;
            pool.release(prev);
            pairs.push(PairReport {
                frame: frame_count,
                mean_cost: field.mean_cost(),
                field,
            });
        }
        prev = Some(curr);
        frame_count += 1;
    }
    if let Some(prev) = prev {
        pool.release(prev);
    }

    let elapsed = start.elapsed().as_secs_f64();
    let stats = pool.stats();
    info!(
        "{} frames, {} mapped, {} reused",
        frame_count, stats.mapped, stats.reused
    );

    let report = Report {
        frame_count,
        block_size: cfg.block_size.get(),
        range: cfg.search_range,
        cpu: cfg.cpu.or_scalar().to_string(),
        pairs,
        speed: if elapsed > 0.0 {
            frame_count as f64 / elapsed
        } else {
            0.0
        },
    };
    print!("{}", serde_json::to_string(&report)?);

    if let Some(path) = opts.output {
        let mut file = File::create(&path)
            .with_context(|| format!("Could not create {}", path.display()))?;
        let output = serde_json::to_string_pretty(&report)?;
        file.write_all(output.as_bytes())?;
    }
    Ok(())
}

fn init_logger(level: LevelFilter) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            let level = match record.level() {
                log::Level::Error => style("error").red().bold(),
                log::Level::Warn => style("warn").yellow().bold(),
                log::Level::Info => style("info").green(),
                log::Level::Debug => style("debug").cyan(),
                log::Level::Trace => style("trace").dim(),
            };
            out.finish(format_args!("[{}] {}: {}", level, record.target(), message));
        })
        .level(level)
        .chain(io::stderr())
        .apply()
        .context("Could not install logger")
}

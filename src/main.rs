use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use quadtrack::capture::{CaptureSource, ImageSequenceCapture, WebcamCapture};
use quadtrack::detection::{ChannelOrder, Detector, DetectorConfig};
use quadtrack::interrupt::CtrlCSignal;
use quadtrack::output::{ImageDirOutput, OutputSink, V4L2Output};
use quadtrack::pipeline::{FramePipeline, Overlay, PipelineOptions, Sinks};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Read frames from an image file or a directory of images instead of the webcam
    #[arg(long, conflicts_with = "input_device")]
    input_images: Option<PathBuf>,

    /// Requested capture width (needs --capture-height)
    #[arg(long, requires = "capture_height")]
    capture_width: Option<u32>,

    /// Requested capture height (needs --capture-width)
    #[arg(long, requires = "capture_width")]
    capture_height: Option<u32>,

    /// v4l2loopback device receiving the annotated frames
    #[arg(short, long)]
    output_device: Option<PathBuf>,

    /// v4l2loopback device receiving the refined mask
    #[arg(long)]
    mask_device: Option<PathBuf>,

    /// Write annotated frames and masks as PNG files into this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Throttle to this many frames per second (0 = as fast as frames arrive)
    #[arg(long, default_value_t = 0)]
    fps: u32,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// TrueType font used to draw the FPS readout
    #[arg(long)]
    font: Option<PathBuf>,

    /// JSON file with detector parameters; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Greenness threshold (0-255)
    #[arg(long)]
    threshold: Option<u8>,

    /// Side length of the square morphology kernel (odd)
    #[arg(long)]
    kernel_size: Option<u32>,

    /// Polygon approximation tolerance as a fraction of contour perimeter
    #[arg(long)]
    epsilon_ratio: Option<f64>,

    /// Channel storage order of incoming frames
    #[arg(long, value_enum)]
    channel_order: Option<ChannelOrder>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn detector_config(&self) -> Result<DetectorConfig> {
        let mut config = match &self.config {
            Some(path) => DetectorConfig::from_json_file(path)?,
            None => DetectorConfig::default(),
        };

        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(kernel_size) = self.kernel_size {
            config.kernel_size = kernel_size;
        }
        if let Some(epsilon_ratio) = self.epsilon_ratio {
            config.epsilon_ratio = epsilon_ratio;
        }
        if let Some(channel_order) = self.channel_order {
            config.channel_order = channel_order;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("quadtrack starting");

    let config = args
        .detector_config()
        .context("Invalid detector configuration")?;
    tracing::info!(
        "Detector: threshold={}, kernel={}x{}, epsilon_ratio={}, channels={:?}",
        config.threshold,
        config.kernel_size,
        config.kernel_size,
        config.epsilon_ratio,
        config.channel_order
    );

    let mut capture: Box<dyn CaptureSource> = match &args.input_images {
        Some(path) => Box::new(
            ImageSequenceCapture::open(path).context("Failed to open input images")?,
        ),
        None => {
            let resolution = args.capture_width.zip(args.capture_height);
            Box::new(
                WebcamCapture::new(args.input_device, resolution)
                    .context("Failed to initialize webcam capture")?,
            )
        }
    };
    let (width, height) = capture.resolution();
    tracing::info!("Capture: {}x{}", width, height);

    let mut frame_sinks: Vec<Box<dyn OutputSink>> = Vec::new();
    let mut mask_sinks: Vec<Box<dyn OutputSink>> = Vec::new();

    if let Some(device) = &args.output_device {
        frame_sinks.push(Box::new(
            V4L2Output::new(device, width, height)
                .context("Failed to initialize v4l2loopback output")?,
        ));
    }
    if let Some(device) = &args.mask_device {
        mask_sinks.push(Box::new(
            V4L2Output::new(device, width, height)
                .context("Failed to initialize v4l2loopback mask output")?,
        ));
    }
    if let Some(dir) = &args.output_dir {
        frame_sinks.push(Box::new(ImageDirOutput::new(dir, "frame")?));
        mask_sinks.push(Box::new(ImageDirOutput::new(dir, "mask")?));
    }
    if frame_sinks.is_empty() {
        tracing::warn!("No output configured, detections are only logged");
    }

    let mut overlay = Overlay::new(config.channel_order)?;
    if let Some(font) = &args.font {
        overlay = overlay.with_font_file(font)?;
    }

    let detector = Detector::new(&config)?;
    let options = PipelineOptions {
        target_fps: args.fps,
        max_frames: args.max_frames,
        ..Default::default()
    };

    let stop = CtrlCSignal::install()?;
    tracing::info!("Press Ctrl+C to stop");

    let mut frame_out = FanOut(frame_sinks);
    let mut mask_out = FanOut(mask_sinks);
    let mut sinks = Sinks {
        frame: (!frame_out.0.is_empty()).then_some(&mut frame_out as &mut dyn OutputSink),
        mask: (!mask_out.0.is_empty()).then_some(&mut mask_out as &mut dyn OutputSink),
    };

    let summary = FramePipeline::new(detector, overlay, options).run(
        capture.as_mut(),
        &mut sinks,
        &stop,
    )?;

    tracing::info!(
        "Processed {} frames, marker found in {}",
        summary.frames,
        summary.detections
    );

    Ok(())
}

/// Presents every frame to each wrapped sink
struct FanOut(Vec<Box<dyn OutputSink>>);

impl OutputSink for FanOut {
    fn write_frame(&mut self, frame: &image::RgbImage) -> Result<()> {
        for sink in &mut self.0 {
            sink.write_frame(frame)?;
        }
        Ok(())
    }
}

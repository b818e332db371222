mod fps;
mod overlay;

pub use fps::FrameRateCounter;
pub use overlay::{fps_label, Overlay};

use anyhow::{Context, Result};
use image::buffer::ConvertBuffer;
use image::RgbImage;
use std::time::{Duration, Instant};

use crate::capture::CaptureSource;
use crate::detection::{Detection, Detector, FrameAnalysis};
use crate::interrupt::StopSignal;
use crate::output::OutputSink;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Sleep to hold this rate; 0 runs as fast as frames arrive
    pub target_fps: u32,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// Log timing averages every this many frames; 0 disables
    pub stats_interval: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target_fps: 0,
            max_frames: None,
            stats_interval: 30,
        }
    }
}

/// Where presented frames go; either output may be absent
#[derive(Default)]
pub struct Sinks<'a> {
    /// Original frame with overlay
    pub frame: Option<&'a mut dyn OutputSink>,
    /// Refined mask, for diagnostics
    pub mask: Option<&'a mut dyn OutputSink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Interrupted,
    FrameLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub frames: u64,
    pub detections: u64,
    pub stop_reason: StopReason,
}

/// One frame after detection and annotation
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub analysis: FrameAnalysis,
    pub annotated: RgbImage,
    pub fps: f64,
}

impl ProcessedFrame {
    pub fn detection(&self) -> Option<&Detection> {
        self.analysis.detection.as_ref()
    }
}

#[derive(Debug, Default)]
struct StageTimes {
    capture: Duration,
    detect: Duration,
    present: Duration,
}

/// Pulls frames one at a time, detects, annotates and presents them
///
/// Strictly sequential: a frame is fully presented before the next one is
/// requested, so outputs keep acquisition order.
pub struct FramePipeline {
    detector: Detector,
    overlay: Overlay,
    fps: FrameRateCounter,
    options: PipelineOptions,
}

impl FramePipeline {
    pub fn new(detector: Detector, overlay: Overlay, options: PipelineOptions) -> Self {
        Self {
            detector,
            overlay,
            fps: FrameRateCounter::new(Instant::now()),
            options,
        }
    }

    /// Detect on `frame`, update the frame-rate window and draw the overlay
    pub fn process_frame(&mut self, frame: &RgbImage, now: Instant) -> ProcessedFrame {
        let analysis = self.detector.analyze(frame);
        let fps = self.fps.tick(now);
        let annotated = self
            .overlay
            .annotate(frame, analysis.detection.as_ref(), fps);

        ProcessedFrame {
            analysis,
            annotated,
            fps,
        }
    }

    pub fn run<C, S>(
        &mut self,
        capture: &mut C,
        sinks: &mut Sinks<'_>,
        stop: &S,
    ) -> Result<PipelineSummary>
    where
        C: CaptureSource + ?Sized,
        S: StopSignal + ?Sized,
    {
        let frame_duration = (self.options.target_fps > 0)
            .then(|| Duration::from_secs_f64(1.0 / self.options.target_fps as f64));
        let mut frame_count = 0u64;
        let mut detections = 0u64;
        let mut totals = StageTimes::default();

        tracing::info!("Starting main pipeline loop");

        let stop_reason = loop {
            let loop_start = Instant::now();

            let frame = match capture
                .capture_frame()
                .context("Failed to capture frame")?
            {
                Some(frame) => frame,
                None => {
                    tracing::info!("Frame source exhausted");
                    break StopReason::EndOfStream;
                }
            };
            let capture_time = loop_start.elapsed();
            totals.capture += capture_time;

            let detect_start = Instant::now();
            let processed = self.process_frame(&frame, detect_start);
            totals.detect += detect_start.elapsed();

            match processed.detection() {
                Some(detection) => {
                    detections += 1;
                    tracing::debug!(
                        "Frame {}: marker at ({}, {})",
                        frame_count,
                        detection.center.x,
                        detection.center.y
                    );
                }
                None => tracing::debug!("Frame {}: no marker", frame_count),
            }

            let present_start = Instant::now();
            present(sinks, &processed)?;
            totals.present += present_start.elapsed();

            frame_count += 1;

            if self.options.stats_interval > 0 && frame_count % self.options.stats_interval == 0 {
                log_stats(frame_count, detections, &totals, processed.fps);
            }

            if stop.stop_requested() {
                break StopReason::Interrupted;
            }
            if self.options.max_frames.is_some_and(|max| frame_count >= max) {
                break StopReason::FrameLimit;
            }

            if let Some(frame_duration) = frame_duration {
                let elapsed = loop_start.elapsed();
                if elapsed < frame_duration {
                    std::thread::sleep(frame_duration - elapsed);
                }
            }
        };

        tracing::info!(
            "Pipeline stopped ({:?}) after {} frames, {} detections",
            stop_reason,
            frame_count,
            detections
        );

        Ok(PipelineSummary {
            frames: frame_count,
            detections,
            stop_reason,
        })
    }
}

fn present(sinks: &mut Sinks<'_>, processed: &ProcessedFrame) -> Result<()> {
    if let Some(sink) = sinks.mask.as_deref_mut() {
        let mask_rgb: RgbImage = processed.analysis.mask.convert();
        sink.write_frame(&mask_rgb)
            .context("Failed to write mask frame")?;
    }
    if let Some(sink) = sinks.frame.as_deref_mut() {
        sink.write_frame(&processed.annotated)
            .context("Failed to write frame")?;
    }
    Ok(())
}

fn log_stats(frame_count: u64, detections: u64, totals: &StageTimes, fps: f64) {
    let per_frame_ms = |total: Duration| total.as_secs_f64() * 1000.0 / frame_count as f64;
    let avg_capture_ms = per_frame_ms(totals.capture);
    let avg_detect_ms = per_frame_ms(totals.detect);
    let avg_present_ms = per_frame_ms(totals.present);

    tracing::info!(
        "Frame {}: capture={:.1}ms, detect={:.1}ms, present={:.1}ms, {}, detections={}",
        frame_count,
        avg_capture_ms,
        avg_detect_ms,
        avg_present_ms,
        fps_label(fps),
        detections
    );
}

//! Interactive segmentation session.
//!
//! A session binds one input image and recomputes the segmentation whenever
//! parameters change. Only one run executes at a time: edits that arrive
//! during a run are coalesced into a single pending slot (latest wins) and
//! picked up by the running caller before it returns.
//!
//! ```text
//! Uninitialized --setup_image--> Ready --process_image--> Processing --> Ready
//!                                  ^                          |
//!                                  +------ pending edits -----+
//! ```

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::buffer::{Region, VoxelBuffer};
use crate::calibration::{Calibration, VoxelRatios};
use crate::error::{Result, SegmentationError};
use crate::filters::arithmetic::threshold;
use crate::histogram::Histogram;
use crate::labels::{create_labels, LabelImage};
use crate::params::{MethodTracker, OutputType, SegmentationParameters, Stage};
use crate::preprocess::Preprocessor;
use crate::seeds::SeedDetector;

/// Prefix of every output name.
pub const OUTPUT_PREFIX: &str = "VTL_";

/// Image handed to a session by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct InputImage {
    pub name: String,
    pub buffer: VoxelBuffer,
    pub calibration: Calibration,
    /// Restrict processing to this rectangle on every slice.
    pub region: Option<Region>,
}

impl InputImage {
    pub fn new(name: impl Into<String>, buffer: VoxelBuffer, calibration: Calibration) -> Self {
        InputImage {
            name: name.into(),
            buffer,
            calibration,
            region: None,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationOutput {
    pub name: String,
    pub output_type: OutputType,
    pub image: VoxelBuffer,
    pub label_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Ready,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A run finished with these parameters (or later coalesced ones).
    Completed { label_count: u32 },
    /// Parameters match the live output; nothing was recomputed.
    Unchanged,
    /// Another run is active and will pick these parameters up.
    Coalesced,
}

/// Everything a run reads, fixed at setup.
#[derive(Debug)]
struct Prepared {
    name: String,
    image: VoxelBuffer,
    histogram: Histogram,
    ratios: VoxelRatios,
}

impl Prepared {
    fn new(input: &InputImage) -> Result<Self> {
        let ratios = input.calibration.ratios()?;
        let image = match &input.region {
            Some(region) => input.buffer.crop(region)?,
            None => input.buffer.clone(),
        };
        let histogram = Histogram::of(&image);
        Ok(Prepared {
            name: input.name.clone(),
            image,
            histogram,
            ratios,
        })
    }

    /// Every stage up to the label image.
    fn segment(&self, params: &SegmentationParameters) -> Result<LabelImage> {
        params.validate()?;

        let preprocessor = Preprocessor::with_ratios(self.ratios);
        let filtered = preprocessor.filter(&self.image, params.filter_method, params.filter_radius)?;
        let preprocessed =
            preprocessor.subtract_background(&filtered, params.background_method, params.background_radius)?;
        drop(filtered);

        let histogram = self.histogram.with_usage(params.histogram_usage);
        let bin = params.threshold_method.select(&histogram)?;
        let level = histogram.level_above(bin);
        debug!(
            "{} threshold: bin {bin}, foreground >= {level}",
            params.threshold_method
        );
        let foreground = threshold(&preprocessed, level);

        let seeds = SeedDetector::with_ratios(self.ratios).detect(
            params.separation_method,
            &preprocessed,
            &foreground,
            params.spot_sigma,
            params.maxima_radius,
        )?;
        drop(preprocessed);

        create_labels(&seeds, &foreground)
    }

    fn present(&self, labels: LabelImage, output_type: OutputType) -> SegmentationOutput {
        let label_count = labels.label_count;
        SegmentationOutput {
            name: format!("{OUTPUT_PREFIX}{}", self.name),
            output_type,
            image: labels.into_output(output_type),
            label_count,
        }
    }
}

/// One-shot segmentation without a session.
pub fn voronoi_threshold_labeling(
    input: &InputImage,
    params: &SegmentationParameters,
) -> Result<SegmentationOutput> {
    params.validate()?;
    let prepared = Prepared::new(input)?;
    let labels = prepared.segment(params)?;
    Ok(prepared.present(labels, params.output_type))
}

#[derive(Debug, Default)]
struct SessionState {
    input: Option<InputImage>,
    prepared: Option<Arc<Prepared>>,
    processing: bool,
    pending: Option<SegmentationParameters>,
    applied: Option<SegmentationParameters>,
    /// Labels behind the live output, reshaped on output-only edits.
    labels: Option<LabelImage>,
    output: Option<SegmentationOutput>,
    tracker: MethodTracker,
}

impl SessionState {
    /// Live labels when `params` differ from the applied ones only in output shape.
    fn reusable_labels(&self, params: &SegmentationParameters) -> Option<LabelImage> {
        let applied = self.applied.as_ref()?;
        match params.first_changed_stage(applied) {
            Some(Stage::Output) => self.labels.clone(),
            _ => None,
        }
    }
}

/// Clears the processing flag if a run unwinds.
struct RunGuard<'a> {
    state: &'a Mutex<SessionState>,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock();
            state.processing = false;
            state.pending = None;
        }
    }
}

/// Segmentation session shared between a host's callbacks.
#[derive(Debug, Default)]
pub struct SegmentationSession {
    state: Mutex<SessionState>,
}

impl SegmentationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        let state = self.state.lock();
        if state.processing {
            SessionPhase::Processing
        } else if state.prepared.is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Uninitialized
        }
    }

    /// Bind `input`, compute its histogram and drop any previous output.
    ///
    /// # Errors
    /// `Busy` while a run is active; calibration and region errors.
    pub fn setup_image(&self, input: InputImage) -> Result<()> {
        if self.state.lock().processing {
            return Err(SegmentationError::Busy);
        }
        let prepared = Prepared::new(&input)?;
        info!(
            "set up {} ({}, region {:?})",
            input.name,
            prepared.image.dims(),
            input.region
        );

        let mut state = self.state.lock();
        if state.processing {
            return Err(SegmentationError::Busy);
        }
        state.prepared = Some(Arc::new(prepared));
        state.input = Some(input);
        state.tracker.reset();
        state.pending = None;
        state.applied = None;
        state.labels = None;
        state.output = None;
        Ok(())
    }

    /// Run the pipeline with `params` unless the live output already matches.
    ///
    /// Invalid parameters are rejected before any work starts. If a run is in
    /// progress the parameters replace any pending ones and `Coalesced` is
    /// returned.
    pub fn process_image(&self, params: SegmentationParameters) -> Result<ProcessOutcome> {
        params.validate()?;

        let mut state = self.state.lock();
        if state.prepared.is_none() {
            return Err(SegmentationError::NotInitialized);
        }
        if state.processing {
            debug!("run in progress, parameters queued");
            state.pending = Some(params);
            return Ok(ProcessOutcome::Coalesced);
        }
        if state.output.is_some() && state.applied.as_ref() == Some(&params) {
            return Ok(ProcessOutcome::Unchanged);
        }
        state.processing = true;
        drop(state);

        self.drain(params)
    }

    /// Reset the radius of a changed filter or background method, then
    /// process. `params` is updated in place so the host can show the reset.
    pub fn apply_edit(&self, params: &mut SegmentationParameters) -> Result<ProcessOutcome> {
        {
            let mut state = self.state.lock();
            if state.prepared.is_none() {
                return Err(SegmentationError::NotInitialized);
            }
            if state.tracker.reconcile(params) {
                debug!("method changed, radius reset");
            }
        }
        self.process_image(params.clone())
    }

    /// Drop the region restriction and the current output, then reprocess
    /// the full image.
    pub fn apply_on_complete_image(&self, params: SegmentationParameters) -> Result<ProcessOutcome> {
        let mut input = {
            let state = self.state.lock();
            if state.processing {
                return Err(SegmentationError::Busy);
            }
            state.input.clone().ok_or(SegmentationError::NotInitialized)?
        };
        input.region = None;
        self.setup_image(input)?;
        self.process_image(params)
    }

    /// Run `params`, then every coalesced edit, until nothing is pending.
    /// The caller must have set the processing flag.
    fn drain(&self, params: SegmentationParameters) -> Result<ProcessOutcome> {
        let mut guard = RunGuard {
            state: &self.state,
            armed: true,
        };
        let mut params = params;

        loop {
            let (prepared, reusable) = {
                let state = self.state.lock();
                let prepared = state.prepared.clone().ok_or(SegmentationError::NotInitialized)?;
                (prepared, state.reusable_labels(&params))
            };
            let result = match reusable {
                Some(labels) => {
                    debug!("output-only edit, reshaping {} labels", labels.label_count);
                    Ok(labels)
                }
                None => prepared.segment(&params),
            };

            let mut state = self.state.lock();
            let outcome = match result {
                Ok(labels) => {
                    let output = prepared.present(labels.clone(), params.output_type);
                    let label_count = output.label_count;
                    info!("{}: {label_count} labels ({})", output.name, output.output_type);
                    state.tracker.observe(&params);
                    state.applied = Some(params);
                    state.labels = Some(labels);
                    state.output = Some(output);
                    Ok(ProcessOutcome::Completed { label_count })
                }
                Err(err) => Err(err),
            };

            match state.pending.take() {
                Some(next) => {
                    if let Err(err) = &outcome {
                        warn!("superseded run failed: {err}");
                    }
                    params = next;
                }
                None => {
                    state.processing = false;
                    guard.armed = false;
                    return outcome;
                }
            }
        }
    }

    pub fn output(&self) -> Option<SegmentationOutput> {
        self.state.lock().output.clone()
    }

    pub fn output_name(&self) -> Option<String> {
        self.state.lock().output.as_ref().map(|o| o.name.clone())
    }

    /// Parameters behind the live output.
    pub fn applied_parameters(&self) -> Option<SegmentationParameters> {
        self.state.lock().applied.clone()
    }

    /// Histogram of the (cropped) input before any usage policy.
    pub fn histogram(&self) -> Option<Histogram> {
        self.state.lock().prepared.as_ref().map(|p| p.histogram.clone())
    }
}

//! Segmentation parameters, their validation and the prior-method diff.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::{Result, SegmentationError};
use crate::histogram::HistogramUsage;
use crate::threshold::AutoThresholdMethod;

/// Upper bound for every radius and sigma.
pub const MAX_RADIUS: f32 = 1000.0;
/// Upper bound for median-based radii, whose cost grows with kernel volume.
pub const MAX_MEDIAN_RADIUS: f32 = 15.0;
/// Radius a method's parameter falls back to after the method changes.
pub const RESET_RADIUS: f32 = 1.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum FilterMethod {
    None,
    #[default]
    Gaussian,
    #[strum(serialize = "DoG")]
    #[serde(rename = "DoG")]
    DifferenceOfGaussian,
    Median,
    Mean,
    Open,
    Close,
    Variance,
}

impl FilterMethod {
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| SegmentationError::UnknownMethod {
            kind: "filter",
            name: name.to_string(),
        })
    }

    pub fn max_radius(self) -> f32 {
        match self {
            FilterMethod::Median => MAX_MEDIAN_RADIUS,
            _ => MAX_RADIUS,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum BackgroundMethod {
    #[default]
    None,
    #[strum(serialize = "DoG")]
    #[serde(rename = "DoG")]
    DifferenceOfGaussian,
    #[strum(serialize = "DoM")]
    #[serde(rename = "DoM")]
    DifferenceOfMedian,
    TopHat,
    BottomHat,
}

impl BackgroundMethod {
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| SegmentationError::UnknownMethod {
            kind: "background",
            name: name.to_string(),
        })
    }

    pub fn max_radius(self) -> f32 {
        match self {
            BackgroundMethod::DifferenceOfMedian => MAX_MEDIAN_RADIUS,
            _ => MAX_RADIUS,
        }
    }
}

/// How seeds are derived before Voronoi growth.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum SeparationMethod {
    #[default]
    Maxima,
    #[strum(serialize = "Eroded Maxima")]
    #[serde(rename = "Eroded Maxima")]
    ErodedMaxima,
    #[strum(serialize = "Eroded box")]
    #[serde(rename = "Eroded box")]
    ErodedBox,
    #[strum(serialize = "Eroded sphere")]
    #[serde(rename = "Eroded sphere")]
    ErodedSphere,
    #[strum(serialize = "DoG Seeds")]
    #[serde(rename = "DoG Seeds")]
    DogSeeds,
}

impl SeparationMethod {
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| SegmentationError::UnknownMethod {
            kind: "separation",
            name: name.to_string(),
        })
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum OutputType {
    #[default]
    Labels,
    Binary,
}

impl OutputType {
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map_err(|_| SegmentationError::UnknownMethod {
            kind: "output type",
            name: name.to_string(),
        })
    }
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Stage {
    Filter,
    Background,
    Threshold,
    Seeds,
    Output,
}

/// Everything one segmentation run depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParameters {
    pub filter_method: FilterMethod,
    pub filter_radius: f32,
    pub background_method: BackgroundMethod,
    pub background_radius: f32,
    pub threshold_method: AutoThresholdMethod,
    pub histogram_usage: HistogramUsage,
    pub separation_method: SeparationMethod,
    /// Blur sigma for maxima strategies, erosion radius for eroded ones.
    pub spot_sigma: f32,
    /// Maxima search radius, or the response threshold for DoG seeds.
    pub maxima_radius: f32,
    pub output_type: OutputType,
}

impl Default for SegmentationParameters {
    fn default() -> Self {
        SegmentationParameters {
            filter_method: FilterMethod::Gaussian,
            filter_radius: 1.0,
            background_method: BackgroundMethod::None,
            background_radius: 1.0,
            threshold_method: AutoThresholdMethod::Default,
            histogram_usage: HistogramUsage::Full,
            separation_method: SeparationMethod::Maxima,
            spot_sigma: 1.0,
            maxima_radius: 1.0,
            output_type: OutputType::Labels,
        }
    }
}

pub(crate) fn check_range(parameter: &'static str, value: f32, max: f32) -> Result<()> {
    // NaN fails both comparisons
    if value >= 0.0 && value <= max {
        Ok(())
    } else {
        Err(SegmentationError::ParameterOutOfRange {
            parameter,
            value,
            min: 0.0,
            max,
        })
    }
}

impl SegmentationParameters {
    /// Reject out-of-range radii before any buffer is allocated.
    pub fn validate(&self) -> Result<()> {
        check_range("filter_radius", self.filter_radius, self.filter_method.max_radius())?;
        check_range(
            "background_radius",
            self.background_radius,
            self.background_method.max_radius(),
        )?;
        check_range("spot_sigma", self.spot_sigma, MAX_RADIUS)?;
        check_range("maxima_radius", self.maxima_radius, MAX_RADIUS)?;
        Ok(())
    }

    /// Parse and validate a JSON preset. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: SegmentationParameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Earliest stage whose result differs between `previous` and `self`.
    pub fn first_changed_stage(&self, previous: &SegmentationParameters) -> Option<Stage> {
        if self.filter_method != previous.filter_method || self.filter_radius != previous.filter_radius {
            Some(Stage::Filter)
        } else if self.background_method != previous.background_method
            || self.background_radius != previous.background_radius
        {
            Some(Stage::Background)
        } else if self.threshold_method != previous.threshold_method
            || self.histogram_usage != previous.histogram_usage
        {
            Some(Stage::Threshold)
        } else if self.separation_method != previous.separation_method
            || self.spot_sigma != previous.spot_sigma
            || self.maxima_radius != previous.maxima_radius
        {
            Some(Stage::Seeds)
        } else if self.output_type != previous.output_type {
            Some(Stage::Output)
        } else {
            None
        }
    }
}

fn names<E: IntoEnumIterator + ToString>() -> Vec<String> {
    E::iter().map(|method| method.to_string()).collect()
}

/// UI names of every option of the parameter `kind`, in menu order.
///
/// `kind` is one of `filter`, `background`, `threshold`, `histogram_usage`,
/// `separation` or `output`.
pub fn choices(kind: &str) -> Result<Vec<String>> {
    let names = match kind {
        "filter" => names::<FilterMethod>(),
        "background" => names::<BackgroundMethod>(),
        "threshold" => names::<AutoThresholdMethod>(),
        "histogram_usage" => names::<HistogramUsage>(),
        "separation" => names::<SeparationMethod>(),
        "output" => names::<OutputType>(),
        _ => {
            return Err(SegmentationError::UnknownMethod {
                kind: "parameter",
                name: kind.to_string(),
            })
        }
    };
    Ok(names)
}

/// Remembers the last filter and background methods seen so a method switch
/// can reset its radius.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodTracker {
    prior_filter: Option<FilterMethod>,
    prior_background: Option<BackgroundMethod>,
}

impl MethodTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every recorded method.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record the methods of `params` without touching any radius.
    pub fn observe(&mut self, params: &SegmentationParameters) {
        self.prior_filter = Some(params.filter_method);
        self.prior_background = Some(params.background_method);
    }

    /// Reset the radius of each method that differs from the recorded one,
    /// then record the new methods.
    ///
    /// # Returns
    /// `true` when any radius was reset
    pub fn reconcile(&mut self, params: &mut SegmentationParameters) -> bool {
        let mut reset = false;

        if let Some(prior) = self.prior_filter {
            if prior != params.filter_method {
                params.filter_radius = RESET_RADIUS;
                reset = true;
            }
        }
        if let Some(prior) = self.prior_background {
            if prior != params.background_method {
                params.background_radius = RESET_RADIUS;
                reset = true;
            }
        }

        self.observe(params);
        reset
    }
}

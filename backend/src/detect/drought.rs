use ndarray::Array2;
use shared::{ClimateSeries, DroughtTrend};
use tch::Tensor;

use crate::detect::error::DetectError;

pub const CLIMATE_CHANNELS: usize = 6;

/// Ordinal severity levels 0 (none) through 5 (exceptional).
pub const DROUGHT_LEVELS: [&str; 6] = [
    "No Drought",
    "Abnormally Dry",
    "Moderate Drought",
    "Severe Drought",
    "Extreme Drought",
    "Exceptional Drought",
];

/// Fits the series to the model window: shorter series are left-padded with
/// zero rows, longer series keep the most recent `window` days. Channels of
/// unequal length are truncated to the shortest common length first.
pub fn window_series(series: &ClimateSeries, window: usize) -> Array2<f32> {
    let channels = [
        &series.temperature,
        &series.humidity,
        &series.rainfall,
        &series.wind_speed,
        &series.soil_moisture,
        &series.evapotranspiration,
    ];
    let len = channels.iter().map(|c| c.len()).min().unwrap_or(0);
    let start = len.saturating_sub(window);
    let kept = len - start;

    let mut rows = Array2::<f32>::zeros((window, CLIMATE_CHANNELS));
    for (i, day) in (start..len).enumerate() {
        let target = window - kept + i;
        for (c, channel) in channels.iter().enumerate() {
            rows[[target, c]] = channel[day];
        }
    }
    rows
}

/// Lays the window out as a `[1, days, channels]` float tensor.
pub fn to_input_tensor(rows: &Array2<f32>) -> Result<Tensor, DetectError> {
    let (days, channels) = rows.dim();
    let flat: Vec<f32> = rows.iter().copied().collect();
    Ok(Tensor::from_slice(&flat).view([1, days as i64, channels as i64]))
}

pub fn level_label(level: usize) -> &'static str {
    DROUGHT_LEVELS.get(level).copied().unwrap_or("Unknown")
}

/// Presentation-only trend bucket anchored at the middle level.
pub fn trend_for_level(level: usize) -> DroughtTrend {
    if level < 2 {
        DroughtTrend::Decreasing
    } else if level == 2 {
        DroughtTrend::Stable
    } else {
        DroughtTrend::Increasing
    }
}

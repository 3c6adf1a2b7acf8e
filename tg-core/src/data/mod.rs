//! Data types and validation modules

mod types;
mod validation;

pub use types::{FrequencyBounds, SensorNamespace, SensorReading};
pub use validation::{
    validate_gain, validate_period, validate_sensor_id, validate_settings, validate_target,
};

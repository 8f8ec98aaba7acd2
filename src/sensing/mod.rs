mod controller;
mod loop_worker;
mod sensor;

pub use controller::SamplerController;
pub use loop_worker::{sampling_loop, SamplerConfig};
pub use sensor::{open_sensor, SignalSensor, SimulatedLine, SysfsGpioSensor};

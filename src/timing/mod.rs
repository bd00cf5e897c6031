// 防抖与节流

pub mod debounce;
pub mod throttle;

pub use debounce::{Debounce, debounce};
pub use throttle::{Throttle, ThrottleGate, throttle};

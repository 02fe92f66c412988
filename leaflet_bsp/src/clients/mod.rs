//! Reference client drivers.
//!
//! Each client claims its pin on activation and keeps the [`PinClaim`] for
//! its lifetime, so dropping the client frees the pin on every exit path.
//! A client that loses a claim conflict fails its own activation; the
//! current owner is unaffected.
//!
//! [`PinClaim`]: crate::allocator::PinClaim

pub mod aio;
pub mod gpio;
pub mod pwm;
pub mod relay;
pub mod temperature;

pub use aio::AioDevice;
pub use gpio::BoardInput;
pub use pwm::PwmDevice;
pub use relay::RelayDevice;
pub use temperature::TemperatureSensor;

//! Target selection.
//!
//! `ports::avr` is the real ATmega328P-class implementation; `ports::mok`
//! is a no-op stand-in used on every other target, almost always the
//! host, running tests.

#[cfg(target_arch = "avr")]
pub mod avr;

#[cfg(not(target_arch = "avr"))]
pub mod mok;

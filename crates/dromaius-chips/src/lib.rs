//! Example chip behavior models built on top of `dromaius-core`'s
//! public [`dromaius_core::Chip`] trait. Each module models one
//! family of parts from the corpus these designs were built from,
//! generalized where a single parameterized chip covers a whole
//! package family (e.g. [`gates::Gate`] instead of a struct per gate
//! function).

pub mod buffer;
pub mod counter;
pub mod cpu;
pub mod crt;
pub mod datassette;
pub mod decoder;
pub mod flipflop;
pub mod gates;
pub mod ieee488;
pub mod lcd;
pub mod memory;
pub mod oscillator;
pub mod pia;
pub mod reset;
pub mod shift_register;
pub mod tap;
pub mod testing;
pub mod transceiver;
pub mod via;

#![cfg_attr(not(feature = "std"), no_std)]

// Copyright 2017, Romuald Texier-Marcadé <romualdtm@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/license/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option.  This file may not be copied, modified, or distributed
// except according to those terms.

//! An adaptive byte-stream transport over the Nordic UART Service (NUS)
//! profile.
//!
//! This crate implements the hard part of emulating a serial port over
//! Bluetooth Low Energy: a ring-buffered transmit engine that continuously
//! converges on the highest throughput a link sustains — given a
//! fluctuating MTU, PHY, data-length extension, signal strength, and an
//! asynchronous notification-completion signal — without overflowing the
//! controller's notification queue or starving the consumer.
//!
//! It does **not** implement a concrete BLE host stack. [`HostStack`] is
//! the capability interface this crate expects GAP/GATT plumbing to be
//! reached through; an application wires its platform's BLE stack
//! (SoftDevice, NimBLE, BlueZ, whatever is available) into a `HostStack`
//! impl and drives [`TxEngine`] from the stack's own event callbacks.
//!
//! # Usage
//!
//! Add a dependency to `nus-transport` in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! nus-transport = "0.1.0"
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use nus_transport::{BeginConfig, CodedScheme, HostStack, Mode, Phy, TxEngine};
//! use nus_transport::gatt::AdvConfig;
//! use nus_transport::host::NotifyOutcome;
//! use nus_transport::profile::ConnParams;
//! use nus_transport::std_clock::StdClock;
//!
//! #[derive(Debug)]
//! struct MyHostError;
//!
//! struct MyHostStack;
//!
//! impl HostStack for MyHostStack {
//!     type Error = MyHostError;
//!     fn notify(&mut self, _chunk: &[u8]) -> Result<NotifyOutcome, Self::Error> {
//!         Ok(NotifyOutcome::Queued)
//!     }
//!     fn request_mtu(&mut self, _mtu: u16) -> Result<(), Self::Error> { Ok(()) }
//!     fn request_phy(&mut self, _phy: Phy, _scheme: Option<CodedScheme>) -> Result<(), Self::Error> { Ok(()) }
//!     fn request_conn_params(&mut self, _params: ConnParams) -> Result<(), Self::Error> { Ok(()) }
//!     fn start_advertising(&mut self, _adv: &AdvConfig) -> Result<(), Self::Error> { Ok(()) }
//!     fn stop_advertising(&mut self) -> Result<(), Self::Error> { Ok(()) }
//!     fn request_tx_power(&mut self, _level_dbm: i8) -> Result<(), Self::Error> { Ok(()) }
//!     fn read_rssi(&mut self) -> Result<i8, Self::Error> { Ok(-60) }
//! }
//!
//! fn main() {
//!     let name = nus_transport::gatt::heapless_name::Name::new("sensor1").unwrap();
//!     let config = BeginConfig { mode: Mode::Balanced, ..BeginConfig::new(name) };
//!     let mut engine = TxEngine::new(MyHostStack, StdClock::new(), config).unwrap();
//!     engine.start_advertising().unwrap();
//!
//!     // Driven from the host stack's own event delivery, typically on
//!     // another thread/context:
//!     engine.on_connect(1, [0xAA; 6]);
//!     engine.on_subscribe_changed(true);
//!
//!     engine.write(b"hello");
//!     loop {
//!         engine.update();
//!         if engine.tx_buffered() == 0 {
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gatt;
pub mod host;
pub mod link_adapter;
pub mod link_params;
pub(crate) mod log;
pub mod pacer;
pub mod profile;
pub mod ring;
pub mod rx;

#[cfg(feature = "std")]
pub mod std_clock;

#[cfg(feature = "embassy-time")]
pub mod embassy_clock;

pub use config::{BeginConfig, PumpMode};
pub use engine::{ConnectionState, TxEngine};
pub use error::TxError;
pub use events::EventSink;
pub use host::HostStack;
pub use link_params::{CodedScheme, Mode, Phy};
pub use ring::RingBuffer;
pub use rx::RxPath;

#[cfg(feature = "std")]
pub use engine::spawn_task_pump;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! cage-server library: hook capture, the event bus, the notification hub
//! and the HTTP surface over them.
//!
//! The `cage-server` binary is a thin wrapper that loads config, sets up
//! logging and calls [`server::run`].

pub mod bus;
pub mod capture;
pub mod config;
pub mod error;
pub mod hub;
pub mod log_buffer;
pub mod server;
pub mod state;

// SPDX-License-Identifier: GPL-3.0-or-later

pub mod application;
pub mod args;
pub mod config;
pub mod context;
pub mod output;
pub mod pipeline;
pub mod tasks;
pub mod trace;
pub mod translate;

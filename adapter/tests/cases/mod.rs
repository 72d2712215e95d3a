// SPDX-License-Identifier: GPL-3.0-or-later

pub mod config;
pub mod exit_codes;
pub mod gradle;
pub mod make;
pub mod translation;

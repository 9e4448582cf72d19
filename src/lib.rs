// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod commands;
pub mod currencies;
pub mod db;
pub mod market;
pub mod models;
pub mod pnl;
pub mod utils;

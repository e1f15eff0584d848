// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ocrlayer: Core types and error definitions shared across all crates.

pub mod cancel;
pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;
pub mod validate;

pub use cancel::{CancellationToken, Cancelled};
pub use config::{ConversionConfig, EngineConfig};
pub use error::{ErrorKind, OcrLayerError};
pub use types::*;

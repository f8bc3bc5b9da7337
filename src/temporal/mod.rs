// Copyright (c) 2025 - Cowboy AI, Inc.
//! Temporal Evaluation
//!
//! Queries can be evaluated "as of" a point in time. Backends keep an
//! [`EntityHistory`] per element and select the state a [`Discriminator`]
//! points at.

pub mod clock;
pub mod discriminator;
pub mod history;

pub use clock::{Clock, ManualClock, SystemClock};
pub use discriminator::Discriminator;
pub use history::{EntityHistory, EntityStateChange};

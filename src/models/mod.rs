// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod image;
pub mod sighting;
pub mod user;

pub use self::image::{ImageError, RasterImage};
pub use sighting::{Comment, Coordinates, Sighting};
pub use user::{Achievement, User};

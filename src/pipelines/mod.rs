// SPDX-License-Identifier: MPL-2.0

//! Frame consumers driven by the frame pump
//!
//! ```text
//!                     ┌──────────────┐     ┌────────────────────┐
//!                 ┌─▶ │   Recorder   │ ──▶ │ {prefix}_Video.mp4 │
//! ┌─────────────┐ │   └──────────────┘     └────────────────────┘
//! │ clean frame │─┤   ┌──────────────┐     ┌────────────────────┐
//! │    slot     │ ├─▶ │ PhotoCapture │ ──▶ │ {prefix}_Foto.jpg  │
//! └─────────────┘ │   └──────────────┘     └────────────────────┘
//!                 │   ┌──────────────┐     ┌────────────────────┐
//!                 └─▶ │   Preview    │ ──▶ │   RGBA texture     │
//!                     └──────────────┘     └────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`photo`]: photo capture and JPEG/PNG encoding
//! - [`preview`]: display texture rendering
//! - [`video`]: recording state machine and MP4 output

pub mod photo;
pub mod preview;
pub mod video;

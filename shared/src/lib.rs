// lib.rs - Airshow shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod api;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod event;
pub mod filters;
pub mod model;
pub mod proximity;
pub mod view;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::CoreConfig;
pub use crux_core::{render::Render, App as CruxApp, Core, Request};
pub use error::{AppError, AppResult, ErrorKind, UserFacingError};
pub use event::{Event, Sensitive};
pub use model::{Model, Screen};
pub use view::{ViewModel, ViewState};

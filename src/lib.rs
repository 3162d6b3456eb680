// src/lib.rs

pub mod config;
pub mod core;
pub mod error;
pub mod history;
pub mod import;
pub mod persistence;

pub use crate::config::RaterConfig;
pub use crate::core::aggregator::RatingResult;
pub use crate::core::engine::RatingEngine;
pub use crate::core::types::{ContentMetadata, ContentType, Level};
pub use crate::error::{RaterError, RaterResult};
pub use crate::history::ContentRating;

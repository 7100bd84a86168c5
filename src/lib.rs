// PageMorph Core Library
//
// Server-side page morphing against website fingerprinting: pads a page's
// HTML and embedded objects so their sizes follow a chosen target profile.

pub mod app_config;
pub mod cli;
pub mod error;
pub mod matcher;
pub mod morph;
pub mod padding;
pub mod page;
pub mod strategy;
pub mod telemetry;

pub use app_config::{AppConfig, MorphConfig};
pub use error::{MorphError, Result};
pub use matcher::{match_sizes, MatchAssignment};
pub use morph::{MorphReport, MorphedPage, Morpher};
pub use padding::{PaddingGenerator, RandomSource};
pub use page::{ContentCategory, DiscoveryRules, EmbeddedObject, Page, PageLoader};
pub use strategy::{TargetProfile, TargetRequest, TargetStrategy};

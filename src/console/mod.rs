//! Console bootstrap decisions and their collaborators.

pub mod auth;
pub mod client;
pub mod config;
pub mod destination;
pub mod error;
pub mod features;
pub mod gate;
pub mod i18n;
pub mod navigation;
pub mod paths;
pub mod routes;
pub mod session;
pub mod storage;
pub mod tier;
pub mod token;

pub use config::ConsoleConfig;
pub use destination::{Destination, DestinationResolver};
pub use error::{Error, Result};
pub use features::{merge_features, FeatureConfig, FeatureDescriptor};
pub use gate::{RenderGate, RenderState};
pub use session::{Collaborators, Console, Organization};
pub use token::DecodedToken;

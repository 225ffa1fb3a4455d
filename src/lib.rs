pub mod clock;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod host;
pub mod logging;
pub mod preview;
pub mod rng;
pub mod scenario;
pub mod session;
pub mod tracker;

pub use config::Config;
pub use engine::{Predictor, PredictorBuilder};
pub use session::SessionId;

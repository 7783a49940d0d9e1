//! Hand gesture recognition

pub mod classifier;
pub mod landmarks;

pub use classifier::{Action, ClassifierConfig, GestureClassifier, GestureResult};
pub use landmarks::{Hand, Landmark};

//! Automation engine: drives the signup form in an ephemeral headless
//! browser and classifies what the site answered.

pub mod attempt;
pub mod browser;
pub mod detection;
pub mod engine;
pub mod pacing;
pub mod resolver;
pub mod session;
pub mod site;

#[cfg(test)]
mod testing;

pub use attempt::{Attempt, AttemptState};
pub use browser::ChromeLauncher;
pub use detection::{Outcome, OutcomeDetector};
pub use engine::{EngineSettings, RegistrationEngine};
pub use pacing::Pacing;
pub use resolver::{Action, Resolved, SelectorResolver};
pub use session::{BrowserLauncher, PageSession};
pub use site::{CandidateSet, DeviceProfile, Locator, SignupSelectors};

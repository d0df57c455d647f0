// Declare all our modules
mod controller;
mod deriver;
mod error;
mod form;
mod frame;
mod models;
mod navigation;
mod paging;
mod viewer;

// Publicly export the parts of our library that users will need
pub use controller::{ViewerCommand, ViewerController, ViewerEvent, ViewerExit, forward_commands};
pub use deriver::{Derivation, UrlDeriver, roman_to_integer};
pub use error::{ErrorKind, Result, ResultError};
pub use form::{FormError, FormField, MAX_REGISTRATION_LENGTH, MIN_REGISTRATION_LENGTH, ResultForm};
pub use frame::{HttpFrame, ResultFrame};
pub use models::*; // Semester, ResultLocator, SiteConfig
pub use navigation::NavigationParams;
pub use paging::{Direction, step_registration_number};
pub use viewer::{LoadState, ViewerSession};

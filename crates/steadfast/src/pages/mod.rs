//! Page objects for the device-management web app.
//!
//! Each page borrows an [`Interactor`](crate::Interactor) and keeps its
//! markup knowledge in a public `*Selectors` struct, so a markup change is a
//! one-line override instead of an edit to the flow.

use crate::wait::UrlPattern;

pub mod devices;
pub mod ids;
pub mod launch_pad;
pub mod login;
pub mod profile;

pub use devices::{DeviceForm, DevicesPage, DevicesSelectors};
pub use launch_pad::{LaunchPad, LaunchPadSelectors, DEFAULT_ORGANIZATION};
pub use login::{FormElementStates, LoginPage, LoginSelectors};
pub use profile::{Frequency, LedgerValidation, ProfilePage, ProfileSelectors, ReportType};

/// A page or component of the application under test
pub trait PageObject {
    /// URLs on which this page is shown
    fn url_pattern(&self) -> UrlPattern;

    /// Page name for logs
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

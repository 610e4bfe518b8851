//! # ancora
//!
//! Presentation helpers for the Ancora CAS guest registry.
//!
//! The helpers fall in two groups. The stateless ones format and compare dates:
//!
//! ```
//! use ancora::prelude::*;
//!
//! assert_eq!(format_date_it(Some("2024-03-07")), "07/03/2024");
//! assert_eq!(days_between_dates("2024-03-08", Some("2024-03-07".into())), Some(1));
//! ```
//!
//! The others prepare a page once its markup is loaded: tooltips and popovers are attached to
//! the elements that ask for them, and forms marked with `needs-validation` get a submit
//! interceptor that blocks invalid submissions and adds `was-validated` for styling. The page is
//! an in-memory [`Document`], and the overlay library sits behind the [`Widget`] trait.
//!
//! ```
//! use ancora::prelude::*;
//!
//! let mut document = Document::new();
//! let form = document
//!     .append(document.root(), ElementSpec::new("form").class("needs-validation"))
//!     .unwrap();
//! document
//!     .append(form, ElementSpec::new("input").attr("name", "cognome").flag("required"))
//!     .unwrap();
//!
//! let mut tooltips = WidgetRegistry::new(WidgetKind::Tooltip);
//! let mut popovers = WidgetRegistry::new(WidgetKind::Popover);
//! let report = initialize(&mut document, &PageSettings::default(), &mut tooltips, &mut popovers)
//!     .unwrap();
//! assert_eq!(report.validated_forms, 1);
//!
//! let event = document.submit(form).unwrap();
//! assert!(event.default_prevented());
//! assert!(document.has_class(form, "was-validated"));
//! ```
//!
//! ## Guest registry
//!
//! A [`Guest`] can be [registered](Guest::register), which computes its fiscal code
//! (*codice fiscale*) and the expiry of its residence permit, and
//! [displayed](GuestRecord::display) with Italian date formatting. A [`Registry`] keeps fiscal
//! codes unique and [lists](Registry::list) guests filtered and sorted.

#![warn(missing_docs)]

/// Settings files.
pub mod config;
/// Italian date formatting and day differences.
pub mod date;
/// The in-memory document a page is initialized on.
pub mod dom;
mod error;
pub mod fiscal_code;
/// Guests as entered and as registered, and their registration form.
pub mod guest;
/// Logging setup for the command line.
pub mod logging;
/// Page initialization.
pub mod page;
/// Residence permit expiry.
pub mod permit;
pub mod registry;
/// Form-validation styling.
pub mod validation;
pub mod validity;
/// Tooltip and popover activation.
pub mod widget;

pub use crate::config::{PageSettings, RegistrySettings, Settings};
pub use crate::date::{days_between_dates, days_between_dates_at, format_date_it, Moment};
pub use crate::dom::{Document, ElementId, ElementSpec, Selector, SubmitEvent};
pub use crate::error::{
    ConfigError, DateError, DomError, FiscalCodeError, PageError, SelectorError,
};
pub use crate::guest::{Guest, GuestRecord, GuestView, RegistrationError};
pub use crate::page::{initialize, InitReport, PageMarkup};
pub use crate::registry::{GuestList, GuestOrder, Registry};
pub use crate::validation::install_validation_styling;
pub use crate::validity::ValidityState;
pub use crate::widget::{activate, Widget, WidgetKind, WidgetRegistry};

/// A convenience module appropriate for glob imports (`use ancora::prelude::*;`).
pub mod prelude {
    #[doc(no_inline)]
    pub use crate::days_between_dates;
    #[doc(no_inline)]
    pub use crate::format_date_it;
    #[doc(no_inline)]
    pub use crate::initialize;
    #[doc(no_inline)]
    pub use crate::Document;
    #[doc(no_inline)]
    pub use crate::ElementSpec;
    #[doc(no_inline)]
    pub use crate::Guest;
    #[doc(no_inline)]
    pub use crate::Moment;
    #[doc(no_inline)]
    pub use crate::PageSettings;
    #[doc(no_inline)]
    pub use crate::Registry;
    #[doc(no_inline)]
    pub use crate::Selector;
    #[doc(no_inline)]
    pub use crate::Settings;
    #[doc(no_inline)]
    pub use crate::Widget;
    #[doc(no_inline)]
    pub use crate::WidgetKind;
    #[doc(no_inline)]
    pub use crate::WidgetRegistry;
}

use std::path::PathBuf;

/// Errors for parsing explicit dates given to the registry helpers.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DateError {
    /// The date string could not be parsed as `YYYY-MM-DD`.
    #[error("Date `{date}` should be in format YYYY-MM-DD: {source}")]
    Unparseable {
        /// The offending date string.
        date: String,
        /// The underlying chrono error.
        source: chrono::ParseError,
    },

    /// The date arithmetic left the range chrono can represent.
    #[error("Date arithmetic on `{date}` is out of range")]
    OutOfRange {
        /// The date the computation started from.
        date: String,
    },
}

/// Errors for parsing a selector string.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SelectorError {
    /// Nothing to select on.
    #[error("Selector should not be empty")]
    Empty,

    /// A `[` was never closed.
    #[error("Attribute selector should be terminated with `]`: {selector}")]
    UnterminatedAttribute {
        /// The full selector string.
        selector: String,
    },

    /// A `.`, `#` or `[` was not followed by a name.
    #[error("Expected a name after `{sigil}` in selector `{selector}`")]
    MissingName {
        /// The character that needed a name after it.
        sigil: char,
        /// The full selector string.
        selector: String,
    },

    /// Combinators, pseudo-classes and the like are not supported.
    #[error("Unsupported character `{character}` in selector `{selector}`")]
    Unsupported {
        /// The character that could not be handled.
        character: char,
        /// The full selector string.
        selector: String,
    },
}

/// Errors raised by the in-memory document.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DomError {
    /// The id does not belong to this document.
    #[error("No element with id {id} in document")]
    UnknownElement {
        /// The index of the id.
        id: usize,
    },

    /// A submit was dispatched on something other than a `<form>`.
    #[error("Element {id} is a `<{tag}>`, but submit events need a `<form>`")]
    NotAForm {
        /// The index of the id.
        id: usize,
        /// The tag of the element.
        tag: String,
    },
}

/// Errors for generating a fiscal code.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FiscalCodeError {
    /// A name part had no letters left after folding to ASCII.
    #[error("{field} should contain at least one letter")]
    NoLetters {
        /// Which part of the name was empty.
        field: &'static str,
    },

    /// The birthplace code does not look like a cadastral (Belfiore) code.
    #[error("Birthplace code `{code}` should be one letter followed by three digits")]
    InvalidBirthplaceCode {
        /// The code as given.
        code: String,
    },

    /// Sex should be `M` or `F`.
    #[error("Sex `{value}` should be `M` or `F`")]
    InvalidSex {
        /// The value as given.
        value: String,
    },
}

/// Errors for loading settings.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("Could not read config file {path}: {source}")]
    Read {
        /// The path that was read.
        path: PathBuf,
        /// The underlying io error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`Settings`](crate::Settings).
    #[error("Could not parse config file {path}: {source}")]
    Parse {
        /// The path that was parsed.
        path: PathBuf,
        /// The underlying toml error.
        source: toml::de::Error,
    },
}

/// Errors for loading page markup.
#[derive(thiserror::Error, Debug)]
pub enum PageError {
    /// The markup file could not be read or parsed.
    #[error("Could not load page markup: {0}")]
    Markup(#[from] toml::de::Error),

    /// A selector from the settings could not be parsed.
    #[error("{0}")]
    Selector(#[from] SelectorError),

    /// The document rejected an operation.
    #[error("{0}")]
    Dom(#[from] DomError),
}

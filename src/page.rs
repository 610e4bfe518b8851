use crate::{
    config::PageSettings,
    dom::{Document, ElementId, ElementSpec, Selector},
    error::{DomError, PageError, SelectorError},
    validation::install_validation_styling,
    widget::{activate, Widget},
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// What [`initialize`] did to a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Elements a tooltip was attached to.
    pub tooltips: usize,
    /// Elements a popover was attached to.
    pub popovers: usize,
    /// Forms whose submission is now intercepted.
    pub validated_forms: usize,
}

/// Prepares a fully loaded page: activates tooltips, then popovers, then installs the
/// form-validation styling.
///
/// This is meant to run exactly once per page, right after its markup is in place. Nothing
/// guards against a second call, which would attach every widget and interceptor again.
///
/// # Errors
///
/// Returns a [`SelectorError`] if one of the selectors in `settings` can't be parsed, before any
/// change is made to the page.
pub fn initialize<T, P>(
    document: &mut Document,
    settings: &PageSettings,
    tooltips: &mut T,
    popovers: &mut P,
) -> Result<InitReport, SelectorError>
where
    T: Widget + ?Sized,
    P: Widget + ?Sized,
{
    let tooltip_trigger = Selector::parse(&settings.tooltip_trigger)?;
    let popover_trigger = Selector::parse(&settings.popover_trigger)?;
    let validation_marker = Selector::parse(&settings.validation_marker)?;

    let report = InitReport {
        tooltips: activate(document, &tooltip_trigger, tooltips),
        popovers: activate(document, &popover_trigger, popovers),
        validated_forms: install_validation_styling(
            document,
            &validation_marker,
            &settings.validated_class,
        ),
    };

    tracing::info!(
        tooltips = report.tooltips,
        popovers = report.popovers,
        forms = report.validated_forms,
        "page initialized"
    );
    Ok(report)
}

/// Page markup as written in a TOML file: a list of `[[element]]` tables, each with optional
/// `attributes`, `classes`, `value` and nested `children`.
///
/// ```toml
/// [[element]]
/// tag = "form"
/// classes = ["needs-validation"]
///
/// [[element.children]]
/// tag = "input"
/// attributes = { name = "cognome", required = "" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageMarkup {
    /// Top-level elements, appended under `<body>`.
    #[serde(default, rename = "element")]
    pub elements: Vec<Markup>,
}

/// One element of [`PageMarkup`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Markup {
    /// Tag name, any case.
    pub tag: String,
    /// Attributes, handled like [`ElementSpec::attr`].
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Classes, added after any `class` attribute.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Initial value of a form control.
    #[serde(default)]
    pub value: Option<String>,
    /// Nested elements, in document order.
    #[serde(default)]
    pub children: Vec<Markup>,
}

impl Markup {
    fn to_spec(&self) -> ElementSpec {
        let mut spec = self
            .attributes
            .iter()
            .fold(ElementSpec::new(&self.tag), |spec, (name, value)| {
                spec.attr(name, value)
            });
        for class in &self.classes {
            spec = spec.class(class);
        }
        if let Some(value) = &self.value {
            spec = spec.value(value);
        }
        spec
    }

    fn append_to(&self, document: &mut Document, parent: ElementId) -> Result<ElementId, DomError> {
        let id = document.append(parent, self.to_spec())?;
        for child in &self.children {
            child.append_to(document, id)?;
        }
        Ok(id)
    }
}

impl PageMarkup {
    /// Parses markup from TOML.
    pub fn from_toml(source: &str) -> Result<Self, PageError> {
        Ok(toml::from_str(source)?)
    }

    /// Builds a new document with this markup under its `<body>`.
    pub fn build(&self) -> Result<Document, DomError> {
        let mut document = Document::new();
        let root = document.root();
        for element in &self.elements {
            element.append_to(&mut document, root)?;
        }
        Ok(document)
    }

    /// Builds the document and runs [`initialize`] on it, the way a browser loads a page and
    /// then fires its ready handler.
    pub fn render<T, P>(
        &self,
        settings: &PageSettings,
        tooltips: &mut T,
        popovers: &mut P,
    ) -> Result<(Document, InitReport), PageError>
    where
        T: Widget + ?Sized,
        P: Widget + ?Sized,
    {
        let mut document = self.build()?;
        let report = initialize(&mut document, settings, tooltips, popovers)?;
        Ok((document, report))
    }
}

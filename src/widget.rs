use crate::dom::{Document, ElementId, Selector};
use core::fmt::{self, Display};
use std::collections::BTreeMap;

/// Something that can be attached to an element of a page, like a tooltip or popover controller
/// of a UI library.
pub trait Widget {
    /// Instantiates the widget on `element`.
    fn attach(&mut self, document: &Document, element: ElementId);
}

/// Attaches `widget` to every element matching `trigger`, in document order, and returns how
/// many it was attached to.
///
/// Elements that already carry the widget are not skipped, so calling this twice attaches twice.
pub fn activate<W>(document: &Document, trigger: &Selector, widget: &mut W) -> usize
where
    W: Widget + ?Sized,
{
    let targets = document.query_selector_all(trigger);
    for &element in &targets {
        widget.attach(document, element);
    }
    tracing::debug!(trigger = %trigger, count = targets.len(), "activated widgets");
    targets.len()
}

/// The overlays a page activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    /// Shows the element's title on hover.
    Tooltip,
    /// Shows a title and a body on click.
    Popover,
}

impl Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tooltip => "tooltip",
            Self::Popover => "popover",
        })
    }
}

/// One widget instance created by a [`WidgetRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetInstance {
    /// The element the widget is attached to.
    pub element: ElementId,
    /// `data-bs-title`, falling back to `title`.
    pub title: Option<String>,
    /// `data-bs-content`. Only read for popovers.
    pub content: Option<String>,
}

/// A [`Widget`] that records every instance it creates, reading the same attributes a Bootstrap
/// tooltip or popover would.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetRegistry {
    kind: WidgetKind,
    instances: Vec<WidgetInstance>,
}

impl WidgetRegistry {
    /// A registry creating `kind` widgets, with no instances yet.
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            instances: Vec::new(),
        }
    }

    /// The kind of widget this registry creates.
    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    /// Every instance, in creation order.
    pub fn instances(&self) -> &[WidgetInstance] {
        &self.instances
    }

    /// How many instances were created on `element`. More than one means it was initialized
    /// more than once.
    pub fn instance_count(&self, element: ElementId) -> usize {
        self.instances.iter().filter(|i| i.element == element).count()
    }

    /// Instance counts per element.
    pub fn counts(&self) -> BTreeMap<ElementId, usize> {
        let mut counts = BTreeMap::new();
        for instance in &self.instances {
            *counts.entry(instance.element).or_insert(0) += 1;
        }
        counts
    }
}

impl Widget for WidgetRegistry {
    fn attach(&mut self, document: &Document, element: ElementId) {
        let Some(target) = document.element(element) else {
            return;
        };
        let title = target
            .attribute("data-bs-title")
            .or_else(|| target.attribute("title"))
            .map(str::to_owned);
        let content = match self.kind {
            WidgetKind::Popover => target.attribute("data-bs-content").map(str::to_owned),
            WidgetKind::Tooltip => None,
        };
        self.instances.push(WidgetInstance {
            element,
            title,
            content,
        });
    }
}

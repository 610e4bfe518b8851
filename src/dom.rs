use crate::{
    error::{DomError, SelectorError},
    validity::PatternCache,
};
use core::{
    fmt::{self, Display},
    str::FromStr,
};
use std::{
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

/// Handle to an element of a [`Document`]. Only meaningful for the document that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    /// Position of the element in its document's arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    value: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Element {
    /// Lowercase tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Value of the attribute `name`. Boolean attributes have an empty value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the attribute `name` is present, boolean or not.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// The class list, in the order classes were added.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Whether `class` is in the class list.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Current value of a form control. Empty for anything else.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// `None` only for the root.
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Direct children, in document order.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }
}

/// Description of an element to [append](Document::append) to a document.
///
/// ```
/// use ancora::dom::{Document, ElementSpec};
///
/// let mut document = Document::new();
/// let form = document
///     .append(document.root(), ElementSpec::new("form").class("needs-validation"))
///     .unwrap();
/// let input = document
///     .append(form, ElementSpec::new("input").attr("name", "nome").flag("required"))
///     .unwrap();
/// assert!(document.element(input).unwrap().has_attribute("required"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSpec {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    value: String,
}

impl ElementSpec {
    /// An element with no attributes. The tag is lowercased.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Sets an attribute. A `class` attribute is split into the class list, and a `value`
    /// attribute sets the initial value.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match name.as_str() {
            "class" => {
                for class in value.split_whitespace() {
                    self = self.class(class);
                }
            }
            "value" => self.value = value,
            _ => {
                self.attributes.insert(name, value);
            }
        }
        self
    }

    /// Sets a boolean attribute such as `required` or `disabled`.
    pub fn flag(self, name: impl Into<String>) -> Self {
        self.attr(name, "")
    }

    /// Adds a class, unless it's already there.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    /// Sets the initial value of a form control.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

/// The outcome of dispatching a submit event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitEvent {
    default_prevented: bool,
    propagation_stopped: bool,
}

impl SubmitEvent {
    /// Cancels the form submission.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Keeps the event from reaching other handlers up the tree.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Whether a listener cancelled the submission.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Whether a listener stopped the propagation.
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Callback run when a form is submitted. Receives the document, the form and the event.
pub type SubmitListener = dyn Fn(&mut Document, ElementId, &mut SubmitEvent);

/// An in-memory document tree with just enough behavior for page initialization: selector
/// queries, class toggling, submit listeners and native constraint validation (see
/// [`Document::check_validity`]).
///
/// Elements live in an arena and are never removed, so an [`ElementId`] stays valid for the
/// lifetime of its document.
pub struct Document {
    elements: Vec<Element>,
    submit_listeners: HashMap<ElementId, Vec<Rc<SubmitListener>>>,
    pub(crate) patterns: PatternCache,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listener_count: usize = self.submit_listeners.values().map(Vec::len).sum();
        f.debug_struct("Document")
            .field("elements", &self.elements)
            .field("submit_listeners", &listener_count)
            .finish()
    }
}

impl Document {
    /// Creates a document holding only an empty `<body>`.
    pub fn new() -> Self {
        let body = Element {
            tag: "body".to_owned(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            value: String::new(),
            parent: None,
            children: Vec::new(),
        };
        Self {
            elements: vec![body],
            submit_listeners: HashMap::new(),
            patterns: PatternCache::default(),
        }
    }

    /// The `<body>` element.
    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    /// Number of elements, the root included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// A document always has its root, so it is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The element behind `id`, if it belongs to this document.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub(crate) fn get(&self, id: ElementId) -> Result<&Element, DomError> {
        self.elements
            .get(id.0)
            .ok_or(DomError::UnknownElement { id: id.0 })
    }

    fn get_mut(&mut self, id: ElementId) -> Result<&mut Element, DomError> {
        self.elements
            .get_mut(id.0)
            .ok_or(DomError::UnknownElement { id: id.0 })
    }

    /// Appends a new element as the last child of `parent`.
    pub fn append(&mut self, parent: ElementId, spec: ElementSpec) -> Result<ElementId, DomError> {
        self.get(parent)?;
        let id = ElementId(self.elements.len());
        self.elements.push(Element {
            tag: spec.tag,
            attributes: spec.attributes,
            classes: spec.classes,
            value: spec.value,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.get_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Sets the current value of a form control, as if the user typed it.
    pub fn set_value(&mut self, id: ElementId, value: impl Into<String>) -> Result<(), DomError> {
        self.get_mut(id)?.value = value.into();
        Ok(())
    }

    /// Sets an attribute, with the same name handling as [`ElementSpec::attr`]: `class` replaces
    /// the class list and `value` sets the value.
    pub fn set_attribute(
        &mut self,
        id: ElementId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let element = self.get_mut(id)?;
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match name.as_str() {
            "class" => {
                element.classes.clear();
                for class in value.split_whitespace() {
                    if !element.has_class(class) {
                        element.classes.push(class.to_owned());
                    }
                }
            }
            "value" => element.value = value,
            _ => {
                element.attributes.insert(name, value);
            }
        }
        Ok(())
    }

    /// Removes an attribute. Removing `class` empties the class list and removing `value`
    /// empties the value.
    pub fn remove_attribute(&mut self, id: ElementId, name: &str) -> Result<(), DomError> {
        let element = self.get_mut(id)?;
        match name.to_ascii_lowercase().as_str() {
            "class" => element.classes.clear(),
            "value" => element.value.clear(),
            name => {
                element.attributes.remove(name);
            }
        }
        Ok(())
    }

    /// Adds `class` to the element's class list, unless it's already there.
    pub fn add_class(&mut self, id: ElementId, class: &str) -> Result<(), DomError> {
        let element = self.get_mut(id)?;
        if !element.has_class(class) {
            element.classes.push(class.to_owned());
        }
        Ok(())
    }

    /// Whether the element has `class`. An unknown id has no classes.
    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    /// All elements below `id`, in document order, excluding `id` itself.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut stack: Vec<ElementId> = match self.element(id) {
            Some(element) => element.children.iter().rev().copied().collect(),
            None => return found,
        };
        while let Some(next) = stack.pop() {
            found.push(next);
            if let Some(element) = self.element(next) {
                stack.extend(element.children.iter().rev().copied());
            }
        }
        found
    }

    /// All elements matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &Selector) -> Vec<ElementId> {
        let root = self.root();
        std::iter::once(root)
            .chain(self.descendants(root))
            .filter(|id| self.element(*id).is_some_and(|e| selector.matches(e)))
            .collect()
    }

    /// Registers a listener for submit events on `target`.
    ///
    /// Listeners are not deduplicated: registering the same behavior twice runs it twice.
    pub fn add_submit_listener<F>(&mut self, target: ElementId, listener: F) -> Result<(), DomError>
    where
        F: Fn(&mut Document, ElementId, &mut SubmitEvent) + 'static,
    {
        self.get(target)?;
        self.submit_listeners
            .entry(target)
            .or_default()
            .push(Rc::new(listener));
        Ok(())
    }

    /// Simulates a user submitting `form`: runs its submit listeners in registration order and
    /// returns the event they acted on.
    ///
    /// # Errors
    ///
    /// - [`DomError::UnknownElement`] if `form` is not in this document.
    /// - [`DomError::NotAForm`] if `form` is not a `<form>`.
    pub fn submit(&mut self, form: ElementId) -> Result<SubmitEvent, DomError> {
        let element = self.get(form)?;
        if element.tag != "form" {
            return Err(DomError::NotAForm {
                id: form.0,
                tag: element.tag.clone(),
            });
        }

        // cloned so listeners are free to mutate the document, including its listeners
        let listeners = self
            .submit_listeners
            .get(&form)
            .cloned()
            .unwrap_or_default();

        let mut event = SubmitEvent::default();
        for listener in listeners {
            listener(self, form, &mut event);
        }

        tracing::debug!(
            form = form.0,
            prevented = event.default_prevented(),
            "dispatched submit event"
        );
        Ok(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeMatch {
    name: String,
    value: Option<String>,
}

/// A compound CSS selector: an optional tag (or `*`) followed by any number of `.class`, `#id`,
/// `[attr]` and `[attr=value]` parts. Combinators and pseudo-classes are not supported.
///
/// ```
/// use ancora::dom::Selector;
///
/// assert!(Selector::parse(r#"[data-bs-toggle="tooltip"]"#).is_ok());
/// assert!(Selector::parse("form.needs-validation").is_ok());
/// assert!(Selector::parse("form > input").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatch>,
    source: String,
}

impl Selector {
    /// Parses a compound selector.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectorError`] for an empty selector, an unterminated or unnamed attribute
    /// part, or any character outside the supported syntax.
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let source = selector.trim();
        if source.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut parsed = Selector {
            source: source.to_owned(),
            ..Selector::default()
        };

        let mut rest = if let Some(rest) = source.strip_prefix('*') {
            rest
        } else {
            let (tag, rest) = split_name(source);
            if !tag.is_empty() {
                parsed.tag = Some(tag.to_ascii_lowercase());
            }
            rest
        };

        while let Some(sigil) = rest.chars().next() {
            rest = &rest[sigil.len_utf8()..];
            match sigil {
                '.' | '#' => {
                    let (name, tail) = split_name(rest);
                    if name.is_empty() {
                        return Err(SelectorError::MissingName {
                            sigil,
                            selector: source.to_owned(),
                        });
                    }
                    if sigil == '.' {
                        parsed.classes.push(name.to_owned());
                    } else {
                        parsed.id = Some(name.to_owned());
                    }
                    rest = tail;
                }
                '[' => {
                    let close =
                        rest.find(']')
                            .ok_or_else(|| SelectorError::UnterminatedAttribute {
                                selector: source.to_owned(),
                            })?;
                    let inner = rest[..close].trim();
                    rest = &rest[close + 1..];

                    let (name, value) = match inner.split_once('=') {
                        Some((name, value)) => (name.trim(), Some(unquote(value.trim()))),
                        None => (inner, None),
                    };
                    if name.is_empty() {
                        return Err(SelectorError::MissingName {
                            sigil,
                            selector: source.to_owned(),
                        });
                    }
                    parsed.attributes.push(AttributeMatch {
                        name: name.to_ascii_lowercase(),
                        value,
                    });
                }
                character => {
                    return Err(SelectorError::Unsupported {
                        character,
                        selector: source.to_owned(),
                    })
                }
            }
        }

        Ok(parsed)
    }

    /// Whether `element` satisfies every part of the selector.
    pub fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if &element.tag != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|m| {
            // the class list is stored apart from the other attributes
            let actual = if m.name == "class" {
                (!element.classes.is_empty()).then(|| element.classes.join(" "))
            } else {
                element.attribute(&m.name).map(str::to_owned)
            };
            match (&m.value, actual) {
                (None, actual) => actual.is_some(),
                (Some(expected), Some(actual)) => *expected == actual,
                (Some(_), None) => false,
            }
        })
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn split_name(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(s.len());
    s.split_at(end)
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner.to_owned();
        }
    }
    value.to_owned()
}

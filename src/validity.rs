//! Native constraint validation, as a browser performs it when a form is submitted.

use crate::{
    dom::{Document, Element, ElementId},
    error::DomError,
};
use chrono::NaiveDate;
use regex::Regex;
use std::{cell::RefCell, collections::HashMap};

/// Which constraints a form control fails. All `false` means the control is valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityState {
    /// `required`, but empty (or unchecked, for a checkbox).
    pub value_missing: bool,
    /// Shorter than `minlength`.
    pub too_short: bool,
    /// Longer than `maxlength`.
    pub too_long: bool,
    /// Does not match `pattern` as a whole.
    pub pattern_mismatch: bool,
    /// Not an e-mail address in an `type="email"` input.
    pub type_mismatch: bool,
    /// Not a number or a date in a `type="number"` or `type="date"` input.
    pub bad_input: bool,
}

impl ValidityState {
    /// No constraint fails.
    pub fn valid(&self) -> bool {
        *self == Self::default()
    }
}

const CONTROL_TAGS: [&str; 3] = ["input", "select", "textarea"];
const UNVALIDATED_INPUT_TYPES: [&str; 4] = ["submit", "button", "reset", "hidden"];

/// Compiled `pattern` attributes of a document, keyed by their source. Patterns that don't
/// compile are remembered as `None`.
#[derive(Debug, Default)]
pub(crate) struct PatternCache(RefCell<HashMap<String, Option<Regex>>>);

impl PatternCache {
    fn get(&self, pattern: &str) -> Option<Regex> {
        self.0
            .borrow_mut()
            .entry(pattern.to_owned())
            .or_insert_with(|| Regex::new(&format!("^(?:{pattern})$")).ok())
            .clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

impl Document {
    /// Checks every form control inside `form` against its constraints, like the browser's
    /// `checkValidity()`. A form without controls is valid.
    pub fn check_validity(&self, form: ElementId) -> Result<bool, DomError> {
        self.get(form)?;
        Ok(self.descendants(form).into_iter().all(|id| {
            self.element(id)
                .map_or(true, |element| self.control_validity(element).valid())
        }))
    }

    /// The validity of a single element. Anything that isn't a validated form control is
    /// always valid.
    pub fn validity(&self, control: ElementId) -> Result<ValidityState, DomError> {
        Ok(self.control_validity(self.get(control)?))
    }

    fn control_validity(&self, element: &Element) -> ValidityState {
        let mut state = ValidityState::default();
        if is_barred(element) {
            return state;
        }

        let input_type = if element.tag() == "input" {
            element
                .attribute("type")
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| "text".to_owned())
        } else {
            element.tag().to_owned()
        };
        if UNVALIDATED_INPUT_TYPES.contains(&input_type.as_str()) {
            return state;
        }

        let value = element.value();

        if element.has_attribute("required") {
            state.value_missing = match input_type.as_str() {
                "checkbox" | "radio" => !element.has_attribute("checked"),
                _ => value.is_empty(),
            };
        }

        // the remaining constraints only apply to something the user typed
        if value.is_empty() || element.tag() == "select" {
            return state;
        }

        let length = value.chars().count();
        if let Some(min) = length_attribute(element, "minlength") {
            state.too_short = length < min;
        }
        if let Some(max) = length_attribute(element, "maxlength") {
            state.too_long = length > max;
        }

        if element.tag() == "input" {
            if let Some(pattern) = element.attribute("pattern") {
                // an invalid pattern is ignored, as browsers do
                if let Some(regex) = self.patterns.get(pattern) {
                    state.pattern_mismatch = !regex.is_match(value);
                }
            }
        }

        match input_type.as_str() {
            "email" => state.type_mismatch = !looks_like_email(value),
            "number" => state.bad_input = !value.parse::<f64>().is_ok_and(f64::is_finite),
            "date" => state.bad_input = NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err(),
            _ => {}
        }

        state
    }
}

/// Whether `element` is left out of constraint validation. `readonly` bars inputs and textareas
/// but has no effect on a select.
fn is_barred(element: &Element) -> bool {
    !CONTROL_TAGS.contains(&element.tag())
        || element.has_attribute("disabled")
        || (element.has_attribute("readonly") && element.tag() != "select")
}

fn length_attribute(element: &Element, name: &str) -> Option<usize> {
    element.attribute(name)?.trim().parse().ok()
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementSpec;
    use rstest::*;

    fn validity_of(spec: ElementSpec) -> ValidityState {
        let mut document = Document::new();
        let form = document
            .append(document.root(), ElementSpec::new("form"))
            .unwrap();
        let control = document.append(form, spec).unwrap();
        document.validity(control).unwrap()
    }

    #[rstest]
    #[case(ElementSpec::new("input"), true)]
    #[case(ElementSpec::new("input").flag("required"), false)]
    #[case(ElementSpec::new("input").flag("required").value("x"), true)]
    #[case(ElementSpec::new("textarea").flag("required"), false)]
    #[case(ElementSpec::new("select").flag("required").value("M"), true)]
    #[case(ElementSpec::new("input").flag("required").flag("disabled"), true)]
    #[case(ElementSpec::new("input").flag("required").flag("readonly"), true)]
    #[case(ElementSpec::new("textarea").flag("required").flag("readonly"), true)]
    #[case(ElementSpec::new("select").flag("required").flag("readonly"), false)]
    #[case(ElementSpec::new("input").attr("type", "hidden").flag("required"), true)]
    #[case(ElementSpec::new("input").attr("type", "checkbox").flag("required"), false)]
    #[case(ElementSpec::new("input").attr("type", "checkbox").flag("required").flag("checked"), true)]
    #[case(ElementSpec::new("div").flag("required"), true)]
    fn test_required(#[case] spec: ElementSpec, #[case] valid: bool) {
        assert_eq!(valid, validity_of(spec).valid());
    }

    #[rstest]
    #[case("", true)] // empty values skip length checks
    #[case("a", false)]
    #[case("ab", true)]
    #[case("àè", true)] // counted in characters, not bytes
    #[case("abcde", true)]
    #[case("abcdef", false)]
    fn test_length(#[case] value: &str, #[case] valid: bool) {
        let spec = ElementSpec::new("input")
            .attr("minlength", "2")
            .attr("maxlength", "5")
            .value(value);
        assert_eq!(valid, validity_of(spec).valid());
    }

    #[test]
    fn test_length_flags() {
        let short = validity_of(ElementSpec::new("input").attr("minlength", "3").value("ab"));
        assert!(short.too_short && !short.too_long);
        let long = validity_of(ElementSpec::new("input").attr("maxlength", "1").value("ab"));
        assert!(long.too_long && !long.too_short);
        let unparsed = validity_of(ElementSpec::new("input").attr("maxlength", "x").value("ab"));
        assert!(unparsed.valid());
    }

    #[rstest]
    #[case("[A-Za-z][0-9]{3}", "H501", true)]
    #[case("[A-Za-z][0-9]{3}", "xH501", false)] // anchored on both ends
    #[case("[A-Za-z][0-9]{3}", "H5012", false)]
    #[case("a|b", "a", true)]
    #[case("a|b", "ab", false)]
    #[case("[unclosed", "anything", true)] // invalid patterns are ignored
    fn test_pattern(#[case] pattern: &str, #[case] value: &str, #[case] valid: bool) {
        let spec = ElementSpec::new("input")
            .attr("pattern", pattern)
            .value(value);
        let state = validity_of(spec);
        assert_eq!(valid, state.valid());
        assert_eq!(!valid, state.pattern_mismatch);
    }

    #[rstest]
    #[case("email", "ospite@example.org", true)]
    #[case("email", "ospite", false)]
    #[case("email", "@example.org", false)]
    #[case("email", "a b@example.org", false)]
    #[case("number", "42", true)]
    #[case("number", "4.2e1", true)]
    #[case("number", "forty", false)]
    #[case("number", "inf", false)]
    #[case("date", "2024-03-07", true)]
    #[case("date", "07/03/2024", false)]
    #[case("date", "2024-02-30", false)]
    #[case("text", "anything", true)]
    fn test_types(#[case] input_type: &str, #[case] value: &str, #[case] valid: bool) {
        let spec = ElementSpec::new("input")
            .attr("type", input_type)
            .value(value);
        assert_eq!(valid, validity_of(spec).valid());
    }

    #[test]
    fn test_check_validity_covers_nested_controls() {
        let mut document = Document::new();
        let form = document
            .append(document.root(), ElementSpec::new("form"))
            .unwrap();
        let group = document
            .append(form, ElementSpec::new("div").class("mb-3"))
            .unwrap();
        let input = document
            .append(group, ElementSpec::new("input").flag("required"))
            .unwrap();

        assert_eq!(Ok(false), document.check_validity(form));
        document.set_value(input, "Rossi").unwrap();
        assert_eq!(Ok(true), document.check_validity(form));
    }

    #[test]
    fn test_readonly_required_form_is_valid() {
        let mut document = Document::new();
        let form = document
            .append(document.root(), ElementSpec::new("form"))
            .unwrap();
        document
            .append(
                form,
                ElementSpec::new("input")
                    .attr("name", "codice_fiscale_display")
                    .flag("readonly")
                    .flag("required"),
            )
            .unwrap();
        assert_eq!(Ok(true), document.check_validity(form));
    }

    #[test]
    fn test_patterns_are_compiled_once() {
        let mut document = Document::new();
        let form = document
            .append(document.root(), ElementSpec::new("form"))
            .unwrap();
        let controls: Vec<ElementId> = [("[0-9]+", "12"), ("[0-9]+", "x"), ("[unclosed", "y")]
            .into_iter()
            .map(|(pattern, value)| {
                let spec = ElementSpec::new("input").attr("pattern", pattern).value(value);
                document.append(form, spec).unwrap()
            })
            .collect();

        for _ in 0..2 {
            let mismatches: Vec<bool> = controls
                .iter()
                .map(|&id| document.validity(id).unwrap().pattern_mismatch)
                .collect();
            assert_eq!(vec![false, true, false], mismatches);
        }
        assert_eq!(2, document.patterns.len());
    }

    #[test]
    fn test_empty_form_is_valid() {
        let mut document = Document::new();
        let form = document
            .append(document.root(), ElementSpec::new("form"))
            .unwrap();
        assert_eq!(Ok(true), document.check_validity(form));
        assert_eq!(
            Err(DomError::UnknownElement { id: 9 }),
            document.check_validity(ElementId(9))
        );
    }
}

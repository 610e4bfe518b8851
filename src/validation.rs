use crate::dom::{Document, Selector};

/// Intercepts the submission of every element matching `marker`.
///
/// On each submit attempt the interceptor checks the form's native validity. An invalid form has
/// its submission cancelled and its propagation stopped. Either way, `validated_class` is then
/// added to the form, so styles can show success and error states from the first attempt on.
///
/// Returns how many elements got an interceptor. Running this twice installs two interceptors
/// per form.
pub fn install_validation_styling(
    document: &mut Document,
    marker: &Selector,
    validated_class: &str,
) -> usize {
    let forms = document.query_selector_all(marker);
    let mut installed = 0;

    for form in forms {
        let validated_class = validated_class.to_owned();
        let added = document.add_submit_listener(form, move |document, form, event| {
            if !document.check_validity(form).unwrap_or(false) {
                event.prevent_default();
                event.stop_propagation();
                tracing::debug!(form = %form, "prevented submit of invalid form");
            }
            if let Err(error) = document.add_class(form, &validated_class) {
                tracing::warn!(%error, "could not mark form as validated");
            }
        });
        if added.is_ok() {
            installed += 1;
        }
    }

    tracing::debug!(marker = %marker, count = installed, "installed validation styling");
    installed
}

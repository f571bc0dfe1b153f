//! Phone-number selector and submit button.
//!
//! Submitting only reports the collected state to the caller; nothing is
//! sent anywhere.

use cardmerge_core::PhoneNumber;
use dioxus::prelude::*;

/// Props for the [`PhoneNumberForm`] component.
#[derive(Props, Clone, PartialEq)]
pub struct PhoneNumberFormProps {
    /// Current selection.
    value: PhoneNumber,
    /// Fired when the selection changes.
    on_change: EventHandler<PhoneNumber>,
    /// Fired on submit.
    on_submit: EventHandler<()>,
    /// Upload pickers rendered above the selector.
    children: Element,
}

/// The left-hand form: upload pickers, phone-number selector, submit.
#[component]
pub fn PhoneNumberForm(props: PhoneNumberFormProps) -> Element {
    let current = props.value.label();

    rsx! {
        form {
            class: "stack",
            onsubmit: move |evt: FormEvent| {
                evt.prevent_default();
                props.on_submit.call(());
            },

            div {
                label { class: "field-label",
                    "Select Aadhaar Images "
                    span { class: "text-error", "*" }
                }
                div { class: "stack", {props.children} }
            }

            div {
                label { class: "field-label", r#for: "phone-number", "Phone Number" }
                select {
                    id: "phone-number",
                    class: "select",
                    value: "{current}",
                    onchange: move |evt: FormEvent| {
                        match PhoneNumber::from_label(&evt.value()) {
                            Some(value) => props.on_change.call(value),
                            None => tracing::warn!(value = %evt.value(), "unknown phone-number option"),
                        }
                    },
                    for choice in PhoneNumber::ALL {
                        option {
                            value: choice.label(),
                            selected: choice.label() == current,
                            {choice.label()}
                        }
                    }
                }
            }

            button { r#type: "submit", class: "btn btn--primary", "Submit" }
        }
    }
}

use maud::{html, Markup};

use crate::{config::PageLocation, AppState};

/// Development-only overlay showing how the environment resolved. Renders
/// nothing at all outside of development.
pub fn overlay(state: &AppState, location: Option<&PageLocation>) -> Markup {
    if !state.config.is_development() {
        return html! {};
    }

    let backend = state.config.backend_url(location);
    html! {
        ."card"."bg-neutral"."text-neutral-content"."text-xs"."font-mono" { ."card-body" {
            ."card-title"."text-sm" {"debug"}
            p {"backend: " @if backend.is_empty() {"(unresolved)"} @else {(backend)}}
            p {"square app id: "
                @if state.config.square.application_id.is_some() {"set"} @else {"missing"}}
            p {"square location id: "
                @if state.config.square.location_id.is_some() {"set"} @else {"missing"}}
            p {"sdk loaded: "(state.sdk.is_loaded())}
            p {"session token: "
                @if state.session().token().is_some() {"present"} @else {"absent"}}
        }}
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Environment;

    use super::*;

    #[test]
    fn hidden_outside_development() {
        let mut state = AppState::for_tests();
        state.config.environment = Environment::Production;
        assert_eq!(overlay(&state, None).into_string(), "");
    }

    #[test]
    fn shows_resolution_state_in_development() {
        let state = AppState::for_tests();
        let markup = overlay(&state, None).into_string();
        assert!(markup.contains("(unresolved)"));
        assert!(markup.contains("session token: absent"));
    }
}

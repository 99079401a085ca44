//! Terminal renderings of the flow views.
//!
//! Status and errors go to stderr; the only stdout output is the user
//! record printed by `me`, so it can be piped. Session tokens are never
//! printed.

use dsci_auth::flow::{DashboardState, DashboardView, FormView};
use dsci_auth::navigation::{Navigator, Route};
use dsci_auth::validation::ValidationErrors;

#[derive(Debug, Default)]
pub struct TerminalFormView;

impl FormView for TerminalFormView {
    fn set_loading(&self, loading: bool) {
        if loading {
            eprintln!("working...");
        }
    }

    fn set_error(&self, message: Option<String>) {
        if let Some(message) = message {
            eprintln!("error: {message}");
        }
    }

    fn set_field_errors(&self, errors: &ValidationErrors) {
        for error in errors.errors() {
            eprintln!("  {error}");
        }
    }
}

#[derive(Debug, Default)]
pub struct TerminalDashboardView;

impl DashboardView for TerminalDashboardView {
    fn show(&self, state: DashboardState) {
        match state {
            DashboardState::Loading => eprintln!("fetching current user..."),
            DashboardState::Ready(user) => {
                let public = serde_json::json!({
                    "userId": user.user_id,
                    "name": user.name,
                    "email": user.email,
                });
                match serde_json::to_string_pretty(&public) {
                    Ok(json) => println!("{json}"),
                    Err(err) => eprintln!("error: could not render user: {err}"),
                }
            }
        }
    }
}

/// Prints navigation targets.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate_to(&self, route: Route) {
        eprintln!("-> {route}");
    }
}

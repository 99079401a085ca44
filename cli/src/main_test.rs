use dsci_auth::consent::ConsentCapture;
use dsci_auth::navigation::Route;

use super::*;

// =============================================================
// argument parsing
// =============================================================

#[test]
fn login_parses_comma_separated_consent() {
    let cli = Cli::try_parse_from([
        "dsci-cli",
        "login",
        "--email",
        "a@b.com",
        "--password",
        "Secret1!",
        "--consent",
        "data-processing,marketing",
    ])
    .unwrap();

    let Command::Login(args) = cli.command else {
        panic!("expected login");
    };
    let choices = args.consent.choices();
    assert!(choices.is_selected(ConsentOption::DataProcessing));
    assert!(choices.is_selected(ConsentOption::Marketing));
    assert!(!choices.is_selected(ConsentOption::Research));
}

#[test]
fn consent_defaults_to_none_selected() {
    let cli = Cli::try_parse_from(["dsci-cli", "login", "--email", "a@b.com"]).unwrap();
    let Command::Login(args) = cli.command else {
        panic!("expected login");
    };
    assert!(!args.consent.choices().is_valid());
}

#[test]
fn unknown_consent_option_is_rejected() {
    let result = Cli::try_parse_from(["dsci-cli", "login", "--email", "a@b.com", "--consent", "telemetry"]);
    assert!(result.is_err());
}

#[test]
fn register_requires_name() {
    assert!(Cli::try_parse_from(["dsci-cli", "register", "--email", "a@b.com"]).is_err());
}

#[test]
fn verbose_flag_counts() {
    let cli = Cli::try_parse_from(["dsci-cli", "-vv", "status"]).unwrap();
    assert_eq!(cli.verbose, 2);
}

// =============================================================
// outcome mapping
// =============================================================

#[test]
fn completed_outcome_is_success() {
    assert!(submit_result("login", SubmitOutcome::Completed(Route::Dashboard)).is_ok());
}

#[test]
fn failure_outcomes_name_the_command() {
    let err = submit_result("register", SubmitOutcome::ConsentFailed { redirected_to: None }).unwrap_err();
    assert_eq!(err.to_string(), "register did not complete: consent submission failed");

    let err = submit_result("login", SubmitOutcome::Rejected("Invalid credentials".to_owned())).unwrap_err();
    assert_eq!(err.to_string(), "login did not complete: rejected by server");
}

#[test]
fn base_url_flag_overrides_environment() {
    let config = load_config(Some("https://api.example.org/"));
    assert_eq!(config.api_base_url, "https://api.example.org");
}

use super::*;
use crate::error::Error;
use crate::scrollback::Scrollback;
use std::sync::Arc;

fn scrollback(lines: &[&str]) -> Scrollback {
    let mut sb = Scrollback::new(100);
    for line in lines {
        sb.push(line);
        sb.push("\n");
    }
    sb
}

fn ls() -> GeneratedCommand {
    GeneratedCommand::new("ls -la", WarningLevel::Safe)
}

#[test]
fn test_request_carries_context_tail() {
    let mut coord = GenerationCoordinator::new(2);
    let sb = scrollback(&["one", "two", "three"]);

    let ticket = coord.generate("  list files ", "bash", "Linux", &sb).unwrap();

    assert_eq!(ticket.request.natural_language_text, "list files");
    assert_eq!(ticket.request.shell_name, "bash");
    assert_eq!(ticket.request.os_identifier, "Linux");
    assert_eq!(ticket.request.scrollback_context, vec!["two", "three"]);
    assert!(coord.is_current(ticket.token));
}

#[test]
fn test_blank_request_is_rejected() {
    let mut coord = GenerationCoordinator::new(10);
    let err = coord
        .generate("   ", "bash", "Linux", &Scrollback::new(1))
        .unwrap_err();
    assert!(matches!(err, Error::EmptyRequest));
    assert_eq!(coord.state(), &CoordinatorState::Idle);
}

#[test]
fn test_one_generation_at_a_time() {
    let mut coord = GenerationCoordinator::new(10);
    let sb = Scrollback::new(1);
    let ticket = coord.generate("a", "bash", "Linux", &sb).unwrap();

    assert!(matches!(
        coord.generate("b", "bash", "Linux", &sb),
        Err(Error::GenerationBusy)
    ));

    coord.resolve(ticket.token, Ok(ls()));
    assert!(matches!(
        coord.generate("c", "bash", "Linux", &sb),
        Err(Error::GenerationBusy)
    ));
}

#[test]
fn test_success_previews_then_executes() {
    let mut coord = GenerationCoordinator::new(10);
    let ticket = coord
        .generate("list", "bash", "Linux", &Scrollback::new(1))
        .unwrap();

    assert_eq!(coord.resolve(ticket.token, Ok(ls())), Resolution::Preview(ls()));
    assert_eq!(coord.preview(), Some(&ls()));

    assert_eq!(coord.execute().as_deref(), Some("ls -la\n"));
    assert_eq!(coord.state(), &CoordinatorState::Idle);
    assert!(coord.execute().is_none());
}

#[test]
fn test_failure_returns_to_idle_with_message() {
    let mut coord = GenerationCoordinator::new(10);
    let ticket = coord
        .generate("list", "bash", "Linux", &Scrollback::new(1))
        .unwrap();

    let resolution = coord.resolve(
        ticket.token,
        Err(Error::Llm(termdeck_llm::Error::Timeout(60_000))),
    );

    assert_eq!(
        resolution,
        Resolution::Failed("The model did not answer within 60 seconds.".to_string())
    );
    assert_eq!(coord.state(), &CoordinatorState::Idle);
}

#[test]
fn test_cancelled_response_is_discarded() {
    let mut coord = GenerationCoordinator::new(10);
    let sb = Scrollback::new(1);
    let first = coord.generate("a", "bash", "Linux", &sb).unwrap();

    assert!(coord.cancel());
    assert!(!coord.cancel());

    let second = coord.generate("b", "bash", "Linux", &sb).unwrap();
    assert_ne!(first.token, second.token);

    assert_eq!(coord.resolve(first.token, Ok(ls())), Resolution::Discarded);
    assert!(coord.is_current(second.token));
    assert_eq!(
        coord.resolve(second.token, Ok(ls())),
        Resolution::Preview(ls())
    );
}

#[test]
fn test_late_failure_after_cancel_is_discarded() {
    let mut coord = GenerationCoordinator::new(10);
    let ticket = coord
        .generate("a", "bash", "Linux", &Scrollback::new(1))
        .unwrap();

    assert!(coord.cancel());
    assert!(!coord.is_current(ticket.token));

    let resolution = coord.resolve(
        ticket.token,
        Err(Error::Generation("connection reset".to_string())),
    );
    assert_eq!(resolution, Resolution::Discarded);
    assert_eq!(coord.state(), &CoordinatorState::Idle);
}

#[test]
fn test_cancel_dismisses_preview() {
    let mut coord = GenerationCoordinator::new(10);
    let ticket = coord
        .generate("a", "bash", "Linux", &Scrollback::new(1))
        .unwrap();
    coord.resolve(ticket.token, Ok(ls()));

    assert!(coord.cancel());
    assert!(coord.preview().is_none());
    assert!(!coord.cancel_preview());
}

#[test]
fn test_warning_level_labels_and_order() {
    assert_eq!(WarningLevel::from_label("HIGH"), WarningLevel::Dangerous);
    assert_eq!(WarningLevel::from_label("warning"), WarningLevel::Caution);
    assert_eq!(WarningLevel::from_label("none"), WarningLevel::Safe);
    assert!(WarningLevel::Dangerous > WarningLevel::Caution);
    assert_eq!(
        serde_json::to_string(&WarningLevel::Caution).unwrap(),
        "\"caution\""
    );
}

#[tokio::test]
async fn test_generator_trait_is_mockable() {
    let mut mock = MockCommandGenerator::new();
    mock.expect_generate()
        .withf(|req| req.natural_language_text == "wipe disk")
        .returning(|_| Ok(GeneratedCommand::new("dd if=/dev/zero of=/dev/sda", WarningLevel::Dangerous)));

    let generator: Arc<dyn CommandGenerator> = Arc::new(mock);
    let cmd = generator
        .generate(GenerationRequest {
            natural_language_text: "wipe disk".to_string(),
            shell_name: "bash".to_string(),
            os_identifier: "Linux".to_string(),
            scrollback_context: Vec::new(),
        })
        .await
        .unwrap();

    assert!(cmd.warning_level.is_dangerous());
}

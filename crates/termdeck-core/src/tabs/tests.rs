use super::*;
use crate::generation::{CoordinatorState, MockCommandGenerator, WarningLevel};
use crate::host::TerminalHost;
use crate::pty::{ExitStatus, MockPtySystem};
use std::time::Duration;

#[derive(Default)]
struct TestView {
    output: String,
    banners: Vec<String>,
}

impl TerminalView for TestView {
    fn write(&mut self, data: &str) {
        self.output.push_str(data);
    }

    fn show_banner(&mut self, text: &str) {
        self.banners.push(text.to_string());
    }

    fn size(&self) -> TermSize {
        TermSize::new(100, 30)
    }
}

fn controller(
    generator: Option<Arc<dyn CommandGenerator>>,
) -> (TabController<TestView>, MockPtySystem) {
    let pty = MockPtySystem::new();
    let terminal = TerminalConfig {
        shell: Some("/bin/bash".to_string()),
        ..TerminalConfig::default()
    };
    let (host, _task) = TerminalHost::spawn(
        Arc::new(pty.clone()),
        terminal.clone(),
        CancellationToken::new(),
    );
    let ctl = TabController::new(host, generator, terminal, &GenerationConfig::default());
    (ctl, pty)
}

fn generator(mock: MockCommandGenerator) -> Option<Arc<dyn CommandGenerator>> {
    Some(Arc::new(mock))
}

async fn poll_until(
    ctl: &mut TabController<TestView>,
    now: Instant,
    mut done: impl FnMut(&TabController<TestView>) -> bool,
) {
    for _ in 0..200 {
        ctl.poll(now);
        if done(ctl) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

async fn open_running(ctl: &mut TabController<TestView>) -> SessionId {
    let id = ctl.open_tab(TestView::default(), Some(std::env::temp_dir()));
    let wait = id.clone();
    poll_until(ctl, Instant::now(), move |c| {
        matches!(c.tab(&wait).map(Tab::status), Some(TabStatus::Running { .. }))
    })
    .await;
    id
}

#[tokio::test]
async fn test_open_tab_becomes_running() {
    let (mut ctl, pty) = controller(None);
    let id = open_running(&mut ctl).await;

    let tab = ctl.tab(&id).unwrap();
    assert_eq!(tab.title(), "bash");
    assert!(matches!(tab.status(), TabStatus::Running { shell, .. } if shell == "bash"));
    assert_eq!(pty.spec(&id).unwrap().size, TermSize::new(100, 30));
    assert_eq!(ctl.active().unwrap().id(), &id);
}

#[tokio::test]
async fn test_failed_create_shows_inline_error() {
    let (mut ctl, pty) = controller(None);
    pty.fail_next_spawn("permission denied");

    let id = ctl.open_tab(TestView::default(), Some(std::env::temp_dir()));
    let wait = id.clone();
    poll_until(&mut ctl, Instant::now(), move |c| {
        matches!(c.tab(&wait).map(Tab::status), Some(TabStatus::Failed(_)))
    })
    .await;

    let tab = ctl.tab(&id).unwrap();
    assert!(tab.view().banners[0].contains("permission denied"));
    ctl.send_input(&id, "ignored");
    assert!(pty.writes(&id).is_empty());
}

#[tokio::test]
async fn test_output_reaches_view_and_scrollback() {
    let (mut ctl, pty) = controller(None);
    let id = open_running(&mut ctl).await;

    pty.emit_output(&id, "\x1b[32mhello\x1b[0m\r\n");
    let wait = id.clone();
    poll_until(&mut ctl, Instant::now(), move |c| {
        c.tab(&wait).unwrap().view().output.contains("hello")
    })
    .await;

    let tab = ctl.tab(&id).unwrap();
    assert_eq!(tab.view().output, "\x1b[32mhello\x1b[0m\r\n");
    assert_eq!(tab.scrollback().tail(5), vec!["hello"]);
}

#[tokio::test]
async fn test_exit_banner_then_auto_close() {
    let (mut ctl, pty) = controller(None);
    let id = open_running(&mut ctl).await;
    let t0 = Instant::now();

    pty.emit_exit(&id, ExitStatus::code(2));
    let wait = id.clone();
    poll_until(&mut ctl, t0, move |c| {
        matches!(c.tab(&wait).map(Tab::status), Some(TabStatus::Exited { .. }))
    })
    .await;

    let tab = ctl.tab(&id).unwrap();
    assert_eq!(tab.view().banners, vec!["[Process exited with code 2]"]);

    ctl.poll(t0 + Duration::from_millis(1499));
    assert!(ctl.tab(&id).is_some());
    assert!(ctl.poll(t0 + Duration::from_millis(1500)));
    assert!(ctl.is_empty());
}

#[test]
fn test_exit_banner_text() {
    assert_eq!(exit_banner(Some(0), None), "[Process exited with code 0]");
    assert_eq!(
        exit_banner(None, Some("SIGKILL")),
        "[Process terminated by SIGKILL]"
    );
    assert_eq!(exit_banner(None, None), "[Process exited]");
}

#[tokio::test]
async fn test_close_tab_kills_shell() {
    let (mut ctl, pty) = controller(None);
    let id = open_running(&mut ctl).await;

    assert!(ctl.close_tab(&id));
    assert!(!ctl.close_tab(&id));
    assert!(ctl.is_empty());

    for _ in 0..200 {
        if pty.kill_count(&id) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(pty.kill_count(&id), 1);
    assert!(!ctl.poll(Instant::now()));
}

#[tokio::test]
async fn test_input_and_resize_forwarded() {
    let (mut ctl, pty) = controller(None);
    let id = open_running(&mut ctl).await;

    ctl.send_input(&id, "ls\n");
    ctl.resize(&id, 120, 40);

    for _ in 0..200 {
        if !pty.resizes(&id).is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(pty.writes(&id), vec!["ls\n"]);
    assert_eq!(pty.resizes(&id), vec![TermSize::new(120, 40)]);
}

#[tokio::test]
async fn test_generate_preview_then_execute() {
    let mut mock = MockCommandGenerator::new();
    mock.expect_generate()
        .times(1)
        .withf(|req| req.natural_language_text == "list files" && req.shell_name == "bash")
        .returning(|_| Ok(GeneratedCommand::new("ls -la", WarningLevel::Safe)));
    let (mut ctl, pty) = controller(generator(mock));
    let id = open_running(&mut ctl).await;
    let now = Instant::now();

    assert_eq!(
        ctl.footer_enter(&id, "list files", false, now),
        EnterAction::Submit
    );
    let wait = id.clone();
    poll_until(&mut ctl, now, move |c| {
        c.tab(&wait).unwrap().coordinator().preview().is_some()
    })
    .await;

    assert_eq!(
        ctl.footer_enter(&id, "list files", false, now),
        EnterAction::Submit
    );
    assert!(ctl.tab(&id).unwrap().coordinator().preview().is_none());

    for _ in 0..200 {
        if !pty.writes(&id).is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(pty.writes(&id), vec!["ls -la\n"]);
}

#[tokio::test]
async fn test_composition_suppresses_submit() {
    let mut mock = MockCommandGenerator::new();
    mock.expect_generate().times(0);
    let (mut ctl, _pty) = controller(generator(mock));
    let id = open_running(&mut ctl).await;
    let t0 = Instant::now();

    ctl.footer_composition_start(&id);
    assert!(ctl.tab(&id).unwrap().is_composing());
    assert_eq!(ctl.footer_enter(&id, "日本", false, t0), EnterAction::Suppress);

    ctl.footer_composition_end(&id, t0);
    assert_eq!(
        ctl.footer_enter(&id, "日本", false, t0 + Duration::from_millis(50)),
        EnterAction::Suppress
    );
    assert_eq!(
        ctl.footer_enter(&id, "日本", true, t0 + Duration::from_millis(50)),
        EnterAction::InsertNewline
    );
}

#[tokio::test]
async fn test_cancelled_generation_is_discarded() {
    let mut mock = MockCommandGenerator::new();
    mock.expect_generate()
        .returning(|_| Ok(GeneratedCommand::new("rm -rf /", WarningLevel::Dangerous)));
    let (mut ctl, _pty) = controller(generator(mock));
    let id = open_running(&mut ctl).await;

    ctl.submit_generation(&id, "clean up").unwrap();
    assert!(ctl.cancel_generation(&id));

    tokio::time::sleep(Duration::from_millis(20)).await;
    ctl.poll(Instant::now());

    let tab = ctl.tab(&id).unwrap();
    assert!(tab.coordinator().preview().is_none());
    assert!(tab.notice().is_none());
    assert!(!ctl.execute_preview(&id));
}

#[tokio::test]
async fn test_cancelled_generation_failure_leaves_no_notice() {
    let mut mock = MockCommandGenerator::new();
    mock.expect_generate()
        .returning(|_| Err(Error::Generation("connection reset".to_string())));
    let (mut ctl, _pty) = controller(generator(mock));
    let id = open_running(&mut ctl).await;

    ctl.submit_generation(&id, "clean up").unwrap();
    assert!(ctl.cancel_generation(&id));

    tokio::time::sleep(Duration::from_millis(20)).await;
    ctl.poll(Instant::now());

    let tab = ctl.tab(&id).unwrap();
    assert!(tab.notice().is_none());
    assert_eq!(tab.coordinator().state(), &CoordinatorState::Idle);
}

#[tokio::test]
async fn test_generation_failure_becomes_notice() {
    let mut mock = MockCommandGenerator::new();
    mock.expect_generate()
        .returning(|_| Err(Error::Generation("the model returned no command".to_string())));
    let (mut ctl, _pty) = controller(generator(mock));
    let id = open_running(&mut ctl).await;

    ctl.submit_generation(&id, "do it").unwrap();
    assert!(matches!(
        ctl.submit_generation(&id, "again"),
        Err(Error::GenerationBusy)
    ));

    let wait = id.clone();
    poll_until(&mut ctl, Instant::now(), move |c| {
        c.tab(&wait).unwrap().notice().is_some()
    })
    .await;

    assert_eq!(
        ctl.tab(&id).unwrap().notice(),
        Some("Command generation failed: the model returned no command")
    );
}

#[tokio::test]
async fn test_disabled_generation_sets_notice() {
    let (mut ctl, _pty) = controller(None);
    let id = open_running(&mut ctl).await;

    ctl.footer_enter(&id, "anything", false, Instant::now());

    assert!(ctl
        .tab(&id)
        .unwrap()
        .notice()
        .unwrap()
        .contains("command generation is disabled"));
}

#[tokio::test]
async fn test_tab_navigation() {
    let (mut ctl, _pty) = controller(None);
    let a = ctl.open_tab(TestView::default(), Some(std::env::temp_dir()));
    let b = ctl.open_tab(TestView::default(), Some(std::env::temp_dir()));
    let c = ctl.open_tab(TestView::default(), Some(std::env::temp_dir()));
    assert_eq!(ctl.active_index(), 2);

    ctl.next_tab();
    assert_eq!(ctl.active().unwrap().id(), &a);
    ctl.prev_tab();
    assert_eq!(ctl.active().unwrap().id(), &c);

    assert!(ctl.select(1));
    assert!(!ctl.select(3));
    ctl.close_tab(&b);
    assert_eq!(ctl.active().unwrap().id(), &c);
    ctl.close_tab(&c);
    assert_eq!(ctl.active().unwrap().id(), &a);
    assert_eq!(ctl.len(), 1);
}

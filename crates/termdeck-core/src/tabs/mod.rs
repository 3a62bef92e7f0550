//! Tab controller
//!
//! Binds one [`TerminalView`] per session and keeps the per-tab state a front
//! end needs: scrollback for generation context, the footer's composition
//! filter and the generation coordinator. The controller is synchronous and
//! owned by the UI loop; host replies, terminal output and generator results
//! come back through its inbox and are applied in [`TabController::poll`].

#[cfg(test)]
mod tests;

use crate::composition::{CompositionFilter, EnterAction};
use crate::config::{GenerationConfig, TerminalConfig};
use crate::error::{Error, Result, UserFriendlyError};
use crate::generation::{
    CommandGenerator, GeneratedCommand, GenerationCoordinator, GenerationToken, Resolution,
};
use crate::host::HostHandle;
use crate::protocol::{CreateReply, CreateRequest, KillReply, ServerMessage, SessionId, TermSize};
use crate::scrollback::Scrollback;
use crate::shell;
use crate::sink::ChannelSink;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Rendering surface for one terminal
pub trait TerminalView: Send {
    /// Feed raw shell output
    fn write(&mut self, data: &str);

    /// Show a status line below the output, such as an exit notice
    fn show_banner(&mut self, text: &str);

    /// Current size in cells
    fn size(&self) -> TermSize;
}

/// Everything that reaches the controller's inbox
#[derive(Debug)]
pub enum UiEvent {
    /// Pushed by the host through a tab's sink
    Server(ServerMessage),
    /// Answer to `open_tab`
    Created(CreateReply),
    /// Answer to `close_tab`
    Killed(KillReply),
    /// A generator call finished
    Generated {
        /// Tab the request came from
        id: SessionId,
        /// Attempt it belongs to
        token: GenerationToken,
        /// Generator outcome
        result: Result<GeneratedCommand>,
    },
}

impl From<ServerMessage> for UiEvent {
    fn from(msg: ServerMessage) -> Self {
        UiEvent::Server(msg)
    }
}

/// Lifecycle of a tab as the UI sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabStatus {
    /// Waiting for the create reply
    Starting,
    /// Shell is running
    Running {
        /// Shell display name
        shell: String,
        /// Working directory
        cwd: PathBuf,
    },
    /// Shell ended; the tab closes after the configured delay
    Exited {
        /// Exit code, if it exited normally
        code: Option<i32>,
        /// Terminating signal, if any
        signal: Option<String>,
    },
    /// The shell never started
    Failed(String),
}

/// One open terminal
pub struct Tab<V> {
    id: SessionId,
    view: V,
    status: TabStatus,
    shell_name: String,
    scrollback: Scrollback,
    footer: CompositionFilter,
    coordinator: GenerationCoordinator,
    surface: CancellationToken,
    close_at: Option<Instant>,
    notice: Option<String>,
}

impl<V> Tab<V> {
    /// Session id
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Rendering surface
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Mutable rendering surface
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Lifecycle status
    pub fn status(&self) -> &TabStatus {
        &self.status
    }

    /// Tab title
    pub fn title(&self) -> &str {
        &self.shell_name
    }

    /// Plain-text history
    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    /// Generation state
    pub fn coordinator(&self) -> &GenerationCoordinator {
        &self.coordinator
    }

    /// Whether the footer is mid-composition
    pub fn is_composing(&self) -> bool {
        self.footer.is_composing()
    }

    /// Last user-visible message, such as a generation failure
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Clear the notice
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    fn accepts_input(&self) -> bool {
        matches!(self.status, TabStatus::Starting | TabStatus::Running { .. })
    }
}

/// Text shown when a shell ends
#[must_use]
pub fn exit_banner(code: Option<i32>, signal: Option<&str>) -> String {
    match (code, signal) {
        (_, Some(signal)) => format!("[Process terminated by {}]", signal),
        (Some(code), None) => format!("[Process exited with code {}]", code),
        (None, None) => "[Process exited]".to_string(),
    }
}

/// Session tabs of one window
pub struct TabController<V> {
    host: HostHandle,
    generator: Option<Arc<dyn CommandGenerator>>,
    terminal: TerminalConfig,
    context_lines: usize,
    tabs: Vec<Tab<V>>,
    active: usize,
    inbox_tx: mpsc::UnboundedSender<UiEvent>,
    inbox_rx: mpsc::UnboundedReceiver<UiEvent>,
}

impl<V: TerminalView> TabController<V> {
    /// Controller for `host`; `generator` is `None` when generation is disabled
    pub fn new(
        host: HostHandle,
        generator: Option<Arc<dyn CommandGenerator>>,
        terminal: TerminalConfig,
        generation: &GenerationConfig,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            host,
            generator,
            terminal,
            context_lines: generation.context_lines,
            tabs: Vec::new(),
            active: 0,
            inbox_tx,
            inbox_rx,
        }
    }

    /// Open a terminal in `cwd` (home when `None`) and make it active
    ///
    /// Must be called inside a tokio runtime. The create reply arrives later
    /// through [`poll`](Self::poll).
    pub fn open_tab(&mut self, view: V, cwd: Option<PathBuf>) -> SessionId {
        let id = SessionId::generate();
        let surface = CancellationToken::new();
        let sink = ChannelSink::new(self.inbox_tx.clone())
            .with_surface(surface.clone())
            .boxed();

        let mut request = CreateRequest::with_id(id.clone()).with_size(view.size());
        request.cwd = cwd;

        let host = self.host.clone();
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let reply = host.create(request, sink).await;
            let _ = inbox.send(UiEvent::Created(reply));
        });

        let shell_name = self
            .terminal
            .shell
            .as_deref()
            .map_or_else(|| shell::shell_name(&shell::default_shell()), shell::shell_name);

        self.tabs.push(Tab {
            id: id.clone(),
            view,
            status: TabStatus::Starting,
            shell_name,
            scrollback: Scrollback::new(self.terminal.scrollback_lines),
            footer: CompositionFilter::new(),
            coordinator: GenerationCoordinator::new(self.context_lines),
            surface,
            close_at: None,
            notice: None,
        });
        self.active = self.tabs.len() - 1;
        debug!(%id, "Tab opened");
        id
    }

    /// Close a tab and kill its shell
    ///
    /// Output still in flight for the tab is dropped. Returns whether the tab
    /// existed.
    pub fn close_tab(&mut self, id: &SessionId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let tab = self.remove_at(index);
        tab.surface.cancel();

        if matches!(tab.status, TabStatus::Starting | TabStatus::Running { .. }) {
            let host = self.host.clone();
            let inbox = self.inbox_tx.clone();
            let id = tab.id.clone();
            tokio::spawn(async move {
                let reply = host.kill(&id).await;
                let _ = inbox.send(UiEvent::Killed(reply));
            });
        }
        true
    }

    /// Forward keyboard input to a shell
    pub fn send_input(&self, id: &SessionId, data: &str) {
        if self.tab(id).is_some_and(Tab::accepts_input) {
            self.host.write(id, data);
        }
    }

    /// Forward a size change to a shell
    pub fn resize(&self, id: &SessionId, cols: u16, rows: u16) {
        if self.tab(id).is_some_and(Tab::accepts_input) {
            self.host.resize(id, cols, rows);
        }
    }

    /// Apply everything in the inbox and close tabs whose exit delay elapsed
    ///
    /// Returns whether anything changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Ok(event) = self.inbox_rx.try_recv() {
            changed |= self.apply(event, now);
        }

        let expired: Vec<SessionId> = self
            .tabs
            .iter()
            .filter(|t| t.close_at.is_some_and(|at| at <= now))
            .map(|t| t.id.clone())
            .collect();
        for id in expired {
            if let Some(index) = self.index_of(&id) {
                self.remove_at(index).surface.cancel();
                debug!(%id, "Closed exited tab");
                changed = true;
            }
        }
        changed
    }

    fn apply(&mut self, event: UiEvent, now: Instant) -> bool {
        match event {
            UiEvent::Server(ServerMessage::Data { id, data }) => {
                let Some(tab) = self.tab_mut(&id) else {
                    return false;
                };
                tab.scrollback.push(&data);
                tab.view.write(&data);
                true
            }
            UiEvent::Server(ServerMessage::Exit {
                id,
                exit_code,
                signal,
            }) => {
                let delay = self.terminal.exit_close_delay();
                let Some(tab) = self.tab_mut(&id) else {
                    return false;
                };
                tab.view.show_banner(&exit_banner(exit_code, signal.as_deref()));
                tab.status = TabStatus::Exited {
                    code: exit_code,
                    signal,
                };
                tab.coordinator.cancel();
                tab.close_at = Some(now + delay);
                info!(%id, ?exit_code, "Shell exited");
                true
            }
            // Create and kill replies travel through the Created/Killed variants
            UiEvent::Server(ServerMessage::CreateResult(reply)) | UiEvent::Created(reply) => {
                self.apply_created(reply)
            }
            UiEvent::Server(ServerMessage::KillResult(reply)) | UiEvent::Killed(reply) => {
                if !reply.success {
                    debug!(id = %reply.id, error = ?reply.error, "Kill found nothing");
                }
                false
            }
            UiEvent::Generated { id, token, result } => {
                let Some(tab) = self.tab_mut(&id) else {
                    return false;
                };
                match tab.coordinator.resolve(token, result) {
                    Resolution::Preview(command) => {
                        debug!(%id, warning = ?command.warning_level, "Command ready");
                        tab.notice = None;
                        true
                    }
                    Resolution::Failed(message) => {
                        tab.notice = Some(message);
                        true
                    }
                    Resolution::Discarded => false,
                }
            }
        }
    }

    fn apply_created(&mut self, reply: CreateReply) -> bool {
        let Some(tab) = self.tab_mut(&reply.id) else {
            debug!(id = %reply.id, "Create reply for a closed tab");
            return false;
        };
        if tab.status != TabStatus::Starting {
            return false;
        }

        if reply.success {
            let shell = reply
                .shell
                .map_or_else(|| tab.shell_name.clone(), |program| shell::shell_name(&program));
            tab.shell_name.clone_from(&shell);
            tab.status = TabStatus::Running {
                shell,
                cwd: reply.cwd.unwrap_or_default(),
            };
        } else {
            let message = reply
                .error
                .unwrap_or_else(|| "Failed to start terminal".to_string());
            warn!(id = %reply.id, error = %message, "Terminal failed to start");
            tab.view.show_banner(&message);
            tab.status = TabStatus::Failed(message);
        }
        true
    }

    /// The footer's input method started composing
    pub fn footer_composition_start(&mut self, id: &SessionId) {
        if let Some(tab) = self.tab_mut(id) {
            tab.footer.composition_start();
        }
    }

    /// The footer's input method finished composing
    pub fn footer_composition_end(&mut self, id: &SessionId, now: Instant) {
        if let Some(tab) = self.tab_mut(id) {
            tab.footer.composition_end(now);
        }
    }

    /// Enter was pressed in the footer
    ///
    /// On `Submit` a previewed command is executed; otherwise `text` is sent
    /// for generation. Errors from that step become the tab's notice.
    pub fn footer_enter(
        &mut self,
        id: &SessionId,
        text: &str,
        shift: bool,
        now: Instant,
    ) -> EnterAction {
        let Some(tab) = self.tab(id) else {
            return EnterAction::Suppress;
        };
        let action = tab.footer.on_enter(shift, now);
        if action != EnterAction::Submit {
            return action;
        }

        if tab.coordinator.preview().is_some() {
            self.execute_preview(id);
        } else if let Err(e) = self.submit_generation(id, text) {
            if let Some(tab) = self.tab_mut(id) {
                tab.notice = Some(e.user_message());
            }
        }
        action
    }

    /// Ask the generator for a command
    ///
    /// Must be called inside a tokio runtime.
    pub fn submit_generation(&mut self, id: &SessionId, text: &str) -> Result<GenerationToken> {
        let generator = self
            .generator
            .clone()
            .ok_or_else(|| Error::Configuration("command generation is disabled".to_string()))?;
        let tab = self
            .tab_mut(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;

        let ticket = tab.coordinator.generate(
            text,
            &tab.shell_name,
            shell::os_identifier(),
            &tab.scrollback,
        )?;
        tab.notice = None;

        let inbox = self.inbox_tx.clone();
        let id = id.clone();
        let token = ticket.token;
        tokio::spawn(async move {
            let result = generator.generate(ticket.request).await;
            let _ = inbox.send(UiEvent::Generated { id, token, result });
        });
        Ok(token)
    }

    /// Run the previewed command in the shell
    pub fn execute_preview(&mut self, id: &SessionId) -> bool {
        let Some(tab) = self.tab_mut(id) else {
            return false;
        };
        let Some(input) = tab.coordinator.execute() else {
            return false;
        };
        self.host.write(id, input);
        true
    }

    /// Abandon generation or dismiss the preview
    pub fn cancel_generation(&mut self, id: &SessionId) -> bool {
        self.tab_mut(id)
            .is_some_and(|tab| tab.coordinator.cancel())
    }

    /// Open tabs in display order
    pub fn tabs(&self) -> &[Tab<V>] {
        &self.tabs
    }

    /// Tab by id
    pub fn tab(&self, id: &SessionId) -> Option<&Tab<V>> {
        self.tabs.iter().find(|t| &t.id == id)
    }

    /// Mutable tab by id
    pub fn tab_mut(&mut self, id: &SessionId) -> Option<&mut Tab<V>> {
        self.tabs.iter_mut().find(|t| &t.id == id)
    }

    /// Focused tab
    pub fn active(&self) -> Option<&Tab<V>> {
        self.tabs.get(self.active)
    }

    /// Mutable focused tab
    pub fn active_mut(&mut self) -> Option<&mut Tab<V>> {
        self.tabs.get_mut(self.active)
    }

    /// Index of the focused tab
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Focus a tab by position
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.tabs.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    /// Focus the next tab, wrapping around
    pub fn next_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.active = (self.active + 1) % self.tabs.len();
        }
    }

    /// Focus the previous tab, wrapping around
    pub fn prev_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.active = (self.active + self.tabs.len() - 1) % self.tabs.len();
        }
    }

    /// Whether no tabs are open
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Number of open tabs
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    fn index_of(&self, id: &SessionId) -> Option<usize> {
        self.tabs.iter().position(|t| &t.id == id)
    }

    fn remove_at(&mut self, index: usize) -> Tab<V> {
        let tab = self.tabs.remove(index);
        if self.active > index || self.active >= self.tabs.len() {
            self.active = self.active.saturating_sub(1);
        }
        tab
    }
}

//! Sync lifecycle coordinator
//!
//! Owns the rules tying the running sync to the options menu, to
//! connectivity changes and to logout:
//!
//! - at most one sync runs; "sync all" while one is running is ignored
//! - the sync items always show exactly one of "sync all" / "cancel sync"
//! - losing the network cancels the dialog-bound task and tells the user
//! - a recreated shell picks up the running sync without restarting it

use crate::services::connectivity::{ConnectivityEvent, ConnectivityListener};
use crate::services::notifications::{UserNotifier, NETWORK_DOWN, SYNC_IN_PROGRESS};
use crate::session::Session;
use crate::settings::{SessionSettings, Settings, SyncSettings};
use crate::sync::{
    spawn_sync, DialogBoundTask, DialogTask, SyncError, SyncEvent, SyncJobFactory, SyncTaskHandle, TaskId,
};
use crate::ui::{MenuAction, MenuState, OptionsMenu, Shell};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Result of a logout request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// User cleared and shell finishing
    Finished,
    /// A sync is running; the user was asked to confirm
    ConfirmationRequired,
    /// Nobody was logged in
    NotLoggedIn,
}

/// Result of a menu action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    SyncStarted(TaskId),
    AlreadySyncing(TaskId),
    SyncCancelled(TaskId),
    NothingToCancel,
    Logout(LogoutOutcome),
    /// Sync actions require a logged-in user
    NotAuthenticated,
}

impl ActionOutcome {
    /// Whether the menu has to be rebuilt
    pub fn changes_menu(&self) -> bool {
        matches!(self, Self::SyncStarted(_) | Self::SyncCancelled(_))
    }
}

pub struct SyncLifecycleCoordinator {
    session: Arc<Session>,
    jobs: Arc<dyn SyncJobFactory>,
    notifier: Arc<dyn UserNotifier>,
    runtime: Handle,
    sync_settings: SyncSettings,
    session_settings: SessionSettings,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<SyncEvent>>>,
}

impl SyncLifecycleCoordinator {
    pub fn new(
        session: Arc<Session>,
        jobs: Arc<dyn SyncJobFactory>,
        notifier: Arc<dyn UserNotifier>,
        settings: &Settings,
        runtime: Handle,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            session,
            jobs,
            notifier,
            runtime,
            sync_settings: settings.sync.clone(),
            session_settings: settings.session.clone(),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Hand out the worker event stream. Only the first caller gets it.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<SyncEvent>> {
        self.event_rx.lock().take()
    }

    /// Menu state for the current user, `None` when logged out
    pub fn menu_state(&self) -> Option<MenuState> {
        if !self.session.is_authenticated() {
            return None;
        }
        Some(MenuState::for_task(self.session.registry().is_occupied()))
    }

    /// Set the sync items from the registry and rebind the running task to
    /// `shell`. Returns whether the menu should be shown at all.
    pub fn on_menu_build(&self, shell: &dyn Shell, menu: &mut OptionsMenu) -> bool {
        if !self.session.is_authenticated() {
            menu.hide_all();
            return false;
        }

        // One snapshot for both items
        let current = self.session.registry().get();
        MenuState::for_task(current.is_some()).apply(menu);

        if let Some(task) = current {
            task.set_context(shell.shell_id());
        }
        true
    }

    pub fn on_menu_action(&self, shell: &dyn Shell, action: MenuAction) -> ActionOutcome {
        match action {
            MenuAction::StartSyncAll => self.start_sync(shell),
            MenuAction::CancelSyncAll => match self.cancel_sync() {
                Some(id) => ActionOutcome::SyncCancelled(id),
                None => {
                    tracing::debug!("Cancel requested with no sync running");
                    ActionOutcome::NothingToCancel
                }
            },
            MenuAction::Logout => ActionOutcome::Logout(self.on_logout(shell)),
        }
    }

    fn start_sync(&self, shell: &dyn Shell) -> ActionOutcome {
        if !self.session.is_authenticated() {
            tracing::warn!("Ignoring sync request without a logged-in user");
            return ActionOutcome::NotAuthenticated;
        }

        let registry = self.session.registry();
        let shell_id = shell.shell_id();
        let create = || Arc::new(SyncTaskHandle::new(Some(shell_id)));
        // The dialog binding goes in with the handle, before the worker exists
        let started = if self.sync_settings.show_progress_dialog {
            registry.try_start_with_dialog(create)
        } else {
            registry.try_start(create)
        };
        let task = match started {
            Ok(task) => task,
            Err(existing) => {
                tracing::debug!("Sync {} already running, ignoring start", existing.id());
                return ActionOutcome::AlreadySyncing(existing.id());
            }
        };

        spawn_sync(
            &self.runtime,
            registry.clone(),
            task.clone(),
            self.jobs.create(),
            self.event_tx.clone(),
        );
        ActionOutcome::SyncStarted(task.id())
    }

    /// Cancel and clear the running sync, if any
    fn cancel_sync(&self) -> Option<TaskId> {
        let registry = self.session.registry();
        let task = registry.take()?;
        task.cancel(false);
        registry.clear_dialog_if(task.id());
        Some(task.id())
    }

    /// Bind a blocking operation to the progress dialog. Fails while another
    /// uncancelled one is bound.
    pub fn bind_dialog(&self, task: Arc<dyn DialogBoundTask>) -> Result<(), SyncError> {
        self.session.registry().try_bind_dialog(task.clone()).map_err(|existing| {
            tracing::debug!("Dialog busy with {}, refusing {}", existing, task.id());
            SyncError::Busy(existing)
        })?;
        tracing::debug!("Dialog task {} bound", task.id());
        Ok(())
    }

    /// Unbind the dialog task if it is still `id`
    pub fn release_dialog(&self, id: TaskId) -> bool {
        let released = self.session.registry().clear_dialog_if(id);
        if released {
            tracing::debug!("Dialog task {} released", id);
        }
        released
    }

    /// Run `operation` behind the progress dialog. Losing the network drops
    /// the operation and returns [`SyncError::Cancelled`].
    pub async fn run_dialog<T, F>(&self, label: &str, operation: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, SyncError>>,
    {
        let task = Arc::new(DialogTask::new(label));
        self.bind_dialog(task.clone())?;

        let result = tokio::select! {
            result = operation => result,
            _ = task.cancelled() => Err(SyncError::Cancelled),
        };

        self.release_dialog(task.id());
        result
    }

    pub fn on_connectivity_event(&self, event: ConnectivityEvent) {
        if event.is_connected {
            return;
        }

        let Some((task, was_sync)) = self.session.registry().take_dialog_with_sync() else {
            tracing::debug!("Network lost with no blocking operation");
            return;
        };

        tracing::warn!("Network lost, cancelling task {}", task.id());
        task.cancel();
        if was_sync {
            tracing::debug!("Cleared sync slot for {}", task.id());
        }
        self.notifier.toast(NETWORK_DOWN);
    }

    /// Log out and finish `shell`. While a sync runs this asks for
    /// confirmation first, unless that is switched off in settings.
    pub fn on_logout(&self, shell: &dyn Shell) -> LogoutOutcome {
        if !self.session.is_authenticated() {
            return LogoutOutcome::NotLoggedIn;
        }

        if self.session_settings.confirm_logout_during_sync && self.session.registry().is_occupied() {
            self.notifier.toast(SYNC_IN_PROGRESS);
            return LogoutOutcome::ConfirmationRequired;
        }

        self.logout(shell)
    }

    /// Logout after the user confirmed; cancels any running sync
    pub fn confirm_logout(&self, shell: &dyn Shell) -> LogoutOutcome {
        self.logout(shell)
    }

    fn logout(&self, shell: &dyn Shell) -> LogoutOutcome {
        let Some(user) = self.session.take_current_user() else {
            return LogoutOutcome::NotLoggedIn;
        };

        if let Some(id) = self.cancel_sync() {
            tracing::info!("Sync {} cancelled by logout", id);
        }

        tracing::info!("User {} logged out", user.user_name);
        shell.finish();
        LogoutOutcome::Finished
    }
}

impl ConnectivityListener for SyncLifecycleCoordinator {
    fn on_connectivity_changed(&self, event: ConnectivityEvent) {
        self.on_connectivity_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifications::MemoryNotifier;
    use crate::session::User;
    use crate::sync::SyncJob;
    use crate::ui::{ShellHandle, CANCEL_SYNC_INDEX, SYNC_ALL_INDEX};
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Each step waits for a permit, so tests decide when work advances
    struct GatedJob {
        gate: Arc<Semaphore>,
        steps: usize,
    }

    impl SyncJob for GatedJob {
        fn total_steps(&self) -> usize {
            self.steps
        }

        fn run_step(&mut self, _index: usize) -> BoxFuture<'_, Result<(), SyncError>> {
            Box::pin(async move {
                let permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|e| SyncError::Unknown(e.to_string()))?;
                permit.forget();
                Ok(())
            })
        }
    }

    struct Fixture {
        coordinator: Arc<SyncLifecycleCoordinator>,
        session: Arc<Session>,
        notifier: Arc<MemoryNotifier>,
        gate: Arc<Semaphore>,
        jobs_created: Arc<AtomicUsize>,
    }

    fn fixture_with(settings: Settings) -> Fixture {
        let session = Session::shared();
        let notifier = Arc::new(MemoryNotifier::new());
        let gate = Arc::new(Semaphore::new(0));
        let jobs_created = Arc::new(AtomicUsize::new(0));

        let factory = {
            let gate = gate.clone();
            let jobs_created = jobs_created.clone();
            move || -> Box<dyn SyncJob> {
                jobs_created.fetch_add(1, Ordering::SeqCst);
                Box::new(GatedJob {
                    gate: gate.clone(),
                    steps: 2,
                })
            }
        };

        let coordinator = Arc::new(SyncLifecycleCoordinator::new(
            session.clone(),
            Arc::new(factory),
            notifier.clone(),
            &settings,
            Handle::current(),
        ));

        Fixture {
            coordinator,
            session,
            notifier,
            gate,
            jobs_created,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Settings::default())
    }

    fn login(session: &Session) {
        session.set_current_user(Some(User::new("field-worker")));
    }

    fn visibility(menu: &OptionsMenu) -> (bool, bool) {
        (
            menu.item(SYNC_ALL_INDEX).unwrap().is_visible(),
            menu.item(CANCEL_SYNC_INDEX).unwrap().is_visible(),
        )
    }

    #[tokio::test]
    async fn test_menu_hidden_when_not_logged_in() {
        let f = fixture();
        let shell = ShellHandle::new();
        let mut menu = OptionsMenu::new();

        assert!(!f.coordinator.on_menu_build(&shell, &mut menu));
        assert!(menu.visible_actions().is_empty());

        f.session.registry().set(Arc::new(SyncTaskHandle::new(None)));
        let mut menu = OptionsMenu::new();
        assert!(!f.coordinator.on_menu_build(&shell, &mut menu));
        assert!(menu.visible_actions().is_empty());
        assert!(f.coordinator.menu_state().is_none());
    }

    #[tokio::test]
    async fn test_menu_rendered_when_logged_in() {
        let f = fixture();
        login(&f.session);
        let shell = ShellHandle::new();
        let mut menu = OptionsMenu::new();

        assert!(f.coordinator.on_menu_build(&shell, &mut menu));
        assert!(menu.item(2).unwrap().is_visible());
    }

    #[tokio::test]
    async fn test_menu_follows_registry() {
        let f = fixture();
        login(&f.session);
        let shell = ShellHandle::new();
        let mut menu = OptionsMenu::new();

        f.session.registry().set(Arc::new(SyncTaskHandle::new(None)));
        f.coordinator.on_menu_build(&shell, &mut menu);
        assert_eq!(visibility(&menu), (false, true));

        f.session.registry().clear();
        f.coordinator.on_menu_build(&shell, &mut menu);
        assert_eq!(visibility(&menu), (true, false));
    }

    #[tokio::test]
    async fn test_menu_build_rebinds_context() {
        let f = fixture();
        login(&f.session);
        let task = Arc::new(SyncTaskHandle::new(None));
        f.session.registry().set(task.clone());

        let shell = ShellHandle::new();
        f.coordinator.on_menu_build(&shell, &mut OptionsMenu::new());

        assert_eq!(task.bound_context(), Some(shell.shell_id()));
    }

    #[tokio::test]
    async fn test_recreated_shell_keeps_running_sync() {
        let f = fixture();
        login(&f.session);
        let first = ShellHandle::new();

        let ActionOutcome::SyncStarted(id) = f.coordinator.on_menu_action(&first, MenuAction::StartSyncAll)
        else {
            panic!("sync should start");
        };

        let second = ShellHandle::new();
        let mut menu = OptionsMenu::new();
        f.coordinator.on_menu_build(&second, &mut menu);
        f.coordinator.on_menu_build(&second, &mut menu);

        let task = f.session.registry().get().unwrap();
        assert_eq!(task.id(), id);
        assert_eq!(task.bound_context(), Some(second.shell_id()));
        assert_eq!(visibility(&menu), (false, true));
        assert_eq!(f.jobs_created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_sync_cancels_and_clears() {
        let f = fixture();
        let task = Arc::new(SyncTaskHandle::new(None));
        f.session.registry().set(task.clone());
        let shell = ShellHandle::new();

        let outcome = f.coordinator.on_menu_action(&shell, MenuAction::CancelSyncAll);

        assert_eq!(outcome, ActionOutcome::SyncCancelled(task.id()));
        assert!(task.is_cancelled());
        assert!(f.session.registry().get().is_none());
    }

    #[tokio::test]
    async fn test_cancel_without_task_is_noop() {
        let f = fixture();
        let shell = ShellHandle::new();

        let outcome = f.coordinator.on_menu_action(&shell, MenuAction::CancelSyncAll);

        assert_eq!(outcome, ActionOutcome::NothingToCancel);
        assert!(f.session.registry().get().is_none());
    }

    #[tokio::test]
    async fn test_double_cancel_cancels_once() {
        let f = fixture();
        let task = Arc::new(SyncTaskHandle::new(None));
        f.session.registry().set(task.clone());
        let shell = ShellHandle::new();

        let first = f.coordinator.on_menu_action(&shell, MenuAction::CancelSyncAll);
        let second = f.coordinator.on_menu_action(&shell, MenuAction::CancelSyncAll);

        assert_eq!(first, ActionOutcome::SyncCancelled(task.id()));
        assert_eq!(second, ActionOutcome::NothingToCancel);
        // The handle reports a second cancel as a repeat
        assert!(!task.cancel(false));
    }

    #[tokio::test]
    async fn test_start_while_running_keeps_handle() {
        let f = fixture();
        login(&f.session);
        let shell = ShellHandle::new();

        let started = f.coordinator.on_menu_action(&shell, MenuAction::StartSyncAll);
        let first = f.session.registry().get().unwrap();
        let again = f.coordinator.on_menu_action(&shell, MenuAction::StartSyncAll);

        assert_eq!(started, ActionOutcome::SyncStarted(first.id()));
        assert_eq!(again, ActionOutcome::AlreadySyncing(first.id()));
        assert!(Arc::ptr_eq(&f.session.registry().get().unwrap(), &first));
        assert_eq!(f.jobs_created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_requires_login() {
        let f = fixture();
        let shell = ShellHandle::new();

        let outcome = f.coordinator.on_menu_action(&shell, MenuAction::StartSyncAll);

        assert_eq!(outcome, ActionOutcome::NotAuthenticated);
        assert!(!f.session.registry().is_occupied());
    }

    #[tokio::test]
    async fn test_completion_returns_menu_to_idle() {
        let f = fixture();
        login(&f.session);
        let mut events = f.coordinator.take_events().unwrap();
        let shell = ShellHandle::new();

        f.coordinator.on_menu_action(&shell, MenuAction::StartSyncAll);
        assert_eq!(f.coordinator.menu_state(), Some(MenuState::for_task(true)));

        f.gate.add_permits(2);
        let last = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await {
                    Some(event) if event.is_terminal() => break Some(event),
                    Some(_) => continue,
                    None => break None,
                }
            }
        })
        .await
        .expect("sync should finish");

        // The slot is cleared before the terminal event goes out
        assert!(matches!(last, Some(SyncEvent::Completed { .. })));
        assert_eq!(f.coordinator.menu_state(), Some(MenuState::for_task(false)));
        assert!(f.session.registry().dialog().is_none());
    }

    #[tokio::test]
    async fn test_network_loss_cancels_dialog_task_and_toasts_once() {
        let f = fixture();
        let dialog = Arc::new(DialogTask::new("upload"));
        f.session.registry().set_dialog(dialog.clone());

        f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: false });
        f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: false });

        assert!(dialog.is_cancelled());
        assert_eq!(f.notifier.latest().as_deref(), Some(NETWORK_DOWN));
        assert_eq!(f.notifier.count(NETWORK_DOWN), 1);
    }

    #[tokio::test]
    async fn test_connected_event_is_noop() {
        let f = fixture();
        let dialog = Arc::new(DialogTask::new("upload"));
        f.session.registry().set_dialog(dialog.clone());

        f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: true });

        assert!(!dialog.is_cancelled());
        assert!(f.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_network_loss_without_dialog_task_is_silent() {
        let f = fixture();
        let task = Arc::new(SyncTaskHandle::new(None));
        f.session.registry().set(task.clone());

        f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: false });

        assert!(!task.is_cancelled());
        assert!(f.session.registry().is_occupied());
        assert!(f.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_network_loss_stops_dialog_bound_sync() {
        let f = fixture();
        login(&f.session);
        let shell = ShellHandle::new();

        f.coordinator.on_menu_action(&shell, MenuAction::StartSyncAll);
        let task = f.session.registry().get().unwrap();

        f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: false });

        assert!(task.is_cancelled());
        assert_eq!(f.coordinator.menu_state(), Some(MenuState::for_task(false)));
        assert_eq!(f.notifier.count(NETWORK_DOWN), 1);

        // The worker finishes its step and must not bring the task back
        f.gate.add_permits(1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!f.session.registry().is_occupied());
    }

    #[tokio::test]
    async fn test_sync_without_dialog_survives_network_loss() {
        let mut settings = Settings::default();
        settings.sync.show_progress_dialog = false;
        let f = fixture_with(settings);
        login(&f.session);
        let shell = ShellHandle::new();

        f.coordinator.on_menu_action(&shell, MenuAction::StartSyncAll);
        f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: false });

        let task = f.session.registry().get().unwrap();
        assert!(!task.is_cancelled());
        assert!(f.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_logout_finishes_shell() {
        let f = fixture();
        login(&f.session);
        let shell = ShellHandle::new();

        let outcome = f.coordinator.on_menu_action(&shell, MenuAction::Logout);

        assert_eq!(outcome, ActionOutcome::Logout(LogoutOutcome::Finished));
        assert!(shell.is_finishing());
        assert!(!f.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_without_user_keeps_shell() {
        let f = fixture();
        let shell = ShellHandle::new();

        assert_eq!(f.coordinator.on_logout(&shell), LogoutOutcome::NotLoggedIn);
        assert!(!shell.is_finishing());
    }

    #[tokio::test]
    async fn test_logout_during_sync_asks_first() {
        let f = fixture();
        login(&f.session);
        let shell = ShellHandle::new();
        let task = Arc::new(SyncTaskHandle::new(None));
        f.session.registry().set(task.clone());

        assert_eq!(f.coordinator.on_logout(&shell), LogoutOutcome::ConfirmationRequired);
        assert!(!shell.is_finishing());
        assert!(!task.is_cancelled());
        assert_eq!(f.notifier.latest().as_deref(), Some(SYNC_IN_PROGRESS));

        assert_eq!(f.coordinator.confirm_logout(&shell), LogoutOutcome::Finished);
        assert!(shell.is_finishing());
        assert!(task.is_cancelled());
        assert!(f.session.registry().get().is_none());
    }

    #[tokio::test]
    async fn test_logout_during_sync_without_confirmation() {
        let mut settings = Settings::default();
        settings.session.confirm_logout_during_sync = false;
        let f = fixture_with(settings);
        login(&f.session);
        let shell = ShellHandle::new();
        let task = Arc::new(SyncTaskHandle::new(None));
        f.session.registry().set(task.clone());

        assert_eq!(f.coordinator.on_logout(&shell), LogoutOutcome::Finished);
        assert!(task.is_cancelled());
        assert!(f.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_menu_invariant_over_action_sequence() {
        let f = fixture();
        login(&f.session);
        let shell = ShellHandle::new();
        let mut menu = OptionsMenu::new();

        let steps = [
            MenuAction::CancelSyncAll,
            MenuAction::StartSyncAll,
            MenuAction::StartSyncAll,
            MenuAction::CancelSyncAll,
            MenuAction::CancelSyncAll,
            MenuAction::StartSyncAll,
        ];
        for action in steps {
            f.coordinator.on_menu_action(&shell, action);
            f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: true });
            assert!(f.coordinator.on_menu_build(&shell, &mut menu));
            let (sync_all, cancel) = visibility(&menu);
            assert_eq!(sync_all, !cancel);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cancel_paths_cancel_once() {
        for _ in 0..50 {
            let f = fixture();
            let task = Arc::new(SyncTaskHandle::new(None));
            f.session.registry().set(task.clone());
            f.session.registry().set_dialog(task.clone());

            let by_user = {
                let coordinator = f.coordinator.clone();
                tokio::spawn(async move {
                    coordinator.on_menu_action(&ShellHandle::new(), MenuAction::CancelSyncAll)
                })
            };
            let by_network = {
                let coordinator = f.coordinator.clone();
                tokio::spawn(async move {
                    coordinator.on_connectivity_event(ConnectivityEvent { is_connected: false })
                })
            };
            by_user.await.unwrap();
            by_network.await.unwrap();

            assert!(task.is_cancelled());
            assert!(f.session.registry().get().is_none());
            assert!(f.session.registry().dialog().is_none());
            assert!(f.notifier.count(NETWORK_DOWN) <= 1);
        }
    }

    #[tokio::test]
    async fn test_network_loss_ignores_cancelled_dialog_task() {
        let f = fixture();
        let dialog = Arc::new(DialogTask::new("upload"));
        f.coordinator.bind_dialog(dialog.clone()).unwrap();
        dialog.cancel();

        f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: false });

        assert!(f.notifier.messages().is_empty());
        assert!(f.session.registry().dialog().is_none());
    }

    #[tokio::test]
    async fn test_released_dialog_task_survives_network_loss() {
        let f = fixture();
        let dialog = Arc::new(DialogTask::new("upload"));
        f.coordinator.bind_dialog(dialog.clone()).unwrap();

        assert!(f.coordinator.release_dialog(dialog.id()));
        assert!(!f.coordinator.release_dialog(dialog.id()));
        f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: false });

        assert!(!dialog.is_cancelled());
        assert!(f.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_run_dialog_releases_on_completion() {
        let f = fixture();

        let value = f.coordinator.run_dialog("upload", async { Ok(7) }).await.unwrap();
        f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: false });

        assert_eq!(value, 7);
        assert!(f.session.registry().dialog().is_none());
        assert!(f.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_run_dialog_cancelled_by_network_loss() {
        let f = fixture();
        let running = {
            let coordinator = f.coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .run_dialog("upload", std::future::pending::<Result<(), SyncError>>())
                    .await
            })
        };

        for _ in 0..100 {
            if f.session.registry().dialog().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        f.coordinator.on_connectivity_event(ConnectivityEvent { is_connected: false });

        let result = tokio::time::timeout(Duration::from_secs(1), running)
            .await
            .expect("dialog should end")
            .unwrap();
        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert!(f.session.registry().dialog().is_none());
        assert_eq!(f.notifier.count(NETWORK_DOWN), 1);
    }

    #[tokio::test]
    async fn test_run_dialog_refused_while_sync_holds_dialog() {
        let f = fixture();
        login(&f.session);
        let shell = ShellHandle::new();
        let ActionOutcome::SyncStarted(id) = f.coordinator.on_menu_action(&shell, MenuAction::StartSyncAll)
        else {
            panic!("sync should start");
        };

        let result = f.coordinator.run_dialog("upload", async { Ok(()) }).await;

        assert!(matches!(result, Err(SyncError::Busy(busy)) if busy == id));
        assert_eq!(f.session.registry().dialog().unwrap().id(), id);
    }

    #[tokio::test]
    async fn test_started_sync_is_bound_to_dialog() {
        let f = fixture();
        login(&f.session);
        let shell = ShellHandle::new();

        f.coordinator.on_menu_action(&shell, MenuAction::StartSyncAll);

        let registry = f.session.registry();
        assert_eq!(registry.dialog().unwrap().id(), registry.get().unwrap().id());
    }
}

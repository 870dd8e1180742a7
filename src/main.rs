//! FieldSync: headless driver for the sync lifecycle
//!
//! Reads shell commands from stdin so the coordinator can be exercised
//! without a device:
//! `login <name>`, `sync`, `cancel`, `upload <record>`, `offline`, `online`,
//! `garbage`, `rotate`, `menu`, `logout`, `confirm-logout`, `quit`.
//! Menu item ids (`synchronize_all`, ...) are accepted as well.

use anyhow::Result;
use fieldsync::services::{
    ConnectivityMonitor, DesktopNotifier, MemoryNotifier, NotificationPayload, ServiceManager,
    UserNotifier,
};
use fieldsync::settings::{self, SettingsRepository};
use fieldsync::sync::{PendingRecordsJob, RecordUploader, SyncError, SyncJob};
use fieldsync::ui::MenuAction;
use fieldsync::{FieldApp, Session, SyncLifecycleCoordinator, User};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const UPLOAD_LATENCY: Duration = Duration::from_millis(400);

/// Stand-in transport that only takes time
struct SimulatedUploader {
    latency: Duration,
}

impl RecordUploader for SimulatedUploader {
    fn upload<'a>(&'a self, record_id: &'a str) -> BoxFuture<'a, Result<(), SyncError>> {
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;
            tracing::info!("Uploaded {}", record_id);
            Ok(())
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fieldsync=debug,warn")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FieldSync v{}", env!("CARGO_PKG_VERSION"));

    let data_dir = settings::data_dir()?;
    let settings = SettingsRepository::new(&data_dir).get().clone();

    let notifier: Arc<dyn UserNotifier> = if std::env::args().any(|a| a == "--desktop") {
        Arc::new(DesktopNotifier::new(settings.notifications.clone()))
    } else {
        Arc::new(MemoryNotifier::new())
    };

    let uploader: Arc<dyn RecordUploader> = Arc::new(SimulatedUploader {
        latency: UPLOAD_LATENCY,
    });
    let jobs = {
        let uploader = uploader.clone();
        let step_delay = Duration::from_millis(settings.sync.step_delay_ms);
        move || -> Box<dyn SyncJob> {
            let records = (1..=10).map(|i| format!("record-{}", i)).collect();
            Box::new(PendingRecordsJob::new(records, uploader.clone()).with_step_delay(step_delay))
        }
    };

    let session = Session::shared();
    let monitor = ConnectivityMonitor::shared();
    let coordinator = Arc::new(SyncLifecycleCoordinator::new(
        session.clone(),
        Arc::new(jobs),
        notifier,
        &settings,
        Handle::current(),
    ));

    let mut services = ServiceManager::new();
    services.start(monitor.clone())?;
    let connectivity = services.connectivity_sender();

    let mut app = FieldApp::create(coordinator.clone(), &monitor);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        app.process_events();

        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };

        match command {
            "login" => {
                let name = parts.next().unwrap_or("field-worker");
                session.set_current_user(Some(User::new(name)));
                app.on_create_options_menu();
            }
            "upload" => {
                let record = parts.next().unwrap_or("record-1").to_string();
                let coordinator = coordinator.clone();
                let uploader = uploader.clone();
                tokio::spawn(async move {
                    let result = coordinator.run_dialog("upload", uploader.upload(&record)).await;
                    println!("upload {}: {:?}", record, result);
                });
            }
            "confirm-logout" => println!("{:?}", app.confirm_logout()),
            "offline" => connectivity.send(NotificationPayload::network_change(false))?,
            "online" => connectivity.send(NotificationPayload::network_change(true))?,
            "garbage" => connectivity.send(NotificationPayload::new())?,
            "rotate" => app = app.recreate(&monitor),
            "menu" => {}
            "quit" => break,
            other => match menu_action(other) {
                Some(action) => println!("{:?}", app.on_options_item_selected(action)),
                None => {
                    println!("Unknown command: {}", other);
                    continue;
                }
            },
        }

        // Give the connectivity pump a chance to run before rendering
        tokio::task::yield_now().await;
        app.process_events();
        print_menu(&app);

        if app.is_finishing() {
            println!("Shell finished");
            break;
        }
    }

    services.shutdown().await?;
    Ok(())
}

/// Short command names map onto menu item ids
fn menu_action(command: &str) -> Option<MenuAction> {
    let id = match command {
        "sync" => MenuAction::StartSyncAll.id(),
        "cancel" => MenuAction::CancelSyncAll.id(),
        other => other,
    };
    MenuAction::from_id(id)
}

fn print_menu(app: &FieldApp) {
    if !app.is_menu_visible() {
        println!("[menu hidden]");
        return;
    }

    let items: Vec<&str> = app
        .menu()
        .items()
        .iter()
        .filter(|item| item.is_visible())
        .map(|item| item.title())
        .collect();
    match app.progress() {
        Some(p) => println!("[{}] syncing {}/{}", items.join(" | "), p.completed, p.total),
        None => println!("[{}]", items.join(" | ")),
    }
}

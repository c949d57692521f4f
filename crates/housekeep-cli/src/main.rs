use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use housekeep_core::app::{App, AppBuilder, CaptureBridge, CoreConfig};
use housekeep_core::domain::{
    Answer, ProgressError, Step, StepId, StepKind, Task, TaskDraft, TaskStatus, Template,
    TemplateStep,
};
use housekeep_core::impls::{
    CollectingNotifier, InMemoryMediaStore, InMemoryTaskStore, ScriptedHost, ScriptedPicker,
};
use housekeep_core::ports::{
    Clock, IdGenerator, SystemClock, TaskStore, TemplateStore, UlidGenerator,
};

#[derive(Parser, Debug)]
#[command(name = "housekeep", version, about = "Housekeeping checklist core, driven from the terminal")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk a task from a template through check / uncheck / comment / complete
    Progress,
    /// Take a step photo through a simulated native camera
    Capture {
        #[arg(long, value_enum, default_value_t = HostReply::Photo)]
        reply: HostReply,
    },
}

/// How the simulated host answers the capture request.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum HostReply {
    Photo,
    Empty,
    Cancel,
    Error,
    /// never answers; the bridge times out
    Silent,
}

#[derive(Serialize)]
struct Line<'a> {
    op: &'a str,
    status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn print_line(op: &str, status: TaskStatus, detail: Option<String>) -> Result<()> {
    let line = serde_json::to_string(&Line { op, status, detail }).context("encode output line")?;
    println!("{line}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = load_config(args.config_path.as_ref())?;
    info!(
        timeout_ms = config.capture.timeout_ms,
        max_upload_bytes = config.capture.max_upload_bytes,
        "configuration loaded"
    );

    match args.command {
        Command::Progress => run_progress(config).await,
        Command::Capture { reply } => run_capture(config, reply).await,
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<CoreConfig> {
    match path {
        Some(path) => CoreConfig::from_file(path)
            .with_context(|| format!("load config from {}", path.display())),
        None => Ok(CoreConfig::default()),
    }
}

struct Demo {
    app: App,
    store: Arc<InMemoryTaskStore>,
    notifier: Arc<CollectingNotifier>,
}

fn build_demo(config: CoreConfig, host: Arc<ScriptedHost>) -> Result<Demo> {
    let store = Arc::new(InMemoryTaskStore::new());
    let notifier = Arc::new(CollectingNotifier::new());
    let app = AppBuilder::new()
        .store(store.clone())
        .media_store(Arc::new(InMemoryMediaStore::new()))
        .picker(Arc::new(ScriptedPicker::new()))
        .capture_host(host)
        .notifier(notifier.clone())
        .config(config)
        .build()
        .context("build app")?;
    Ok(Demo {
        app,
        store,
        notifier,
    })
}

async fn run_progress(config: CoreConfig) -> Result<()> {
    let demo = build_demo(config, Arc::new(ScriptedHost::without_native()))?;
    let ids = UlidGenerator::new(SystemClock);

    let template = Template {
        id: ids.generate_template_id(),
        title: "Turnover clean".to_string(),
        description: None,
        location: Some("Room 204".to_string()),
        department: Some("housekeeping".to_string()),
        steps: vec![
            template_step("Make the bed", StepKind::Checkbox, 0),
            template_step("Minibar restocked?", StepKind::YesNo, 1),
            TemplateStep {
                optional: true,
                ..template_step("Water the plants", StepKind::Checkbox, 2)
            },
        ],
    };
    demo.store
        .save_template(&template)
        .await
        .context("save template")?;

    let progress = demo.app.progress();
    let task = progress
        .create_from_template(template.id, TaskDraft::default())
        .await
        .context("create task")?;
    print_line("create", task.status(), Some(task.title.clone()))?;
    let [bed, minibar, plants] = step_ids::<3>(&task)?;

    let status = progress.set_checkbox(task.id, bed, true).await?;
    print_line("check bed", status, None)?;
    let status = progress.set_checkbox(task.id, bed, false).await?;
    print_line("uncheck bed", status, None)?;

    let status = progress
        .save_comment(task.id, plants, "two pots missing")
        .await?;
    print_line("comment plants", status, None)?;
    let status = progress.set_checkbox(task.id, bed, true).await?;
    print_line("check bed", status, None)?;

    match progress.mark_complete(task.id).await {
        Err(ProgressError::Incomplete { unsatisfied, .. }) => {
            print_line(
                "complete",
                status,
                Some(format!("{} required step(s) open", unsatisfied.len())),
            )?;
        }
        other => warn!(result = ?other, "expected the minibar step to block completion"),
    }

    let status = progress.answer(task.id, minibar, Answer::No).await?;
    print_line("answer minibar", status, Some("no".to_string()))?;
    let completed_at = progress.mark_complete(task.id).await?;
    let task = demo.store.load_task(task.id).await?;
    print_line("complete", task.status(), Some(completed_at.to_rfc3339()))?;

    // completed tasks stay completed
    let status = progress.set_checkbox(task.id, bed, false).await?;
    print_line("uncheck bed", status, None)?;
    Ok(())
}

async fn run_capture(config: CoreConfig, reply: HostReply) -> Result<()> {
    let host = Arc::new(ScriptedHost::new());
    let demo = build_demo(config, host)?;
    let ids = UlidGenerator::new(SystemClock);

    let steps = vec![
        Step::new(ids.generate_step_id(), "Bathroom mirror", StepKind::Checkbox)
            .requires_photo(true),
    ];
    let task = Task::new(
        ids.generate_task_id(),
        TaskDraft {
            title: "Inspection".to_string(),
            location: "Room 310".to_string(),
            ..Default::default()
        },
        SystemClock.now(),
        steps,
    );
    demo.store.insert_task(&task).await.context("seed task")?;

    let responder = tokio::spawn(answer_host(demo.app.bridge().clone(), reply));
    let result = demo
        .app
        .capture_step_photo(task.id, task.steps[0].id)
        .await;
    responder.await.context("host responder")?;

    let loaded = demo.store.load_task(task.id).await?;
    match result {
        Ok(Some(status)) => print_line("capture", status, loaded.steps[0].photo_url.clone())?,
        Ok(None) => print_line("capture", loaded.status(), Some("no photo".to_string()))?,
        Err(err) => print_line("capture", loaded.status(), Some(err.to_string()))?,
    }
    for notice in demo.notifier.take() {
        println!(
            "{}",
            serde_json::to_string(&notice).context("encode notice")?
        );
    }
    Ok(())
}

/// Plays the native side: waits for the request, then answers it.
async fn answer_host(bridge: Arc<CaptureBridge>, reply: HostReply) {
    let mut request_id = None;
    for _ in 0..500 {
        if let Some(id) = bridge.pending_ids().last().copied() {
            request_id = Some(id.to_string());
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    let Some(request_id) = request_id else {
        warn!("no capture request reached the host");
        return;
    };

    let resolved = match reply {
        HostReply::Photo => {
            let payload = format!("data:image/jpeg;base64,{}", STANDARD.encode(fake_jpeg()));
            bridge.on_capture_success(&request_id, &payload, "mirror.jpg", "image/jpeg")
        }
        HostReply::Empty => bridge.on_capture_success(&request_id, "", "mirror.jpg", "image/jpeg"),
        HostReply::Cancel => bridge.on_capture_error(&request_id, "CANCELLED", "user closed the camera"),
        HostReply::Error => bridge.on_capture_error(&request_id, "CAMERA_BUSY", "camera in use"),
        HostReply::Silent => return,
    };
    info!(request_id = %request_id, resolved, "host answered");
}

fn template_step(title: &str, kind: StepKind, position: u32) -> TemplateStep {
    TemplateStep {
        title: title.to_string(),
        kind,
        optional: false,
        requires_photo: false,
        position,
    }
}

fn step_ids<const N: usize>(task: &Task) -> Result<[StepId; N]> {
    let ids: Vec<_> = task.steps.iter().map(|s| s.id).collect();
    ids.try_into()
        .map_err(|ids: Vec<_>| anyhow!("expected {N} steps, got {}", ids.len()))
}

fn fake_jpeg() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend(std::iter::repeat_n(0x42, 2048));
    bytes.extend([0xFF, 0xD9]);
    bytes
}

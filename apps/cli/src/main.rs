use std::{
    io::IsTerminal,
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use client_core::{
    AuthMode, ControllerError, HttpRemoteClient, ViewController, ViewEvent, ViewState,
};
use shared::{
    domain::TaskId,
    protocol::{Credentials, RegistrationProfile, TaskDraft},
};
use storage::FileStore;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::load_settings;
use render::{render, render_whoami, Screen};

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Command-line client for the ToDo task API")]
struct Args {
    /// Base URL of the task API, e.g. http://127.0.0.1:5000/api
    #[arg(long)]
    server_url: Option<String>,
    /// File holding the persisted session
    #[arg(long)]
    storage_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the current task list
    List,
    /// Print the logged-in user's name and id
    Whoami,
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    #[command(group(
        ArgGroup::new("changes")
            .required(true)
            .multiple(true)
            .args(["title", "description", "completed"])
    ))]
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Mark a task completed
    Done { id: i64 },
    /// Mark a task not completed
    Undone { id: i64 },
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings().with_overrides(args.server_url, args.storage_path);
    let remote = Arc::new(HttpRemoteClient::with_timeout(
        &settings.server_url,
        settings.request_timeout(),
    )?);
    let storage = Arc::new(FileStore::new(&settings.storage_path));
    let mut view = ViewController::new(remote, storage);

    let indicator = std::io::stderr()
        .is_terminal()
        .then(|| spawn_loading_indicator(&view));

    let whoami = matches!(args.command, Command::Whoami);
    view.start().await;
    let result = run_command(&mut view, args.command).await;

    match view.user() {
        Some(user) if whoami && result.is_ok() => print!("{}", render_whoami(user)),
        _ => print!("{}", render(&Screen::capture(&view))),
    }

    let code = match result {
        Err(err) if err.is_precondition() => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
        _ if view.error().is_some() => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    };

    drop(view);
    if let Some(indicator) = indicator {
        let _ = indicator.await;
    }
    Ok(code)
}

async fn run_command(view: &mut ViewController, command: Command) -> Result<(), ControllerError> {
    match command {
        Command::Login { email, password } => {
            view.set_auth_mode(AuthMode::Login);
            view.login(&Credentials::new(email, password)).await
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            view.set_auth_mode(AuthMode::Register);
            view.register(&RegistrationProfile {
                name,
                identifier: email,
                secret: password,
            })
            .await
        }
        Command::Logout => {
            view.logout();
            Ok(())
        }
        // start() already restored the session and loaded its list.
        Command::List | Command::Whoami => require_login(view),
        Command::Add { title, description } => view
            .add_task(&TaskDraft {
                title: Some(title),
                description,
                completed: None,
            })
            .await
            .map(|_| ()),
        Command::Update {
            id,
            title,
            description,
            completed,
        } => view
            .update_task(
                TaskId(id),
                &TaskDraft {
                    title,
                    description,
                    completed,
                },
            )
            .await
            .map(|_| ()),
        Command::Done { id } => view
            .update_task(TaskId(id), &TaskDraft::completion(true))
            .await
            .map(|_| ()),
        Command::Undone { id } => view
            .update_task(TaskId(id), &TaskDraft::completion(false))
            .await
            .map(|_| ()),
        Command::Delete { id } => view.delete_task(TaskId(id)).await,
    }
}

fn require_login(view: &ViewController) -> Result<(), ControllerError> {
    if view.is_logged_in() {
        Ok(())
    } else {
        Err(ControllerError::NotAuthenticated)
    }
}

fn spawn_loading_indicator(view: &ViewController) -> tokio::task::JoinHandle<()> {
    let mut events = view.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event == ViewEvent::StateChanged(ViewState::Loading) {
                eprintln!("Loading...");
            }
        }
    })
}

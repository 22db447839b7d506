use std::fmt::Write as _;

use client_core::{AuthMode, ViewController, ViewState};
use shared::domain::{Task, UserProfile};

/// Everything the terminal view needs, detached from the controller.
pub struct Screen<'a> {
    pub state: ViewState,
    pub user: Option<&'a UserProfile>,
    pub error: Option<&'a str>,
    pub tasks: &'a [Task],
}

impl<'a> Screen<'a> {
    pub fn capture(view: &'a ViewController) -> Self {
        Self {
            state: view.state(),
            user: view.user(),
            error: view.error(),
            tasks: view.tasks(),
        }
    }
}

pub fn render(screen: &Screen<'_>) -> String {
    let mut out = String::new();

    if screen.state == ViewState::Loading {
        out.push_str("Loading...\n");
        return out;
    }

    out.push_str("ToDo App\n");
    if let (ViewState::Authenticated, Some(user)) = (screen.state, screen.user) {
        let _ = writeln!(out, "Welcome, {}", user.name);
    }

    if let Some(error) = screen.error {
        let _ = writeln!(out, "! {error}");
    }
    out.push('\n');

    match screen.state {
        ViewState::Unauthenticated { mode } => render_auth_hint(&mut out, mode),
        ViewState::Authenticated => render_tasks(&mut out, screen.tasks),
        ViewState::Loading => {}
    }

    out
}

/// One-line identity summary for `todo whoami`.
pub fn render_whoami(user: &UserProfile) -> String {
    format!("{} (id {})\n", user.name, user.id)
}

fn render_auth_hint(out: &mut String, mode: AuthMode) {
    match mode {
        AuthMode::Login => {
            out.push_str("Log in with: todo login --email <email> --password <password>\n");
            out.push_str("Don't have an account? Register with: todo register\n");
        }
        AuthMode::Register => {
            out.push_str(
                "Register with: todo register --name <name> --email <email> --password <password>\n",
            );
            out.push_str("Already have an account? Log in with: todo login\n");
        }
    }
}

fn render_tasks(out: &mut String, tasks: &[Task]) {
    if tasks.is_empty() {
        out.push_str("No tasks yet.\n");
        return;
    }

    let width = tasks
        .iter()
        .map(|task| task.id.to_string().len())
        .max()
        .unwrap_or(1);
    for task in tasks {
        let mark = if task.completed { 'x' } else { ' ' };
        let _ = writeln!(out, "[{mark}] {:>width$}  {}", task.id, task.title);
        if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "    {:width$}  {description}", "");
        }
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;

//! Terminal dashboard for binli showing live bin fill levels and the compliance score.
//!
//! The server address comes from the first argument, then `BINLI_URL`, then
//! `http://127.0.0.1:8080`.

mod app;
mod input;
mod ui;

use std::{env, io, sync::Arc, time::Duration as StdDuration};

use anyhow::Result;
use binli_client::{BinliClient, DEFAULT_BASE_URL};
use binli_core::DashboardUpdate;
use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tokio::sync::mpsc;

use crate::app::{App, Watcher, distance_for_fill};
use crate::input::Action;

#[tokio::main]
async fn main() -> Result<()> {
    // HTTP + collaborator setup
    let base_url = env::args()
        .nth(1)
        .or_else(|| env::var("BINLI_URL").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
    let client = Client::builder().user_agent("binli/0.1").build()?;
    let client = Arc::new(BinliClient::new(client, base_url));

    // App state
    let app = App::new(client);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

async fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel::<DashboardUpdate>();
    // Dropped on every exit path below, which aborts the subscription.
    let mut watcher = Watcher::spawn(&app.model, updates_tx.clone());

    loop {
        // Apply everything the change feed delivered since the last frame
        while let Ok(update) = updates_rx.try_recv() {
            app.apply(update);
        }

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if !event::poll(StdDuration::from_millis(100))? {
            continue;
        }
        let CEvent::Key(key) = event::read()? else {
            continue;
        };

        match input::handle_key_event(key, &mut app) {
            Action::Quit => break,
            Action::None => {}
            Action::Refresh => {
                app.is_loading = true;
                app.info_message = None;
                terminal.draw(|frame| ui::draw(frame, &app))?;

                let res = app.model.refresh(Utc::now()).await;

                app.is_loading = false;
                match res {
                    Ok(()) => {
                        app.error_message = None;
                        if watcher.is_finished() {
                            watcher = Watcher::spawn(&app.model, updates_tx.clone());
                            app.info_message = Some("Reconnected".into());
                        }
                    }
                    Err(err) => {
                        app.error_message = Some(format!("Refresh failed: {err}"));
                    }
                }
            }
            Action::SimulateTick => {
                let readings = app.simulated_readings();
                let mut failures = Vec::new();
                for (bin_type, distance_cm) in readings {
                    if let Err(err) = app.client.submit_reading(bin_type, distance_cm, None).await {
                        failures.push(format!("{bin_type}: {err}"));
                    }
                }
                if failures.is_empty() {
                    app.info_message = Some("Simulated sensor tick sent".into());
                } else {
                    app.error_message = Some(format!("Simulation failed ({})", failures.join("; ")));
                }
            }
            Action::EmptySelected => {
                let Some(bin_type) = app.selected_bin() else {
                    app.error_message = Some("No bin selected".into());
                    continue;
                };

                match app
                    .client
                    .submit_reading(bin_type, distance_for_fill(0.0), None)
                    .await
                {
                    Ok(record) => app.info_message = Some(record.summary()),
                    Err(err) => {
                        app.error_message = Some(format!("Failed to report {bin_type} as emptied: {err}"));
                    }
                }
            }
        }

        if app.is_disconnected() && app.error_message.is_none() {
            app.error_message = Some("Disconnected · press r to reconnect".into());
        }
    }

    Ok(())
}

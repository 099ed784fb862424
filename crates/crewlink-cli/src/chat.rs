//! Interactive chat loop and the query runner shared with one-shot mode

use std::path::{Path, PathBuf};

use console::style;
use crewlink_core::{ChatClient, ClientEvent};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;

use crate::render::Renderer;

/// Submit `query` and render its stream until it stops. Ctrl+C acts as
/// `/clear`: the live stream is cancelled and the response cleared.
pub async fn run_query(
    client: &ChatClient,
    renderer: &mut Renderer,
    rx: &mut Receiver<ClientEvent>,
    query: &str,
) -> anyhow::Result<()> {
    let handle = client.submit_query(query).await?;
    let finish = handle.finish();
    tokio::pin!(finish);

    loop {
        tokio::select! {
            result = &mut finish => {
                renderer.drain(rx);
                return result.map_err(Into::into);
            }
            event = rx.recv() => match event {
                Ok(event) => renderer.handle(event),
                Err(RecvError::Lagged(n)) => tracing::warn!("Display fell behind, skipped {} events", n),
                Err(RecvError::Closed) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                client.clear_response();
                renderer.drain(rx);
                println!("{}", style("Interrupted").yellow());
                return Ok(());
            }
        }
    }
}

pub async fn run_chat(client: ChatClient, download_dir: PathBuf) -> anyhow::Result<()> {
    let mut rx = client.subscribe();
    let mut renderer = Renderer::new();

    println!("{}", style("Crewlink").bold().cyan());
    println!("{}", style("Type a question, /help for commands, /quit to exit").dim());
    println!();

    client.initialize().await;
    renderer.drain(&mut rx);

    let mut editor = DefaultEditor::new()?;
    loop {
        // The line editor blocks; keep the runtime's other workers going
        let line = match tokio::task::block_in_place(|| editor.readline("you> ")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        if let Some(command) = input.strip_prefix('/') {
            match handle_command(&client, command, &download_dir).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => println!("{}", style(format!("Error: {}", e)).red()),
            }
            // Commands can rotate the session or refresh the listing
            renderer.drain(&mut rx);
            continue;
        }

        if let Err(e) = run_query(&client, &mut renderer, &mut rx, input).await {
            println!("{}", style(format!("Error: {}", e)).red());
        }
        println!();
    }

    Ok(())
}

/// Run one slash command; returns true when the loop should exit
async fn handle_command(client: &ChatClient, command: &str, download_dir: &Path) -> anyhow::Result<bool> {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match name {
        "quit" | "exit" => return Ok(true),
        "help" => print_help(),
        "clear" => {
            client.clear_response();
            println!("{}", style("Response cleared").dim());
        }
        "session" => {
            let id = client.session_id();
            if id.is_empty() {
                println!("{}", style("No session").dim());
            } else {
                println!("Session: {}", style(id).green());
            }
        }
        "files" => {
            client.refresh_workspace_files().await;
            print_files(client);
        }
        "select" => {
            let number: usize = arg
                .ok_or_else(|| anyhow::anyhow!("usage: /select N"))?
                .parse()
                .map_err(|_| anyhow::anyhow!("usage: /select N"))?;
            let index = number
                .checked_sub(1)
                .ok_or_else(|| anyhow::anyhow!("files are numbered from 1"))?;
            client.select_workspace_file(index)?;
            print_files(client);
        }
        "download" => {
            let dir = arg.map(PathBuf::from).unwrap_or_else(|| download_dir.to_path_buf());
            let target = client.download_workspace_file(&dir).await?;
            println!("{} {}", style("Saved").green(), target.display());
        }
        other => println!("{}", style(format!("Unknown command: /{}", other)).yellow()),
    }
    Ok(false)
}

pub fn print_files(client: &ChatClient) {
    let snapshot = client.snapshot();
    if snapshot.workspace_files.is_empty() {
        println!("{}", style("No workspace files").dim());
        return;
    }

    println!("{}", style("Workspace files:").bold());
    for (i, file) in snapshot.workspace_files.iter().enumerate() {
        let marker = if snapshot.selected_workspace_file == Some(i) { "*" } else { " " };
        println!("  {} {:>3}. {}", style(marker).green(), i + 1, file);
    }
}

fn print_help() {
    println!("{}", style("Commands:").bold());
    println!("  /files          List workspace files");
    println!("  /select N       Select workspace file N");
    println!("  /download [DIR] Download the selected file");
    println!("  /clear          Clear the current response");
    println!("  /session        Show the session id");
    println!("  /quit           Exit");
    println!("  Ctrl+C          While an answer streams: stop it, same as /clear");
}

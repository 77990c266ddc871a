//! Line-oriented incremental search.
//!
//! Each line is a new search text; a blank line fetches the next page of
//! the current one. `:saved [text]` browses the cache, `:q` quits.
//! The session is suspended on every way out: end of input, `:q`, Ctrl-C,
//! and I/O failures on the terminal.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use usersearch_core::{Page, SearchSession};

use crate::commands::{describe_failure, print_outcome, print_users};

const PROMPT: &str = "search> ";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    NextPage,
    Search(String),
    Saved(String),
    Quit,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Input::NextPage;
    }
    match line.trim() {
        ":q" | ":quit" => Input::Quit,
        cmd if cmd == ":saved" || cmd.starts_with(":saved ") => {
            Input::Saved(cmd[":saved".len()..].trim().to_string())
        }
        _ => Input::Search(line.to_string()),
    }
}

/// Current search text and the next page to fetch for it.
struct Cursor {
    text: String,
    next: Page,
    exhausted: bool,
}

async fn prompt<W: AsyncWrite + Unpin>(output: &mut W) -> Result<()> {
    output.write_all(PROMPT.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

async fn handle(session: &SearchSession, input: Input, cursor: &mut Option<Cursor>) {
    match input {
        Input::Search(text) => {
            *cursor = Some(Cursor {
                text,
                next: session.first_page(),
                exhausted: false,
            });
        }
        Input::NextPage => match cursor {
            Some(c) if c.exhausted => {
                println!("No more results");
                return;
            }
            Some(_) => {}
            None => return,
        },
        Input::Saved(text) => {
            match session.browse_saved(&text, session.first_page()).await {
                Ok(outcome) if !outcome.users().is_empty() => print_users(outcome.users(), 0),
                Ok(_) => println!("Nothing cached for \"{}\"", text),
                Err(e) => println!("{}", describe_failure(&e)),
            }
            return;
        }
        Input::Quit => return,
    }

    let Some(c) = cursor.as_mut() else {
        return;
    };
    match session.search(&c.text, c.next).await {
        Ok(outcome) => {
            let shown = print_outcome(&c.text, c.next, &outcome);
            if shown < c.next.fetch_limit() {
                c.exhausted = true;
            } else {
                c.next = c.next.next();
            }
        }
        Err(e) => println!("{}", describe_failure(&e)),
    }
}

async fn read_loop<R, W>(session: &SearchSession, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut cursor: Option<Cursor> = None;

    loop {
        prompt(output).await?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("Interrupted");
                None
            }
        };

        let Some(line) = line else {
            return Ok(());
        };
        let input = parse_input(&line);
        debug!(input = ?input, "Interactive input");
        if input == Input::Quit {
            return Ok(());
        }
        handle(session, input, &mut cursor).await;
    }
}

/// Run the loop over `input`/`output`, then suspend the session whatever
/// the loop returned. A loop error wins over a save error.
pub async fn run_with<R, W>(session: &SearchSession, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = read_loop(session, input, output).await;
    let saved = session.suspend();
    if let Err(ref e) = saved {
        error!(error = %e, "Failed to save deny-list");
    }
    result.and(saved)
}

pub async fn run(session: &SearchSession) -> Result<()> {
    println!("Type a name to search, Enter for the next page, :saved to browse the cache, :q to quit.");
    let mut stdout = tokio::io::stdout();
    run_with(session, BufReader::new(tokio::io::stdin()), &mut stdout).await
}

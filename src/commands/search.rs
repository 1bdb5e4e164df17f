//! `wakepoint search` — interactive destination picker.
//!
//! A minimal line editor over raw-mode input: type a query, and once the
//! input has been quiet for the debounce interval a geocoding request fires.
//! Results are listed with digits for selection; the chosen coordinate is
//! printed on stdout so it can be fed straight back into
//! `wakepoint --dest`. The picker always runs in the idle state, so the
//! debouncer's suppression path is never taken here — it is exercised by the
//! tracking loop's state instead.

use anyhow::{Context, Result};
use crossterm::event::{self as term_event, Event as TermEvent, KeyCode, KeyModifiers};
use std::io::Write;
use std::time::{Duration, Instant};

use crate::logger::Log;
use crate::providers::{Geocoder, SearchDebouncer, SearchResult};
use crate::utils::TerminalGuard;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(debug_enabled: bool) -> Result<()> {
    let geocoder = Geocoder::new().context("failed to initialize geocoder")?;

    // The picker redraws its own lines; block logging would tear the UI.
    Log::set_enabled(false);
    let result = pick(&geocoder, debug_enabled);
    Log::set_enabled(true);

    match result? {
        Some(choice) => {
            println!(
                "{} @ {},{}",
                choice.name, choice.coordinate.latitude, choice.coordinate.longitude
            );
            if let Some(address) = &choice.address {
                println!("  {address}");
            }
            println!(
                "Run: wakepoint --dest \"{},{}\"",
                choice.coordinate.latitude, choice.coordinate.longitude
            );
        }
        None => println!("Cancelled."),
    }
    Ok(())
}

fn pick(geocoder: &Geocoder, _debug_enabled: bool) -> Result<Option<SearchResult>> {
    let _term = TerminalGuard::new().context("failed to initialize terminal")?;

    let mut query = String::new();
    let mut debouncer = SearchDebouncer::new();
    let mut results: Vec<SearchResult> = Vec::new();
    let mut status: Option<String> = None;

    redraw(&query, &results, status.as_deref())?;

    loop {
        // Fire a pending lookup once the input has settled.
        if let Some(ready) = debouncer.poll(Instant::now(), true) {
            status = Some("Searching...".to_string());
            redraw(&query, &results, status.as_deref())?;

            match geocoder.search(&ready) {
                Ok(found) => {
                    status = if found.is_empty() {
                        Some("No locations found".to_string())
                    } else {
                        None
                    };
                    results = found;
                }
                Err(e) => {
                    // Network failure: empty list plus a visible message.
                    results.clear();
                    status = Some(format!("Search failed: {e}"));
                }
            }
            redraw(&query, &results, status.as_deref())?;
        }

        if !term_event::poll(POLL_INTERVAL)? {
            continue;
        }
        let TermEvent::Key(key) = term_event::read()? else {
            continue;
        };

        match key.code {
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None);
            }
            KeyCode::Char(digit @ '1'..='9') if !results.is_empty() => {
                let index = digit as usize - '1' as usize;
                if let Some(choice) = results.get(index) {
                    return Ok(Some(choice.clone()));
                }
            }
            KeyCode::Char(c) => {
                query.push(c);
                debouncer.input(&query, Instant::now());
                redraw(&query, &results, status.as_deref())?;
            }
            KeyCode::Backspace => {
                query.pop();
                debouncer.input(&query, Instant::now());
                if query.is_empty() {
                    results.clear();
                    status = None;
                }
                redraw(&query, &results, status.as_deref())?;
            }
            _ => {}
        }
    }
}

/// Repaint the prompt, result list and status line.
fn redraw(query: &str, results: &[SearchResult], status: Option<&str>) -> Result<()> {
    use crossterm::{cursor, execute, terminal};
    let mut out = std::io::stdout();

    execute!(
        out,
        cursor::MoveTo(0, 0),
        terminal::Clear(terminal::ClearType::All)
    )?;

    write!(out, "Search destination (Esc cancels): {query}\r\n\r\n")?;
    for (index, result) in results.iter().enumerate() {
        write!(out, "  [{}] {}\r\n", index + 1, result.name)?;
        if let Some(address) = &result.address {
            write!(out, "      {address}\r\n")?;
        }
    }
    if let Some(status) = status {
        write!(out, "\r\n  {status}\r\n")?;
    }
    out.flush()?;
    Ok(())
}

//! Rendering of command results for the terminal

use athenaeum_core::commands::catalog::ItemSummary;
use athenaeum_core::commands::events::{AttendanceDrift, EventRegistration, EventSummary};
use athenaeum_core::commands::fines::FineStatement;
use athenaeum_core::storage::TableDump;
use athenaeum_core::{Outcome, Result};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// What the caller should do after a result was shown
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Done,
    /// Input or auth error; nothing changed
    Rejected,
    /// The store is in an unknown state; close it and stop
    Fatal,
}

#[derive(Clone, Copy, Debug)]
pub struct Reporter {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Reporter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn text() -> Self {
        Self::new(OutputFormat::Text, false)
    }

    /// Show an operation's result, using `text` to render a success
    pub fn report<T: Serialize>(&self, result: Result<T>, text: impl FnOnce(&T)) -> Flow {
        let details = result
            .as_ref()
            .err()
            .map(|err| (err.code(), err.suggestion()));
        let outcome = Outcome::from(result);
        let flow = match &outcome {
            Outcome::Success(_) => Flow::Done,
            Outcome::InputError(_) => Flow::Rejected,
            Outcome::Fatal(_) => Flow::Fatal,
        };

        match self.format {
            OutputFormat::Json => {
                let mut value = serde_json::to_value(&outcome).unwrap_or_else(|e| {
                    serde_json::json!({
                        "outcome": "fatal",
                        "value": format!("Failed to serialize result: {}", e),
                    })
                });
                if let (Some((code, suggestion)), Some(map)) = (details, value.as_object_mut()) {
                    map.insert("code".to_string(), code.into());
                    if let Some(suggestion) = suggestion {
                        map.insert("suggestion".to_string(), suggestion.into());
                    }
                }
                let rendered =
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                println!("{}", rendered);
            }
            OutputFormat::Text => match outcome {
                Outcome::Success(value) => text(&value),
                Outcome::InputError(message) => {
                    eprintln!("INPUT ERROR: {}", message);
                    if let Some((_, Some(suggestion))) = details {
                        if !self.quiet {
                            eprintln!("  Try: {}", suggestion);
                        }
                    }
                }
                Outcome::Fatal(message) => {
                    eprintln!("CRITICAL ERROR: {}", message);
                    eprintln!("The program will now exit.");
                }
            },
        }
        flow
    }

    /// Print a plain informational line in text mode
    pub fn note(&self, message: impl AsRef<str>) {
        if self.format == OutputFormat::Text && !self.quiet {
            println!("{}", message.as_ref());
        }
    }
}

pub fn print_items(items: &[ItemSummary]) {
    if items.is_empty() {
        println!("No items found matching that title.");
        return;
    }

    println!("\nSearch Results:");
    for item in items {
        let item_type = item.item_type.map(|t| t.as_str()).unwrap_or("Unknown");
        println!(
            "ID: {}, Title: {}, Type: {}, Status: {}",
            item.id,
            item.title,
            item_type,
            item.status.as_str()
        );
        println!(
            "Location: {}, Authors: {}",
            item.location.as_deref().unwrap_or("Unknown"),
            item.authors.as_deref().unwrap_or("Unknown")
        );
        if item.reference_only {
            println!("Reference only: this item cannot be borrowed");
        }
        println!("{}", "-".repeat(40));
    }
}

pub fn print_events(events: &[EventSummary]) {
    if events.is_empty() {
        println!("No events found matching that name.");
        return;
    }

    println!("\nEvent Search Results:");
    for event in events {
        println!(
            "ID: {}, Name: {}, Date: {}, Time: {}",
            event.id,
            event.name,
            event.date,
            event.time.as_deref().unwrap_or("TBA")
        );
        println!(
            "Location: {}, Available spots: {} of {}",
            event.room_name, event.remaining_capacity, event.max_capacity
        );
        if let Some(audience) = &event.recommended_audience {
            println!("Recommended for: {}", audience);
        }
        if let Some(description) = &event.description {
            println!("Description: {}", description);
        }
        println!("{}", "-".repeat(40));
    }
}

pub fn print_registrations(registrations: &[EventRegistration]) {
    if registrations.is_empty() {
        println!("You are not registered for any events.");
        return;
    }

    println!("\nYour Registered Events:");
    for event in registrations {
        println!(
            "ID: {}, {} on {} at {}",
            event.event_id,
            event.name,
            event.date,
            event.time.as_deref().unwrap_or("TBA")
        );
    }
}

pub fn print_fines(statement: &FineStatement) {
    if statement.total <= 0.0 {
        println!("You have no outstanding fines.");
    } else {
        println!("Your total fine is: ${:.2}", statement.total);
        println!("You cannot borrow additional items until your fine is paid.");
    }

    if !statement.items.is_empty() {
        println!("\nItems with fines:");
        for item in &statement.items {
            println!("Borrowing ID: {}, Title: {}", item.borrowing_id, item.title);
            println!(
                "Due: {}, Returned: {}, Fine: ${:.2}",
                item.due_date, item.return_date, item.fine_amount
            );
            println!("{}", "-".repeat(40));
        }
    }
}

pub fn print_table(dump: &TableDump) {
    println!("\nRecords in {}:", dump.table);
    println!("{}", "-".repeat(50));

    let header = dump.columns.join(" | ");
    println!("{}", header);
    println!("{}", "-".repeat(header.len()));

    if dump.is_empty() {
        println!("(No records)");
    }
    for row in &dump.rows {
        println!("{}", row.join(" | "));
    }
}

/// One block per row, one line per column
pub fn print_table_detail(dump: &TableDump) {
    println!("\nDetailed view of {}:", dump.table);
    println!("{}", "-".repeat(50));

    if dump.is_empty() {
        println!("(No records)");
    }
    for row in &dump.rows {
        println!("{}", "-".repeat(30));
        for (column, value) in dump.columns.iter().zip(row) {
            println!("{}: {}", column, value);
        }
    }
}

pub fn print_drift(drift: &[AttendanceDrift]) {
    if drift.is_empty() {
        println!("All event attendee counts match their registrations.");
        return;
    }

    println!("Events whose attendee count differs from registrations:");
    for event in drift {
        println!(
            "  {} - {}: recorded {}, registered {}",
            event.event_id, event.name, event.recorded_attendees, event.registered_members
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athenaeum_core::Error;

    #[test]
    fn test_flow_follows_error_kind() {
        let reporter = Reporter::new(OutputFormat::Json, true);

        assert_eq!(reporter.report(Ok(1), |_| {}), Flow::Done);
        assert_eq!(
            reporter.report::<()>(Err(Error::ItemAlreadyBorrowed(10)), |_| {}),
            Flow::Rejected
        );
        assert_eq!(
            reporter.report::<()>(Err(Error::AdminAuthorizationRequired), |_| {}),
            Flow::Rejected
        );
        assert_eq!(
            reporter.report::<()>(Err(Error::Config("broken".into())), |_| {}),
            Flow::Fatal
        );
    }

    #[test]
    fn test_text_renderer_only_runs_on_success() {
        let reporter = Reporter::new(OutputFormat::Text, true);
        let mut rendered = false;
        reporter.report::<i64>(Err(Error::MemberNotFound(5)), |_| rendered = true);
        assert!(!rendered);

        reporter.report(Ok(5), |_| rendered = true);
        assert!(rendered);
    }
}

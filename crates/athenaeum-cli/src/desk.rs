//! The circulation desk: one method per library operation
//!
//! Both the one-shot subcommands and the interactive menu go through
//! [`Desk`], so confirmation prompts and admin login happen the same way
//! and always before the operation that needs them is started.

use crate::console::{Console, ConsoleSecretSource};
use crate::render::{self, Flow, Reporter};
use athenaeum_core::commands::donation::{self, NewDonation};
use athenaeum_core::commands::{catalog, circulation, events, fines, help_desk, members};
use athenaeum_core::security::{AccessControl, AdminSecret, Authentication};
use athenaeum_core::storage::{Database, DUMP_ROW_LIMIT, introspection};
use athenaeum_core::{Error, Result};

pub struct Desk<'a> {
    db: &'a Database,
    reporter: Reporter,
    max_attempts: u32,
    console: Option<Console>,
    access: Option<AccessControl>,
}

fn open_console(console: &mut Option<Console>) -> anyhow::Result<&mut Console> {
    if console.is_none() {
        *console = Some(Console::open()?);
    }
    console
        .as_mut()
        .ok_or_else(|| anyhow::anyhow!("Console is not available"))
}

fn access_control(access: &mut Option<AccessControl>) -> Result<&AccessControl> {
    if access.is_none() {
        *access = Some(AccessControl::new(AdminSecret::from_env())?);
    }
    access
        .as_ref()
        .ok_or_else(|| Error::Config("Admin access control is not available".to_string()))
}

impl<'a> Desk<'a> {
    pub fn new(db: &'a Database, reporter: Reporter, max_attempts: u32) -> Self {
        Self {
            db,
            reporter,
            max_attempts,
            console: None,
            access: None,
        }
    }

    pub fn reporter(&self) -> Reporter {
        self.reporter
    }

    pub fn db(&self) -> &Database {
        self.db
    }

    /// Hash the admin secret now rather than at the first login
    pub fn prepare_access(&mut self) -> Flow {
        match access_control(&mut self.access) {
            Ok(_) => Flow::Done,
            Err(err) => self.reporter.report::<()>(Err(err), |_| {}),
        }
    }

    pub fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        open_console(&mut self.console)?.read_line(prompt)
    }

    pub fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        open_console(&mut self.console)?.confirm(question)
    }

    /// Prompt for the admin code with the configured number of attempts
    pub fn authenticate(&mut self) -> anyhow::Result<Result<Authentication>> {
        let access = match access_control(&mut self.access) {
            Ok(access) => access,
            Err(err) => return Ok(Err(err)),
        };
        let console = open_console(&mut self.console)?;
        let mut source = ConsoleSecretSource::new(console);
        Ok(access.authenticate(&mut source, self.max_attempts))
    }

    pub async fn find_member(&self, member_id: i64) -> Flow {
        self.reporter
            .report(members::find_member(self.db, member_id).await, |member| {
                println!("Welcome, {}!", member.display_name());
            })
    }

    pub async fn find_items(&self, title: &str) -> Flow {
        self.reporter
            .report(catalog::find_items(self.db, title).await, |items| render::print_items(items))
    }

    pub async fn borrow(&self, member_id: i64, item_id: i64) -> Flow {
        self.reporter
            .report(circulation::borrow_item(self.db, member_id, item_id).await, |b| {
                println!("SUCCESS: Item borrowed successfully! Borrowing ID: {}", b.id);
                println!("Due date: {}", b.due_date);
            })
    }

    pub async fn return_item(&self, borrowing_id: i64) -> Flow {
        self.reporter
            .report(circulation::return_item(self.db, borrowing_id).await, |receipt| {
                println!("SUCCESS: Item returned successfully!");
                if receipt.fine_applied > 0.0 {
                    println!(
                        "A fine of ${:.2} has been added to your account.",
                        receipt.fine_applied
                    );
                }
            })
    }

    pub async fn donate(
        &mut self,
        member_id: i64,
        donation: &NewDonation,
        assume_yes: bool,
    ) -> anyhow::Result<Flow> {
        let mut proceed = assume_yes;
        let isbn = donation.isbn.as_deref().map(str::trim).filter(|s| !s.is_empty());

        if let Some(isbn) = isbn {
            if !assume_yes {
                match catalog::check_duplicate_isbn(self.db, isbn).await {
                    Ok(Some(existing)) => {
                        println!(
                            "Warning: An item with ISBN {} already exists: '{}'",
                            isbn, existing
                        );
                        if !self.confirm("Do you still want to donate this item?")? {
                            self.reporter.note("Donation cancelled.");
                            return Ok(Flow::Done);
                        }
                        proceed = true;
                    }
                    Ok(None) => {}
                    Err(err) => return Ok(self.reporter.report::<()>(Err(err), |_| {})),
                }
            }
        }

        let result = donation::donate_item(self.db, member_id, donation, proceed).await;
        Ok(self.reporter.report(result, |item_id| {
            println!("SUCCESS: Thank you for your donation! Item ID: {}", item_id);
        }))
    }

    pub async fn find_events(&self, name: &str) -> Flow {
        self.reporter
            .report(events::find_events(self.db, name).await, |found| render::print_events(found))
    }

    pub async fn register(&self, member_id: i64, event_id: i64) -> Flow {
        self.reporter
            .report(events::register_for_event(self.db, member_id, event_id).await, |r| {
                println!("SUCCESS: Registered for '{}'!", r.event_name);
                println!("Current attendance: {}/{}", r.attendees, r.max_capacity);
            })
    }

    pub async fn cancel(&self, member_id: i64, event_id: i64) -> Flow {
        self.reporter
            .report(events::cancel_registration(self.db, member_id, event_id).await, |c| {
                println!("SUCCESS: Your registration for '{}' has been cancelled.", c.event_name);
            })
    }

    pub async fn registrations(&self, member_id: i64) -> Flow {
        self.reporter
            .report(events::registered_events(self.db, member_id).await, |r| {
                render::print_registrations(r)
            })
    }

    pub async fn volunteer(&self, member_id: i64, event_id: i64, role: &str) -> Flow {
        self.reporter
            .report(events::volunteer_for_event(self.db, member_id, event_id, role).await, |v| {
                println!(
                    "SUCCESS: You are now volunteering as '{}' for event {}.",
                    v.role, v.event_id
                );
            })
    }

    pub async fn ask(&self, member_id: i64, question: &str) -> Flow {
        self.reporter
            .report(help_desk::ask_librarian(self.db, member_id, question).await, |contact| {
                println!(
                    "Your question has been forwarded to {}, {}.",
                    contact.staff_name, contact.staff_position
                );
                println!("They will get back to you shortly.");
            })
    }

    pub async fn fines(&self, member_id: i64) -> Flow {
        self.reporter
            .report(fines::view_fines(self.db, member_id).await, |statement| {
                render::print_fines(statement)
            })
    }

    /// Confirm, authenticate, then clear the balance
    pub async fn pay_fine(&mut self, member_id: i64, assume_yes: bool) -> anyhow::Result<Flow> {
        let balance = match members::find_member(self.db, member_id).await {
            Ok(_) => fines::outstanding_balance(self.db, member_id).await,
            Err(err) => Err(err),
        };
        let balance = match balance {
            Ok(balance) => balance,
            Err(err) => return Ok(self.reporter.report::<()>(Err(err), |_| {})),
        };

        if balance > 0.0 {
            self.reporter
                .note(format!("Your current fine balance is: ${:.2}", balance));
            let question = format!("Do you want to pay the full amount of ${:.2}?", balance);
            if !assume_yes && !self.confirm(&question)? {
                self.reporter.note("Payment cancelled.");
                return Ok(Flow::Done);
            }

            self.reporter
                .note("Admin authentication required to process payment.");
            match self.authenticate()? {
                Ok(Authentication::Granted) => {}
                Ok(Authentication::Cancelled) => {
                    self.reporter.note("Payment cancelled.");
                    return Ok(Flow::Done);
                }
                Ok(denied) => {
                    return Ok(self.reporter.report::<()>(denied.require_granted(), |_| {}));
                }
                Err(err) => return Ok(self.reporter.report::<()>(Err(err), |_| {})),
            }
        }

        let result = fines::pay_fine(self.db, member_id, balance > 0.0).await;
        Ok(self.reporter.report(result, |receipt| {
            if receipt.amount_paid > 0.0 {
                println!("SUCCESS: Payment of ${:.2} processed successfully.", receipt.amount_paid);
                println!("Your account is now in good standing and you can borrow items again.");
            } else {
                println!("You have no outstanding fines to pay.");
            }
        }))
    }

    /// Every table, at most [`DUMP_ROW_LIMIT`] rows each
    pub async fn dump(&self) -> Flow {
        self.reporter
            .report(introspection::dump_all(self.db).await, |dumps| {
                println!("\nAdmin View - Database Records");
                println!("{}", "=".repeat(50));
                for dump in dumps {
                    render::print_table(dump);
                    if dump.rows.len() as i64 == DUMP_ROW_LIMIT {
                        println!("(showing first {} rows)", DUMP_ROW_LIMIT);
                    }
                }
            })
    }

    pub async fn table(&self, name: &str) -> Flow {
        self.reporter
            .report(introspection::table_rows(self.db, name.trim(), None).await, |dump| {
                render::print_table_detail(dump)
            })
    }

    pub async fn check_attendance(&self) -> Flow {
        self.reporter
            .report(events::attendance_drift(self.db).await, |drift| render::print_drift(drift))
    }
}

//! Interactive menus
//!
//! Input errors are shown and the current menu is redrawn. A fatal result
//! stops every loop and is handed back so the caller can close the store.

use crate::desk::Desk;
use crate::render::Flow;
use athenaeum_core::commands::catalog::ItemType;
use athenaeum_core::commands::donation::NewDonation;
use athenaeum_core::security::Authentication;
use std::ops::ControlFlow;

/// Loop result: keep going, or stop with the flow to report
type Step = ControlFlow<Flow>;

fn step(flow: Flow) -> Step {
    match flow {
        Flow::Fatal => ControlFlow::Break(Flow::Fatal),
        _ => ControlFlow::Continue(()),
    }
}

/// Read an id; `Ok(None)` when the answer was not a number or input ended
fn read_id(desk: &mut Desk<'_>, prompt: &str) -> anyhow::Result<Option<i64>> {
    let Some(answer) = desk.read_line(prompt)? else {
        return Ok(None);
    };
    match answer.trim().parse::<i64>() {
        Ok(id) => Ok(Some(id)),
        Err(_) => {
            eprintln!("INPUT ERROR: Please enter a valid number");
            Ok(None)
        }
    }
}

/// Main menu; returns `Flow::Fatal` if the session ended on a store failure
pub async fn run(desk: &mut Desk<'_>) -> anyhow::Result<Flow> {
    if desk.prepare_access() == Flow::Fatal {
        return Ok(Flow::Fatal);
    }

    loop {
        println!("\nWelcome to the Library System!");
        println!("1. Member Login");
        println!("2. Admin Login");
        println!("3. Exit");

        let Some(choice) = desk.read_line("Enter your choice (1-3): ")? else {
            println!("Exiting the system. Goodbye!");
            return Ok(Flow::Done);
        };

        let outcome = match choice.trim() {
            "1" => member_login(desk).await?,
            "2" => admin_session(desk).await?,
            "3" => {
                println!("Exiting the system. Goodbye!");
                return Ok(Flow::Done);
            }
            _ => {
                eprintln!("INPUT ERROR: Invalid choice (must be 1, 2, or 3)");
                ControlFlow::Continue(())
            }
        };

        if let ControlFlow::Break(flow) = outcome {
            return Ok(flow);
        }
    }
}

async fn member_login(desk: &mut Desk<'_>) -> anyhow::Result<Step> {
    let Some(member_id) = read_id(desk, "Enter your Member ID: ")? else {
        return Ok(ControlFlow::Continue(()));
    };

    match desk.find_member(member_id).await {
        Flow::Done => member_menu(desk, member_id).await,
        flow => Ok(step(flow)),
    }
}

async fn admin_session(desk: &mut Desk<'_>) -> anyhow::Result<Step> {
    println!("\nAdmin Login");
    println!("{}", "-".repeat(50));

    match desk.authenticate()? {
        Ok(Authentication::Granted) => println!("Admin login successful."),
        Ok(Authentication::Cancelled) => {
            println!("Admin login cancelled.");
            return Ok(ControlFlow::Continue(()));
        }
        Ok(Authentication::Exhausted) => {
            println!("Too many failed attempts. Access denied.");
            return Ok(ControlFlow::Continue(()));
        }
        Err(err) => {
            let flow = desk.reporter().report::<()>(Err(err), |_| {});
            return Ok(step(flow));
        }
    }

    if let ControlFlow::Break(flow) = step(desk.dump().await) {
        return Ok(ControlFlow::Break(flow));
    }
    if let ControlFlow::Break(flow) = step(desk.check_attendance().await) {
        return Ok(ControlFlow::Break(flow));
    }

    println!("\nAdmin Options:");
    println!("1. View a specific table in detail");
    println!("2. Return to main menu");
    if let Some(option) = desk.read_line("Enter option (1-2): ")? {
        if option.trim() == "1" {
            let table = desk.read_line("Enter table name to view: ")?.unwrap_or_default();
            if let ControlFlow::Break(flow) = step(desk.table(&table).await) {
                return Ok(ControlFlow::Break(flow));
            }
        }
    }

    if desk.confirm("Would you like to switch to normal user mode?")? {
        return member_login(desk).await;
    }
    println!("Exiting admin mode.");
    Ok(ControlFlow::Continue(()))
}

async fn member_menu(desk: &mut Desk<'_>, member_id: i64) -> anyhow::Result<Step> {
    loop {
        println!("\nLibrary System Menu:");
        println!("1. Find an item");
        println!("2. Borrow an item");
        println!("3. Return an item");
        println!("4. Donate an item");
        println!("5. Find an event");
        println!("6. Register for an event");
        println!("7. Volunteer for an event");
        println!("8. Ask for help from a librarian");
        println!("9. View your fines");
        println!("10. Pay fines");
        println!("11. Cancel event registration");
        println!("12. Exit to Main Menu");

        let Some(choice) = desk.read_line("Enter your choice (1-12): ")? else {
            return Ok(ControlFlow::Continue(()));
        };

        let flow = match choice.trim() {
            "1" => {
                let title = desk.read_line("Enter the title to search: ")?.unwrap_or_default();
                desk.find_items(&title).await
            }
            "2" => match read_id(desk, "Enter the Item ID to borrow: ")? {
                Some(item_id) => desk.borrow(member_id, item_id).await,
                None => Flow::Rejected,
            },
            "3" => match read_id(desk, "Enter the Borrowing ID to return: ")? {
                Some(borrowing_id) => desk.return_item(borrowing_id).await,
                None => Flow::Rejected,
            },
            "4" => donate_prompt(desk, member_id).await?,
            "5" => {
                let name = desk.read_line("Enter the event name to search: ")?.unwrap_or_default();
                desk.find_events(&name).await
            }
            "6" => match read_id(desk, "Enter the Event ID to register: ")? {
                Some(event_id) => desk.register(member_id, event_id).await,
                None => Flow::Rejected,
            },
            "7" => match read_id(desk, "Enter the Event ID to volunteer for: ")? {
                Some(event_id) => {
                    let role = desk
                        .read_line("Enter your volunteer role (e.g., 'Usher'): ")?
                        .unwrap_or_default();
                    desk.volunteer(member_id, event_id, &role).await
                }
                None => Flow::Rejected,
            },
            "8" => {
                let question = desk
                    .read_line("Enter your question for the librarian: ")?
                    .unwrap_or_default();
                desk.ask(member_id, &question).await
            }
            "9" => desk.fines(member_id).await,
            "10" => desk.pay_fine(member_id, false).await?,
            "11" => match desk.registrations(member_id).await {
                Flow::Done => match read_id(desk, "Enter the Event ID to cancel registration: ")? {
                    Some(event_id) => desk.cancel(member_id, event_id).await,
                    None => Flow::Rejected,
                },
                flow => flow,
            },
            "12" => {
                println!("Returning to the main menu...");
                return Ok(ControlFlow::Continue(()));
            }
            _ => {
                eprintln!("INPUT ERROR: Invalid choice (must be 1-12)");
                Flow::Rejected
            }
        };

        if let ControlFlow::Break(flow) = step(flow) {
            return Ok(ControlFlow::Break(flow));
        }
    }
}

async fn donate_prompt(desk: &mut Desk<'_>, member_id: i64) -> anyhow::Result<Flow> {
    let title = desk
        .read_line("Enter the title of the item to donate: ")?
        .unwrap_or_default();
    if title.trim().is_empty() {
        eprintln!("INPUT ERROR: Title cannot be empty");
        return Ok(Flow::Rejected);
    }

    println!("\nValid item types: {}", ItemType::valid_names());
    let type_name = desk.read_line("Enter the type: ")?.unwrap_or_default();
    let item_type = match type_name.parse::<ItemType>() {
        Ok(item_type) => item_type,
        Err(err) => return Ok(desk.reporter().report::<()>(Err(err), |_| {})),
    };

    let isbn = desk
        .read_line("Enter the ISBN (leave blank if none): ")?
        .unwrap_or_default();
    let reference_only = desk.confirm("Is this item reference-only (not borrowable)?")?;

    let mut donation = NewDonation::new(title, item_type);
    if !isbn.trim().is_empty() {
        donation = donation.with_isbn(isbn);
    }
    if reference_only {
        donation = donation.reference_only();
    }

    desk.donate(member_id, &donation, false).await
}

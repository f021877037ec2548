use std::io::Write;

use chrono::{FixedOffset, NaiveDate};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

use hvacbook::config::ClientConfig;
use hvacbook::models::TimeSlot;
use hvacbook::services::calendar::DaySlots;
use hvacbook::services::dates;
use hvacbook::services::scheduler::demo::DemoScheduler;
use hvacbook::services::scheduler::proxy::ProxyBackend;
use hvacbook::services::wizard::{BookingWizard, Step, SubmitOutcome, FALLBACK_PHONE};

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` on end of input.
    async fn ask(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        print!("{label}: ");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }
}

fn header(wizard: &BookingWizard) {
    let step = wizard.step();
    match step.number() {
        Some(n) => println!("\n== Step {n} of 4: {} ==", step.title()),
        None => println!("\n== {} ==", step.title()),
    }
    if wizard.is_demo_mode() {
        println!("(demo mode: showing sample availability)");
    }
}

async fn service_step(wizard: &mut BookingWizard, prompt: &mut Prompt) -> anyhow::Result<bool> {
    let services = wizard.services().to_vec();
    for (i, service) in services.iter().enumerate() {
        let price = service.price_label().unwrap_or_default();
        println!("  {}. {} ({} min) {price}", i + 1, service.name, service.duration_minutes);
        if !service.description.is_empty() {
            println!("     {}", service.description);
        }
    }

    let Some(answer) = prompt.ask("Service number (q to quit)").await? else {
        return Ok(false);
    };
    if answer == "q" {
        return Ok(false);
    }

    let chosen = answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| services.get(i));
    match chosen {
        Some(service) => {
            wizard.select_service(&service.id)?;
            wizard.next().await?;
        }
        None => println!("Please enter a number from the list."),
    }
    Ok(true)
}

async fn date_step(
    wizard: &mut BookingWizard,
    prompt: &mut Prompt,
    offset: FixedOffset,
) -> anyhow::Result<bool> {
    print!("{}", wizard.month_grid().render_text());

    let Some(answer) = prompt
        .ask("Day of month, n/p to change month, b to go back")
        .await?
    else {
        return Ok(false);
    };

    match answer.as_str() {
        "n" => {
            wizard.show_next_month().await?;
        }
        "p" => {
            if let Err(e) = wizard.show_previous_month().await {
                println!("{e}");
            }
        }
        "b" => {
            wizard.back()?;
        }
        day => {
            let month = wizard.visible_month();
            let Some(date) = day
                .parse::<u32>()
                .ok()
                .and_then(|d| NaiveDate::from_ymd_opt(month.year, month.month, d))
            else {
                println!("Please enter a day number.");
                return Ok(true);
            };
            match wizard.select_date(date) {
                Ok(DaySlots::Slots(slots)) => {
                    println!("{}", dates::format_date_long(date));
                    return slot_choice(wizard, prompt, &slots, offset).await;
                }
                Ok(_) => println!("No available times on this date. Please choose another day."),
                Err(e) => println!("{e}"),
            }
        }
    }
    Ok(true)
}

async fn slot_choice(
    wizard: &mut BookingWizard,
    prompt: &mut Prompt,
    slots: &[TimeSlot],
    offset: FixedOffset,
) -> anyhow::Result<bool> {
    for (i, slot) in slots.iter().enumerate() {
        let time = dates::format_time(&slot.local_start(offset));
        match slot.duration_minutes() {
            Some(minutes) => println!("  {}. {time} ({minutes} min)", i + 1),
            None => println!("  {}. {time}", i + 1),
        }
    }
    let Some(answer) = prompt.ask("Time number").await? else {
        return Ok(false);
    };
    let chosen = answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| slots.get(i));
    match chosen {
        Some(slot) => {
            wizard.select_slot(slot.start_at)?;
            wizard.next().await?;
        }
        None => println!("Please enter a number from the list."),
    }
    Ok(true)
}

async fn contact_step(wizard: &mut BookingWizard, prompt: &mut Prompt) -> anyhow::Result<bool> {
    let current = wizard.selection().customer.clone();
    let fields: [(&str, &str); 4] = [
        ("Full name", &current.name),
        ("Phone", &current.phone),
        ("Email", &current.email),
        ("Notes (optional)", &current.notes),
    ];

    let mut answers = Vec::with_capacity(fields.len());
    for (label, existing) in fields {
        let label = if existing.is_empty() {
            label.to_string()
        } else {
            format!("{label} [{existing}]")
        };
        let Some(answer) = prompt.ask(&label).await? else {
            return Ok(false);
        };
        if answer == "b" {
            wizard.back()?;
            return Ok(true);
        }
        answers.push(if answer.is_empty() { existing.to_string() } else { answer });
    }

    wizard.set_name(&answers[0]);
    wizard.set_phone(&answers[1]);
    wizard.set_email(&answers[2]);
    wizard.set_notes(&answers[3]);

    let validation = wizard.validation();
    if !validation.name {
        println!("Please enter your name (at least 2 characters).");
    }
    if !validation.phone {
        println!("Please enter a phone number (at least 7 characters).");
    }
    if !validation.email {
        println!("Please enter a valid email address.");
    }
    if validation.all_valid() {
        wizard.next().await?;
    }
    Ok(true)
}

async fn review_step(wizard: &mut BookingWizard, prompt: &mut Prompt) -> anyhow::Result<bool> {
    if let Some(summary) = wizard.summary() {
        println!("  Service: {}", summary.service_name);
        if let Some(price) = &summary.price_label {
            println!("  Price:   {price}");
        }
        println!("  When:    {} at {}", summary.date_label, summary.time_label);
        println!("  Length:  {} min", summary.duration_minutes);
        println!("  Name:    {}", summary.name);
        println!("  Phone:   {}", summary.phone);
        println!("  Email:   {}", summary.email);
        if let Some(notes) = &summary.notes {
            println!("  Notes:   {notes}");
        }
    }
    if let Some(error) = wizard.last_error() {
        println!("\n  ! {error}");
    }

    let Some(answer) = prompt.ask("s to confirm, e to edit, b to go back").await? else {
        return Ok(false);
    };
    match answer.as_str() {
        "s" => {
            println!("Booking...");
            // failures stay on this step and are shown via last_error
            if let SubmitOutcome::Booked(confirmation) = wizard.submit().await? {
                tracing::debug!(booking_id = %confirmation.booking.id, "booked");
            }
        }
        "e" => {
            wizard.edit()?;
        }
        "b" => {
            wizard.back()?;
        }
        _ => {}
    }
    Ok(true)
}

async fn success_step(wizard: &mut BookingWizard, prompt: &mut Prompt) -> anyhow::Result<bool> {
    if let Some(summary) = wizard.summary() {
        println!(
            "{} on {} at {}.",
            summary.service_name, summary.date_label, summary.time_label
        );
        println!("A confirmation will be sent to {}.", summary.email);
    }
    if let Some(confirmation) = wizard.confirmation() {
        println!("Reference: {}", confirmation.booking.id);
    }
    println!("Questions? Call us at {FALLBACK_PHONE}.");

    let Some(answer) = prompt.ask("a to book another, q to quit").await? else {
        return Ok(false);
    };
    if answer == "a" {
        wizard.start_over();
        return Ok(true);
    }
    Ok(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let config = ClientConfig::from_env();
    let offset = config.offset();

    let live = ProxyBackend::new(config.api_base_url.clone());
    let demo = DemoScheduler::new(offset, config.demo_submit_delay);
    let mut wizard = BookingWizard::new(Box::new(live), Box::new(demo), offset);
    let mut prompt = Prompt::new();

    wizard.load_services().await;

    loop {
        header(&wizard);
        let keep_going = match wizard.step() {
            Step::ServiceSelect => service_step(&mut wizard, &mut prompt).await?,
            Step::DateTimeSelect => date_step(&mut wizard, &mut prompt, offset).await?,
            Step::CustomerInfo => contact_step(&mut wizard, &mut prompt).await?,
            Step::ReviewConfirm => review_step(&mut wizard, &mut prompt).await?,
            Step::Success => success_step(&mut wizard, &mut prompt).await?,
        };
        if !keep_going {
            break;
        }
    }

    Ok(())
}

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use medialert::api::{NoCredential, StaticToken, TokenProvider};
use medialert::{
    init_config, init_telemetry, Advance, AssessmentDefaults, AssessmentUpdate,
    AssessmentWorkflow, BookingUpdate, BookingWorkflow, EventSink, GeoPoint, HttpTriageApi,
    MediAlertConfig, TriageApi, WorkflowEvent,
};

#[derive(Parser)]
#[command(name = "medialert")]
#[command(about = "Emergency triage assessment and doctor booking from the terminal")]
#[command(long_about = "MediAlert walks the multi-step assessment and booking workflows \
                       against a MediAlert backend. Start with 'medialert assess' to get \
                       a severity classification for your symptoms.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default medialert.toml in the current directory
    Init {
        /// Overwrite an existing medialert.toml
        #[arg(long, help = "Overwrite an existing configuration file")]
        force: bool,
    },
    /// Run the three-step symptom assessment and print the classification
    Assess {
        /// Symptom to report (repeat for several)
        #[arg(long = "symptom", required = true, help = "Symptom label, e.g. --symptom Fever")]
        symptoms: Vec<String>,
        /// Free-text description of other symptoms
        #[arg(long)]
        other: Option<String>,
        /// Age in years
        #[arg(long)]
        age: u32,
        /// Pain rating from 1 to 10
        #[arg(long, default_value = "5")]
        pain: u8,
        /// Medical history notes
        #[arg(long)]
        history: Option<String>,
        /// Current medications
        #[arg(long)]
        medications: Option<String>,
        /// Known allergies
        #[arg(long)]
        allergies: Option<String>,
        /// Override the configured latitude
        #[arg(long)]
        latitude: Option<f64>,
        /// Override the configured longitude
        #[arg(long)]
        longitude: Option<f64>,
    },
    /// List available doctors
    Doctors {
        /// Filter by specialty
        #[arg(long)]
        specialty: Option<String>,
    },
    /// List free time slots for a doctor on a date
    Slots {
        doctor_id: String,
        /// Date as YYYY-MM-DD
        date: NaiveDate,
    },
    /// Book a consultation (requires a bearer token)
    Book {
        doctor_id: String,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Time slot exactly as listed by `slots`
        #[arg(long)]
        time: String,
        /// Note for the doctor
        #[arg(long)]
        note: Option<String>,
    },
}

/// Thin subscriber: renders workflow events, owns no transition logic.
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn notify(&mut self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::StepChanged { step } => println!("→ {step}"),
            WorkflowEvent::ValidationFailed { reason } => println!("✗ {reason}"),
            WorkflowEvent::SubmitStarted => println!("… submitting"),
            WorkflowEvent::SubmitSucceeded => println!("✓ submitted"),
            WorkflowEvent::SubmitFailed { message } => println!("✗ {message}"),
            WorkflowEvent::Cancelled => println!("cancelled"),
        }
    }
}

fn build_api(config: &MediAlertConfig) -> Result<Arc<HttpTriageApi>> {
    let tokens: Box<dyn TokenProvider> = match &config.api.token {
        Some(token) => Box::new(StaticToken(token.clone())),
        None => Box::new(NoCredential),
    };
    let api = HttpTriageApi::new(
        config.api.base_url.clone(),
        Duration::from_secs(config.api.timeout_seconds),
        tokens,
    )
    .context("failed to build API client")?;
    Ok(Arc::new(api))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry()?;
    init_config()?;
    let config = medialert::config()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Init { force } => init_command(force),
        Commands::Assess {
            symptoms,
            other,
            age,
            pain,
            history,
            medications,
            allergies,
            latitude,
            longitude,
        } => {
            let api = build_api(config)?;
            assess_command(
                api, config, symptoms, other, age, pain, history, medications, allergies,
                latitude, longitude,
            )
            .await
        }
        Commands::Doctors { specialty } => {
            let api = build_api(config)?;
            doctors_command(api, specialty.as_deref()).await
        }
        Commands::Slots { doctor_id, date } => {
            let api = build_api(config)?;
            slots_command(api, &doctor_id, date).await
        }
        Commands::Book {
            doctor_id,
            date,
            time,
            note,
        } => {
            let api = build_api(config)?;
            book_command(api, &doctor_id, date, &time, note).await
        }
    }
}

fn init_command(force: bool) -> Result<()> {
    let path = "medialert.toml";
    if Path::new(path).exists() && !force {
        bail!("{path} already exists (use --force to overwrite)");
    }
    MediAlertConfig::default().save_to_file(path)?;
    println!("Wrote {path}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn assess_command(
    api: Arc<HttpTriageApi>,
    config: &MediAlertConfig,
    symptoms: Vec<String>,
    other: Option<String>,
    age: u32,
    pain: u8,
    history: Option<String>,
    medications: Option<String>,
    allergies: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<()> {
    let defaults = AssessmentDefaults {
        location: GeoPoint {
            latitude: latitude.unwrap_or(config.assessment.default_latitude),
            longitude: longitude.unwrap_or(config.assessment.default_longitude),
        },
        location_address: config.assessment.location_address.clone(),
    };
    let mut workflow = AssessmentWorkflow::new(
        api,
        defaults,
        config.assessment.emergency_number.clone(),
        Box::new(ConsoleSink),
    );

    for symptom in &symptoms {
        workflow.toggle_symptom(symptom);
    }
    workflow.merge(AssessmentUpdate {
        other_symptoms: other,
        age: Some(age),
        pain_rating: Some(pain),
        medical_history: history,
        current_medications: medications,
        allergies,
        ..Default::default()
    });

    // Walk the three intake steps; the last advance submits.
    workflow.advance().await?;
    workflow.advance().await?;
    let result = workflow.advance().await?;

    if result != Advance::Submitted {
        bail!("assessment did not complete");
    }
    let outcome = workflow
        .outcome()
        .context("assessment completed without an outcome")?;

    println!();
    println!("{}", outcome.severity.label());
    println!("Assessment ID: #{}", outcome.assessment_id);
    println!("Recommendation: {}", outcome.detail.recommendation);
    println!("Action: {}", outcome.detail.action);
    println!("Expected response: {}", outcome.detail.estimated_response);
    if let Some(phone) = &outcome.emergency_phone {
        println!("Emergency contact: {phone}");
    }
    Ok(())
}

async fn doctors_command(api: Arc<HttpTriageApi>, specialty: Option<&str>) -> Result<()> {
    let doctors = api.available_doctors(specialty).await?;
    if doctors.is_empty() {
        println!("No doctors available");
        return Ok(());
    }
    for doctor in doctors {
        println!(
            "{:10} {:24} {:22} ★{:.1}  {}y",
            doctor.id, doctor.name, doctor.specialty, doctor.rating, doctor.experience_years
        );
    }
    Ok(())
}

async fn slots_command(api: Arc<HttpTriageApi>, doctor_id: &str, date: NaiveDate) -> Result<()> {
    let slots = api.available_slots(doctor_id, date).await?;
    if slots.is_empty() {
        println!("No free slots on {date}");
        return Ok(());
    }
    for slot in slots {
        println!("{slot}");
    }
    Ok(())
}

async fn book_command(
    api: Arc<HttpTriageApi>,
    doctor_id: &str,
    date: NaiveDate,
    time: &str,
    note: Option<String>,
) -> Result<()> {
    let mut workflow = BookingWorkflow::new(api, Box::new(ConsoleSink));

    workflow.load_doctors(None).await?;
    workflow.select_doctor(doctor_id)?;
    workflow.advance().await?;
    workflow.set_date(date).await?;
    workflow.select_time(time)?;
    if note.is_some() {
        workflow.annotate(BookingUpdate {
            notes: note,
            ..Default::default()
        });
    }
    workflow.advance().await?;
    let result = workflow.advance().await?;

    if result != Advance::Submitted {
        bail!("booking did not complete");
    }
    let confirmation = workflow
        .confirmation()
        .context("booking completed without a confirmation")?;

    println!();
    println!("Booking confirmed!");
    println!("Doctor: {}", confirmation.doctor.name);
    println!("Date: {}", confirmation.date);
    println!("Time: {}", confirmation.time);
    println!("Consultation ID: #{}", confirmation.consultation_id);
    Ok(())
}

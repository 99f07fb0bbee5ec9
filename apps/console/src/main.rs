use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration as ChronoDuration, Utc};
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scheduling_cell::models::{ConsultationFilter, ScheduleConsultationRequest};
use scheduling_cell::services::{ConsultationSchedulingService, DoctorRosterService};
use shared_api::ApiClient;
use shared_config::AppConfig;
use shared_models::auth::CallRole;
use video_call_cell::models::{CallPhase, CallSessionConfig};
use video_call_cell::services::{CallSessionController, HttpSessionBroker, SimulatedMediaEngine};

/// Scripted walkthrough of a televisit: pick a doctor, book a consultation,
/// run the call against the simulated engine, then show the agenda and stats.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting televisit console");

    let config = AppConfig::from_env();
    if !config.is_configured() {
        warn!("Backend access is not fully configured; API calls will fail");
    }

    let auth_token = config.auth_token.clone();
    let api = Arc::new(ApiClient::new(&config));

    // Pick someone to see
    let roster = DoctorRosterService::with_client(api.clone());
    let doctors = roster.list_available(None, &auth_token).await?;
    let doctor = doctors
        .first()
        .context("no doctors available for booking")?;
    info!(
        "Booking {} ({})",
        doctor.display_name(),
        doctor.specialty.as_deref().unwrap_or("general")
    );

    // Book a consultation a few minutes out; that is already inside the
    // join window, so the call can start right away
    let scheduling = ConsultationSchedulingService::with_client(api.clone());
    let request = ScheduleConsultationRequest {
        doctor_id: doctor.user_id,
        scheduled_start_time: Utc::now() + ChronoDuration::minutes(5),
        duration_minutes: 30,
        patient_notes: Some("Follow-up on last week's visit".to_string()),
    };
    let consultation = scheduling.schedule(&request, &auth_token).await?;
    info!(
        "Consultation {} scheduled for {}",
        consultation.consultation_id, consultation.scheduled_start_time
    );

    // Run the call with the in-process engine standing in for the RTC stack
    let broker = Arc::new(HttpSessionBroker::with_client(
        api.clone(),
        auth_token.clone(),
    ));
    let engine = Arc::new(SimulatedMediaEngine::new());
    let controller =
        CallSessionController::new(broker, engine, CallSessionConfig::default());
    let mut session = controller.launch(consultation.consultation_id, CallRole::Patient);

    // Log every phase change as the call progresses
    let mut transitions = session.watch();
    let transition_log = tokio::spawn(async move {
        let mut last_phase = transitions.borrow().phase;
        while transitions.changed().await.is_ok() {
            let snapshot = transitions.borrow().clone();
            if snapshot.phase != last_phase {
                info!("Call phase: {} -> {}", last_phase, snapshot.phase);
                last_phase = snapshot.phase;
            }
        }
    });

    session.start().await;
    let snapshot = session.wait_for_phase(CallPhase::Connected).await;
    if snapshot.phase == CallPhase::Connected {
        info!("Connected, waiting for the other side");
        let mut state = session.watch();
        while !state.borrow().peer_present() {
            if state.changed().await.is_err() {
                break;
            }
        }
        info!("Remote peer is in the call");

        session.toggle_audio().await;
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        session.toggle_audio().await;
        session.end().await;
    } else {
        warn!(
            "Call never connected: {}",
            snapshot.failure.as_deref().unwrap_or("unknown reason")
        );
    }

    let final_snapshot = session.closed().await;
    let _ = transition_log.await;
    info!(
        "Call finished in phase {} after {}s",
        final_snapshot.phase, final_snapshot.elapsed_seconds
    );

    // Agenda view: everything, split into upcoming and past
    let items = scheduling
        .list_mine(&ConsultationFilter::default(), &auth_token)
        .await?;
    let (upcoming, past) = ConsultationSchedulingService::partition(items, Utc::now());
    info!("Agenda: {} upcoming, {} past", upcoming.len(), past.len());
    for item in &upcoming {
        info!(
            "  {} with {} at {}",
            item.consultation_id,
            item.doctor_name.as_deref().unwrap_or("unassigned doctor"),
            item.scheduled_start_time
        );
    }

    let stats = scheduling.my_stats(&auth_token).await?;
    info!(
        "Totals: {} scheduled, {} completed, {} upcoming",
        stats.total_scheduled, stats.total_completed, stats.upcoming_count
    );

    Ok(())
}

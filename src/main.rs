use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use log::{error, info, warn};

use invigil::api::ApiClient;
use invigil::configuration::Config;
use invigil::local_state::StateStore;
use invigil::media_source::source::{MediaSource, VideoTrack};
use invigil::media_source::synthetic::{SyntheticBehavior, SyntheticDevice};
use invigil::media_source::types::{MediaConstraints, Resolution};
use invigil::overlay::{OverlayRenderer, Viewport};
use invigil::session_management::{format_clock, SessionDescriptor, TrackingPipeline};

#[derive(Parser)]
#[command(name = "invigil")]
#[command(version = "0.1.0")]
#[command(about = "Headless proctored study-session tracking client")]
struct Args {
    config_file: String,

    /// Requested session length in minutes.
    #[arg(long, default_value_t = 10)]
    duration: u64,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    println!(
        "
██╗███╗   ██╗██╗   ██╗██╗ ██████╗ ██╗██╗
██║████╗  ██║██║   ██║██║██╔════╝ ██║██║
██║██╔██╗ ██║██║   ██║██║██║  ███╗██║██║
██║██║╚██╗██║╚██╗ ██╔╝██║██║   ██║██║██║
██║██║ ╚████║ ╚████╔╝ ██║╚██████╔╝██║███████╗
╚═╝╚═╝  ╚═══╝  ╚═══╝  ╚═╝ ╚═════╝ ╚═╝╚══════╝
=============================================
  Proctored session tracking client v0.1.0
=============================================
"
    );

    let args = Args::parse();

    if args.config_file.is_empty() {
        error!("No configuration file given");
        std::process::exit(1);
    }

    let config = match Config::from_file(Path::new(args.config_file.as_str())) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration from file: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration imported successfully");

    let store = Arc::new(StateStore::load(&config.state_path));

    let api = match ApiClient::new(&config.backend_url) {
        Ok(api) => api,
        Err(e) => {
            error!("Unable to build the API client: {}", e);
            std::process::exit(1);
        }
    };

    // Identity is best-effort: the backend session grant is what
    // actually gates tracking.
    match api.me().await {
        Ok(user) => {
            info!("signed in as {}", user.username);
            if let Err(e) = store.save_user(user) {
                warn!("could not persist user identity: {}", e);
            }
        }
        Err(e) => warn!("could not fetch identity: {}", e),
    }

    // An in-flight session from a previous run is rejoined with its
    // true remaining time; otherwise a fresh session is requested.
    let descriptor: SessionDescriptor = match store.current().resumable_session(Utc::now()) {
        Some(session) => {
            info!(
                "resuming session {}, {} remaining",
                session.session_id,
                format_clock(session.remaining_secs(Utc::now()))
            );
            session
        }
        None => match api.start_session(args.duration).await {
            Ok(response) => {
                let descriptor: SessionDescriptor = response.into();
                info!(
                    "session {} granted, {} on the clock",
                    descriptor.session_id,
                    format_clock(descriptor.duration_secs())
                );
                if let Err(e) = store.save_session(descriptor) {
                    warn!("could not persist session: {}", e);
                }
                descriptor
            }
            Err(e) => {
                error!("Unable to start a session: {}", e);
                std::process::exit(1);
            }
        },
    };

    let device = Arc::new(SyntheticDevice::new(
        SyntheticBehavior::Healthy,
        Resolution {
            width: config.fallback_width,
            height: config.fallback_height,
        },
    ));
    let mut media = MediaSource::new(device, MediaConstraints { video: true });

    let track: VideoTrack = match media.acquire().await {
        Ok(stream) => match stream.video_tracks().first() {
            Some(track) => track.clone(),
            None => {
                error!("Acquired stream carries no video track");
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Camera unavailable: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline =
        TrackingPipeline::start(descriptor, track.clone(), &config, api.clone(), store).await;

    let overlay_task = pipeline.detections().map(|mut detections| {
        let renderer = OverlayRenderer::new(
            Viewport::new(config.viewport_width, config.viewport_height),
            track.resolution().unwrap_or(Resolution {
                width: config.fallback_width,
                height: config.fallback_height,
            }),
            config.gaze_sensitivity,
            f64::from(config.gaze_blob_radius_px),
        );
        let snapshot_dir = config.overlay_snapshot_dir.clone();

        tokio::spawn(async move {
            let mut frames: u64 = 0;
            while detections.changed().await.is_ok() {
                let detection = match *detections.borrow_and_update() {
                    Some(detection) => detection,
                    None => continue,
                };
                let overlay = renderer.render(&detection);
                frames += 1;

                if let Some(dir) = &snapshot_dir {
                    let gaze = renderer.rasterize_gaze_layer(&overlay);
                    let path = dir.join(format!("overlay_{:06}.png", frames));
                    if let Err(e) = gaze.save(&path) {
                        warn!("could not write overlay snapshot: {}", e);
                    }
                }
            }
            info!("overlay feed closed after {} detections", frames);
        })
    });

    tokio::select! {
        _ = pipeline.wait_until_ended() => {
            info!("session ended on schedule");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, ending session early");
            pipeline.end_session().await;
        }
    }

    media.release();

    if let Some(task) = overlay_task {
        task.abort();
    }

    if let Ok(user) = api.me().await {
        match api.user_sessions(user.id).await {
            Ok(history) => info!("{} session(s) on record", history.sessions.len()),
            Err(e) => warn!("could not fetch session history: {}", e),
        }
    }

    info!("done");
}

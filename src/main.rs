//! Pi-timelapse binary: capture stills at an interval, then optionally a video.

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};

use pi_timelapse::sequence::scan_image_sequence;
use pi_timelapse::{
    compile_captured, run_session, select_camera, Cli, EncodingError, StopReason, StopSignal,
    VideoAssembler,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(&Cli::parse()) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    info!("Starting pi-timelapse");

    let session = cli.session_config()?;
    let device = cli.device_config()?;
    let video = cli.encode_request()?;

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received, finishing current step");
        handler_stop.stop();
    })
    .context("failed to install interrupt handler")?;

    let mut camera = select_camera(&cli.platform, device)?.with_stop_signal(stop.clone());
    let report = run_session(&mut camera, &session, &stop).context("capture session failed")?;

    if report.negotiated.is_mismatch() {
        warn!(
            "Images were captured at {} instead of the requested resolution",
            report
                .negotiated
                .actual
                .map_or_else(|| "an unknown size".to_owned(), |r| r.to_string())
        );
    }
    if report.stop_reason == StopReason::Signal {
        info!("Capture interrupted after {} images", report.captured);
    }

    if let Some(request) = video {
        match scan_image_sequence(&request.image_folder) {
            Ok(on_disk) if on_disk != report.captured => warn!(
                "{} images on disk, {} captured this session; the video uses all of them",
                on_disk, report.captured
            ),
            Ok(_) => {}
            Err(err) => warn!("{err}; the encoder stops at the first missing image"),
        }

        match compile_captured(&VideoAssembler::new(), report.captured, &request) {
            Some(Err(err)) => {
                error!("Video compilation failed: {err}");
                if let EncodingError::EncoderFailed { stderr, .. } = &err {
                    if !stderr.is_empty() {
                        error!("Encoder output:\n{stderr}");
                    }
                }
            }
            Some(Ok(_)) | None => {}
        }
    }

    info!("pi-timelapse finished");
    Ok(())
}

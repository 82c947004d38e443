//! Interactive mic check.
//!
//! Drives the same triggers a page would: "check mic", "recording done"
//! and "check again", printing the error banner as it changes.

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, IsTerminal};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::app;
use crate::banner::{BannerHandle, BannerState, ESCALATION_DELAY};
use crate::cli::args::CheckCliArgs;
use crate::config::Config;
use crate::global;
use crate::page::MicCheckPage;
use crate::playback::{HttpPlayer, Player};

pub async fn handle_check_command(args: CheckCliArgs) -> Result<()> {
    if !io::stdin().is_terminal() {
        info!("Non-interactive session, nothing to check.");
        return Ok(());
    }

    let config = Config::load()?;
    let base_url = args
        .base_url
        .unwrap_or_else(|| config.server.base_url.clone());

    let banner = BannerHandle::default();
    tokio::spawn(print_banner(banner.subscribe()));

    let mic_check = app::build_mic_check(&config, &base_url, banner.clone())?;
    let player = HttpPlayer::new(global::samples_dir()?);
    let mut page = MicCheckPage::new(&base_url);

    println!();
    println!("Microphone check");
    println!("================");
    println!();

    let mut prompt = "Check your microphone now?";
    while confirm(prompt).await? {
        prompt = "Check again?";
        page.on_check_again();

        let mut attempt = match mic_check.begin_attempt().await {
            Ok(attempt) => attempt,
            // Already on the banner.
            Err(_) => continue,
        };

        page.on_check_mic(attempt.is_supported(), &banner, &config.messages);
        if attempt.start().await.is_err() {
            continue;
        }

        if attempt.is_supported() {
            println!("Recording... say something, then press Enter.");
        } else {
            println!("Press Enter to continue.");
        }
        wait_for_enter().await?;

        if attempt.finish().await.is_err() {
            continue;
        }

        let spinner = create_spinner("Uploading sample...");
        if let Err(e) = attempt.upload_settled().await {
            warn!("Mic check attempt failed ({}): {}", e.kind(), e);
        }
        let token = attempt.into_done().await;
        spinner.finish_and_clear();

        match page.on_recording_done(token.as_ref()) {
            Some(source) if args.no_playback => {
                println!("Sample stored: {}", source.urls.join(", "));
            }
            Some(source) => {
                println!("Your microphone works! Playing back the recording...");
                if let Err(e) = player.play(&source).await {
                    warn!("Playback failed: {:#}", e);
                }
            }
            None => {
                // Let the retry hint land before prompting again.
                tokio::time::sleep(ESCALATION_DELAY).await;
            }
        }
    }

    Ok(())
}

async fn confirm(prompt: &'static str) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(true)
            .interact()
    })
    .await
    .context("Prompt task failed")?
    .context("Failed to read answer")
}

async fn wait_for_enter() -> Result<()> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map(|_| ())
    })
    .await
    .context("Input task failed")?
    .context("Failed to read from stdin")
}

fn create_spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner());
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn print_banner(mut rx: watch::Receiver<BannerState>) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if let Some(line) = banner_line(&state) {
            eprintln!("{line}");
        }
    }
}

fn banner_line(state: &BannerState) -> Option<String> {
    if !state.visible {
        return None;
    }
    state
        .message
        .as_deref()
        .map(|message| format!("! {}", message.replace('\n', "\n  ")))
}

use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::config::{
    default_global_config_path, default_state_root, load_settings_or_default, Settings,
};
use crate::executor::CommandExecutor;
use crate::intent::KeywordClassifier;
use crate::pipeline::{
    run_voice_session, ConfirmationOutcome, ConfirmationPrompt, Disposition, PendingCommand,
    Pipeline, RoundResult, SessionEnd, VoiceSessionOptions,
};
use crate::registry::{compile_to_path, load_source, Registry};
use crate::router::ConfidenceRouter;
use crate::speech::{CommandCapture, HttpTranscriber, SpeechCapture, WakewordStripper};
use crate::trust::{EnergyStatsExtractor, SpeakerTrustGate};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

#[derive(Debug, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    registry_path: Option<PathBuf>,
    auto_threshold: Option<f64>,
    confirm_threshold: Option<f64>,
    verify_speaker: bool,
    positional: Vec<String>,
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let Some((verb_raw, rest)) = args.split_first() else {
        return Ok(help_text());
    };
    let options = parse_options(rest)?;

    match parse_cli_verb(verb_raw) {
        CliVerb::Help => Ok(help_text()),
        CliVerb::Run => handle_run(options),
        CliVerb::Interactive => handle_interactive(options),
        CliVerb::Listen => handle_listen(options),
        CliVerb::Validate => handle_validate(options),
        CliVerb::Commands => handle_commands(options),
        CliVerb::Enroll => handle_enroll(options),
        CliVerb::Verify => handle_verify(options),
        CliVerb::ResetSpeaker => handle_reset_speaker(options),
        CliVerb::Unknown => Err(format!(
            "unknown command `{verb_raw}`\n\n{}",
            help_text()
        )),
    }
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                options.config_path = Some(PathBuf::from(flag_value(&mut iter, "--config")?));
            }
            "--registry" => {
                options.registry_path = Some(PathBuf::from(flag_value(&mut iter, "--registry")?));
            }
            "--auto-threshold" => {
                options.auto_threshold =
                    Some(parse_threshold(&flag_value(&mut iter, "--auto-threshold")?)?);
            }
            "--confirm-threshold" => {
                options.confirm_threshold =
                    Some(parse_threshold(&flag_value(&mut iter, "--confirm-threshold")?)?);
            }
            "--verify-speaker" => options.verify_speaker = true,
            other if other.starts_with("--") => {
                return Err(format!("unknown flag `{other}`"));
            }
            positional => options.positional.push(positional.to_string()),
        }
    }
    Ok(options)
}

fn flag_value(iter: &mut std::slice::Iter<'_, String>, flag: &str) -> Result<String, String> {
    iter.next()
        .map(|value| value.to_string())
        .ok_or_else(|| format!("flag `{flag}` requires a value"))
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("`{raw}` is not a valid confidence value"))
}

struct Workspace {
    settings: Settings,
    state_root: PathBuf,
}

fn load_workspace(options: &CliOptions) -> Result<Workspace, String> {
    let config_path = match &options.config_path {
        Some(path) => path.clone(),
        None => default_global_config_path().map_err(|err| err.to_string())?,
    };
    let mut settings = load_settings_or_default(&config_path).map_err(|err| err.to_string())?;

    if let Some(path) = &options.registry_path {
        settings.registry_path = Some(path.clone());
    }
    if let Some(value) = options.auto_threshold {
        settings.routing.auto_execute_threshold = value;
    }
    if let Some(value) = options.confirm_threshold {
        settings.routing.confirmation_threshold = value;
    }
    if options.verify_speaker {
        settings.speaker.verify = true;
    }
    settings.validate().map_err(|err| err.to_string())?;

    let state_root = default_state_root().map_err(|err| err.to_string())?;
    Ok(Workspace {
        settings,
        state_root,
    })
}

fn load_registry(workspace: &Workspace) -> Result<Registry, String> {
    let path = workspace
        .settings
        .resolve_registry_path(&workspace.state_root);
    load_source(&path).map_err(|err| err.to_string())
}

fn open_trust_gate(workspace: &Workspace) -> Result<SpeakerTrustGate, String> {
    let store = workspace
        .settings
        .resolve_speaker_model_path(&workspace.state_root);
    SpeakerTrustGate::open(
        &store,
        workspace.settings.speaker.threshold,
        Box::new(EnergyStatsExtractor::default()),
    )
    .map_err(|err| err.to_string())
}

fn build_pipeline(workspace: &Workspace) -> Result<Pipeline, String> {
    let registry = load_registry(workspace)?;
    let classifier = KeywordClassifier::from_artifacts(
        &workspace
            .settings
            .resolve_intent_artifacts_path(&workspace.state_root),
        &registry,
    )
    .map_err(|err| err.to_string())?;
    let thresholds = workspace.settings.thresholds().map_err(|err| err.to_string())?;
    let wakeword = WakewordStripper::new(
        &workspace.settings.wakeword.word,
        workspace.settings.wakeword.case_sensitive,
        workspace.settings.wakeword.leading_only,
    );

    let mut pipeline = Pipeline::new(
        CommandExecutor::new(registry),
        ConfidenceRouter::new(thresholds),
        Box::new(classifier),
        wakeword,
        workspace.state_root.clone(),
    );
    if workspace.settings.speaker.verify {
        pipeline = pipeline.with_trust_gate(
            open_trust_gate(workspace)?,
            workspace.settings.speaker.on_error,
        );
    }
    Ok(pipeline)
}

fn build_capture(workspace: &Workspace) -> Result<Box<dyn SpeechCapture>, String> {
    let command = workspace
        .settings
        .capture
        .command
        .as_deref()
        .ok_or_else(|| {
            "voice mode needs a recorder: set `capture.command` in config.yaml".to_string()
        })?;
    let argv = shell_words::split(command).map_err(|err| err.to_string())?;
    let capture = CommandCapture::new(argv, workspace.settings.capture.sample_rate)
        .map_err(|err| err.to_string())?;
    Ok(Box::new(capture))
}

fn build_transcriber(workspace: &Workspace) -> Result<HttpTranscriber, String> {
    let endpoint = workspace
        .settings
        .transcriber
        .endpoint
        .as_deref()
        .ok_or_else(|| {
            "voice mode needs a transcriber: set `transcriber.endpoint` in config.yaml".to_string()
        })?;
    Ok(HttpTranscriber::new(
        endpoint,
        &workspace.settings.transcriber.language,
    ))
}

fn voice_options(workspace: &Workspace) -> VoiceSessionOptions {
    VoiceSessionOptions {
        timeout: Duration::from_secs(workspace.settings.capture.timeout_seconds),
        phrase_limit: Duration::from_secs(workspace.settings.capture.phrase_limit_seconds),
        max_capture_attempts: workspace.settings.capture.max_attempts,
    }
}

struct StdinPrompt;

impl ConfirmationPrompt for StdinPrompt {
    fn request(&mut self, pending: &PendingCommand) -> std::io::Result<String> {
        let mut stdout = std::io::stdout();
        writeln!(
            stdout,
            "Run `{}`? (confidence {:.0}%) [y/N]",
            pending.command_id,
            pending.confidence * 100.0
        )?;
        stdout.flush()?;
        let mut reply = String::new();
        std::io::stdin().read_line(&mut reply)?;
        Ok(reply)
    }
}

fn describe(disposition: &Disposition) -> String {
    match disposition {
        Disposition::Executed { outcome } => format!("executed {}", outcome.command_id),
        Disposition::AwaitingConfirmation { pending } => {
            format!("awaiting confirmation for {}", pending.command_id)
        }
        Disposition::Rejected { intent } => format!(
            "rejected: best guess {} at {:.0}% confidence",
            intent.intent_id,
            intent.confidence * 100.0
        ),
        Disposition::SpeakerVetoed { confidence } => format!(
            "speaker not recognized ({:.0}% confidence); command blocked",
            confidence * 100.0
        ),
    }
}

fn resolve_interactively(
    pipeline: &mut Pipeline,
    disposition: Disposition,
) -> Result<String, String> {
    match disposition {
        Disposition::AwaitingConfirmation { pending } => {
            let reply = StdinPrompt
                .request(&pending)
                .map_err(|err| err.to_string())?;
            match pipeline
                .resolve_confirmation(&pending, &reply)
                .map_err(|err| err.to_string())?
            {
                ConfirmationOutcome::Executed { outcome } => {
                    Ok(format!("executed {}", outcome.command_id))
                }
                ConfirmationOutcome::Cancelled => Ok("cancelled".to_string()),
            }
        }
        other => Ok(describe(&other)),
    }
}

fn handle_run(options: CliOptions) -> Result<String, String> {
    let text = options.positional.join(" ");
    if text.trim().is_empty() {
        return Err("run needs utterance text, e.g. `borealis run lock the screen`".to_string());
    }
    let workspace = load_workspace(&options)?;
    let mut pipeline = build_pipeline(&workspace)?;
    let disposition = pipeline
        .process_utterance(&text, None)
        .map_err(|err| err.to_string())?;
    resolve_interactively(&mut pipeline, disposition)
}

fn handle_interactive(options: CliOptions) -> Result<String, String> {
    let workspace = load_workspace(&options)?;
    let mut pipeline = build_pipeline(&workspace)?;
    let commands = pipeline.executor().registry().list_commands().join(", ");
    println!("Available commands: {commands}");
    println!("Type an utterance per line (Ctrl-D to quit).");

    // One transient stdin lock per line; the confirmation prompt takes its
    // own lock between reads.
    let stdin = std::io::stdin();
    let mut processed = 0usize;
    loop {
        let mut line = String::new();
        let read = stdin.read_line(&mut line).map_err(|err| err.to_string())?;
        if read == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match pipeline.process_utterance(&line, None) {
            Ok(disposition) => match resolve_interactively(&mut pipeline, disposition) {
                Ok(message) => println!("{message}"),
                Err(message) => println!("error: {message}"),
            },
            Err(err) => println!("error: {err}"),
        }
        processed += 1;
    }
    Ok(format!("processed {processed} utterances"))
}

fn handle_listen(options: CliOptions) -> Result<String, String> {
    let workspace = load_workspace(&options)?;
    let mut pipeline = build_pipeline(&workspace)?;
    let mut capture = build_capture(&workspace)?;
    let transcriber = build_transcriber(&workspace)?;
    let session_options = voice_options(&workspace);
    let stop = AtomicBool::new(false);

    let report = run_voice_session(
        &mut pipeline,
        capture.as_mut(),
        &transcriber,
        &mut StdinPrompt,
        &session_options,
        &stop,
    )
    .map_err(|err| err.to_string())?;

    let mut lines: Vec<String> = report
        .rounds
        .iter()
        .map(|round| match round {
            RoundResult::Executed { command_id } => format!("executed {command_id}"),
            RoundResult::ExecutedAfterConfirmation { command_id } => {
                format!("executed {command_id} after confirmation")
            }
            RoundResult::Cancelled { command_id } => format!("cancelled {command_id}"),
            RoundResult::Rejected {
                intent_id,
                confidence,
            } => format!(
                "rejected {intent_id} at {:.0}% confidence",
                confidence * 100.0
            ),
            RoundResult::SpeakerVetoed { confidence } => format!(
                "speaker not recognized ({:.0}% confidence)",
                confidence * 100.0
            ),
            RoundResult::Unintelligible => "could not understand speech".to_string(),
            RoundResult::TranscriptionFailed { message } => {
                format!("transcription failed: {message}")
            }
            RoundResult::UtteranceFailed { message } => format!("utterance failed: {message}"),
        })
        .collect();
    lines.push(match report.end {
        SessionEnd::StopRequested => "session stopped".to_string(),
        SessionEnd::CaptureAttemptsExhausted => {
            "no speech detected; giving up after retries".to_string()
        }
    });
    Ok(lines.join("\n"))
}

fn handle_validate(options: CliOptions) -> Result<String, String> {
    let workspace = load_workspace(&options)?;
    let registry = load_registry(&workspace)?;
    let compiled_path = workspace
        .settings
        .resolve_compiled_registry_path(&workspace.state_root);
    compile_to_path(&registry, &compiled_path).map_err(|err| err.to_string())?;
    Ok(format!(
        "compiled {} commands to {}",
        registry.len(),
        compiled_path.display()
    ))
}

fn handle_commands(options: CliOptions) -> Result<String, String> {
    let workspace = load_workspace(&options)?;
    let registry = load_registry(&workspace)?;
    Ok(registry.list_commands().join("\n"))
}

fn capture_one_sample(workspace: &Workspace) -> Result<crate::speech::AudioSample, String> {
    let mut capture = build_capture(workspace)?;
    let options = voice_options(workspace);
    capture
        .capture(options.timeout, options.phrase_limit)
        .map_err(|err| err.to_string())
}

fn handle_enroll(options: CliOptions) -> Result<String, String> {
    let workspace = load_workspace(&options)?;
    let mut gate = open_trust_gate(&workspace)?;
    println!("Speak now ({}s max)...", workspace.settings.capture.phrase_limit_seconds);
    let sample = capture_one_sample(&workspace)?;
    gate.enroll(&sample).map_err(|err| err.to_string())?;
    Ok(format!(
        "enrolled sample #{}; speaker model updated",
        gate.sample_count()
    ))
}

fn handle_verify(options: CliOptions) -> Result<String, String> {
    let workspace = load_workspace(&options)?;
    let gate = open_trust_gate(&workspace)?;
    println!("Speak now ({}s max)...", workspace.settings.capture.phrase_limit_seconds);
    let sample = capture_one_sample(&workspace)?;
    let verification = gate.verify(&sample).map_err(|err| err.to_string())?;
    Ok(format!(
        "authorized: {} (confidence {:.1}%, threshold {:.1}%)",
        verification.authorized,
        verification.confidence * 100.0,
        gate.threshold() * 100.0
    ))
}

fn handle_reset_speaker(options: CliOptions) -> Result<String, String> {
    let workspace = load_workspace(&options)?;
    let mut gate = open_trust_gate(&workspace)?;
    gate.reset().map_err(|err| err.to_string())?;
    Ok("speaker model reset".to_string())
}

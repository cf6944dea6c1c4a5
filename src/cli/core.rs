use std::{
    io,
    sync::{Arc, MutexGuard},
};

use strsim::levenshtein;
use thiserror::Error;

use crate::{
    autosave::{AutoSave, ThreadScheduler},
    cli::output::{self, OutputPreferences},
    config::{resolve_base_dir, ConfigManager},
    errors::WizardError,
    review::review_sections,
    schema::FieldSchema,
    store::{DraftStore, JsonFileStore},
    time::{Clock, SystemClock},
    wizard::{SharedSession, StepStatus, StoreWarning, SubmitOutcome, WizardSession},
};

/// Top-level CLI failure.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("Line editor error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure of a single shell command. Reported, never fatal.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("Wizard session is unavailable")]
    SessionUnavailable,
    #[error("Exit requested")]
    ExitRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

type CommandHandler = fn(&mut ShellContext, &[&str]) -> Result<(), CommandError>;

struct CommandSpec {
    name: &'static str,
    usage: &'static str,
    summary: &'static str,
    handler: CommandHandler,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        usage: "help",
        summary: "List available commands",
        handler: cmd_help,
    },
    CommandSpec {
        name: "show",
        usage: "show",
        summary: "Show the current step and its fields",
        handler: cmd_show,
    },
    CommandSpec {
        name: "set",
        usage: "set <field> <value>",
        summary: "Set a field value",
        handler: cmd_set,
    },
    CommandSpec {
        name: "next",
        usage: "next",
        summary: "Validate the current step and continue",
        handler: cmd_next,
    },
    CommandSpec {
        name: "back",
        usage: "back",
        summary: "Return to the previous step",
        handler: cmd_back,
    },
    CommandSpec {
        name: "goto",
        usage: "goto <step>",
        summary: "Jump directly to a step",
        handler: cmd_goto,
    },
    CommandSpec {
        name: "review",
        usage: "review",
        summary: "Summarize every answer",
        handler: cmd_review,
    },
    CommandSpec {
        name: "save",
        usage: "save",
        summary: "Save the draft now",
        handler: cmd_save,
    },
    CommandSpec {
        name: "submit",
        usage: "submit",
        summary: "Submit the application",
        handler: cmd_submit,
    },
    CommandSpec {
        name: "status",
        usage: "status",
        summary: "Show progress across all steps",
        handler: cmd_status,
    },
    CommandSpec {
        name: "last",
        usage: "last",
        summary: "Show the most recent submission",
        handler: cmd_last,
    },
    CommandSpec {
        name: "reset",
        usage: "reset",
        summary: "Discard the draft and start over",
        handler: cmd_reset,
    },
    CommandSpec {
        name: "exit",
        usage: "exit",
        summary: "Leave the wizard",
        handler: cmd_exit,
    },
];

pub struct ShellContext {
    pub(crate) running: bool,
    session: SharedSession,
    autosave: AutoSave<ThreadScheduler>,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let base = resolve_base_dir();
        let config = ConfigManager::with_base_dir(&base).load()?;
        output::set_preferences(OutputPreferences {
            plain: mode == CliMode::Script || !config.color_enabled,
        });

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let schema = Arc::new(FieldSchema::admission(clock.current_year()));
        let store = DraftStore::new(Box::new(JsonFileStore::in_dir(
            &config.resolve_data_dir(&base),
        )));
        let session = WizardSession::start(schema, store, clock)
            .with_reference_prefix(config.reference_prefix.clone());
        if let Some(warning) = session.last_store_warning() {
            report_warning(warning);
        }
        let session = session.into_shared();

        let mut autosave = AutoSave::new(ThreadScheduler::new());
        autosave.start(Arc::clone(&session), config.autosave_interval())?;

        Ok(Self {
            running: true,
            session,
            autosave,
        })
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        COMMANDS.iter().map(|command| command.name).collect()
    }

    /// Field identifiers, offered as completions after `set`.
    pub fn field_names(&self) -> Vec<String> {
        self.lock_session()
            .map(|session| session.schema().field_ids().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn prompt(&self) -> String {
        match self.lock_session() {
            Ok(session) => format!(
                "wizard [{}/{}]> ",
                session.current_step(),
                session.schema().step_count()
            ),
            Err(_) => "wizard> ".into(),
        }
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let alias = match command {
            "quit" => "exit",
            "previous" | "prev" => "back",
            other => other,
        };
        match COMMANDS.iter().find(|spec| spec.name == alias) {
            Some(spec) => match (spec.handler)(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            },
            None => {
                self.suggest_command(raw);
                Ok(LoopControl::Continue)
            }
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            other => output::error(other),
        }
    }

    pub(crate) fn print_warning(&self, message: &str) {
        output::warning(message);
    }

    /// Stops the autosave timer and writes the draft one last time.
    pub(crate) fn shutdown(&mut self) {
        self.autosave.stop();
        if let Ok(mut session) = self.lock_session() {
            if let Some(warning) = session.flush() {
                report_warning(&warning);
            }
        }
    }

    fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        if let Some(best) = closest(input, COMMANDS.iter().map(|spec| spec.name)) {
            output::info(format!("Suggestion: `{}`?", best));
        }
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, WizardSession>, CommandError> {
        self.session
            .lock()
            .map_err(|_| CommandError::SessionUnavailable)
    }
}

impl Drop for ShellContext {
    fn drop(&mut self) {
        self.autosave.stop();
    }
}

fn closest<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let needle = input.to_ascii_lowercase();
    candidates
        .map(|candidate| (levenshtein(&needle, &candidate.to_ascii_lowercase()), candidate))
        .min_by_key(|(distance, _)| *distance)
        .filter(|(distance, _)| *distance <= 3)
        .map(|(_, candidate)| candidate)
}

fn report_warning(warning: &StoreWarning) {
    output::warning(format!(
        "Could not {} ({}). Your answers are kept for this session.",
        warning.operation.replace('_', " "),
        warning.message
    ));
}

fn status_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "[✓]",
        StepStatus::Active => "[>]",
        StepStatus::NotStarted => "[ ]",
    }
}

fn print_progress(session: &WizardSession) {
    let line = session
        .schema()
        .steps()
        .iter()
        .zip(session.progress())
        .map(|(step, status)| format!("{} {} {}", status_marker(status), step.number, step.title))
        .collect::<Vec<_>>()
        .join("  ");
    output::line(line);
}

fn print_step(session: &WizardSession) {
    let step = session.current_step();
    let title = session
        .schema()
        .step(step)
        .map(|definition| definition.title.as_str())
        .unwrap_or("");
    output::section(format!("Step {}: {}", step, title));

    if session.is_review_step() {
        print_review(session);
        output::detail("Type `submit` to send your application.");
        return;
    }

    for field in session.schema().fields_in_step(step) {
        let value = session.value(&field.id);
        let shown = if value.is_empty() { "-" } else { value };
        let marker = if field.is_optional() { "" } else { " *" };
        output::line(format!("  {}{} ({}): {}", field.label, marker, field.id, shown));
        if !field.choices.is_empty() {
            output::detail(format!("      options: {}", field.choices.join(", ")));
        }
        if let Some(message) = session.errors().error_for(&field.id) {
            output::error(format!("{}: {}", field.id, message));
        }
    }
}

fn print_review(session: &WizardSession) {
    for section in review_sections(session.schema(), session.draft()) {
        output::line(format!("{}:", section.title));
        for line in section.lines {
            output::line(format!("  {}: {}", line.label, line.value));
        }
    }
}

fn print_errors(session: &WizardSession) {
    for (id, message) in session.errors().errors() {
        output::error(format!("{}: {}", id, message));
    }
}

fn expect_no_args(args: &[&str], usage: &'static str) -> Result<(), CommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandError::Usage(usage))
    }
}

fn cmd_help(_context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    output::section("Commands");
    for spec in COMMANDS {
        output::line(format!("  {:<22} {}", spec.usage, spec.summary));
    }
    Ok(())
}

fn cmd_show(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    expect_no_args(args, "show")?;
    let session = context.lock_session()?;
    print_progress(&session);
    print_step(&session);
    Ok(())
}

fn cmd_set(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    let Some((field, rest)) = args.split_first() else {
        return Err(CommandError::Usage("set <field> <value>"));
    };
    let value = rest.join(" ");
    let mut session = context.lock_session()?;
    match session.set_field(field, value) {
        Ok(()) => {
            output::success(format!("{} updated.", field));
            Ok(())
        }
        Err(WizardError::UnknownField(name)) => {
            let ids: Vec<String> = session.schema().field_ids().map(str::to_string).collect();
            if let Some(best) = closest(&name, ids.iter().map(String::as_str)) {
                output::info(format!("Suggestion: `{}`?", best));
            }
            Err(CommandError::Wizard(WizardError::UnknownField(name)))
        }
        Err(err) => Err(err.into()),
    }
}

fn cmd_next(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    expect_no_args(args, "next")?;
    let mut session = context.lock_session()?;
    let report = session.next();
    if let Some(warning) = &report.warning {
        report_warning(warning);
    }
    if !report.accepted() {
        output::warning("Please fix the highlighted fields.");
        print_errors(&session);
        return Ok(());
    }
    if session.is_review_step() && report.state.is_completed(session.current_step()) {
        output::success("Everything looks good. Type `submit` to finish.");
        return Ok(());
    }
    output::success(format!("Moved to step {}.", report.state.current_step()));
    print_progress(&session);
    print_step(&session);
    Ok(())
}

fn cmd_back(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    expect_no_args(args, "back")?;
    let mut session = context.lock_session()?;
    let report = session.previous();
    if let Some(warning) = &report.warning {
        report_warning(warning);
    }
    if !report.moved {
        output::info("Already on the first step.");
        return Ok(());
    }
    print_progress(&session);
    print_step(&session);
    Ok(())
}

fn cmd_goto(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    let [raw] = args else {
        return Err(CommandError::Usage("goto <step>"));
    };
    let step: usize = raw
        .parse()
        .map_err(|_| CommandError::InvalidInput(format!("`{}` is not a step number", raw)))?;
    let mut session = context.lock_session()?;
    if !session.schema().contains_step(step) {
        return Err(CommandError::InvalidInput(format!(
            "step must be between 1 and {}",
            session.schema().step_count()
        )));
    }
    let report = session.go_to(step);
    if let Some(warning) = &report.warning {
        report_warning(warning);
    }
    print_progress(&session);
    print_step(&session);
    Ok(())
}

fn cmd_review(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    expect_no_args(args, "review")?;
    let session = context.lock_session()?;
    output::section("Review");
    print_review(&session);
    Ok(())
}

fn cmd_save(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    expect_no_args(args, "save")?;
    let mut session = context.lock_session()?;
    match session.save_draft() {
        Some(warning) => report_warning(&warning),
        None => output::success("Draft saved successfully."),
    }
    Ok(())
}

fn cmd_submit(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    expect_no_args(args, "submit")?;
    let mut session = context.lock_session()?;
    if !session.is_review_step() {
        output::detail("Submitting before reaching the review step.");
    }
    match session.submit() {
        SubmitOutcome::Submitted { record, warnings } => {
            for warning in &warnings {
                report_warning(warning);
            }
            output::success("Application submitted.");
            output::line(format!("Reference: {}", record.reference()));
            output::line(format!("Submitted at: {}", record.submitted_at_iso()));
        }
        SubmitOutcome::NotStored { record, warnings } => {
            for warning in &warnings {
                report_warning(warning);
            }
            output::error(format!(
                "Application {} could not be stored. Your draft is kept; try `submit` again.",
                record.reference()
            ));
        }
        SubmitOutcome::Rejected(_) => {
            output::warning("Please fix the highlighted fields before submitting.");
            print_errors(&session);
        }
    }
    Ok(())
}

fn cmd_status(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    expect_no_args(args, "status")?;
    let session = context.lock_session()?;
    print_progress(&session);
    let completed: Vec<String> = session
        .state()
        .completed_steps()
        .iter()
        .map(usize::to_string)
        .collect();
    output::line(format!(
        "Current step: {} | Completed: {}",
        session.current_step(),
        if completed.is_empty() {
            "none".to_string()
        } else {
            completed.join(", ")
        }
    ));
    if let Some(warning) = session.last_store_warning() {
        report_warning(warning);
    }
    Ok(())
}

fn cmd_last(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    expect_no_args(args, "last")?;
    let mut session = context.lock_session()?;
    match session.last_submission() {
        Some(record) => {
            output::line(format!("Reference: {}", record.reference()));
            output::line(format!("Submitted at: {}", record.submitted_at_iso()));
            let name = format!("{} {}", record.value("firstName"), record.value("lastName"));
            if !name.trim().is_empty() {
                output::line(format!("Applicant: {}", name.trim()));
            }
        }
        None => output::info("No submission yet."),
    }
    Ok(())
}

fn cmd_reset(context: &mut ShellContext, args: &[&str]) -> Result<(), CommandError> {
    expect_no_args(args, "reset")?;
    let mut session = context.lock_session()?;
    match session.reset() {
        Some(warning) => report_warning(&warning),
        None => output::success("Draft discarded."),
    }
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> Result<(), CommandError> {
    Err(CommandError::ExitRequested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_suggests_near_matches_only() {
        let names = ["submit", "status", "show"];
        assert_eq!(closest("sumbit", names.iter().copied()), Some("submit"));
        assert_eq!(closest("zzzzzzzz", names.iter().copied()), None);
    }

    #[test]
    fn command_table_has_unique_names() {
        let mut names: Vec<_> = COMMANDS.iter().map(|spec| spec.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COMMANDS.len());
    }
}

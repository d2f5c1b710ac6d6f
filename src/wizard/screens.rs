//! Text-mode wizard screens
//!
//! Screens talk to the user only through the [`Prompt`] trait, so the same
//! screen works over a terminal, a serial console or a scripted answer file.
//! All screens of one wizard share a single prompt.

use super::{ScreenResult, Step};
use crate::context::{keys, Context};
use crate::partition::{str_to_size, validate_mountpoint, SizeUnit};
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;
use tracing::debug;

/// What the user typed at a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Value(String),
    Back,
    Exit,
}

/// Input/output surface for screens.
pub trait Prompt {
    /// Show a question and wait for an answer.
    fn ask(&mut self, title: &str, question: &str) -> Result<Answer>;

    /// Show a message that needs no answer (validation errors, notices).
    fn notify(&mut self, message: &str) -> Result<()>;
}

/// Shared handle to the prompt used by every screen of a wizard.
pub type SharedPrompt = Rc<RefCell<dyn Prompt>>;

/// Line-oriented prompt over any reader/writer pair.
///
/// `<` goes back, `q` exits, end of input counts as exit.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ask(&mut self, title: &str, question: &str) -> Result<Answer> {
        writeln!(self.output, "== {} ==", title)?;
        write!(self.output, "{} ('<' back, 'q' quit): ", question)?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read answer")?;
        if read == 0 {
            return Ok(Answer::Exit);
        }

        Ok(match line.trim() {
            "<" => Answer::Back,
            "q" => Answer::Exit,
            value => Answer::Value(value.to_string()),
        })
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "! {}", message)?;
        Ok(())
    }
}

/// Validator for a text entry: the value to store, or a message to show.
pub type Validator = Box<dyn Fn(&str, &Context) -> std::result::Result<Value, String>>;

/// Asks one question and stores the validated answer under one key.
pub struct TextEntryScreen {
    key: String,
    title: String,
    question: String,
    validator: Validator,
    prompt: SharedPrompt,
}

impl TextEntryScreen {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        question: impl Into<String>,
        prompt: SharedPrompt,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            question: question.into(),
            validator: Box::new(|value, _| Ok(Value::String(value.to_string()))),
            prompt,
        }
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str, &Context) -> std::result::Result<Value, String> + 'static,
    {
        self.validator = Box::new(validator);
        self
    }
}

impl Step for TextEntryScreen {
    fn id(&self) -> &str {
        &self.key
    }

    fn run(&mut self, ctx: &mut Context) -> Result<ScreenResult> {
        let answer = self.prompt.borrow_mut().ask(&self.title, &self.question)?;
        match answer {
            Answer::Back => Ok(ScreenResult::Back),
            Answer::Exit => Ok(ScreenResult::Exit),
            Answer::Value(raw) => match (self.validator)(&raw, ctx) {
                Ok(value) => Ok(ScreenResult::forward_with(self.key.clone(), value)),
                Err(message) => {
                    self.prompt.borrow_mut().notify(&message)?;
                    Ok(ScreenResult::Repeat)
                }
            },
        }
    }
}

/// One partition request collected by [`MountpointScreen`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRequest {
    pub mountpoint: String,
    pub size_mib: u64,
}

/// Reads `<mountpoint> <size>` and adds it to the `partitions` list.
///
/// Each screen owns one entry. Revisiting the screen after `Back` replaces
/// that entry instead of adding a second one.
pub struct MountpointScreen {
    prompt: SharedPrompt,
    accepted: Option<PartitionRequest>,
}

impl MountpointScreen {
    pub fn new(prompt: SharedPrompt) -> Self {
        Self {
            prompt,
            accepted: None,
        }
    }

    fn existing(ctx: &Context) -> Vec<PartitionRequest> {
        ctx.get(keys::PARTITIONS)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    fn parse(raw: &str, existing: &[PartitionRequest]) -> std::result::Result<PartitionRequest, String> {
        let mut parts = raw.split_whitespace();
        let (Some(mountpoint), Some(size), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err("Enter a mountpoint and a size, e.g. '/boot 512M'".to_string());
        };

        let in_use: Vec<&str> = existing.iter().map(|p| p.mountpoint.as_str()).collect();
        let mountpoint = validate_mountpoint(mountpoint, &in_use).map_err(|e| e.to_string())?;
        let size = str_to_size(size, SizeUnit::Mib)
            .filter(|s| s.mib() > 0)
            .ok_or_else(|| format!("'{}' is not a valid size", size))?;

        Ok(PartitionRequest {
            mountpoint,
            size_mib: size.mib(),
        })
    }
}

impl Step for MountpointScreen {
    fn id(&self) -> &str {
        "mountpoint"
    }

    fn run(&mut self, ctx: &mut Context) -> Result<ScreenResult> {
        let answer = self
            .prompt
            .borrow_mut()
            .ask("Add Partition", "Mountpoint and size")?;
        let raw = match answer {
            Answer::Back => return Ok(ScreenResult::Back),
            Answer::Exit => return Ok(ScreenResult::Exit),
            Answer::Value(raw) => raw,
        };

        let mut partitions = Self::existing(ctx);
        if let Some(previous) = &self.accepted {
            if let Some(pos) = partitions.iter().rposition(|p| p == previous) {
                partitions.remove(pos);
            }
        }
        match Self::parse(&raw, &partitions) {
            Ok(request) => {
                debug!(mountpoint = %request.mountpoint, size_mib = request.size_mib, "partition accepted");
                self.accepted = Some(request.clone());
                partitions.push(request);
                let value = serde_json::to_value(&partitions)?;
                Ok(ScreenResult::forward_with(keys::PARTITIONS, value))
            }
            Err(message) => {
                self.prompt.borrow_mut().notify(&message)?;
                Ok(ScreenResult::Repeat)
            }
        }
    }
}

/// Final yes/no gate before anything destructive happens.
pub struct ConfirmScreen {
    question: String,
    prompt: SharedPrompt,
}

impl ConfirmScreen {
    pub fn new(question: impl Into<String>, prompt: SharedPrompt) -> Self {
        Self {
            question: question.into(),
            prompt,
        }
    }
}

impl Step for ConfirmScreen {
    fn id(&self) -> &str {
        "confirm"
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<ScreenResult> {
        let answer = self.prompt.borrow_mut().ask("Confirm", &self.question)?;
        Ok(match answer {
            Answer::Back => ScreenResult::Back,
            Answer::Exit => ScreenResult::Exit,
            Answer::Value(v) => match v.to_ascii_lowercase().as_str() {
                "y" | "yes" => ScreenResult::next(),
                "n" | "no" => ScreenResult::Exit,
                _ => {
                    self.prompt.borrow_mut().notify("Answer 'yes' or 'no'")?;
                    ScreenResult::Repeat
                }
            },
        })
    }
}

/// Hostname rule shared by the interactive screen and config validation.
pub fn validate_hostname(name: &str) -> std::result::Result<(), String> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !name.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid hostname", name))
    }
}

/// The interactive install sequence: hostname, NTP servers, partitions, confirm.
pub fn default_screens(prompt: SharedPrompt) -> Vec<Box<dyn Step>> {
    vec![
        Box::new(
            TextEntryScreen::new(keys::HOSTNAME, "Hostname", "System hostname", prompt.clone())
                .with_validator(|value, _| {
                    validate_hostname(value).map(|()| Value::String(value.to_string()))
                }),
        ),
        Box::new(
            TextEntryScreen::new(
                keys::NTP_SERVERS,
                "Time",
                "NTP servers, comma separated (empty for none)",
                prompt.clone(),
            )
            .with_validator(|value, _| {
                let servers: Vec<Value> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect();
                if servers
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|s| s.chars().any(char::is_whitespace))
                {
                    return Err("Server names cannot contain spaces".to_string());
                }
                Ok(Value::Array(servers))
            }),
        ),
        Box::new(MountpointScreen::new(prompt.clone())),
        Box::new(ConfirmScreen::new(
            "Write changes to disk and install?",
            prompt,
        )),
    ]
}

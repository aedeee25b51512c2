//! # Console Output
//!
//! Prints responses and notifications in one of two modes:
//!
//! - **Text**: a prompt, then each response as indented `key: value` lines.
//!   Help gets its own wrapped layout.
//! - **JSON**: exactly one JSON object per line and nothing else, so a client
//!   can parse standard output line by line.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;
use xbdc_core::Notification;
use xbdc_protocol::response::{HelpEntry, ResponsePayload};
use xbdc_protocol::Response;

/// Column the help text wraps at.
const HELP_WIDTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode
{
    Text,
    Json,
}

/// Owns standard output (or any writer in tests).
pub struct Console<W: Write>
{
    out: W,
    mode: OutputMode,
}

impl<W: Write> Console<W>
{
    pub fn new(out: W, mode: OutputMode) -> Self
    {
        Self { out, mode }
    }

    pub fn mode(&self) -> OutputMode
    {
        self.mode
    }

    pub fn banner(&mut self) -> io::Result<()>
    {
        if self.mode == OutputMode::Text {
            writeln!(self.out, "==== Xbox Debug Console ====")?;
            writeln!(self.out, "Type 'help' or '?' for a list of commands.")?;
        }
        self.out.flush()
    }

    /// `Xbox> ` while a console is connected, `> ` otherwise. Never printed
    /// in JSON mode.
    pub fn prompt(&mut self, connected: bool) -> io::Result<()>
    {
        if self.mode == OutputMode::Text {
            write!(self.out, "{}", if connected { "Xbox> " } else { "> " })?;
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn response(&mut self, response: &Response) -> io::Result<()>
    {
        let rendered = match self.mode {
            OutputMode::Json => json_line(response)?,
            OutputMode::Text => match response.payload() {
                Some(ResponsePayload::Help(entries)) => render_help(entries),
                _ => render_text(response)?,
            },
        };
        self.out.write_all(rendered.as_bytes())?;
        self.out.flush()
    }

    pub fn notification(&mut self, notification: &Notification) -> io::Result<()>
    {
        let rendered = match self.mode {
            OutputMode::Json => json_line(notification)?,
            OutputMode::Text => format!("\n{}", render_text(notification)?),
        };
        self.out.write_all(rendered.as_bytes())?;
        self.out.flush()
    }
}

fn json_line<T: Serialize>(value: &T) -> io::Result<String>
{
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

/// Any serializable value as nested `key: value` lines.
fn render_text<T: Serialize>(value: &T) -> io::Result<String>
{
    let value = serde_json::to_value(value)?;
    let mut out = String::new();
    render_value(&value, 1, &mut out);
    Ok(out)
}

fn render_value(value: &Value, indent: usize, out: &mut String)
{
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(fields) => {
            for (key, field) in fields {
                out.push_str(&format!("{pad}{key}:"));
                render_field(field, indent, out);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                out.push_str(&format!("{pad}[{index}]:"));
                render_field(item, indent, out);
            }
        }
        scalar => out.push_str(&format!("{pad}{}\n", scalar_text(scalar))),
    }
}

/// The part after `key:`: scalars stay on the line, containers nest below it.
fn render_field(value: &Value, indent: usize, out: &mut String)
{
    match value {
        Value::Object(_) | Value::Array(_) => {
            out.push('\n');
            render_value(value, indent + 1, out);
        }
        scalar => out.push_str(&format!(" {}\n", scalar_text(scalar))),
    }
}

fn scalar_text(value: &Value) -> String
{
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn render_help(entries: &[HelpEntry]) -> String
{
    let mut out = String::from("Available commands:\n");
    for entry in entries {
        out.push_str(&format!("  {}\n", entry.command));
        for line in wrap(&entry.description, HELP_WIDTH) {
            out.push_str(&format!("      {line}\n"));
        }
        for arg in &entry.args {
            let text = format!("{}: {}", arg.name, arg.description);
            for (index, line) in wrap(&text, HELP_WIDTH).into_iter().enumerate() {
                let pad = if index == 0 { "        " } else { "          " };
                out.push_str(&format!("{pad}{line}\n"));
            }
        }
    }
    out
}

/// Greedy word wrap. A word longer than `width` gets a line of its own.
fn wrap(text: &str, width: usize) -> Vec<String>
{
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

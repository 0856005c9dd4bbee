//! Terminal output and the interactive resolution prompt.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use pyq::{
  classifier::{Question, Request},
  crawl::{CrawlReport, InventoryEntry},
};

use super::*;

pub static INFO_PREFIX: &str = "ℹ ";
pub static SUCCESS_PREFIX: &str = "✓ ";
pub static ERROR_PREFIX: &str = "✗ ";
pub static WARNING_PREFIX: &str = "! ";
pub static PROMPT_PREFIX: &str = "❯ ";
pub static ITEM_PREFIX: &str = "├─";
pub static LAST_ITEM_PREFIX: &str = "└─";
pub static CONTINUE_PREFIX: &str = "│  ";

/// Things the CLI reports to the user.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  /// Totals of a finished or aborted crawl
  Report(&'a CrawlReport),
  /// A `--list-only` enumeration
  Inventory(&'a [InventoryEntry]),
  /// A completed step
  Success(&'a str),
  /// Something the user should notice
  Warning(&'a str),
  /// Plain information
  Info(&'a str),
}

/// Prints `content` to stdout.
pub fn reply(content: ResponseContent) {
  match content {
    ResponseContent::Report(report) => {
      let prefix = if report.aborted { WARNING_PREFIX } else { SUCCESS_PREFIX };
      let headline = if report.aborted { "Crawl stopped early" } else { "Crawl finished" };
      println!("{} {}", style(prefix).green(), style(headline).bold());
      let rows = [
        ("Papers", report.files),
        ("Directories", report.directories),
        ("Excluded", report.excluded),
        ("Unclassified", report.unclassified),
        ("Failed", report.failed),
      ];
      for (i, (label, count)) in rows.iter().enumerate() {
        let branch = if i + 1 == rows.len() { LAST_ITEM_PREFIX } else { ITEM_PREFIX };
        println!("   {} {:<13} {}", style(branch).dim(), label, style(count).cyan());
      }
    },
    ResponseContent::Inventory(entries) => {
      for entry in entries {
        let indent = CONTINUE_PREFIX.repeat(entry.depth);
        if entry.is_directory {
          println!("{}{} {}/", style(indent).dim(), style(ITEM_PREFIX).dim(), style(&entry.name).blue());
        } else {
          println!("{}{} {}", style(indent).dim(), style(ITEM_PREFIX).dim(), entry.name);
        }
      }
      let files = entries.iter().filter(|entry| !entry.is_directory).count();
      println!(
        "{} {} files in {} directories",
        style(INFO_PREFIX).blue(),
        style(files).cyan(),
        style(entries.len() - files).cyan()
      );
    },
    ResponseContent::Success(message) => println!("{} {message}", style(SUCCESS_PREFIX).green()),
    ResponseContent::Warning(message) => println!("{} {message}", style(WARNING_PREFIX).yellow()),
    ResponseContent::Info(message) => println!("{} {message}", style(INFO_PREFIX).blue()),
  }
}

/// Asks a yes/no question on the terminal.
pub fn confirm(message: &str) -> Result<bool> {
  Ok(
    Confirm::with_theme(&ColorfulTheme::default())
      .with_prompt(message)
      .default(true)
      .interact()?,
  )
}

/// Answers resolution questions from the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TerminalPrompt {
  /// Prints the file under resolution and its suggestions.
  fn show(request: &Request) {
    println!();
    println!("{} {}", style(PROMPT_PREFIX).yellow(), style(&request.path).bold());
    println!("   {} {}", style("Unmatched text:").dim(), style(&request.fragment).cyan());
    if request.suggestions.is_empty() {
      println!("   {}", style("No suggestions").dim());
    }
    for (i, suggestion) in request.suggestions.iter().enumerate() {
      let branch =
        if i + 1 == request.suggestions.len() { LAST_ITEM_PREFIX } else { ITEM_PREFIX };
      println!(
        "   {} {}. {} {}",
        style(branch).dim(),
        style(i + 1).cyan(),
        suggestion.standard,
        style(format!("({})", suggestion.subject_key)).dim()
      );
    }
    println!(
      "   {}",
      style("number: accept  s: skip  e: exclude  f: use file name  n: new subject  q: quit").dim()
    );
  }

  fn read(prompt: &str, default: Option<&str>) -> pyq::error::Result<String> {
    let theme = ColorfulTheme::default();
    let mut input = Input::<String>::with_theme(&theme)
      .with_prompt(prompt)
      .allow_empty(true);
    if let Some(default) = default {
      input = input.default(default.to_string());
    }
    input.interact_text().map_err(|e| PyqError::Io(std::io::Error::other(e.to_string())))
  }
}

impl Prompt for TerminalPrompt {
  fn ask(&mut self, question: &Question<'_>) -> pyq::error::Result<String> {
    match question {
      Question::Choice(request) => {
        Self::show(request);
        Self::read("Choice", None)
      },
      Question::SubjectName(request) => Self::read("Subject name", Some(&request.raw_name())),
      Question::SubjectKey { name, default } =>
        Self::read(&format!("Key for {name}"), Some(default)),
    }
  }

  fn reject(&mut self, message: &str) {
    println!("{} {message}", style(ERROR_PREFIX).red());
  }
}

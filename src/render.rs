use std::io::Write;

use crossterm::style::{StyledContent, Stylize};

use crate::error::Result;
use crate::types::AnnotatedPullRequest;

/// Receives the listing as it is produced: a header per repository followed
/// by that repository's pull requests.
pub trait Renderer {
    fn begin_repository(&mut self, name: &str, language: &str) -> Result<()>;
    fn pull_request(&mut self, pr: &AnnotatedPullRequest) -> Result<()>;
}

/// Writes the listing as colored lines. Pull-request numbers are padded to
/// four columns and followed by a space before the quoted title, so numbers
/// of any width stay separated from it.
pub struct TerminalRenderer<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn banner(&mut self, forge: &str) -> Result<()> {
        let line = self.paint(format!("Connecting to {}...", forge), |s| s.green());
        writeln!(self.out, "{}", line)?;
        Ok(())
    }

    fn paint(
        &self,
        text: String,
        style: impl FnOnce(StyledContent<String>) -> StyledContent<String>,
    ) -> String {
        if self.color {
            style(text.stylize()).to_string()
        } else {
            text
        }
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn begin_repository(&mut self, name: &str, language: &str) -> Result<()> {
        let name = self.paint(name.to_string(), |s| s.bold().green());
        let language = self.paint(format!("[{}]", language), |s| s.blue());
        writeln!(self.out, "{} {}", name, language)?;
        Ok(())
    }

    fn pull_request(&mut self, pr: &AnnotatedPullRequest) -> Result<()> {
        let number = self.paint(format!("#{:<4}", pr.number), |s| s.bold().white());
        let title = self.paint(format!("{:?}", pr.title), |s| s.cyan());
        let status = if pr.mergeable {
            self.paint("mergeable".to_string(), |s| s.green())
        } else {
            self.paint("unmergeable".to_string(), |s| s.red())
        };

        write!(self.out, "  {} {} {}", number, title, status)?;
        if pr.stale {
            let stale = self.paint("very-old".to_string(), |s| s.bold().underlined().yellow());
            write!(self.out, " {}", stale)?;
        }
        writeln!(self.out)?;
        Ok(())
    }
}

use std::io::{self, BufRead, Write};

/// Line-oriented question/answer source for interactive commands.
pub trait Prompter {
    /// Asks for a non-empty value. A blank answer takes `default` when one is given.
    fn ask(&mut self, label: &str, default: &str) -> io::Result<String>;
}

pub struct StdioPrompter<R, W> {
    input: R,
    output: W,
}

impl StdioPrompter<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> StdioPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompter for StdioPrompter<R, W> {
    fn ask(&mut self, label: &str, default: &str) -> io::Result<String> {
        loop {
            if default.is_empty() {
                write!(self.output, "{label}: ")?;
            } else {
                write!(self.output, "{label} [{default}]: ")?;
            }
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("no answer for `{label}`"),
                ));
            }

            let answer = line.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
            if !default.is_empty() {
                return Ok(default.to_string());
            }
            writeln!(self.output, "Input must not be empty")?;
        }
    }
}

//! # Command Loop
//!
//! Reads one line, decodes it in the active mode, dispatches it and prints
//! the response. Pending notifications are printed only after the response,
//! so they never interleave with command output. The loop ends at end of
//! input or after a quit command.

use std::io::{self, BufRead, Write};

use tracing::debug;
use xbdc_core::Dispatcher;
use xbdc_protocol::{decode_json, decode_text, Response};

use crate::console::{Console, OutputMode};

pub struct Repl<R, W: Write>
{
    dispatcher: Dispatcher,
    input: R,
    console: Console<W>,
}

impl<R: BufRead, W: Write> Repl<R, W>
{
    pub fn new(dispatcher: Dispatcher, input: R, console: Console<W>) -> Self
    {
        Self {
            dispatcher,
            input,
            console,
        }
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher
    {
        &mut self.dispatcher
    }

    /// Print a response produced outside the loop, e.g. a start-up symbol load.
    pub fn print(&mut self, response: &Response) -> io::Result<()>
    {
        self.console.response(response)?;
        self.flush_notifications()
    }

    /// Run until quit or end of input.
    ///
    /// ## Errors
    ///
    /// Returns an error only when reading input or writing output fails.
    pub fn run(&mut self) -> io::Result<()>
    {
        self.console.banner()?;
        let mut line = String::new();
        while self.dispatcher.is_running() {
            self.console.prompt(self.dispatcher.is_connected())?;
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                debug!("end of input");
                break;
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            let response = self.execute(input);
            self.print(&response)?;
        }
        Ok(())
    }

    fn execute(&mut self, input: &str) -> Response
    {
        let decoded = match self.console.mode() {
            OutputMode::Text => decode_text(input),
            OutputMode::Json => decode_json(input),
        };
        match decoded {
            Ok(request) => self.dispatcher.dispatch(request),
            Err(err) => {
                debug!(%err, "input rejected");
                Response::from(err)
            }
        }
    }

    fn flush_notifications(&mut self) -> io::Result<()>
    {
        for notification in self.dispatcher.notifications().drain() {
            self.console.notification(&notification)?;
        }
        Ok(())
    }
}

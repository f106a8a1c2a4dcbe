//! Print each command typed into the terminal, until `ZZ` is typed.
//!
//! A TOML configuration file can be given as the first argument. Setting `RUST_LOG` (for
//! example, `RUST_LOG=vimgrammar=debug`) writes the interpreter's logs to `keylog.log`.
use std::error::Error;
use std::io::{self, Write};
use std::sync::Mutex;

use crossbeam_channel::{select, unbounded, Receiver};
use crossterm::event::{self, Event};
use crossterm::terminal;

use vimgrammar::action::RegisterEffect;
use vimgrammar::catalog::Catalog;
use vimgrammar::config::SessionConfig;
use vimgrammar::dispatch::{ActionRequest, Editor, Effect};
use vimgrammar::keytrie::timer::{ChannelTimer, TimerTicket};
use vimgrammar::register::{RegisterCell, RegisterShape};
use vimgrammar::session::{ContextId, Session};

/// An editor without any text, which prints what it's asked to do.
struct Printer {
    out: io::Stdout,
}

impl Printer {
    fn line(&mut self, s: &str) -> io::Result<()> {
        // Raw mode needs explicit carriage returns.
        write!(self.out, "{s}\r\n")?;
        self.out.flush()
    }
}

impl Editor for Printer {
    type Error = io::Error;

    fn begin_change(&mut self) {}

    fn end_change(&mut self) {}

    fn perform(&mut self, req: &ActionRequest<'_>) -> Result<Effect, io::Error> {
        let cmd = req.command;
        let mut desc = format!("{:>12}  {}", cmd.notation(), cmd.name());

        if let Some(count) = cmd.count {
            desc.push_str(&format!(" x{count}"));
        }

        if let Some(register) = cmd.register {
            desc.push_str(&format!(" {register}"));
        }

        if let Some(argument) = cmd.argument {
            desc.push_str(&format!(" {argument}"));
        }

        if let Some(cell) = &req.contents {
            desc.push_str(&format!(" <- {:?}", cell.text));
        }

        self.line(&desc)?;

        // Pretend that the keys themselves were the text.
        let cell = RegisterCell::new(RegisterShape::CharWise, cmd.notation());
        let effect = match cmd.effect() {
            RegisterEffect::Yank => Effect::Yanked(cell),
            RegisterEffect::Delete => Effect::Deleted(cell),
            RegisterEffect::Put | RegisterEffect::None => Effect::None,
        };

        Ok(effect)
    }
}

fn run(
    session: &mut Session,
    ctx: ContextId,
    printer: &mut Printer,
    events: Receiver<Event>,
    timers: Receiver<TimerTicket>,
) -> Result<(), Box<dyn Error>> {
    printer.line("Type some Vim commands, or ZZ to quit.")?;

    loop {
        let res = select! {
            recv(events) -> event => session.handle_event(ctx, printer, &event?),
            recv(timers) -> ticket => session.timeout(printer, ticket?),
        };

        match res {
            Ok(handled) => {
                if handled.executed.iter().any(|cmd| cmd.name() == "write-quit") {
                    return Ok(());
                }

                match handled.recovered {
                    Some(err) if !err.is_silent() => printer.line(&format!("! {err}"))?,
                    _ => {},
                }
            },
            Err(err) => {
                printer.line(&format!("! {err}"))?;
            },
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if std::env::var_os("RUST_LOG").is_some() {
        let log = std::fs::File::create("keylog.log")?;

        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(Mutex::new(log))
            .with_ansi(false)
            .init();
    }

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => SessionConfig::default(),
    };

    let (timer_tx, timer_rx) = unbounded();
    let (event_tx, event_rx) = unbounded();

    let mut session = Session::new(&Catalog::vim(), config)?;
    let ctx = session.open_context(Box::new(ChannelTimer::new(timer_tx)));
    let mut printer = Printer { out: io::stdout() };

    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.send(ev).is_err() {
                        return;
                    }
                },
                Err(e) => {
                    tracing::error!(err = %e, "failed to read terminal event");
                    return;
                },
            }
        }
    });

    terminal::enable_raw_mode()?;
    let res = run(&mut session, ctx, &mut printer, event_rx, timer_rx);
    terminal::disable_raw_mode()?;

    if let Some(err) = session.close_context(ctx) {
        tracing::debug!(%err, "closed with a partial command");
    }

    return res;
}

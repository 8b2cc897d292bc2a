// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Keyboard parameter entry.

use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use tracing::{info, span, warn, Level};

use crate::config::Params;
use crate::playback::PlayParams;
use crate::sync::Publisher;

mod command;

pub use command::{Command, ParseError, USAGE};

/// Requests the controller passes on to whoever runs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Print the current output level.
    Level,
    /// Stop playback and exit. Also sent when input ends.
    Quit,
}

/// Turns keyboard commands into published parameter snapshots.
pub struct Controller {
    params: Params,
    sample_rate: u32,
    publisher: Publisher<PlayParams>,
    events_tx: Sender<Event>,
}

impl Controller {
    pub fn new(
        params: Params,
        sample_rate: u32,
        publisher: Publisher<PlayParams>,
        events_tx: Sender<Event>,
    ) -> Controller {
        Controller {
            params,
            sample_rate,
            publisher,
            events_tx,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Publishes the current parameters.
    pub fn publish(&mut self) {
        self.publisher
            .publish(self.params.to_play_params(self.sample_rate));
    }

    /// Applies one command. Returns false once the controller should stop.
    pub fn apply<W: Write>(&mut self, command: Command, writer: &mut W) -> io::Result<bool> {
        match command {
            Command::Walk(kmh) => {
                let kmh = self.params.set_walk(kmh);
                writeln!(writer, "walk {kmh:.1} km/h")?;
            }
            Command::Pitch(semitones) => {
                let semitones = self.params.set_pitch(semitones);
                writeln!(writer, "pitch +/-{semitones:.1} semitones")?;
            }
            Command::Volume(db) => {
                let db = self.params.set_volume(db);
                writeln!(writer, "volume -{db:.1} dB")?;
            }
            Command::Lpf(khz) => {
                let khz = self.params.set_lpf(khz);
                writeln!(writer, "lpf -{khz:.1} kHz")?;
            }
            Command::Q(q) => {
                let q = self.params.set_q(q);
                writeln!(writer, "q +{q:.2}")?;
            }
            Command::Lfo(lfo) => {
                self.params.set_lfo(lfo);
                match self.params.lfo() {
                    Some((rate, depth)) => writeln!(writer, "lfo {rate:.1} Hz {depth:.0} %")?,
                    None => writeln!(writer, "lfo off")?,
                }
            }
            Command::Distortion(on) => {
                self.params.set_distortion(on);
                writeln!(writer, "dist {}", if on { "on" } else { "off" })?;
            }
            Command::Fade(on) => {
                self.params.set_fadeout(on);
                writeln!(writer, "fade {}", if on { "on" } else { "off" })?;
            }
            Command::Show => {
                writeln!(writer, "{}", self.params)?;
                return Ok(true);
            }
            Command::Help => {
                writeln!(writer, "{USAGE}")?;
                return Ok(true);
            }
            Command::Level => {
                self.send(Event::Level);
                return Ok(true);
            }
            Command::Quit => {
                self.send(Event::Quit);
                return Ok(false);
            }
        }

        info!(command = ?command, "Parameters changed.");
        self.publish();
        Ok(true)
    }

    /// Reads commands until `quit` or the end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, mut reader: R, mut writer: W) -> io::Result<()> {
        let mut line = String::new();
        loop {
            write!(writer, "> ")?;
            writer.flush()?;

            line.clear();
            if reader.read_line(&mut line)? == 0 {
                self.send(Event::Quit);
                return Ok(());
            }
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(command) => {
                    if !self.apply(command, &mut writer)? {
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!(input = line.trim(), error = %e, "Unrecognized input");
                    writeln!(writer, "{e} (type help for commands)")?;
                }
            }
        }
    }

    fn send(&self, event: Event) {
        if self.events_tx.send(event).is_err() {
            warn!(event = ?event, "Nobody is listening for controller events.");
        }
    }

    /// Runs the controller on stdin and stdout on its own thread.
    pub fn spawn(mut self) -> io::Result<JoinHandle<io::Result<()>>> {
        thread::Builder::new()
            .name("footfall-keyboard".into())
            .spawn(move || {
                let span = span!(Level::INFO, "keyboard controller");
                let _enter = span.enter();

                info!("Keyboard controller started.");
                self.run(io::stdin().lock(), io::stdout())
            })
    }
}

#[cfg(test)]
mod test {
    use std::io::{BufReader, Cursor};

    use super::{Controller, Event};
    use crate::config::Params;
    use crate::playback::{step_frames_for_speed, PlayParams};
    use crate::sync::triple_buffer;

    fn run(input: &str) -> (PlayParams, Vec<Event>, String) {
        let (publisher, mut subscriber) = triple_buffer(PlayParams::new(48000));
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let mut controller = Controller::new(Params::default(), 48000, publisher, events_tx);

        let mut output = Cursor::new(Vec::new());
        controller
            .run(BufReader::new(input.as_bytes()), &mut output)
            .unwrap();

        let params = *subscriber.latest();
        let events = events_rx.try_iter().collect();
        (params, events, String::from_utf8(output.into_inner()).unwrap())
    }

    #[test]
    fn commands_publish_params() {
        let (params, events, _) = run("walk 6\npitch 3\nlfo 5 50\ndist on\nfade off\nquit\n");
        assert_eq!(params.step_frames, step_frames_for_speed(48000, 6.0));
        assert_eq!(params.pitch_deviation, 3.0);
        assert!(params.lfo_enabled);
        assert_eq!(params.lfo_rate, 5.0);
        assert_eq!(params.lfo_depth, 0.5);
        assert!(params.distortion);
        assert!(!params.fadeout);
        assert_eq!(events, vec![Event::Quit]);
    }

    #[test]
    fn values_are_clamped() {
        let (params, _, output) = run("pitch 40\nlpf -3\n");
        assert_eq!(params.pitch_deviation, 12.0);
        assert_eq!(params.lpf_freq_deviation, 0.0);
        assert!(output.contains("pitch +/-12.0 semitones"));
    }

    #[test]
    fn stops_at_quit_and_end_of_input() {
        let (params, events, _) = run("level\nquit\nwalk 12\n");
        assert_eq!(params, PlayParams::new(48000));
        assert_eq!(events, vec![Event::Level, Event::Quit]);

        let (_, events, _) = run("show\n");
        assert_eq!(events, vec![Event::Quit]);
    }

    #[test]
    fn bad_input_is_reported() {
        let (params, _, output) = run("jump\nwalk fast\n\n");
        assert_eq!(params, PlayParams::new(48000));
        assert!(output.contains("Unknown command jump"));
        assert!(output.contains("fast is not a number"));
    }
}

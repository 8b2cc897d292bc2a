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
use std::str::FromStr;

pub const WALK: &str = "walk";
pub const PITCH: &str = "pitch";
pub const VOLUME: &str = "volume";
pub const LPF: &str = "lpf";
pub const Q: &str = "q";
pub const LFO: &str = "lfo";
pub const DIST: &str = "dist";
pub const FADE: &str = "fade";
pub const SHOW: &str = "show";
pub const LEVEL: &str = "level";
pub const HELP: &str = "help";
pub const QUIT: &str = "quit";

pub const USAGE: &str = "\
walk <1-12>         walking speed in km/h
pitch <0-12>        pitch deviation in semitones
volume <0-90>       volume deviation in dB
lpf <0-19>          low-pass cutoff deviation in kHz
q <0-8>             resonance deviation
lfo <1-20> <0-100>  LFO rate in Hz and depth in percent
lfo off             disable the LFO
dist on|off         waveshaper distortion
fade on|off         fade clips cut short by the step
show                print the current parameters
level               print the output level
help                print this help
quit                stop playback and exit";

/// One line of keyboard input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Walk(f32),
    Pitch(f32),
    Volume(f32),
    Lpf(f32),
    Q(f32),
    /// Rate and depth, or `None` to turn the LFO off.
    Lfo(Option<(f32, f32)>),
    Distortion(bool),
    Fade(bool),
    Show,
    Level,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("No command given")]
    Empty,

    #[error("Unknown command {0}")]
    Unknown(String),

    #[error("{0} needs a value")]
    MissingArgument(&'static str),

    #[error("{0} is not a number")]
    BadNumber(String),

    #[error("Expected on or off, got {0}")]
    BadSwitch(String),

    #[error("Too many arguments for {0}")]
    TooManyArguments(&'static str),
}

fn number(name: &'static str, arg: Option<&str>) -> Result<f32, ParseError> {
    let arg = arg.ok_or(ParseError::MissingArgument(name))?;
    arg.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::BadNumber(arg.to_string()))
}

fn switch(name: &'static str, arg: Option<&str>) -> Result<bool, ParseError> {
    match arg.ok_or(ParseError::MissingArgument(name))? {
        "on" | "1" | "true" => Ok(true),
        "off" | "0" | "false" => Ok(false),
        other => Err(ParseError::BadSwitch(other.to_string())),
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Command, ParseError> {
        let line = line.trim().to_lowercase();
        let mut args = line.split_whitespace();
        let name = args.next().ok_or(ParseError::Empty)?;

        let command = match name {
            WALK => Command::Walk(number(WALK, args.next())?),
            PITCH => Command::Pitch(number(PITCH, args.next())?),
            VOLUME => Command::Volume(number(VOLUME, args.next())?),
            LPF => Command::Lpf(number(LPF, args.next())?),
            Q => Command::Q(number(Q, args.next())?),
            LFO => match args.next() {
                Some("off") => Command::Lfo(None),
                rate => {
                    let rate = number(LFO, rate)?;
                    let depth = number(LFO, args.next())?;
                    Command::Lfo(Some((rate, depth)))
                }
            },
            DIST => Command::Distortion(switch(DIST, args.next())?),
            FADE => Command::Fade(switch(FADE, args.next())?),
            SHOW => Command::Show,
            LEVEL => Command::Level,
            HELP => Command::Help,
            QUIT | "exit" => Command::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };

        if args.next().is_some() {
            let name = match command {
                Command::Walk(_) => WALK,
                Command::Pitch(_) => PITCH,
                Command::Volume(_) => VOLUME,
                Command::Lpf(_) => LPF,
                Command::Q(_) => Q,
                Command::Lfo(_) => LFO,
                Command::Distortion(_) => DIST,
                Command::Fade(_) => FADE,
                Command::Show => SHOW,
                Command::Level => LEVEL,
                Command::Help => HELP,
                Command::Quit => QUIT,
            };
            return Err(ParseError::TooManyArguments(name));
        }
        Ok(command)
    }
}

#[cfg(test)]
mod test {
    use super::{Command, ParseError};

    #[test]
    fn parses_commands() {
        assert_eq!("walk 6".parse(), Ok(Command::Walk(6.0)));
        assert_eq!("  PITCH 2.5 ".parse(), Ok(Command::Pitch(2.5)));
        assert_eq!("volume 12".parse(), Ok(Command::Volume(12.0)));
        assert_eq!("lpf 4".parse(), Ok(Command::Lpf(4.0)));
        assert_eq!("q 1.5".parse(), Ok(Command::Q(1.5)));
        assert_eq!("lfo 3 50".parse(), Ok(Command::Lfo(Some((3.0, 50.0)))));
        assert_eq!("lfo off".parse(), Ok(Command::Lfo(None)));
        assert_eq!("dist on".parse(), Ok(Command::Distortion(true)));
        assert_eq!("fade off".parse(), Ok(Command::Fade(false)));
        assert_eq!("show".parse(), Ok(Command::Show));
        assert_eq!("level".parse(), Ok(Command::Level));
        assert_eq!("help".parse(), Ok(Command::Help));
        assert_eq!("quit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Command>(), Err(ParseError::Empty));
        assert_eq!(
            "jump 3".parse::<Command>(),
            Err(ParseError::Unknown("jump".into()))
        );
        assert_eq!("walk".parse::<Command>(), Err(ParseError::MissingArgument("walk")));
        assert_eq!(
            "walk fast".parse::<Command>(),
            Err(ParseError::BadNumber("fast".into()))
        );
        assert_eq!(
            "walk nan".parse::<Command>(),
            Err(ParseError::BadNumber("nan".into()))
        );
        assert_eq!("lfo 3".parse::<Command>(), Err(ParseError::MissingArgument("lfo")));
        assert_eq!(
            "dist maybe".parse::<Command>(),
            Err(ParseError::BadSwitch("maybe".into()))
        );
        assert_eq!(
            "walk 3 4".parse::<Command>(),
            Err(ParseError::TooManyArguments("walk"))
        );
    }
}

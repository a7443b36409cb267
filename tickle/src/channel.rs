//! The Channel Table
//!
//! Each interpreter owns a table of open I/O channels, by name.  Every table starts with
//! `stdin`, `stdout`, and `stderr`; files opened with `open` are added as `file1`,
//! `file2`, and so on.
//!
//! The table is a thin layer over `std::io`: the I/O commands (`puts`, `gets`, `open`,
//! `close`, `eof`, `seek`, `tell`, `flush`) translate their arguments and call straight
//! through to it.

use crate::types::*;
use crate::value::Value;
use alloc::format;
use alloc::string::String;
use indexmap::IndexMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};

/// How a file channel was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessMode {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
}

impl AccessMode {
    /// Parses an `open` access mode: `r`, `r+`, `w`, `w+`, `a`, or `a+`.
    pub fn parse(mode: &str) -> Result<Self, Exception> {
        let (read, write, append, truncate, create) = match mode {
            "r" => (true, false, false, false, false),
            "r+" => (true, true, false, false, false),
            "w" => (false, true, false, true, true),
            "w+" => (true, true, false, true, true),
            "a" => (false, true, true, false, true),
            "a+" => (true, true, true, false, true),
            _ => {
                return Err(Exception::error(
                    ErrorKind::Generic,
                    format!(
                        "illegal access mode \"{}\": must be r, r+, w, w+, a, or a+",
                        mode
                    ),
                ))
            }
        };

        Ok(Self {
            read,
            write,
            append,
            truncate,
            create,
        })
    }
}

enum Channel {
    Stdin { eof: bool },
    Stdout,
    Stderr,
    File {
        reader: BufReader<File>,
        mode: AccessMode,
        eof: bool,
    },
}

/// The named channels open in one interpreter.
pub struct ChannelTable {
    channels: IndexMap<String, Channel, TickleHasher>,
    next_id: usize,
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelTable {
    /// Creates a table holding the three standard channels.
    pub fn new() -> Self {
        let mut channels = IndexMap::default();
        channels.insert("stdin".into(), Channel::Stdin { eof: false });
        channels.insert("stdout".into(), Channel::Stdout);
        channels.insert("stderr".into(), Channel::Stderr);
        Self {
            channels,
            next_id: 1,
        }
    }

    /// The names of the open channels.
    pub fn names(&self) -> TickleList {
        self.channels.keys().map(Value::from).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Opens a file and returns the new channel's name.
    pub fn open(&mut self, path: &str, mode: &str) -> Result<String, Exception> {
        let mode = AccessMode::parse(mode)?;
        let file = OpenOptions::new()
            .read(mode.read)
            .write(mode.write && !mode.append)
            .append(mode.append)
            .truncate(mode.truncate)
            .create(mode.create)
            .open(path)
            .map_err(|err| io_error(&format!("couldn't open \"{}\"", path), err))?;

        let name = format!("file{}", self.next_id);
        self.next_id += 1;
        self.channels.insert(
            name.clone(),
            Channel::File {
                reader: BufReader::new(file),
                mode,
                eof: false,
            },
        );

        tracing::debug!(channel = %name, path, "opened channel");
        Ok(name)
    }

    /// Closes a channel.  The standard channels are removed from the table like any other.
    pub fn close(&mut self, name: &str) -> Result<(), Exception> {
        let channel = self
            .channels
            .shift_remove(name)
            .ok_or_else(|| bad_channel(name))?;

        if let Channel::File { mut reader, mode, .. } = channel {
            if mode.write {
                reader
                    .get_mut()
                    .flush()
                    .map_err(|err| io_error(&format!("error closing \"{}\"", name), err))?;
            }
        }

        tracing::debug!(channel = name, "closed channel");
        Ok(())
    }

    /// Writes text to a channel.
    pub fn print(&mut self, name: &str, text: &str) -> Result<(), Exception> {
        let context = || format!("error writing \"{}\"", name);
        match self.channel(name)? {
            Channel::Stdout => io::stdout()
                .write_all(text.as_bytes())
                .map_err(|err| io_error(&context(), err)),
            Channel::Stderr => io::stderr()
                .write_all(text.as_bytes())
                .map_err(|err| io_error(&context(), err)),
            Channel::File { reader, mode, .. } if mode.write => {
                // Drop any read-ahead so the write lands at the logical position.
                reader
                    .seek(SeekFrom::Current(0))
                    .and_then(|_| reader.get_mut().write_all(text.as_bytes()))
                    .map_err(|err| io_error(&context(), err))
            }
            _ => Err(Exception::error(
                ErrorKind::Generic,
                format!("channel \"{}\" wasn't opened for writing", name),
            )),
        }
    }

    /// Reads the next line from a channel, without its line ending.  Returns `None` at
    /// end of file.
    pub fn gets(&mut self, name: &str) -> Result<Option<String>, Exception> {
        let context = || format!("error reading \"{}\"", name);
        let mut line = String::new();

        let count = match self.channel(name)? {
            Channel::Stdin { eof } => {
                let count = io::stdin()
                    .lock()
                    .read_line(&mut line)
                    .map_err(|err| io_error(&context(), err))?;
                *eof = count == 0;
                count
            }
            Channel::File { reader, mode, eof } if mode.read => {
                let count = reader
                    .read_line(&mut line)
                    .map_err(|err| io_error(&context(), err))?;
                *eof = count == 0 || reader.fill_buf().map(|buf| buf.is_empty()).unwrap_or(true);
                count
            }
            _ => {
                return Err(Exception::error(
                    ErrorKind::Generic,
                    format!("channel \"{}\" wasn't opened for reading", name),
                ))
            }
        };

        if count == 0 {
            return Ok(None);
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    /// Reads the rest of a channel.
    pub fn read_all(&mut self, name: &str) -> Result<String, Exception> {
        let context = || format!("error reading \"{}\"", name);
        let mut text = String::new();
        match self.channel(name)? {
            Channel::Stdin { eof } => {
                io::stdin()
                    .lock()
                    .read_to_string(&mut text)
                    .map_err(|err| io_error(&context(), err))?;
                *eof = true;
            }
            Channel::File { reader, mode, eof } if mode.read => {
                reader
                    .read_to_string(&mut text)
                    .map_err(|err| io_error(&context(), err))?;
                *eof = true;
            }
            _ => {
                return Err(Exception::error(
                    ErrorKind::Generic,
                    format!("channel \"{}\" wasn't opened for reading", name),
                ))
            }
        }
        Ok(text)
    }

    /// True if the last read on the channel reached end of file.
    pub fn eof(&mut self, name: &str) -> Result<bool, Exception> {
        match self.channel(name)? {
            Channel::Stdin { eof } | Channel::File { eof, .. } => Ok(*eof),
            _ => Ok(false),
        }
    }

    /// Moves a file channel's position.  `origin` is `start`, `current`, or `end`.
    pub fn seek(&mut self, name: &str, offset: TickleInt, origin: &str) -> Result<(), Exception> {
        let pos = match origin {
            "start" => SeekFrom::Start(u64::try_from(offset).map_err(|_| {
                Exception::error(ErrorKind::Generic, format!("bad offset \"{}\"", offset))
            })?),
            "current" => SeekFrom::Current(offset),
            "end" => SeekFrom::End(offset),
            _ => {
                return Err(Exception::error(
                    ErrorKind::Generic,
                    format!(
                        "bad origin \"{}\": must be start, current, or end",
                        origin
                    ),
                ))
            }
        };

        match self.channel(name)? {
            Channel::File { reader, eof, .. } => {
                reader
                    .seek(pos)
                    .map_err(|err| io_error(&format!("error during seek on \"{}\"", name), err))?;
                *eof = false;
                Ok(())
            }
            _ => Err(unseekable(name)),
        }
    }

    /// A file channel's current position.
    pub fn tell(&mut self, name: &str) -> Result<TickleInt, Exception> {
        match self.channel(name)? {
            Channel::File { reader, .. } => {
                let pos = reader
                    .stream_position()
                    .map_err(|err| io_error(&format!("error during tell on \"{}\"", name), err))?;
                Ok(TickleInt::try_from(pos).unwrap_or(TickleInt::MAX))
            }
            _ => Ok(-1),
        }
    }

    pub fn flush(&mut self, name: &str) -> Result<(), Exception> {
        let context = || format!("error flushing \"{}\"", name);
        match self.channel(name)? {
            Channel::Stdout => io::stdout().flush().map_err(|err| io_error(&context(), err)),
            Channel::Stderr => io::stderr().flush().map_err(|err| io_error(&context(), err)),
            Channel::File { reader, .. } => reader
                .get_mut()
                .flush()
                .map_err(|err| io_error(&context(), err)),
            Channel::Stdin { .. } => Ok(()),
        }
    }

    fn channel(&mut self, name: &str) -> Result<&mut Channel, Exception> {
        self.channels
            .get_mut(name)
            .ok_or_else(|| bad_channel(name))
    }
}

fn bad_channel(name: &str) -> Exception {
    Exception::error(
        ErrorKind::Generic,
        format!("can not find channel named \"{}\"", name),
    )
}

fn unseekable(name: &str) -> Exception {
    Exception::error(
        ErrorKind::Generic,
        format!("error during seek on \"{}\": invalid argument", name),
    )
}

fn io_error(context: &str, err: io::Error) -> Exception {
    Exception::error(ErrorKind::Generic, format!("{}: {}", context, err))
}

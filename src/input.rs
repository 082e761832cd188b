use std::collections::VecDeque;
use std::io;

#[cfg(not(target_arch = "wasm32"))]
use crossterm::{
    event::{poll, read, Event, KeyCode, KeyModifiers},
    execute, terminal,
};
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

/// what the person at the terminal can ask the host to do between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Quit,
    /// restart the CPU, flash untouched
    Reset,
}

/// keys the terminal host listens for
const HOST_KEYMAP: [(char, HostCommand); 4] = [
    ('q', HostCommand::Quit),
    ('Q', HostCommand::Quit),
    ('r', HostCommand::Reset),
    ('R', HostCommand::Reset),
];

/// reads host commands without blocking
pub trait Input {
    /// the next pending command, if any
    fn poll_command(&mut self) -> Result<Option<HostCommand>, io::Error>;
}

/// Input from the controlling terminal, using crossterm. While it exists
/// the terminal is in raw mode on the alternate screen.
#[cfg(not(target_arch = "wasm32"))]
pub struct KeyboardInput;

#[cfg(not(target_arch = "wasm32"))]
impl KeyboardInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), terminal::EnterAlternateScreen)?;
        Ok(KeyboardInput)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Drop for KeyboardInput {
    fn drop(&mut self) {
        if let Err(e) = execute!(io::stdout(), terminal::LeaveAlternateScreen) {
            log::warn!("unable to leave the alternate screen: {}", e);
        }
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("unable to restore the terminal: {}", e);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Input for KeyboardInput {
    fn poll_command(&mut self) -> Result<Option<HostCommand>, io::Error> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => match evt.code {
                    KeyCode::Esc => return Ok(Some(HostCommand::Quit)),
                    KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(Some(HostCommand::Quit))
                    }
                    KeyCode::Char(key) => match command_for(key) {
                        Some(cmd) => return Ok(Some(cmd)),
                        None => log::trace!("unmapped key {:?}", key),
                    },
                    _ => log::trace!("ignored key event {:?}", evt),
                },
                other => log::trace!("ignored event {:?}", other),
            }
        }
        Ok(None)
    }
}

/// dummy Input implementation for testing; hands out a fixed script
pub struct DummyInput {
    commands: VecDeque<HostCommand>,
}

impl DummyInput {
    pub fn new(commands: &[HostCommand]) -> Self {
        DummyInput {
            commands: commands.iter().copied().collect(),
        }
    }
}

impl Input for DummyInput {
    fn poll_command(&mut self) -> Result<Option<HostCommand>, io::Error> {
        Ok(self.commands.pop_front())
    }
}

/// map a typed character the way the terminal host does
pub fn command_for(key: char) -> Option<HostCommand> {
    HOST_KEYMAP
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, cmd)| *cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keymap() {
        assert_eq!(command_for('q'), Some(HostCommand::Quit));
        assert_eq!(command_for('R'), Some(HostCommand::Reset));
        assert_eq!(command_for('x'), None);
    }

    #[test]
    fn test_dummy_input_in_order() -> Result<(), io::Error> {
        let mut i = DummyInput::new(&[HostCommand::Reset, HostCommand::Quit]);
        assert_eq!(i.poll_command()?, Some(HostCommand::Reset));
        assert_eq!(i.poll_command()?, Some(HostCommand::Quit));
        assert_eq!(i.poll_command()?, None);
        Ok(())
    }
}

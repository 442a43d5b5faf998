//! PC/SC card reader management

use std::ffi::CString;
use std::time::Duration;

use pcsc::{Card, Context, Protocols, ReaderState, Scope, ShareMode, State, MAX_BUFFER_SIZE};
use tracing::{debug, info};

use crate::apdu::{ApduCommand, ApduResponse};
use crate::error::CardError;
use crate::kernel::ApduTransport;

/// Result of waiting on a reader state change
///
/// A timeout is a state-preserving signal: callers re-arm the wait rather
/// than failing whatever they were doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Present,
    Removed,
    Timeout,
}

/// Card reader wrapper for managing PC/SC connections
pub struct CardReader {
    context: Context,
    readers: Vec<String>,
    selected: Option<String>,
    card: Option<Card>,
}

impl CardReader {
    /// Establish a PC/SC context and enumerate the attached readers
    pub fn new() -> Result<Self, CardError> {
        let context = Context::establish(Scope::User)?;

        let mut readers_buf = [0; 2048];
        let readers = context
            .list_readers(&mut readers_buf)?
            .map(|r| r.to_str().unwrap_or("Unknown").to_string())
            .collect();

        Ok(Self {
            context,
            readers,
            selected: None,
            card: None,
        })
    }

    /// Names of all attached readers
    pub fn readers(&self) -> &[String] {
        &self.readers
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select a reader by its position in [`CardReader::readers`]
    pub fn select_index(&mut self, index: usize) -> Result<(), CardError> {
        let name = self
            .readers
            .get(index)
            .ok_or_else(|| CardError::Malformed(format!("reader index {index} out of range")))?;

        self.selected = Some(name.clone());
        Ok(())
    }

    /// Select the first reader whose name contains `fragment`
    pub fn select_containing(&mut self, fragment: &str) -> Result<(), CardError> {
        let name = self
            .readers
            .iter()
            .find(|name| name.contains(fragment))
            .ok_or(CardError::NoReaderSelected)?;

        info!(reader = %name, "selected card reader");
        self.selected = Some(name.clone());
        Ok(())
    }

    fn selected_cstring(&self) -> Result<CString, CardError> {
        let name = self.selected.as_ref().ok_or(CardError::NoReaderSelected)?;
        CString::new(name.as_str())
            .map_err(|_| CardError::Malformed("reader name contains NUL".to_string()))
    }

    /// Block until a card lands on the selected reader or the timeout fires
    pub fn wait_for_card(&self, timeout: Duration) -> Result<WaitOutcome, CardError> {
        self.wait_for_state(State::EMPTY, State::PRESENT, WaitOutcome::Present, timeout)
    }

    /// Block until the selected reader is empty again or the timeout fires
    pub fn wait_for_removal(&self, timeout: Duration) -> Result<WaitOutcome, CardError> {
        self.wait_for_state(State::PRESENT, State::EMPTY, WaitOutcome::Removed, timeout)
    }

    fn wait_for_state(
        &self,
        current: State,
        wanted: State,
        outcome: WaitOutcome,
        timeout: Duration,
    ) -> Result<WaitOutcome, CardError> {
        let name = self.selected_cstring()?;
        let mut states = [ReaderState::new(name, current)];

        match self.context.get_status_change(timeout, &mut states) {
            Ok(()) => {
                if states[0].event_state().intersects(wanted) {
                    debug!(outcome = ?outcome, "reader state changed");
                    Ok(outcome)
                } else {
                    Ok(WaitOutcome::Timeout)
                }
            }
            Err(pcsc::Error::Timeout) => Ok(WaitOutcome::Timeout),
            Err(err) => Err(err.into()),
        }
    }

    /// Connect to the card on the selected reader
    pub fn connect(&mut self) -> Result<(), CardError> {
        let name = self.selected_cstring()?;
        let card = self
            .context
            .connect(&name, ShareMode::Shared, Protocols::ANY)?;

        self.card = Some(card);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.card = None;
    }
}

impl ApduTransport for CardReader {
    fn transmit(&mut self, command: &ApduCommand) -> Result<ApduResponse, CardError> {
        let card = self.card.as_ref().ok_or(CardError::NoReaderSelected)?;

        let mut rapdu_buf = [0; MAX_BUFFER_SIZE];
        let raw = card.transmit(&command.to_bytes(), &mut rapdu_buf)?;

        ApduResponse::parse(raw)
    }
}

//! Scripted transport double for unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::transport::{PageDriver, RawDriver, TagInfo, TagTechnology};

/// One recorded driver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Connect,
    Close,
    Transceive(Vec<u8>),
    ReadPages(u8),
    WritePage(u8, Vec<u8>),
}

#[derive(Default)]
pub(crate) struct MockState {
    pub calls: Vec<Call>,
    pub responses: VecDeque<Result<Vec<u8>>>,
    pub refuse_connect: bool,
}

/// Driver that answers from a response script and records every call
///
/// An empty script answers `Ok(vec![])`.
pub(crate) struct MockTech {
    tag: TagInfo,
    max: usize,
    connected: bool,
    state: Arc<Mutex<MockState>>,
}

impl MockTech {
    pub fn new(max: usize) -> (Self, Arc<Mutex<MockState>>) {
        Self::with_tag(max, nxp_tag())
    }

    pub fn with_tag(max: usize, tag: TagInfo) -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let tech = Self {
            tag,
            max,
            connected: false,
            state: Arc::clone(&state),
        };
        (tech, state)
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn next_response(&self) -> Result<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .responses
            .pop_front()
            .unwrap_or(Ok(Vec::new()))
    }
}

/// An NTAG215 as seen during anticollision
pub(crate) fn nxp_tag() -> TagInfo {
    TagInfo {
        uid: vec![0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66],
        sak: 0x00,
        atqa: [0x44, 0x00],
    }
}

/// Queue scripted answers
pub(crate) fn script(state: &Arc<Mutex<MockState>>, responses: Vec<Result<Vec<u8>>>) {
    state.lock().unwrap().responses.extend(responses);
}

/// Calls recorded so far
pub(crate) fn calls(state: &Arc<Mutex<MockState>>) -> Vec<Call> {
    state.lock().unwrap().calls.clone()
}

/// Only the raw frames sent so far
pub(crate) fn frames(state: &Arc<Mutex<MockState>>) -> Vec<Vec<u8>> {
    calls(state)
        .into_iter()
        .filter_map(|c| match c {
            Call::Transceive(frame) => Some(frame),
            _ => None,
        })
        .collect()
}

impl TagTechnology for MockTech {
    fn connect(&mut self) -> Result<()> {
        self.record(Call::Connect);
        if self.state.lock().unwrap().refuse_connect {
            return Err(Error::ConnectFailed);
        }
        self.connected = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.record(Call::Close);
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        self.record(Call::Transceive(frame.to_vec()));
        self.next_response()
    }

    fn max_transceive_length(&self) -> usize {
        self.max
    }

    fn tag(&self) -> &TagInfo {
        &self.tag
    }
}

impl PageDriver for MockTech {
    fn read_pages(&mut self, page: u8) -> Result<Vec<u8>> {
        self.record(Call::ReadPages(page));
        self.next_response()
    }

    fn write_page(&mut self, page: u8, data: &[u8]) -> Result<()> {
        self.record(Call::WritePage(page, data.to_vec()));
        self.next_response().map(|_| ())
    }
}

impl RawDriver for MockTech {}

//! A simulated 95-series EEPROM for tests.
//!
//! The SPI, chip-select and delay handles share one device state, so the
//! simulation sees the exact chip-select windows the driver produces.

use crate::command::{Opcodes, Status};
use crate::Geometry;
use core::convert::Infallible;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;
use std::cell::RefCell;
use std::rc::Rc;

/// Write cycle time of the simulated part.
pub const WRITE_CYCLE_MS: u32 = 5;

/// Injected SPI failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimFault;

#[derive(Debug)]
struct State {
    geometry: Geometry,
    memory: Vec<u8>,
    wel: bool,
    busy_ms: u32,
    stuck_busy: bool,
    selected: bool,
    frame: Vec<u8>,
    selects: usize,
    releases: usize,
    fail_in: Option<usize>,
    elapsed_ms: u32,
    status_polls: usize,
    page_writes: Vec<u32>,
    bytes_clocked: usize,
    commands_while_busy: usize,
}

impl State {
    fn busy(&self) -> bool {
        self.stuck_busy || self.busy_ms > 0
    }

    fn status(&self) -> u8 {
        let mut status = Status::empty();
        status.set(Status::WIP, self.busy());
        status.set(Status::WEL, self.wel);
        status.bits()
    }

    fn clock(&mut self, mosi: u8) -> u8 {
        let pos = self.frame.len();
        self.frame.push(mosi);
        self.bytes_clocked += 1;
        let ops = Opcodes::M95;
        if pos == 0 {
            if self.busy() && mosi != ops.read_status {
                self.commands_while_busy += 1;
            }
            return 0xFF;
        }
        let opcode = self.frame[0];
        if opcode == ops.read_status {
            self.status()
        } else if opcode == ops.read && pos >= 3 {
            let start = (self.frame[1] as usize) << 8 | self.frame[2] as usize;
            self.memory[(start + pos - 3) % self.memory.len()]
        } else {
            0xFF
        }
    }

    fn finish_frame(&mut self) {
        let frame = std::mem::replace(&mut self.frame, Vec::new());
        let ops = Opcodes::M95;
        match frame.first() {
            Some(&op) if op == ops.write_enable => self.wel = true,
            Some(&op) if op == ops.read_status => self.status_polls += 1,
            Some(&op) if op == ops.write && frame.len() > 3 && self.wel && !self.busy() => {
                let addr = ((frame[1] as u32) << 8 | frame[2] as u32) % self.geometry.capacity();
                let page_size = self.geometry.page_size();
                let base = addr - addr % page_size;
                for (i, byte) in frame[3..].iter().enumerate() {
                    // The device wraps around within the addressed page.
                    let offset = (addr % page_size + i as u32) % page_size;
                    self.memory[(base + offset) as usize] = *byte;
                }
                self.page_writes.push(addr);
                self.wel = false;
                self.busy_ms = WRITE_CYCLE_MS;
            }
            _ => {}
        }
    }
}

/// Handle to the shared device state.
#[derive(Debug, Clone)]
pub struct SimEeprom(Rc<RefCell<State>>);

impl SimEeprom {
    pub fn new(geometry: Geometry) -> Self {
        SimEeprom(Rc::new(RefCell::new(State {
            geometry,
            memory: vec![0; geometry.capacity() as usize],
            wel: false,
            busy_ms: 0,
            stuck_busy: false,
            selected: false,
            frame: Vec::new(),
            selects: 0,
            releases: 0,
            fail_in: None,
            elapsed_ms: 0,
            status_polls: 0,
            page_writes: Vec::new(),
            bytes_clocked: 0,
            commands_while_busy: 0,
        })))
    }

    pub fn spi(&self) -> SimSpi {
        SimSpi(self.0.clone())
    }

    pub fn cs(&self) -> SimCs {
        SimCs(self.0.clone())
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay(self.0.clone())
    }

    pub fn memory(&self) -> Vec<u8> {
        self.0.borrow().memory.clone()
    }

    pub fn load(&self, addr: usize, data: &[u8]) {
        self.0.borrow_mut().memory[addr..addr + data.len()].copy_from_slice(data);
    }

    pub fn fail_next_transfer(&self) {
        self.fail_transfer(0);
    }

    /// Fails the transfer call after `skip` successful ones.
    pub fn fail_transfer(&self, skip: usize) {
        self.0.borrow_mut().fail_in = Some(skip);
    }

    /// Keeps the write-in-progress bit set regardless of elapsed time.
    pub fn stick_busy(&self, stuck: bool) {
        self.0.borrow_mut().stuck_busy = stuck;
    }

    pub fn selects(&self) -> usize {
        self.0.borrow().selects
    }

    pub fn releases(&self) -> usize {
        self.0.borrow().releases
    }

    pub fn is_selected(&self) -> bool {
        self.0.borrow().selected
    }

    pub fn elapsed_ms(&self) -> u32 {
        self.0.borrow().elapsed_ms
    }

    pub fn status_polls(&self) -> usize {
        self.0.borrow().status_polls
    }

    /// Start addresses of all accepted WRITE commands, in order.
    pub fn page_writes(&self) -> Vec<u32> {
        self.0.borrow().page_writes.clone()
    }

    pub fn bytes_clocked(&self) -> usize {
        self.0.borrow().bytes_clocked
    }

    /// Commands other than RDSR issued during a write cycle.
    pub fn commands_while_busy(&self) -> usize {
        self.0.borrow().commands_while_busy
    }
}

#[derive(Debug)]
pub struct SimSpi(Rc<RefCell<State>>);

impl Transfer<u8> for SimSpi {
    type Error = SimFault;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], SimFault> {
        let mut guard = self.0.borrow_mut();
        let state = &mut *guard;
        match state.fail_in {
            Some(0) => {
                state.fail_in = None;
                return Err(SimFault);
            }
            Some(n) => state.fail_in = Some(n - 1),
            None => {}
        }
        assert!(state.selected, "bytes clocked while the chip is deselected");
        for word in words.iter_mut() {
            *word = state.clock(*word);
        }
        Ok(words)
    }
}

#[derive(Debug)]
pub struct SimCs(Rc<RefCell<State>>);

impl OutputPin for SimCs {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        let mut state = self.0.borrow_mut();
        state.selected = true;
        state.selects += 1;
        state.frame.clear();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut state = self.0.borrow_mut();
        if state.selected {
            state.finish_frame();
            state.releases += 1;
        }
        state.selected = false;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimDelay(Rc<RefCell<State>>);

impl DelayMs<u32> for SimDelay {
    fn delay_ms(&mut self, ms: u32) {
        let mut state = self.0.borrow_mut();
        state.elapsed_ms += ms;
        state.busy_ms = state.busy_ms.saturating_sub(ms);
    }
}

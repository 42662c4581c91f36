//! IEEE-488 (GPIB) peripheral handshake state machine. Grounded on
//! `original_source/src/perif_ieee488_tester.c`: the three-wire
//! DAV̅/NRFD̅/NDAC̅ acceptor/source handshake, command decode
//! (LISTEN/UNLISTEN/TALK/UNTALK/SECONDARY/OPEN/CLOSE), and
//! PETSCII-to-ASCII channel-name capture while a channel is being
//! opened. The original hardcodes its talker payload as a fixed test
//! buffer; here each channel's talk data is set explicitly instead, in
//! keeping with this workspace's in-memory-buffer stance.

use dromaius_core::{Chip, DependencyContext, Signal, SignalContext, SignalGroup, Tick};

const CHANNEL_COUNT: usize = 16;

const CMD_MASK: u8 = 0xf0;
const ADDR_MASK: u8 = 0x0f;
const CMD_LISTEN: u8 = 0x20;
const CMD_UNLISTEN: u8 = 0x30;
const CMD_TALK: u8 = 0x40;
const CMD_UNTALK: u8 = 0x50;
const CMD_SECONDARY: u8 = 0x60;
const CMD_CLOSE: u8 = 0xe0;
const CMD_OPEN: u8 = 0xf0;

fn petscii_to_ascii(code: u8) -> char {
    if (0x20..=0x5d).contains(&code) && code != 0x5c {
        code as char
    } else {
        '\0'
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum BusState {
    Idle,
    AcceptorStart,
    AcceptorReady,
    AcceptorDataAvailable,
    AcceptorDataTaken,
    SourceStart,
    SourceReady,
    SourceDataValid,
    SourceDataTaken,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CommState {
    Idle,
    Listening,
    StartTalking,
    Talking,
    Opening,
}

#[derive(Default)]
struct Channel {
    open: bool,
    name: String,
    talk_data: Vec<u8>,
    talk_pos: usize,
}

/// A single device on an IEEE-488 bus: responds to LISTEN/TALK
/// addressing at `address`, decodes the usual secondary-address
/// command set, and captures channel names opened against it while
/// listening.
pub struct Ieee488Device {
    eoi_b: Signal,
    dav_b: Signal,
    nrfd_b: Signal,
    ndac_b: Signal,
    atn_b: Signal,
    srq_b: Signal,
    ifc_b: Signal,
    dio: SignalGroup,

    address: u8,
    bus_state: BusState,
    comm_state: CommState,
    active_channel: u8,
    channels: Vec<Channel>,

    out_eoi: bool,
    out_dav: bool,
    out_nrfd: bool,
    out_ndac: bool,
    out_dio: u8,
}

impl Ieee488Device {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        eoi_b: Signal,
        dav_b: Signal,
        nrfd_b: Signal,
        ndac_b: Signal,
        atn_b: Signal,
        srq_b: Signal,
        ifc_b: Signal,
        dio: SignalGroup,
        address: u8,
    ) -> Self {
        Ieee488Device {
            eoi_b,
            dav_b,
            nrfd_b,
            ndac_b,
            atn_b,
            srq_b,
            ifc_b,
            dio,
            address,
            bus_state: BusState::Idle,
            comm_state: CommState::Idle,
            active_channel: 0,
            channels: (0..CHANNEL_COUNT).map(|_| Channel::default()).collect(),
            out_eoi: false,
            out_dav: false,
            out_nrfd: false,
            out_ndac: false,
            out_dio: 0,
        }
    }

    pub fn comm_state(&self) -> CommState {
        self.comm_state
    }

    pub fn active_channel(&self) -> u8 {
        self.active_channel
    }

    pub fn is_channel_open(&self, channel: u8) -> bool {
        self.channels[channel as usize].open
    }

    pub fn channel_name(&self, channel: u8) -> &str {
        &self.channels[channel as usize].name
    }

    /// Loads the bytes `channel` returns while this device is the
    /// addressed talker; resets that channel's read cursor to the
    /// start.
    pub fn set_talk_data(&mut self, channel: u8, data: Vec<u8>) {
        self.channels[channel as usize].talk_data = data;
        self.channels[channel as usize].talk_pos = 0;
    }

    fn reset(&mut self) {
        self.bus_state = BusState::Idle;
        self.comm_state = CommState::Idle;
        self.active_channel = 0;
        for channel in &mut self.channels {
            *channel = Channel::default();
        }
        self.out_eoi = false;
        self.out_dav = false;
        self.out_nrfd = false;
        self.out_ndac = false;
        self.out_dio = 0;
    }

    fn read_data(&self, ctx: &SignalContext<'_>) -> u8 {
        !(self.dio.ctx_read(ctx) as u8)
    }

    fn handle_command_in(&mut self, ctx: &SignalContext<'_>) {
        let data = self.read_data(ctx);
        let command = data & CMD_MASK;
        let address = data & ADDR_MASK;

        match command {
            CMD_LISTEN => {
                if self.address == address {
                    self.comm_state = CommState::Listening;
                }
            }
            CMD_UNLISTEN => self.comm_state = CommState::Idle,
            CMD_TALK => {
                if self.address == address {
                    self.comm_state = CommState::StartTalking;
                }
            }
            CMD_UNTALK => self.comm_state = CommState::Idle,
            CMD_SECONDARY => match self.comm_state {
                CommState::Listening => self.active_channel = address,
                CommState::StartTalking => {
                    self.active_channel = address;
                    self.channels[address as usize].talk_pos = 0;
                    self.comm_state = CommState::Talking;
                }
                _ => {}
            },
            CMD_CLOSE => {
                if self.comm_state == CommState::Listening {
                    self.channels[self.active_channel as usize].open = false;
                }
            }
            CMD_OPEN => {
                if self.comm_state == CommState::Listening {
                    self.active_channel = address;
                    self.comm_state = CommState::Opening;
                    let channel = &mut self.channels[self.active_channel as usize];
                    channel.open = true;
                    channel.name.clear();
                }
            }
            _ => {}
        }
    }

    fn handle_data_in(&mut self, ctx: &SignalContext<'_>) {
        let data = self.read_data(ctx);
        if self.comm_state == CommState::Opening {
            self.channels[self.active_channel as usize].name.push(petscii_to_ascii(data));
        }
    }

    fn drive_outputs(&self, ctx: &mut SignalContext<'_>) {
        let drive = |ctx: &mut SignalContext<'_>, signal: Signal, asserted: bool| {
            if asserted {
                ctx.write(signal, false);
            } else {
                ctx.clear_writer(signal);
            }
        };
        drive(ctx, self.eoi_b, self.out_eoi);
        drive(ctx, self.dav_b, self.out_dav);
        drive(ctx, self.nrfd_b, self.out_nrfd);
        drive(ctx, self.ndac_b, self.out_ndac);
        drive(ctx, self.srq_b, false);
        drive(ctx, self.ifc_b, false);
        for (i, signal) in self.dio.iter().enumerate() {
            drive(ctx, signal, (self.out_dio >> i) & 1 != 0);
        }
    }
}

impl Chip for Ieee488Device {
    fn process(&mut self, ctx: &mut SignalContext<'_>) -> Option<Tick> {
        if ctx.changed(self.ifc_b) && !ctx.read(self.ifc_b) {
            self.reset();
            self.drive_outputs(ctx);
            return None;
        }

        if ctx.changed(self.atn_b) && !ctx.read(self.atn_b) {
            // controller wants to send a command; start listening right away
            self.bus_state = BusState::AcceptorStart;
        }

        match self.bus_state {
            BusState::Idle => {
                self.out_nrfd = false;
                self.out_ndac = false;
            }
            BusState::AcceptorStart => {
                self.out_nrfd = true;
                self.out_ndac = true;
                self.bus_state = BusState::AcceptorReady;
            }
            BusState::AcceptorReady => {
                self.out_nrfd = false;
                if !ctx.read(self.dav_b) {
                    self.bus_state = BusState::AcceptorDataAvailable;
                }
            }
            BusState::AcceptorDataAvailable => {
                self.out_nrfd = true;
                if !ctx.read(self.atn_b) {
                    self.handle_command_in(ctx);
                } else {
                    self.handle_data_in(ctx);
                }
                self.out_ndac = false;
                self.bus_state = BusState::AcceptorDataTaken;
            }
            BusState::AcceptorDataTaken => {
                if ctx.read(self.dav_b) {
                    self.out_ndac = true;
                    self.bus_state = match self.comm_state {
                        CommState::Talking => BusState::SourceStart,
                        CommState::Idle => BusState::Idle,
                        _ => BusState::AcceptorReady,
                    };
                }
            }
            BusState::SourceStart => {
                self.out_dav = false;
                self.out_nrfd = false;
                self.out_ndac = false;
                if !ctx.read(self.atn_b) {
                    // wait for the controller to release ATN
                } else if ctx.read(self.nrfd_b) && ctx.read(self.ndac_b) {
                    self.bus_state = BusState::Idle; // no listener acknowledged
                } else {
                    self.bus_state = BusState::SourceReady;
                }
            }
            BusState::SourceReady => {
                let channel = &self.channels[self.active_channel as usize];
                let remaining = channel.talk_data.len().saturating_sub(channel.talk_pos);
                let data = channel.talk_data.get(channel.talk_pos).copied().unwrap_or(0);
                self.out_dio = data;
                if remaining <= 1 {
                    self.out_eoi = true;
                }
                if ctx.read(self.nrfd_b) {
                    self.bus_state = BusState::SourceDataValid;
                }
            }
            BusState::SourceDataValid => {
                self.out_dav = true;
                if ctx.read(self.ndac_b) {
                    self.bus_state = BusState::SourceDataTaken;
                }
            }
            BusState::SourceDataTaken => {
                self.out_dav = false;
                self.out_eoi = false;
                self.out_dio = 0;
                let channel = &mut self.channels[self.active_channel as usize];
                channel.talk_pos += 1;
                if channel.talk_pos < channel.talk_data.len() {
                    self.bus_state = BusState::SourceReady;
                } else {
                    self.bus_state = BusState::Idle;
                    self.comm_state = CommState::Idle;
                }
            }
        }

        self.drive_outputs(ctx);
        None
    }

    fn register_dependencies(&self, ctx: &mut DependencyContext<'_>) {
        ctx.depends_on(self.ifc_b);
        ctx.depends_on(self.atn_b);
        ctx.depends_on(self.dav_b);
        ctx.depends_on(self.nrfd_b);
        ctx.depends_on(self.ndac_b);
    }
}

use log::{error, info};

use structopt::StructOpt;

use linux_embedded_hal::sysfs_gpio::Direction;
use linux_embedded_hal::{spidev, spidev::SpiModeFlags, Delay, Pin as Pindev, Spidev};

use simplelog::{LevelFilter, TermLogger, TerminalMode};

use ihex::{Reader, Record};

use std::fmt::Debug;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::process;

use spi_eeprom::prelude::*;
use spi_eeprom::{series95::Eeprom, Geometry, Readiness};

type Error = Box<dyn std::error::Error>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq, StructOpt)]
struct Options {
    #[structopt(subcommand)]
    operation: Operations,

    /// SPI device
    #[structopt(long, default_value = "/dev/spidev0.0", env = "SPI_DEV")]
    spi_dev: String,

    /// SPI baud rate
    #[structopt(long, default_value = "5000000", env = "SPI_BAUD")]
    spi_baud: u32,

    /// Chip Select (output) pin
    #[structopt(long, default_value = "8", env = "CS_PIN")]
    cs_pin: u64,

    /// EEPROM part, selects the memory geometry (m95640, m95256)
    #[structopt(long, default_value = "m95640", env = "EEPROM_CHIP")]
    chip: Chip,

    /// Override the page size in bytes
    #[structopt(long)]
    page_size: Option<u32>,

    /// Override the number of pages
    #[structopt(long)]
    page_count: Option<u32>,

    /// Fixed wait after each write in milliseconds
    #[structopt(long, default_value = "5")]
    write_cycle_ms: u32,

    /// Poll the status register (up to this many times) instead of waiting a fixed time
    #[structopt(long)]
    poll_retries: Option<u32>,

    /// Sleep between status polls in milliseconds
    #[structopt(long, default_value = "1")]
    poll_interval_ms: u32,

    /// Configure log level
    #[structopt(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: LevelFilter,
}

#[derive(Debug, PartialEq, StructOpt)]
pub enum Operations {
    /// Read the status register
    Status,
    /// Read data from the device
    Read {
        /// Start address in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,
        /// Number of bytes to read
        #[structopt()]
        length: u32,
    },
    /// Write a single byte
    WriteByte {
        /// Address in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,
        /// Value in hex
        #[structopt(parse(try_from_str = parse_hex_byte))]
        value: u8,
    },
    /// Write data, split at page boundaries
    Write {
        /// Start address in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,

        // Data to write in hexadecimal
        #[structopt(long)]
        data: HexData,
    },
    /// Fill pages with a value
    Erase {
        /// Fill value in hex
        #[structopt(long, default_value = "ff", parse(try_from_str = parse_hex_byte))]
        fill: u8,

        /// First page to fill
        #[structopt(long, default_value = "0")]
        first_page: u32,

        /// Last page to fill (inclusive), defaults to the last page of the device
        #[structopt(long)]
        last_page: Option<u32>,
    },
    /// Append memory contents to a file
    Dump {
        /// Start address in hex
        #[structopt(parse(try_from_str = parse_hex))]
        address: u32,

        /// Number of bytes to dump
        #[structopt()]
        length: u32,

        /// Output file
        #[structopt(long, default_value = "dump.csv")]
        file: String,

        /// Output format (csv, ihex)
        #[structopt(long, default_value = "csv")]
        format: DumpFormat,
    },
    /// Load the device from an Intel HEX file
    Load {
        /// Input ihex file
        file: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Chip {
    M95640,
    M95256,
}

impl Chip {
    fn geometry(self) -> Geometry {
        match self {
            Chip::M95640 => Geometry::M95640,
            Chip::M95256 => Geometry::M95256,
        }
    }
}

impl std::str::FromStr for Chip {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m95640" => Ok(Chip::M95640),
            "m95256" => Ok(Chip::M95256),
            _ => Err(format!("unknown chip '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DumpFormat {
    Csv,
    Ihex,
}

impl std::str::FromStr for DumpFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "csv" => Ok(DumpFormat::Csv),
            "ihex" => Ok(DumpFormat::Ihex),
            _ => Err(format!("unknown dump format '{}'", s)),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct HexData(Vec<u8>);

impl std::str::FromStr for HexData {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        hex::decode(s).map(HexData)
    }
}

fn parse_hex(s: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16)
}

fn parse_hex_byte(s: &str) -> std::result::Result<u8, std::num::ParseIntError> {
    u8::from_str_radix(s.trim_start_matches("0x"), 16)
}

impl Options {
    fn geometry(&self) -> Result<Geometry> {
        let preset = self.chip.geometry();
        let page_size = self.page_size.unwrap_or_else(|| preset.page_size());
        let page_count = self.page_count.unwrap_or_else(|| preset.page_count());
        Geometry::new(page_size, page_count).ok_or_else(|| {
            format!(
                "invalid geometry: {} pages of {} bytes",
                page_count, page_size
            )
            .into()
        })
    }

    fn readiness(&self) -> Readiness {
        match self.poll_retries {
            Some(max_retries) => Readiness::PollStatus {
                max_retries,
                interval_ms: self.poll_interval_ms,
            },
            None => Readiness::FixedDelay {
                ms: self.write_cycle_ms,
            },
        }
    }
}

fn main() {
    if let Err(e) = run() {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    // Load options
    let opts = Options::from_args();

    // Setup logging
    TermLogger::init(opts.log_level, simplelog::Config::default(), TerminalMode::Mixed)?;

    let geometry = opts.geometry()?;

    // Connect and configure GPIO pin, deselected
    let cs_pin = Pindev::new(opts.cs_pin);
    cs_pin.export()?;
    cs_pin.set_direction(Direction::High)?;

    // Connect and configure SPI device
    let mut spi = Spidev::open(&opts.spi_dev)?;

    let mut spi_config = spidev::SpidevOptions::new();
    spi_config.mode(SpiModeFlags::SPI_MODE_0 | SpiModeFlags::SPI_NO_CS);
    spi_config.max_speed_hz(opts.spi_baud);
    spi.configure(&spi_config)?;

    let mut eeprom = Eeprom::init(spi, cs_pin, Delay, geometry)
        .dbg_err("eeprom init")?
        .with_readiness(opts.readiness());

    info!(
        "EEPROM: {} pages of {} bytes, {:?}",
        geometry.page_count(),
        geometry.page_size(),
        eeprom.readiness()
    );

    // Perform the requested operation
    match &opts.operation {
        Operations::Status => {
            let status = eeprom.read_status().dbg_err("read status")?;
            info!("Status: {:?}", status);
        }
        Operations::Read { address, length } => {
            info!("Reading {} bytes from address 0x{:04x}", length, address);

            let mut buff = vec![0u8; *length as usize];
            eeprom.read(*address, &mut buff).dbg_err("read")?;

            info!("Read: {:02x?}", buff);
        }
        Operations::WriteByte { address, value } => {
            info!("Writing 0x{:02x} to address 0x{:04x}", value, address);

            eeprom.write_byte(*address, *value).dbg_err("write byte")?;

            info!("Write complete");
        }
        Operations::Write { address, data } => {
            info!("Writing {} bytes to address 0x{:04x}", data.0.len(), address);

            eeprom.write_bytes(*address, &data.0).dbg_err("write")?;

            info!("Write complete");
        }
        Operations::Erase {
            fill,
            first_page,
            last_page,
        } => {
            let last_page = last_page.unwrap_or(geometry.page_count() - 1);
            info!(
                "Filling pages {} to {} with 0x{:02x}",
                first_page, last_page, fill
            );

            eeprom
                .erase_pages(*first_page..last_page + 1, *fill)
                .dbg_err("erase")?;

            info!("Erase complete");
        }
        Operations::Dump {
            address,
            length,
            file,
            format,
        } => {
            info!(
                "Reading {} bytes from address 0x{:04x} to file {}",
                length, address, file
            );

            let mut buff = vec![0u8; *length as usize];
            let text = match format {
                DumpFormat::Csv => {
                    let mut text = String::new();
                    eeprom
                        .dump(&mut text, *address, &mut buff)
                        .dbg_err("dump")?;
                    text
                }
                DumpFormat::Ihex => {
                    eeprom.dump_range(*address, &mut buff).dbg_err("dump")?;

                    let chunk = geometry.page_size() as usize;
                    let mut records = Vec::new();
                    for (c, data) in buff.chunks(chunk).enumerate() {
                        records.push(Record::Data {
                            offset: (*address as usize + c * chunk) as u16,
                            value: data.to_vec(),
                        });
                    }
                    records.push(Record::EndOfFile);

                    ihex::create_object_file_representation(&records)?
                }
            };

            let mut out = OpenOptions::new().create(true).append(true).open(file)?;
            out.write_all(text.as_bytes())?;
            out.flush()?;

            info!("Dump complete");
        }
        Operations::Load { file } => {
            info!("Loading file {}", file);

            let data = std::fs::read_to_string(file)?;

            for record in Reader::new(&data) {
                match record? {
                    Record::Data { offset, value } => {
                        info!("Writing {} bytes at address 0x{:04x}", value.len(), offset);
                        eeprom
                            .write_bytes(offset as u32, &value)
                            .dbg_err("load")?;
                    }
                    Record::EndOfFile => (),
                    other => {
                        return Err(format!("Unrecognised record: {:?}", other).into());
                    }
                }
            }

            info!("Load complete");
        }
    }

    Ok(())
}

trait ResultExt<T, E> {
    fn dbg_err(self, msg: &str) -> std::result::Result<T, Error>;
}

impl<T, E: Debug> ResultExt<T, E> for std::result::Result<T, E> {
    fn dbg_err(self, msg: &str) -> std::result::Result<T, Error> {
        self.map_err(|e| format!("{}: {:?}", msg, e).into())
    }
}

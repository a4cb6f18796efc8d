//! RustScpiController - Main entry point
//!
//! Firmware (`espidf`): UART1 carries commands, the framer is polled from
//! the main task, engine logs go to the default console.
//!
//! Host: the same instrument over stdin/stdout for bench testing. A reader
//! thread plays the receive interrupt; newlines are translated to the
//! command terminator and back.

use rust_scpi_controller::{
    config::{features, FramingConfig},
    instrument::{with_tree, Board},
    log_drain::drain_to,
    DefaultFramer, Framer, CLI_LOG,
};

#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();

    if let Err(e) = firmware::run() {
        log_line(format_args!("[ERROR] controller stopped: {e}"));
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> std::process::ExitCode {
    match host::run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log_line(format_args!("[ERROR] controller stopped: {e}"));
            std::process::ExitCode::FAILURE
        }
    }
}

/// Console sink for engine logs (stderr, kept apart from the reply stream).
struct LogConsole;

impl core::fmt::Write for LogConsole {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        eprint!("{s}");
        Ok(())
    }
}

fn log_line(args: core::fmt::Arguments<'_>) {
    eprintln!("{args}");
}

fn enabled_features() -> u32 {
    let test = if cfg!(debug_assertions) { features::TEST } else { 0 };
    features::EEPROM | test
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use esp_idf_svc::hal::delay::{FreeRtos, BLOCK, NON_BLOCK};
    use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, Level, Output, PinDriver};
    use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::uart::{config::Config as UartConfig, UartDriver};
    use esp_idf_svc::hal::units::Hertz;
    use esp_idf_svc::sys::{self, EspError};

    use rust_scpi_controller::config::eeprom::PAGE_SIZE;
    use rust_scpi_controller::hal::{OutputPin, PageStore, SystemControl};
    use rust_scpi_controller::{cli_info, cli_warn, BusError, Transport, TransportError};

    use super::*;

    /// 7-bit address of the AT24C256 on the peripheral I2C bus.
    const EEPROM_ADDRESS: u8 = 0x51;
    /// Device write cycle.
    const EEPROM_WRITE_MS: u32 = 12;

    fn clock() -> i64 {
        // SAFETY: plain read of the monotonic timer.
        unsafe { sys::esp_timer_get_time() }
    }

    static FRAMER: DefaultFramer<'static> =
        Framer::new(FramingConfig::DEFAULT.with_clock(clock), &CLI_LOG);

    struct UartLink<'a, 'd>(&'a UartDriver<'d>);

    impl Transport for UartLink<'_, '_> {
        fn is_connected(&self) -> bool {
            true
        }

        fn is_busy(&self) -> bool {
            self.0.wait_tx_done(NON_BLOCK).is_err()
        }

        fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            let mut rest = bytes;
            while !rest.is_empty() {
                let n = self.0.write(rest).map_err(|_| TransportError)?;
                rest = &rest[n..];
            }
            Ok(())
        }
    }

    struct ResetLine<'d>(Mutex<PinDriver<'d, AnyOutputPin, Output>>);

    impl OutputPin for ResetLine<'_> {
        fn is_set_high(&self) -> bool {
            self.0.lock().map(|pin| pin.is_set_high()).unwrap_or(false)
        }

        fn set_level(&self, high: bool) {
            if let Ok(mut pin) = self.0.lock() {
                let _ = pin.set_level(Level::from(high));
            }
        }
    }

    struct I2cEeprom<'d>(Mutex<I2cDriver<'d>>);

    impl PageStore for I2cEeprom<'_> {
        fn read(&self, addr: u16, buf: &mut [u8]) -> Result<(), BusError> {
            let mut bus = self.0.lock().map_err(|_| BusError)?;
            bus.write_read(EEPROM_ADDRESS, &addr.to_be_bytes(), buf, BLOCK)
                .map_err(|_| BusError)
        }

        fn write(&self, addr: u16, data: &[u8]) -> Result<(), BusError> {
            let mut frame: heapless::Vec<u8, { PAGE_SIZE + 2 }> = heapless::Vec::new();
            frame.extend_from_slice(&addr.to_be_bytes()).map_err(|_| BusError)?;
            frame.extend_from_slice(data).map_err(|_| BusError)?;

            let mut bus = self.0.lock().map_err(|_| BusError)?;
            bus.write(EEPROM_ADDRESS, &frame, BLOCK).map_err(|_| BusError)?;
            FreeRtos::delay_ms(EEPROM_WRITE_MS);
            Ok(())
        }
    }

    /// Boot loader = factory app partition, selected before restart.
    struct Chip {
        loader: AtomicBool,
    }

    impl SystemControl for Chip {
        fn schedule_bootloader(&self) {
            self.loader.store(true, Ordering::Release);
        }

        fn reset(&self) {
            if self.loader.load(Ordering::Acquire) {
                // SAFETY: partition table lookups and OTA data update only.
                unsafe {
                    let factory = sys::esp_partition_find_first(
                        sys::esp_partition_type_t_ESP_PARTITION_TYPE_APP,
                        sys::esp_partition_subtype_t_ESP_PARTITION_SUBTYPE_APP_FACTORY,
                        core::ptr::null(),
                    );
                    if factory.is_null() || sys::esp!(sys::esp_ota_set_boot_partition(factory)).is_err() {
                        cli_warn!(CLI_LOG, clock(), "no boot loader partition");
                    }
                }
            }
            drain_to(&CLI_LOG, &mut LogConsole);
            // SAFETY: does not return.
            unsafe { sys::esp_restart() }
        }
    }

    fn unique_id() -> [u32; 3] {
        let mut mac = [0u8; 6];
        // SAFETY: buffer is the 6 bytes the call requires.
        unsafe {
            sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
        }
        [
            u32::from_be_bytes([mac[0], mac[1], mac[2], mac[3]]),
            u32::from_be_bytes([0, 0, mac[4], mac[5]]),
            0,
        ]
    }

    pub fn run() -> Result<(), EspError> {
        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        // Board pin map: UART TX/RX, peripheral nRST, EEPROM SDA/SCL
        #[cfg(not(feature = "esp32p4"))]
        let (tx_pin, rx_pin, nrst, sda, scl) = (pins.gpio17, pins.gpio18, pins.gpio4, pins.gpio8, pins.gpio9);
        #[cfg(feature = "esp32p4")]
        let (tx_pin, rx_pin, nrst, sda, scl) = (pins.gpio22, pins.gpio23, pins.gpio20, pins.gpio7, pins.gpio8);

        let uart = UartDriver::new(
            peripherals.uart1,
            tx_pin,
            rx_pin,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &UartConfig::default().baudrate(Hertz(115_200)),
        )?;

        let mut nrst = PinDriver::output(AnyOutputPin::from(nrst))?;
        nrst.set_high()?;
        let periph_reset = ResetLine(Mutex::new(nrst));

        let i2c = I2cDriver::new(
            peripherals.i2c0,
            sda,
            scl,
            &I2cConfig::new().baudrate(Hertz(400_000)),
        )?;
        let eeprom = I2cEeprom(Mutex::new(i2c));

        let chip = Chip {
            loader: AtomicBool::new(false),
        };

        let board = Board {
            system: &chip,
            periph_reset: &periph_reset,
            eeprom: &eeprom,
            uid: unique_id(),
            features: enabled_features(),
        };

        let served = with_tree(&board, |tree| {
            cli_info!(CLI_LOG, clock(), "controller ready");
            let mut rx = [0u8; 64];
            loop {
                if let Ok(n) = uart.read(&mut rx, NON_BLOCK) {
                    FRAMER.receive(&rx[..n]);
                }
                FRAMER.poll(&mut UartLink(&uart), tree);
                drain_to(&CLI_LOG, &mut LogConsole);
                FreeRtos::delay_ms(1);
            }
        });
        if let Err(e) = served {
            log_line(format_args!("[ERROR] command tree: {e}"));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
mod host {
    use std::io::{self, Read, Write};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, OnceLock};
    use std::time::{Duration, Instant};

    use rust_scpi_controller::config::eeprom::ADDR_END;
    use rust_scpi_controller::config::TERMINATOR;
    use rust_scpi_controller::hal::{OutputPin, PageStore, SystemControl};
    use rust_scpi_controller::{cli_info, BusError, ErrorKind, Transport, TransportError};

    use super::*;

    fn clock() -> i64 {
        static START: OnceLock<Instant> = OnceLock::new();
        START.get_or_init(Instant::now).elapsed().as_micros() as i64
    }

    static FRAMER: DefaultFramer<'static> =
        Framer::new(FramingConfig::DEFAULT.with_clock(clock), &CLI_LOG);

    struct StdoutLink(io::Stdout);

    impl Transport for StdoutLink {
        fn is_connected(&self) -> bool {
            true
        }

        fn is_busy(&self) -> bool {
            false
        }

        fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
            let mut out = self.0.lock();
            for &b in bytes {
                let b = if b == TERMINATOR { b'\n' } else { b };
                out.write_all(&[b]).map_err(|_| TransportError)?;
            }
            out.flush().map_err(|_| TransportError)
        }
    }

    struct SimPin(AtomicBool);

    impl OutputPin for SimPin {
        fn is_set_high(&self) -> bool {
            self.0.load(Ordering::Relaxed)
        }

        fn set_level(&self, high: bool) {
            self.0.store(high, Ordering::Relaxed);
        }
    }

    struct SimEeprom(Mutex<Vec<u8>>);

    impl PageStore for SimEeprom {
        fn read(&self, addr: u16, buf: &mut [u8]) -> Result<(), BusError> {
            let mem = self.0.lock().map_err(|_| BusError)?;
            let start = addr as usize;
            let src = mem.get(start..start + buf.len()).ok_or(BusError)?;
            buf.copy_from_slice(src);
            Ok(())
        }

        fn write(&self, addr: u16, data: &[u8]) -> Result<(), BusError> {
            let mut mem = self.0.lock().map_err(|_| BusError)?;
            let start = addr as usize;
            let dst = mem.get_mut(start..start + data.len()).ok_or(BusError)?;
            dst.copy_from_slice(data);
            Ok(())
        }
    }

    struct SimSystem {
        loader: AtomicBool,
    }

    impl SystemControl for SimSystem {
        fn schedule_bootloader(&self) {
            self.loader.store(true, Ordering::Relaxed);
        }

        fn reset(&self) {
            let loader = self.loader.swap(false, Ordering::Relaxed);
            cli_info!(CLI_LOG, clock(), "reset requested (loader: {})", loader);
        }
    }

    /// Terminal input to wire framing: drop `\r`, `\n` ends a command.
    fn to_wire(chunk: &mut [u8]) -> usize {
        let mut len = 0;
        for i in 0..chunk.len() {
            let b = match chunk[i] {
                b'\r' => continue,
                b'\n' => TERMINATOR,
                b => b,
            };
            chunk[len] = b;
            len += 1;
        }
        len
    }

    pub fn run() -> Result<(), ErrorKind> {
        let system = SimSystem {
            loader: AtomicBool::new(false),
        };
        let periph_reset = SimPin(AtomicBool::new(true));
        let eeprom = SimEeprom(Mutex::new(vec![0xFF; ADDR_END as usize]));

        let board = Board {
            system: &system,
            periph_reset: &periph_reset,
            eeprom: &eeprom,
            uid: [0x0001_0203, 0x0405_0607, 0x0809_0A0B],
            features: enabled_features(),
        };

        let input_done = AtomicBool::new(false);

        with_tree(&board, |tree| {
            std::thread::scope(|s| {
                s.spawn(|| {
                    let mut stdin = io::stdin().lock();
                    let mut chunk = [0u8; 256];
                    while let Ok(n) = stdin.read(&mut chunk) {
                        if n == 0 {
                            break;
                        }
                        let len = to_wire(&mut chunk[..n]);
                        FRAMER.receive(&chunk[..len]);
                    }
                    input_done.store(true, Ordering::Release);
                });

                let mut link = StdoutLink(io::stdout());
                loop {
                    let finished = input_done.load(Ordering::Acquire);
                    FRAMER.poll(&mut link, tree);
                    drain_to(&CLI_LOG, &mut LogConsole);
                    if finished && !FRAMER.is_pending() {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
            });
        })
    }
}

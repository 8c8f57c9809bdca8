// Session recorder firmware: a letter matrix with per-key LEDs and a speaker.
// Committed sessions are streamed to the host over USB serial.

#![no_main]
#![no_std]

use core::ops::ControlFlow;

use defmt::{error, info, warn, Display2Format};
use defmt_rtt as _;
use embedded_hal::digital::PinState;
use key_recorder::{
    recorder_layout, Board, BufferedStrip, ColorOrder, Command, Controller, GridLines, HostCommands,
    RecorderConfig, Timestamp,
};
use panic_probe as _;
use rand::{rngs::SmallRng, SeedableRng};
use rp2040_hal::{
    pac,
    pio::PIOExt,
    rosc::RingOscillator,
    rtc::RealTimeClock,
    usb::UsbBus,
    Clock, Timer, Watchdog,
};
use usb_device::{
    bus::UsbBusAllocator,
    device::{StringDescriptors, UsbDeviceBuilder, UsbVidPid},
};
use usbd_serial::SerialPort;
use ws2812_pio::Ws2812;

/// The linker will place this boot block at the start of our program image. We
/// need this to help the ROM bootloader get our code up and running.
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

mod clock;
mod logger;
mod tone;
mod usb_log;

use clock::{RtcClock, TimerClock};
use tone::PwmTone;
use usb_log::UsbLink;

const EXTERNAL_CRYSTAL_FREQUENCY_HZ: u32 = 12_000_000;

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}

#[cortex_m_rt::entry]
fn main() -> ! {
    info!("Start of main()");
    logger::init(log::LevelFilter::Debug);

    let mut pac = pac::Peripherals::take().unwrap();

    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    let clocks = rp2040_hal::clocks::init_clocks_and_plls(
        EXTERNAL_CRYSTAL_FREQUENCY_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    // Seed session identifiers from the ring oscillator's jitter.
    let rosc = RingOscillator::new(pac.ROSC).initialize();
    let seed = (0..64).fold(0u64, |seed, _| (seed << 1) | rosc.get_random_bit() as u64);
    let rng = SmallRng::seed_from_u64(seed);

    // Setup USB
    let force_vbus_detect_bit = true;
    let usb_bus = UsbBus::new(
        pac.USBCTRL_REGS,
        pac.USBCTRL_DPRAM,
        clocks.usb_clock,
        force_vbus_detect_bit,
        &mut pac.RESETS,
    );

    let bus_allocator = UsbBusAllocator::new(usb_bus);
    let serial = SerialPort::new(&bus_allocator);

    // Shared V-USB CDC-ACM VID/PID pair, see
    // https://github.com/obdev/v-usb/blob/master/usbdrv/USB-IDs-for-free.txt
    let usb_device = UsbDeviceBuilder::new(&bus_allocator, UsbVidPid(0x16c0, 0x27dd))
        .strings(&[StringDescriptors::default()
            .manufacturer("bschwind")
            .product("key recorder")
            .serial_number("0001")])
        .unwrap()
        .device_class(usbd_serial::USB_CLASS_CDC)
        .build();

    let session_log = UsbLink::new(usb_device, serial);

    info!("USB initialized");

    // Get the GPIO peripherals.
    let sio = rp2040_hal::Sio::new(pac.SIO);

    let pins =
        rp2040_hal::gpio::Pins::new(pac.IO_BANK0, pac.PADS_BANK0, sio.gpio_bank0, &mut pac.RESETS);

    // Rows idle high and are pulled low one at a time; columns read low
    // through a closed switch.
    let primary = GridLines::new(
        [
            pins.gpio0.into_push_pull_output_in_state(PinState::High).into_dyn_pin(),
            pins.gpio1.into_push_pull_output_in_state(PinState::High).into_dyn_pin(),
            pins.gpio2.into_push_pull_output_in_state(PinState::High).into_dyn_pin(),
        ],
        [
            pins.gpio3.into_pull_up_input().into_dyn_pin(),
            pins.gpio4.into_pull_up_input().into_dyn_pin(),
            pins.gpio5.into_pull_up_input().into_dyn_pin(),
            pins.gpio6.into_pull_up_input().into_dyn_pin(),
            pins.gpio7.into_pull_up_input().into_dyn_pin(),
            pins.gpio8.into_pull_up_input().into_dyn_pin(),
            pins.gpio9.into_pull_up_input().into_dyn_pin(),
        ],
    );

    let auxiliary = GridLines::new(
        [
            pins.gpio10.into_push_pull_output_in_state(PinState::High).into_dyn_pin(),
            pins.gpio11.into_push_pull_output_in_state(PinState::High).into_dyn_pin(),
        ],
        [
            pins.gpio12.into_pull_up_input().into_dyn_pin(),
            pins.gpio13.into_pull_up_input().into_dyn_pin(),
        ],
    );

    // Timer-based resources.
    let timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    // LED strip on PIO0, state machine 0. The WS2811 strip is wired RGB.
    let (mut pio, sm0, _, _, _) = pac.PIO0.split(&mut pac.RESETS);
    let ws2812 = Ws2812::new(
        pins.gpio21.into_function(),
        &mut pio,
        sm0,
        clocks.peripheral_clock.freq(),
        timer.count_down(),
    );
    let strip: BufferedStrip<_, { key_recorder::key_mapping::NUM_PIXELS }> =
        BufferedStrip::new(ws2812, ColorOrder::Rgb);

    // Speaker on GP16, PWM slice 0 channel A.
    let mut pwm_slices = rp2040_hal::pwm::Slices::new(pac.PWM, &mut pac.RESETS);
    pwm_slices.pwm0.channel_a.output_to(pins.gpio16);
    let tone = PwmTone::new(pwm_slices.pwm0, clocks.system_clock.freq().to_Hz());

    let rtc = RealTimeClock::new(
        pac.RTC,
        clocks.rtc_clock,
        &mut pac.RESETS,
        clock::to_datetime(Timestamp::EPOCH),
    )
    .unwrap();

    let board = Board {
        primary,
        auxiliary,
        delay: timer,
        strip,
        tone,
        log: session_log,
        clock: RtcClock::new(rtc),
    };

    let config = RecorderConfig::default();
    let layout = match recorder_layout() {
        Ok(layout) => layout,
        Err(err) => {
            error!("Bad key layout: {}", err);
            halt();
        },
    };

    let mut controller = match Controller::new(layout, board, rng, &config) {
        Ok(controller) => controller,
        Err(err) => {
            error!("Initialization failed: {}", Display2Format(&err));
            halt();
        },
    };

    info!("Start main loop");

    let monotonic = TimerClock(timer);
    let mut host = HostCommands::new();

    let result = controller.run(&monotonic, |controller| {
        let mut buf = [0u8; 64];
        let received = controller.session_log_mut().poll(&mut buf);

        for command in host.feed_all(&buf[..received]) {
            match command {
                Command::Shutdown => return ControlFlow::Break(()),
                Command::SetTime(timestamp) => match controller.clock_mut().set(timestamp) {
                    Ok(()) => info!("Clock set to {}", Display2Format(&timestamp)),
                    Err(err) => warn!("Could not set clock: {}", defmt::Debug2Format(&err)),
                },
            }
        }

        ControlFlow::Continue(())
    });

    match result {
        Ok(()) => info!("Stopped by host"),
        Err(err) => error!("Stopped on scan failure: {}", Display2Format(&err)),
    }

    halt();
}

fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

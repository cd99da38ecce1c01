#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::convert::Infallible;

use embassy_executor::Spawner;
use embassy_time::Delay;
use envnode_core::acquisition::Sensors;
use envnode_core::config::NodeVariant;
use envnode_core::fault::{FatalFault, FaultHandler, SosFaultHandler};
use envnode_core::node::Node;
use envnode_core::schedule::idle_between_cycles;
use envnode_firmware::config::node_config;
use envnode_firmware::drivers::{bme280::Bme280, ccs811::Ccs811, pcf8523::Pcf8523};
use envnode_firmware::hardware::{create_i2c_bus, create_sd_card, share_i2c_bus};
use envnode_firmware::sleep::TimerSleep;
use envnode_firmware::storage::{FixedTime, SdCardSink};
use envnode_firmware::telemetry::RttTelemetry;
use envnode_firmware::voltage::AdcVoltage;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "the node and its drivers live in main for the whole run"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let config = node_config();

    let mut led = Output::new(peripherals.GPIO13, Level::High, OutputConfig::default());
    let mut gas_reset = Output::new(peripherals.GPIO4, Level::High, OutputConfig::default());

    let i2c = match create_i2c_bus(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9) {
        Ok(bus) => bus,
        Err(e) => {
            error!("{e}");
            match halt(led, FatalFault::TempHumidityPressure).await {}
        }
    };
    let devices = share_i2c_bus(i2c);

    // Boot decides whether a missing card is fatal for this variant
    let sd_card = match create_sd_card(
        peripherals.SPI2,
        peripherals.GPIO36,
        peripherals.GPIO35,
        peripherals.GPIO37,
        peripherals.GPIO10,
    ) {
        Ok(card) => Some(card),
        Err(e) => {
            warn!("{e}");
            None
        }
    };

    let sensors = Sensors {
        clock: Pcf8523::new(devices.clock),
        climate: Bme280::new(devices.climate, Delay),
        gas: Ccs811::new(devices.gas, Delay),
        voltage: AdcVoltage::new(peripherals.ADC1, peripherals.GPIO1),
    };
    let storage = sd_card.map(|card| SdCardSink::new(card, FixedTime));

    let mut node = match Node::boot(config, sensors, storage, &mut gas_reset, Delay).await {
        Ok(node) => node,
        Err(fault) => match halt(led, fault).await {},
    };

    let mut telemetry = RttTelemetry::new(config.variant == NodeVariant::RtcDisplay);
    let mut sleeper = TimerSleep;
    let mut delay = Delay;

    loop {
        node.run_cycle(&mut telemetry).await;
        idle_between_cycles(
            config.power,
            config.cycle_period_ms,
            &mut led,
            &mut delay,
            &mut sleeper,
        )
        .await;
    }
}

/// Blink SOS on the status LED forever.
async fn halt(led: Output<'static>, fault: FatalFault) -> Infallible {
    SosFaultHandler::new(led, Delay).handle(fault).await
}

//! Bus and pin setup for the node board
//!
//! I2C0 carries the BME280, CCS811 and PCF8523; SPI2 carries the SD card.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::spi::Mode as SpiMode;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::{Async, Blocking};
use static_cell::StaticCell;
use thiserror_no_std::Error;

use crate::async_i2c_bus::AsyncI2cDevice;

pub type I2cBus = I2c<'static, Async>;
pub type SharedI2c = AsyncI2cDevice<'static, I2cBus>;
pub type SdSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, Delay>;
pub type SdCard = embedded_sdmmc::SdCard<SdSpi, Delay>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HardwareError {
    #[error("I2C bus configuration rejected")]
    I2cConfig,

    #[error("SPI bus configuration rejected")]
    SpiConfig,

    #[error("SD card chip select unavailable")]
    ChipSelect,
}

/// One handle per I2C peripheral
pub struct I2cDevices {
    pub climate: SharedI2c,
    pub gas: SharedI2c,
    pub clock: SharedI2c,
}

/// Create the I2C bus at 100 kHz; the CCS811 stretches the clock beyond
/// what 400 kHz tolerates.
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO8<'static>,
    scl: esp_hal::peripherals::GPIO9<'static>,
) -> Result<I2cBus, HardwareError> {
    let bus = I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(100)))
        .map_err(|_| HardwareError::I2cConfig)?
        .with_sda(sda)
        .with_scl(scl)
        .into_async();
    Ok(bus)
}

/// Share the bus between the three drivers.
///
/// Must be called once; the bus lives in a static for the rest of the run.
pub fn share_i2c_bus(bus: I2cBus) -> I2cDevices {
    static I2C0_BUS: StaticCell<AsyncMutex<CriticalSectionRawMutex, I2cBus>> = StaticCell::new();
    let bus = I2C0_BUS.init(AsyncMutex::new(bus));

    I2cDevices {
        climate: AsyncI2cDevice::new(bus),
        gas: AsyncI2cDevice::new(bus),
        clock: AsyncI2cDevice::new(bus),
    }
}

/// SD card on SPI2. The card is probed at 400 kHz, so the bus starts there.
pub fn create_sd_card(
    spi2: esp_hal::peripherals::SPI2<'static>,
    sck: esp_hal::peripherals::GPIO36<'static>,
    mosi: esp_hal::peripherals::GPIO35<'static>,
    miso: esp_hal::peripherals::GPIO37<'static>,
    cs: esp_hal::peripherals::GPIO10<'static>,
) -> Result<SdCard, HardwareError> {
    let config = SpiConfig::default()
        .with_frequency(Rate::from_khz(400))
        .with_mode(SpiMode::_0);
    let spi = Spi::new(spi2, config)
        .map_err(|_| HardwareError::SpiConfig)?
        .with_sck(sck)
        .with_mosi(mosi)
        .with_miso(miso);

    let cs = Output::new(cs, Level::High, OutputConfig::default());
    let device = ExclusiveDevice::new(spi, cs, Delay::new()).map_err(|_| HardwareError::ChipSelect)?;

    Ok(embedded_sdmmc::SdCard::new(device, Delay::new()))
}

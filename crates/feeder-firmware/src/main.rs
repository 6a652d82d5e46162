#![no_std]
#![no_main]

extern crate alloc;

mod config;
mod infrastructure;
mod manifest;

use alloc::boxed::Box;
use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Delay;

use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::Blocking;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::{clock::CpuClock, timer::timg::TimerGroup};
use log::{info, warn};

use feeder_node::{
    ControlLoop, DeviceManifest, NodeConfig, Peripherals, SharedOutputs, TelemetrySampler,
};

use crate::config::{DEVICE, HOPPER, MQTT, node_config};
use crate::infrastructure::adapters::{ChannelBroker, SignalFeeder};
use crate::infrastructure::drivers::{
    At24c, Bme280, ClimateSource, Ds3231, FillLevelSource, Quantity, RangeSource, RelayBank,
    Unfitted, Vl6180x, WifiLink, init_network_stack,
};
use crate::infrastructure::tasks::{
    BrokerTarget, Stepper, broker_task, feeder_task, network_runner_task,
};

esp_bootloader_esp_idf::esp_app_desc!();

type SensorBus = RefCell<I2c<'static, Blocking>>;
type Relays = SharedOutputs<CriticalSectionRawMutex, RelayBank>;

// static_cell::make_static! in main causes a compiler error
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

/// Telemetry channels in manifest order; missing chips report `null`
fn build_sampler(bus: &'static SensorBus) -> TelemetrySampler<'static> {
    let mut sampler = TelemetrySampler::new();

    match Vl6180x::new(bus) {
        Ok(distance) => {
            sampler.add_source(Box::new(FillLevelSource::new(
                distance,
                HOPPER.full_mm,
                HOPPER.empty_mm,
            )));
            sampler.add_source(Box::new(RangeSource::new(distance)));
        }
        Err(e) => {
            warn!("sensors: distance sensor not found: {}", e);
            sampler.add_source(Box::new(Unfitted("c")));
            sampler.add_source(Box::new(Unfitted("cr")));
        }
    }

    sampler.add_source(Box::new(At24c::new(bus)));

    match Bme280::new(bus) {
        Ok(climate) => {
            for quantity in [Quantity::Temperature, Quantity::Pressure, Quantity::Humidity] {
                sampler.add_source(Box::new(ClimateSource::new(climate, quantity)));
            }
        }
        Err(e) => {
            warn!("sensors: climate sensor not found: {}", e);
            for channel in ["t", "p", "h"] {
                sampler.add_source(Box::new(Unfitted(channel)));
            }
        }
    }

    sampler.add_source(Box::new(Ds3231::new(bus)));
    sampler
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();

    // Initialize hardware
    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    // Allocate heap memory (64 + 32 KB)
    esp_alloc::heap_allocator!(
        #[unsafe(link_section = ".dram2_uninit")] size: 64 * 1024
    );
    esp_alloc::heap_allocator!(size: 32 * 1024);

    // Start rtos
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("main: booting '{}'", DEVICE.id);

    // Sensor bus shared by the distance, climate, clock and memory chips
    let (sda, scl) = crate::i2c_gpios!(peripherals);
    let i2c = I2c::new(peripherals.I2C0, I2cConfig::default())
        .expect("i2c init failed")
        .with_sda(sda)
        .with_scl(scl);
    let bus = mk_static!(SensorBus, RefCell::new(i2c));

    let mut clock = Ds3231::new(bus);
    if let Err(e) = clock.configure() {
        warn!("rtc: cannot configure: {}", e);
    }
    let sampler = build_sampler(bus);

    // Relays and feeder motor
    let relay_bank = RelayBank::new(crate::relay_gpios!(peripherals));
    let relays = mk_static!(Relays, Relays::new(relay_bank));

    let (dir, step, sleep) = crate::stepper_gpios!(peripherals);
    let stepper = Stepper {
        dir: Output::new(dir, Level::Low, OutputConfig::default()),
        step: Output::new(step, Level::Low, OutputConfig::default()),
        sleep: Output::new(sleep, Level::Low, OutputConfig::default()),
    };
    spawner.spawn(feeder_task(stepper)).ok();

    // Network stack and broker connection
    let config = mk_static!(NodeConfig, node_config());
    let (stack, runner, controller) = init_network_stack(peripherals.WIFI, DEVICE.id);
    spawner.spawn(network_runner_task(runner)).ok();
    spawner
        .spawn(broker_task(
            stack,
            BrokerTarget {
                host: MQTT.host,
                port: config.broker.port,
            },
        ))
        .ok();

    let manifest = mk_static!(DeviceManifest, manifest::device_manifest());
    let collaborators = Peripherals::new(&*relays)
        .with_memory(At24c::new(bus))
        .with_clock(clock)
        .with_feeder(SignalFeeder);

    let mut node = ControlLoop::new(
        config,
        manifest,
        WifiLink::new(controller, stack),
        ChannelBroker,
        Delay,
        sampler,
        collaborators,
    );
    node.run().await
}

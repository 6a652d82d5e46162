//! Stepper motor driving the food auger

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use esp_hal::gpio::Output;
use log::info;

use crate::config::FEEDER;

/// Portions requested by the dispatcher
pub(crate) static FEED_SIGNAL: Signal<CriticalSectionRawMutex, u8> = Signal::new();
/// Set while the motor is turning
pub(crate) static FEEDING: AtomicBool = AtomicBool::new(false);

/// Stepper driver pins (DRV8825-style)
pub(crate) struct Stepper {
    pub dir: Output<'static>,
    pub step: Output<'static>,
    /// Driver sleeps while low
    pub sleep: Output<'static>,
}

impl Stepper {
    async fn turn(&mut self, steps: u32) {
        for _ in 0..steps {
            self.step.set_high();
            Timer::after(FEEDER.step_interval).await;
            self.step.set_low();
            Timer::after(FEEDER.step_interval).await;
        }
    }

    async fn dispense(&mut self) {
        self.dir.set_high();
        self.turn(FEEDER.forward_steps).await;
        Timer::after(FEEDER.pause).await;

        self.dir.set_low();
        self.turn(FEEDER.reverse_steps).await;
        Timer::after(FEEDER.pause).await;
    }
}

#[embassy_executor::task]
pub(crate) async fn feeder_task(mut stepper: Stepper) {
    stepper.sleep.set_low();
    loop {
        let portions = FEED_SIGNAL.wait().await;
        FEEDING.store(true, Ordering::Release);
        stepper.sleep.set_high();
        info!("feeder: dispensing {} portion(s)", portions);

        for _ in 0..portions {
            stepper.dispense().await;
        }

        stepper.sleep.set_low();
        FEEDING.store(false, Ordering::Release);
        info!("feeder: done");
    }
}

//! Stepper-motor sequencer, 7-segment display multiplexer, and ADC
//! temperature sensor, reimplemented against [`artos::Kernel`] in place
//! of the bare interrupt-driven loop they came from.
//!
//! Pin wiring and thresholds match the original: `PORTB` drives the
//! stepper and two status LEDs, `PORTD` drives the shift-register-backed
//! 7-segment display and a cold-alarm LED, `ADC0` feeds the sensor task.
#![no_std]
#![no_main]

use artos::Kernel;
use core::sync::atomic::{AtomicU16, Ordering};

const MOTOR_TASK_DELAY: u16 = 1500;
const MOTOR_TASK_SEQUENCE_DELAY: u16 = 100;

const DISPLAY_REFRESH_FREQ: u16 = 5;
const DISPLAY_NUM: usize = 4;

const SENSOR_TASK_DELAY: u16 = 250;
const TEMP_HIGH_THRESH: u16 = 30;
const TEMP_LOW_THRESH: u16 = 10;

const PORTB: *mut u8 = 0x25 as *mut u8;
const DDRB: *mut u8 = 0x24 as *mut u8;
const PORTD: *mut u8 = 0x2b as *mut u8;
const DDRD: *mut u8 = 0x2a as *mut u8;
const ADMUX: *mut u8 = 0x7c as *mut u8;
const ADCSRA: *mut u8 = 0x7a as *mut u8;
const ADCL: *mut u8 = 0x78 as *mut u8;
const ADCH: *mut u8 = 0x79 as *mut u8;
const ADSC_BIT: u8 = 1 << 6;

static MOTOR_TURN_COUNT: AtomicU16 = AtomicU16::new(0);
static TEMPERATURE_CELSIUS: AtomicU16 = AtomicU16::new(0);

const NUMBER_CODES_FOR_7SEG: [u8; 10] = [
    0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F,
];

unsafe fn set_bit(port: *mut u8, bit: u8, value: bool) {
    let current = core::ptr::read_volatile(port);
    let updated = if value {
        current | (1 << bit)
    } else {
        current & !(1 << bit)
    };
    core::ptr::write_volatile(port, updated);
}

fn motor_task() -> ! {
    loop {
        unsafe {
            set_bit(PORTB, 3, true);
            set_bit(PORTB, 2, false);
            set_bit(PORTB, 1, false);
            set_bit(PORTB, 0, false);
        }
        Kernel::delay_task(MOTOR_TASK_SEQUENCE_DELAY);

        unsafe {
            set_bit(PORTB, 3, false);
            set_bit(PORTB, 2, false);
            set_bit(PORTB, 1, true);
            set_bit(PORTB, 0, false);
        }
        Kernel::delay_task(MOTOR_TASK_SEQUENCE_DELAY);

        unsafe {
            set_bit(PORTB, 3, false);
            set_bit(PORTB, 2, true);
            set_bit(PORTB, 1, false);
            set_bit(PORTB, 0, false);
        }
        Kernel::delay_task(MOTOR_TASK_SEQUENCE_DELAY);

        unsafe {
            set_bit(PORTB, 3, false);
            set_bit(PORTB, 2, false);
            set_bit(PORTB, 1, false);
            set_bit(PORTB, 0, true);
        }
        MOTOR_TURN_COUNT.fetch_add(1, Ordering::Relaxed);
        Kernel::delay_task(MOTOR_TASK_DELAY);
    }
}

fn display_digit(mut digit: u8) {
    unsafe {
        set_bit(PORTD, 5, false);
        for _ in 0..8 {
            set_bit(PORTD, 7, false);
            set_bit(PORTD, 6, digit & 0x80 != 0);
            digit <<= 1;
            set_bit(PORTD, 7, true);
        }
        set_bit(PORTD, 5, true);
    }
}

fn display_task() -> ! {
    let mut display_index: u8 = 0;
    loop {
        display_index += 1;
        if display_index as usize > DISPLAY_NUM {
            display_index = 1;
        }

        let turns = MOTOR_TURN_COUNT.load(Ordering::Relaxed);
        let number = [
            (turns / 1000) as u8,
            ((turns / 100) % 10) as u8,
            ((turns / 10) % 10) as u8,
            (turns % 10) as u8,
        ];

        unsafe {
            match display_index {
                1 => {
                    set_bit(PORTD, 4, false);
                    set_bit(PORTD, 3, false);
                }
                2 => {
                    set_bit(PORTD, 4, true);
                    set_bit(PORTD, 3, false);
                }
                3 => {
                    set_bit(PORTD, 4, false);
                    set_bit(PORTD, 3, true);
                }
                _ => {
                    set_bit(PORTD, 4, true);
                    set_bit(PORTD, 3, true);
                }
            }
        }
        display_digit(NUMBER_CODES_FOR_7SEG[number[display_index as usize - 1] as usize]);

        Kernel::delay_task(DISPLAY_REFRESH_FREQ);
    }
}

fn sensor_task() -> ! {
    loop {
        unsafe {
            set_bit(ADCSRA, 6, true);
            while core::ptr::read_volatile(ADCSRA) & ADSC_BIT != 0 {}

            let low = core::ptr::read_volatile(ADCL) as u16;
            let high = core::ptr::read_volatile(ADCH) as u16;
            let raw = low | (high << 8);
            let celsius = ((raw as u32 * 500) / 1024) as u16;
            TEMPERATURE_CELSIUS.store(celsius, Ordering::Relaxed);

            set_bit(PORTB, 5, celsius > TEMP_HIGH_THRESH);
            set_bit(PORTD, 2, celsius < TEMP_LOW_THRESH);
        }
        Kernel::delay_task(SENSOR_TASK_DELAY);
    }
}

unsafe fn init_pins() {
    set_bit(DDRB, 5, true); // LED
    set_bit(DDRB, 4, true); // step motor enable
    set_bit(DDRB, 3, true); // step motor in1
    set_bit(DDRB, 2, true); // step motor in2
    set_bit(DDRB, 1, true); // step motor in3
    set_bit(DDRB, 0, true); // step motor in4

    set_bit(DDRD, 7, true); // shift register clock
    set_bit(DDRD, 6, true); // shift register data
    set_bit(DDRD, 5, true); // shift register latch
    set_bit(DDRD, 4, true); // decoder input A
    set_bit(DDRD, 3, true); // decoder input B
    set_bit(DDRD, 2, true); // LED

    set_bit(PORTB, 4, true); // motor driver enable

    core::ptr::write_volatile(ADMUX, 0x00);
    set_bit(ADCSRA, 7, true); // enable ADC
}

#[unsafe(no_mangle)]
pub extern "C" fn main() -> ! {
    unsafe {
        init_pins();
    }

    Kernel::init();

    Kernel::create_task("SensorTask", 3, sensor_task);
    Kernel::create_task("MotorTask", 2, motor_task);
    Kernel::create_task("DisplayTask", 1, display_task);

    Kernel::start();
}

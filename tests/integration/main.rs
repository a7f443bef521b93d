//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a server against mock
//! platform adapters and simulated register pages.  All tests run on the
//! host with no real hardware required.

mod gpio_tests;
mod line_transport_tests;
mod mock_hw;
mod pwm_tests;
mod startup_tests;

use marquee_core::{BookingService, HoldEngine};

#[derive(Clone)]
pub struct AppState {
    pub booking: BookingService,
}

impl AppState {
    pub fn new(booking: BookingService) -> Self {
        Self { booking }
    }

    pub fn engine(&self) -> &HoldEngine {
        self.booking.engine()
    }
}

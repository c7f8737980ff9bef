use icalendar::{Calendar, Component, Event, EventLike};

use crate::models::{GymClass, MemberId};

#[derive(Clone, Default)]
pub struct ICalExporter;

impl ICalExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, member: &MemberId, classes: &[GymClass]) -> Vec<u8> {
        if classes.is_empty() {
            return Vec::new();
        }

        let mut calendar = Calendar::new();
        calendar.name("Gym class bookings");

        for class in classes {
            let mut event = Event::new();
            event.summary(&class.name);
            event.starts(class.start_time);
            event.ends(class.end_time());
            if !class.description.is_empty() {
                event.description(&class.description);
            }
            event.uid(&format!("{}-{}-gym-booking", class.id, member));
            calendar.push(event);
        }

        calendar.to_string().into_bytes()
    }
}

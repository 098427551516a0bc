use log::{info, warn};

use crate::events::LendingEvent;

/// Trait for lending event observation
pub trait LendingObserver {
    /// Called after the library records an event
    fn on_event(&self, event: &LendingEvent);
}

/// Writes every lending event to the log
#[derive(Debug)]
pub struct EventLogger;

impl LendingObserver for EventLogger {
    fn on_event(&self, event: &LendingEvent) {
        match event {
            LendingEvent::CheckedOut { member, book, date } => {
                info!("member {member} checked out {book} on {date}");
            }
            LendingEvent::CheckoutRefused { member, book, date, reasons } => {
                warn!("checkout of {book} by member {member} on {date} refused: {reasons:?}");
            }
            LendingEvent::Restored { member, book, date } => {
                info!("restored loan of {book} to member {member} from {date}");
            }
            LendingEvent::Returned { member, book, date } => {
                info!("member {member} returned {book} on {date}");
            }
            LendingEvent::LoanDaysExtended { member, loan_days } => {
                info!("teacher {member} now has {loan_days} loan days");
            }
        }
    }
}

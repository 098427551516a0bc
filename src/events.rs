use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{book::BookId, member::MemberId};

/// Why a checkout was refused. Both causes may hold at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum CheckoutRefusal {
    /// The book already has an open loan
    BookOnLoan,
    /// The member has an overdue loan or is at the student cap
    MemberIneligible,
}

impl CheckoutRefusal {
    /// Get a human-readable description of the refusal
    #[must_use]
    pub fn get_description(self) -> &'static str {
        match self {
            Self::BookOnLoan => "The book is already on loan.",
            Self::MemberIneligible => {
                "The member cannot borrow (loan limit reached or overdue loans)."
            }
        }
    }
}

/// Events recorded by the library as loans change
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum LendingEvent {
    /// A loan was opened through checkout
    CheckedOut {
        /// Borrowing member
        member: MemberId,
        /// Borrowed book
        book: BookId,
        /// Checkout date
        date: NaiveDate,
    },
    /// A checkout request was turned down
    CheckoutRefused {
        /// Requesting member
        member: MemberId,
        /// Requested book
        book: BookId,
        /// Requested checkout date
        date: NaiveDate,
        /// Every cause that applied
        reasons: Vec<CheckoutRefusal>,
    },
    /// A persisted loan was attached without eligibility checks
    Restored {
        /// Borrowing member
        member: MemberId,
        /// Borrowed book
        book: BookId,
        /// Original checkout date
        date: NaiveDate,
    },
    /// A book came back
    Returned {
        /// Member who held the book
        member: MemberId,
        /// Returned book
        book: BookId,
        /// Return date
        date: NaiveDate,
    },
    /// A teacher's allowance was raised
    LoanDaysExtended {
        /// Rewarded teacher
        member: MemberId,
        /// Allowance after the reward
        loan_days: u32,
    },
}

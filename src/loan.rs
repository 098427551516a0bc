use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    book::{Book, BookId},
    library::LendingError,
    member::{Member, MemberId},
};

/// Date format used when rendering loans
const DATE_FORMAT: &str = "%Y/%m/%d";

/// Placeholder rendered for a missing return date
const NO_DATE: &str = "----/--/--";

/// Identifier of a loan in the library's ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct LoanId(pub(crate) usize);

impl LoanId {
    /// Position of the loan in the ledger, in creation order
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Represents the two states of a loan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum LoanStatus {
    /// The book has not come back yet
    #[default]
    Open,
    /// The book was returned on the given date
    Closed(NaiveDate),
}

impl LoanStatus {
    /// Get a human-readable description of the status
    #[must_use]
    pub fn get_description(self) -> String {
        match self {
            Self::Open => "Loan is open".to_string(),
            Self::Closed(date) => format!("Loan was closed on {}", date.format(DATE_FORMAT)),
        }
    }

    /// Whether the loan is still open
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// The return date, if the loan is closed
    #[must_use]
    pub fn return_date(self) -> Option<NaiveDate> {
        match self {
            Self::Open => None,
            Self::Closed(date) => Some(date),
        }
    }
}

/// A checkout of one book by one member
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Loan {
    /// Ledger identifier
    id: LoanId,
    /// Day the book left the library
    checkout_date: NaiveDate,
    /// Open or closed
    status: LoanStatus,
    /// Borrowing member
    member: MemberId,
    /// Borrowed book
    book: BookId,
}

impl Loan {
    /// Create an open loan
    pub(crate) fn new(id: LoanId, checkout_date: NaiveDate, member: MemberId, book: BookId) -> Self {
        Self { id, checkout_date, status: LoanStatus::Open, member, book }
    }

    /// Ledger identifier
    #[must_use]
    pub fn id(&self) -> LoanId {
        self.id
    }

    /// Day the book left the library
    #[must_use]
    pub fn checkout_date(&self) -> NaiveDate {
        self.checkout_date
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> LoanStatus {
        self.status
    }

    /// Identifier of the borrowing member
    #[must_use]
    pub fn member_id(&self) -> MemberId {
        self.member
    }

    /// Identifier of the borrowed book
    #[must_use]
    pub fn book_id(&self) -> BookId {
        self.book
    }

    /// Whether the book is still out
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Due date for a borrower allowed `loan_days` days
    #[must_use]
    pub fn due_date(&self, loan_days: u32) -> NaiveDate {
        self.checkout_date
            .checked_add_days(Days::new(u64::from(loan_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// A loan is overdue once `reference` is strictly after the due date
    #[must_use]
    pub fn is_overdue(&self, loan_days: u32, reference: NaiveDate) -> bool {
        reference > self.due_date(loan_days)
    }

    /// Record the return of the book
    ///
    /// # Errors
    ///
    /// Returns `LendingError::LoanAlreadyClosed` if the loan was already closed;
    /// a closed loan is never reopened or re-dated.
    pub(crate) fn close(&mut self, return_date: NaiveDate) -> Result<(), LendingError> {
        match self.status {
            LoanStatus::Open => {
                self.status = LoanStatus::Closed(return_date);
                Ok(())
            }
            LoanStatus::Closed(returned) => {
                Err(LendingError::LoanAlreadyClosed { loan: self.id, returned })
            }
        }
    }
}

/// A loan resolved against its member and book
#[derive(Debug, Clone, Copy)]
pub struct LoanView<'a> {
    /// The ledger entry
    loan: &'a Loan,
    /// Borrowing member
    member: &'a Member,
    /// Borrowed book
    book: &'a Book,
}

impl<'a> LoanView<'a> {
    /// Bundle a loan with the records it points at
    pub(crate) fn new(loan: &'a Loan, member: &'a Member, book: &'a Book) -> Self {
        Self { loan, member, book }
    }

    /// The ledger entry
    #[must_use]
    pub fn loan(self) -> &'a Loan {
        self.loan
    }

    /// Borrowing member
    #[must_use]
    pub fn member(self) -> &'a Member {
        self.member
    }

    /// Borrowed book
    #[must_use]
    pub fn book(self) -> &'a Book {
        self.book
    }

    /// Ledger identifier
    #[must_use]
    pub fn id(self) -> LoanId {
        self.loan.id
    }

    /// Current status
    #[must_use]
    pub fn status(self) -> LoanStatus {
        self.loan.status
    }

    /// Whether the book is still out
    #[must_use]
    pub fn is_open(self) -> bool {
        self.loan.is_open()
    }

    /// Due date under the member's current allowance
    #[must_use]
    pub fn due_date(self) -> NaiveDate {
        self.loan.due_date(self.member.loan_days())
    }

    /// Overdue check against the member's current allowance.
    ///
    /// Raising a teacher's allowance moves the due date of every loan they
    /// ever took, including closed ones.
    #[must_use]
    pub fn is_overdue(self, reference: NaiveDate) -> bool {
        self.loan.is_overdue(self.member.loan_days(), reference)
    }
}

impl fmt::Display for LoanView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let returned = self
            .loan
            .status
            .return_date()
            .map_or_else(|| NO_DATE.to_string(), |date| date.format(DATE_FORMAT).to_string());
        writeln!(
            f,
            "Checkout: {} - Return: {returned}",
            self.loan.checkout_date.format(DATE_FORMAT)
        )?;
        writeln!(f, "Book: {}", self.book.title())?;
        write!(f, "Member: {}", self.member.name())
    }
}

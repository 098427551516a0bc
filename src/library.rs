use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    book::{Book, BookId, BookView},
    events::{CheckoutRefusal, LendingEvent},
    loan::{Loan, LoanId, LoanView},
    member::{Classification, Member, MemberId, MemberView, Role},
    observers::LendingObserver,
};

/// Number of events kept in the history before the oldest are dropped
const MAX_HISTORY_SIZE: usize = 100;

/// Errors raised by lending operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LendingError {
    /// The book has no open loan to return or report on
    #[error("the book '{title}' is not on loan")]
    NotOnLoan {
        /// The book that was asked about
        book: BookId,
        /// Its title, for messages
        title: String,
    },
    /// A loan was closed a second time
    #[error("loan {loan} was already returned on {returned}")]
    LoanAlreadyClosed {
        /// The loan
        loan: LoanId,
        /// Date of the first return
        returned: NaiveDate,
    },
    /// No member carries the id
    #[error("no member with id {0}")]
    UnknownMember(MemberId),
    /// No book carries the id
    #[error("no book with id {0}")]
    UnknownBook(BookId),
    /// The id already belongs to a member
    #[error("a member with id {0} is already registered")]
    DuplicateMember(MemberId),
    /// Only teachers have an adjustable allowance
    #[error("member {0} is not a teacher")]
    NotATeacher(MemberId),
}

/// The aggregate owning every member, book and loan
pub struct Library {
    /// Display name
    name: String,
    /// Members in registration order
    members: Vec<Member>,
    /// Books in registration order, indexed by `BookId`
    books: Vec<Book>,
    /// Loan ledger in creation order, indexed by `LoanId`
    loans: Vec<Loan>,
    /// Recent lending events, oldest first
    history: Vec<LendingEvent>,
    /// Maximum number of history entries to keep
    max_history_size: usize,
    /// Registered event observers
    observers: Vec<Box<dyn LendingObserver>>,
}

// Manual implementation of Debug for Library
impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("books", &self.books)
            .field("loans", &self.loans)
            .field("history", &self.history)
            .field("max_history_size", &self.max_history_size)
            .field("observers_count", &self.observers.len())
            .finish()
    }
}

impl Library {
    /// Create an empty library
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
            books: Vec::new(),
            loans: Vec::new(),
            history: Vec::new(),
            max_history_size: MAX_HISTORY_SIZE,
            observers: Vec::new(),
        }
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an observer to be notified of lending events
    pub fn register_observer(&mut self, observer: Box<dyn LendingObserver>) {
        self.observers.push(observer);
    }

    /// Add a book exemplar. Titles need not be unique.
    pub fn register_book(
        &mut self,
        title: impl Into<String>,
        edition: i32,
        publisher: impl Into<String>,
        year: i32,
    ) -> BookId {
        let id = BookId(self.books.len());
        self.books.push(Book::new(id, title.into(), edition, publisher.into(), year));
        id
    }

    /// Register a student with the fixed student allowance
    ///
    /// # Errors
    ///
    /// Returns `LendingError::DuplicateMember` if the id is taken.
    pub fn register_student(
        &mut self,
        id: MemberId,
        name: impl Into<String>,
        major: impl Into<String>,
    ) -> Result<MemberId, LendingError> {
        self.register_member(id, name.into(), Role::Student { major: major.into() })
    }

    /// Register a teacher with the starting teacher allowance
    ///
    /// # Errors
    ///
    /// Returns `LendingError::DuplicateMember` if the id is taken.
    pub fn register_teacher(
        &mut self,
        id: MemberId,
        name: impl Into<String>,
        department: impl Into<String>,
    ) -> Result<MemberId, LendingError> {
        self.register_member(id, name.into(), Role::Teacher { department: department.into() })
    }

    /// Register a member of any role
    ///
    /// # Errors
    ///
    /// Returns `LendingError::DuplicateMember` if the id is taken.
    pub fn register_member(
        &mut self,
        id: MemberId,
        name: String,
        role: Role,
    ) -> Result<MemberId, LendingError> {
        if self.find_member(id).is_some() {
            return Err(LendingError::DuplicateMember(id));
        }
        self.members.push(Member::new(id, name, role));
        Ok(id)
    }

    /// Members in registration order
    pub fn members(&self) -> impl Iterator<Item = MemberView<'_>> {
        self.members.iter().map(move |member| MemberView::new(member, self))
    }

    /// Books in registration order
    pub fn books(&self) -> impl Iterator<Item = BookView<'_>> {
        self.books.iter().map(move |book| BookView::new(book, self))
    }

    /// Every loan ever made, in creation order
    pub fn loans(&self) -> impl Iterator<Item = LoanView<'_>> {
        self.loans.iter().filter_map(move |loan| self.resolve_loan(loan))
    }

    /// Number of registered members
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Number of registered books
    #[must_use]
    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    /// Linear search by identity number
    #[must_use]
    pub fn find_member(&self, id: MemberId) -> Option<MemberView<'_>> {
        self.members
            .iter()
            .find(|member| member.id() == id)
            .map(|member| MemberView::new(member, self))
    }

    /// Look up a book by its registration identifier
    #[must_use]
    pub fn book(&self, id: BookId) -> Option<BookView<'_>> {
        self.books.get(id.0).map(|book| BookView::new(book, self))
    }

    /// First book whose title matches, ignoring case. With duplicate titles
    /// the earliest registered exemplar wins.
    #[must_use]
    pub fn find_book_by_title(&self, title: &str) -> Option<BookView<'_>> {
        let wanted = title.to_lowercase();
        self.books
            .iter()
            .find(|book| book.title().to_lowercase() == wanted)
            .map(|book| BookView::new(book, self))
    }

    /// Look up a loan in the ledger
    #[must_use]
    pub fn loan(&self, id: LoanId) -> Option<LoanView<'_>> {
        self.loans.get(id.0).and_then(|loan| self.resolve_loan(loan))
    }

    /// Pair a ledger entry with its member and book
    fn resolve_loan<'a>(&'a self, loan: &'a Loan) -> Option<LoanView<'a>> {
        let member = self.members.iter().find(|member| member.id() == loan.member_id())?;
        let book = self.books.get(loan.book_id().0)?;
        Some(LoanView::new(loan, member, book))
    }

    /// Every reason a checkout at `date` would be refused; empty if it would succeed
    ///
    /// # Errors
    ///
    /// Returns `LendingError::UnknownMember` or `LendingError::UnknownBook` for
    /// identifiers the library does not know.
    pub fn refusal_reasons(
        &self,
        date: NaiveDate,
        member: MemberId,
        book: BookId,
    ) -> Result<Vec<CheckoutRefusal>, LendingError> {
        let borrower = self.find_member(member).ok_or(LendingError::UnknownMember(member))?;
        let exemplar = self.book(book).ok_or(LendingError::UnknownBook(book))?;

        let mut reasons = Vec::new();
        if exemplar.is_on_loan() {
            reasons.push(CheckoutRefusal::BookOnLoan);
        }
        if !borrower.can_borrow(date) {
            reasons.push(CheckoutRefusal::MemberIneligible);
        }
        Ok(reasons)
    }

    /// Lend `book` to `member` on `date`.
    ///
    /// Eligibility is evaluated at `date`. A refused checkout is `Ok(false)`;
    /// use [`Self::refusal_reasons`] to find out why.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::UnknownMember` or `LendingError::UnknownBook` for
    /// identifiers the library does not know.
    pub fn checkout(
        &mut self,
        date: NaiveDate,
        member: MemberId,
        book: BookId,
    ) -> Result<bool, LendingError> {
        let reasons = self.refusal_reasons(date, member, book)?;
        if !reasons.is_empty() {
            self.record(LendingEvent::CheckoutRefused { member, book, date, reasons });
            return Ok(false);
        }

        self.open_loan(date, member, book)?;
        self.record(LendingEvent::CheckedOut { member, book, date });
        Ok(true)
    }

    /// Attach a persisted loan without checking member eligibility. The book
    /// must still be free; otherwise nothing happens and `Ok(false)` is returned.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::UnknownMember` or `LendingError::UnknownBook` for
    /// identifiers the library does not know.
    pub fn restore_loan(
        &mut self,
        date: NaiveDate,
        member: MemberId,
        book: BookId,
    ) -> Result<bool, LendingError> {
        if self.find_member(member).is_none() {
            return Err(LendingError::UnknownMember(member));
        }
        let exemplar = self.book(book).ok_or(LendingError::UnknownBook(book))?;
        if exemplar.is_on_loan() {
            let reasons = vec![CheckoutRefusal::BookOnLoan];
            self.record(LendingEvent::CheckoutRefused { member, book, date, reasons });
            return Ok(false);
        }

        self.open_loan(date, member, book)?;
        self.record(LendingEvent::Restored { member, book, date });
        Ok(true)
    }

    /// Create an open loan and append it to both histories
    fn open_loan(
        &mut self,
        date: NaiveDate,
        member: MemberId,
        book: BookId,
    ) -> Result<LoanId, LendingError> {
        let id = LoanId(self.loans.len());
        let borrower = self
            .members
            .iter_mut()
            .find(|candidate| candidate.id() == member)
            .ok_or(LendingError::UnknownMember(member))?;
        let exemplar = self.books.get_mut(book.0).ok_or(LendingError::UnknownBook(book))?;

        borrower.push_loan(id);
        exemplar.push_loan(id);
        self.loans.push(Loan::new(id, date, member, book));
        Ok(id)
    }

    /// Close the open loan of `book` on `date`
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotOnLoan` if the book is not out, and
    /// `LendingError::UnknownBook` for an unknown identifier.
    pub fn return_book(&mut self, date: NaiveDate, book: BookId) -> Result<LoanId, LendingError> {
        let (loan_id, member) = {
            let exemplar = self.book(book).ok_or(LendingError::UnknownBook(book))?;
            let open = exemplar.current_loan().ok_or_else(|| LendingError::NotOnLoan {
                book,
                title: exemplar.title().to_string(),
            })?;
            (open.id(), open.member().id())
        };

        if let Some(loan) = self.loans.get_mut(loan_id.0) {
            loan.close(date)?;
        }
        self.record(LendingEvent::Returned { member, book, date });
        Ok(loan_id)
    }

    /// The member currently holding `book`
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotOnLoan` if the book is on the shelf, and
    /// `LendingError::UnknownBook` for an unknown identifier.
    pub fn who_has(&self, book: BookId) -> Result<MemberView<'_>, LendingError> {
        self.book(book).ok_or(LendingError::UnknownBook(book))?.current_borrower()
    }

    /// Number of members of a role, given as `Student`/`Teacher` or
    /// `Estudiante`/`Docente` in any case. Unknown roles count zero.
    #[must_use]
    pub fn count_by_role(&self, role: &str) -> usize {
        Classification::parse(role).map_or(0, |classification| {
            self.members.iter().filter(|member| member.classification() == classification).count()
        })
    }

    /// Open loans past due at `reference`, book by book
    #[must_use]
    pub fn overdue_loans(&self, reference: NaiveDate) -> Vec<LoanView<'_>> {
        self.books()
            .flat_map(BookView::loans)
            .filter(|loan| loan.is_open() && loan.is_overdue(reference))
            .collect()
    }

    /// Teachers who never kept a book past its due date, in registration order
    #[must_use]
    pub fn responsible_teachers(&self, today: NaiveDate) -> Vec<MemberView<'_>> {
        self.members().filter(|member| member.is_responsible(today) == Some(true)).collect()
    }

    /// Reward a teacher with extra loan days, returning the new allowance.
    /// Due dates of all of the teacher's loans move with it.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::UnknownMember` for an unknown id and
    /// `LendingError::NotATeacher` for students.
    pub fn extend_loan_days(
        &mut self,
        member: MemberId,
        extra_days: u32,
    ) -> Result<u32, LendingError> {
        let teacher = self
            .members
            .iter_mut()
            .find(|candidate| candidate.id() == member)
            .ok_or(LendingError::UnknownMember(member))?;
        let loan_days = teacher.extend_loan_days(extra_days)?;
        self.record(LendingEvent::LoanDaysExtended { member, loan_days });
        Ok(loan_days)
    }

    /// Recent lending events, oldest first
    #[must_use]
    pub fn history(&self) -> &[LendingEvent] {
        &self.history
    }

    /// Notify observers and append to the bounded history
    fn record(&mut self, event: LendingEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }

        self.history.push(event);
        if self.history.len() > self.max_history_size {
            self.history.remove(0); // Remove oldest entry
        }
    }
}

// Implementing display for nicer output
impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} members, {} books, {} loans",
            self.name,
            self.members.len(),
            self.books.len(),
            self.loans.len()
        )
    }
}

// Include tests module
#[cfg(test)]
mod tests;

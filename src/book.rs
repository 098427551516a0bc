use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    library::{LendingError, Library},
    loan::{LoanId, LoanView},
    member::MemberView,
};

/// Identifier of a book exemplar, assigned at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct BookId(pub(crate) usize);

impl BookId {
    /// Registration position of the book
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// A physical exemplar of a title. Several exemplars may share a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Registration identifier
    id: BookId,
    /// Title
    title: String,
    /// Edition number
    edition: i32,
    /// Publisher name
    publisher: String,
    /// Publication year
    year: i32,
    /// Loans in creation order
    loans: Vec<LoanId>,
}

impl Book {
    /// Create a book with an empty loan history
    pub(crate) fn new(id: BookId, title: String, edition: i32, publisher: String, year: i32) -> Self {
        Self { id, title, edition, publisher, year, loans: Vec::new() }
    }

    /// Registration identifier
    #[must_use]
    pub fn id(&self) -> BookId {
        self.id
    }

    /// Title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Edition number
    #[must_use]
    pub fn edition(&self) -> i32 {
        self.edition
    }

    /// Publisher name
    #[must_use]
    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    /// Publication year
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Loan identifiers in creation order
    #[must_use]
    pub fn loan_ids(&self) -> &[LoanId] {
        &self.loans
    }

    /// Most recent loan, the only one that can be open
    #[must_use]
    pub fn last_loan_id(&self) -> Option<LoanId> {
        self.loans.last().copied()
    }

    /// Append a loan to the history
    pub(crate) fn push_loan(&mut self, loan: LoanId) {
        self.loans.push(loan);
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Title: {}", self.title)
    }
}

/// A book resolved against the library's loan ledger
#[derive(Debug, Clone, Copy)]
pub struct BookView<'a> {
    /// The book record
    book: &'a Book,
    /// Owner of the loan ledger
    library: &'a Library,
}

impl<'a> BookView<'a> {
    /// Bundle a book with the library it belongs to
    pub(crate) fn new(book: &'a Book, library: &'a Library) -> Self {
        Self { book, library }
    }

    /// The book record
    #[must_use]
    pub fn book(self) -> &'a Book {
        self.book
    }

    /// Registration identifier
    #[must_use]
    pub fn id(self) -> BookId {
        self.book.id
    }

    /// Title
    #[must_use]
    pub fn title(self) -> &'a str {
        &self.book.title
    }

    /// Every loan of this exemplar, oldest first
    pub fn loans(self) -> impl Iterator<Item = LoanView<'a>> {
        let library = self.library;
        self.book.loans.iter().filter_map(move |id| library.loan(*id))
    }

    /// The open loan, if the book is out
    #[must_use]
    pub fn current_loan(self) -> Option<LoanView<'a>> {
        self.book
            .last_loan_id()
            .and_then(|id| self.library.loan(id))
            .filter(|loan| loan.is_open())
    }

    /// Whether the most recent loan is still open
    #[must_use]
    pub fn is_on_loan(self) -> bool {
        self.current_loan().is_some()
    }

    /// The member holding the book
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotOnLoan` if the book is on the shelf.
    pub fn current_borrower(self) -> Result<MemberView<'a>, LendingError> {
        self.current_loan()
            .and_then(|loan| self.library.find_member(loan.member().id()))
            .ok_or_else(|| LendingError::NotOnLoan {
                book: self.book.id,
                title: self.book.title.clone(),
            })
    }
}

impl fmt::Display for BookView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} || On loan: ({})", self.book, if self.is_on_loan() { "Yes" } else { "No" })
    }
}
